// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Messages exchanged between the front end and the watch daemon.
//!
//! Requests and responses travel over the in-process bus and, for a
//! daemon owned by another process, over the socket protocol. Both sides
//! share these types so the wire format is simply their JSON encoding.

use crate::id::RequestId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Instruction targeting the daemon's own lifecycle rather than a domain
/// operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlCommand {
    /// Re-read the persisted watch list and apply it
    Reload,
    /// Stop the daemon
    Shutdown,
}

impl std::fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlCommand::Reload => write!(f, "reload"),
            ControlCommand::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// Operation carried by a [`Request`].
///
/// Serializes with `{"type": "watch:add", ...fields}` format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    #[serde(rename = "watch:add")]
    AddWatch { path: PathBuf },

    #[serde(rename = "control")]
    Control { command: ControlCommand },

    #[serde(rename = "watch:list")]
    ListWatches,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::AddWatch { .. } => CommandKind::AddWatch,
            Command::Control { .. } => CommandKind::Control,
            Command::ListWatches => CommandKind::ListWatches,
        }
    }
}

/// Discriminant of [`Command`], echoed on responses so subscribers can
/// filter by the operation a response answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    AddWatch,
    Control,
    ListWatches,
}

/// A correlated request. Immutable once sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub command: Command,
}

impl Request {
    /// Build a request with a freshly allocated identifier.
    pub fn new(command: Command) -> Self {
        Self {
            id: RequestId::next(),
            command,
        }
    }
}

/// Status of a response. Only 200 is success; every other code is an
/// error carrying a human-readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const CONFLICT: StatusCode = StatusCode(409);
    pub const INTERNAL: StatusCode = StatusCode(500);
    /// Daemon unreachable, connection lost, or daemon shutting down
    pub const UNAVAILABLE: StatusCode = StatusCode(503);

    pub fn is_success(self) -> bool {
        self == StatusCode::OK
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// State of a single watched folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchStatus {
    Watching,
    /// Configured, but the folder no longer exists
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEntry {
    pub path: PathBuf,
    pub status: WatchStatus,
}

/// Structured payload attached to some responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    Watches { watches: Vec<WatchEntry> },
}

/// Answer to a [`Request`], matched to it by `request_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub request_id: RequestId,
    pub kind: CommandKind,
    pub code: StatusCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
}

impl Response {
    /// Successful response to `request`.
    pub fn ok(request: &Request, message: impl Into<String>) -> Self {
        Self {
            request_id: request.id,
            kind: request.command.kind(),
            code: StatusCode::OK,
            message: message.into(),
            payload: None,
        }
    }

    /// Error-band response to `request`.
    pub fn error(request: &Request, code: StatusCode, message: impl Into<String>) -> Self {
        Self::error_for(request.id, request.command.kind(), code, message)
    }

    /// Error-band response when only the identifier and kind are known,
    /// e.g. synthesized after a lost connection.
    pub fn error_for(
        request_id: RequestId,
        kind: CommandKind,
        code: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            request_id,
            kind,
            code,
            message: message.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }
}

/// Everything that travels on the [`MessageBus`](crate::MessageBus).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Request(Request),
    Response(Response),
    /// Lifecycle instruction for a daemon sharing this bus
    Control(ControlCommand),
    /// The front end has been asked to exit
    ExitRequested,
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Request(request) => match request.command.kind() {
                CommandKind::AddWatch => MessageKind::AddWatchRequest,
                CommandKind::Control => MessageKind::ControlRequest,
                CommandKind::ListWatches => MessageKind::ListWatchesRequest,
            },
            Message::Response(response) => match response.kind {
                CommandKind::AddWatch => MessageKind::AddWatchResponse,
                CommandKind::Control => MessageKind::ControlResponse,
                CommandKind::ListWatches => MessageKind::ListWatchesResponse,
            },
            Message::Control(_) => MessageKind::Control,
            Message::ExitRequested => MessageKind::ExitRequested,
        }
    }
}

/// Runtime type of a [`Message`]; subscribers declare interest in these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    AddWatchRequest,
    ControlRequest,
    ListWatchesRequest,
    AddWatchResponse,
    ControlResponse,
    ListWatchesResponse,
    Control,
    ExitRequested,
}

impl MessageKind {
    pub const REQUESTS: &'static [MessageKind] = &[
        MessageKind::AddWatchRequest,
        MessageKind::ControlRequest,
        MessageKind::ListWatchesRequest,
    ];

    pub const RESPONSES: &'static [MessageKind] = &[
        MessageKind::AddWatchResponse,
        MessageKind::ControlResponse,
        MessageKind::ListWatchesResponse,
    ];
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
