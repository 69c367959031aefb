// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transport bridge between the bus and the daemon.
//!
//! Resolved once per session. When this process owns the daemon, requests
//! on the bus are answered in-process. Otherwise they are framed over the
//! daemon's Unix socket and responses are published back onto the bus.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wt_core::{
    CommandKind, Handler, Message, MessageBus, MessageKind, Request, RequestId, Response,
    StatusCode, SubscriptionId,
};
use wt_daemon::protocol::{self, ProtocolError};
use wt_daemon::{RequestHandler, DEFAULT_TIMEOUT};

use crate::daemon_process::{DaemonProcess, DaemonProcessState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Embedded,
    Remote,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Embedded => write!(f, "embedded"),
            TransportMode::Remote => write!(f, "remote"),
        }
    }
}

pub enum Transport {
    Embedded(EmbeddedTransport),
    Remote(RemoteTransport),
}

impl Transport {
    /// Start or find the daemon and attach `bus` to it.
    ///
    /// A failed embedded launch falls back to the socket.
    pub async fn resolve(process: &DaemonProcess, bus: &MessageBus) -> Transport {
        let state = process.start().await;
        if state == DaemonProcessState::Running {
            if let Some(handler) = process.handler() {
                info!(mode = %TransportMode::Embedded, "transport resolved");
                return Transport::Embedded(EmbeddedTransport::attach(bus, handler));
            }
        } else {
            warn!(%state, "no embedded daemon, trying the daemon socket");
        }
        info!(mode = %TransportMode::Remote, "transport resolved");
        Transport::Remote(RemoteTransport::connect(bus, process.socket_path()).await)
    }

    pub fn mode(&self) -> TransportMode {
        match self {
            Transport::Embedded(_) => TransportMode::Embedded,
            Transport::Remote(_) => TransportMode::Remote,
        }
    }

    /// Whether requests can reach a daemon. Always true in-process.
    pub fn is_connected(&self) -> bool {
        match self {
            Transport::Embedded(_) => true,
            Transport::Remote(t) => t.is_connected(),
        }
    }

    /// Disconnect from the bus. Requests still in flight on the socket
    /// are answered with an error.
    pub fn detach(self) {
        match self {
            Transport::Embedded(t) => t.detach(),
            Transport::Remote(t) => t.detach(),
        }
    }
}

/// Answers bus requests with an in-process daemon.
pub struct EmbeddedTransport {
    bus: MessageBus,
    subscription: SubscriptionId,
}

impl EmbeddedTransport {
    pub fn attach(bus: &MessageBus, handler: Arc<dyn RequestHandler>) -> Self {
        let subscription = bus.register(Arc::new(EmbeddedAdapter {
            bus: bus.clone(),
            handler,
        }));
        Self {
            bus: bus.clone(),
            subscription,
        }
    }

    fn detach(self) {
        self.bus.unsubscribe(self.subscription);
    }
}

struct EmbeddedAdapter {
    bus: MessageBus,
    handler: Arc<dyn RequestHandler>,
}

#[async_trait]
impl Handler for EmbeddedAdapter {
    fn interests(&self) -> &[MessageKind] {
        MessageKind::REQUESTS
    }

    async fn handle(&self, message: Message) {
        let Message::Request(request) = message else {
            return;
        };
        let response = self.handler.handle(&request);
        self.bus.publish(Message::Response(response));
    }
}

/// Connection state shared by the socket writer and reader.
#[derive(Default)]
struct Link {
    connected: bool,
    inflight: HashMap<RequestId, CommandKind>,
    /// Why the link is down, echoed in synthetic responses
    reason: String,
}

impl Link {
    fn disconnect(&mut self, reason: impl Into<String>) -> Vec<(RequestId, CommandKind)> {
        self.connected = false;
        self.reason = reason.into();
        self.inflight.drain().collect()
    }
}

/// Frames bus requests over the daemon socket.
pub struct RemoteTransport {
    bus: MessageBus,
    link: Arc<Mutex<Link>>,
    subscription: SubscriptionId,
    reader: Option<JoinHandle<()>>,
}

impl RemoteTransport {
    /// Connect to the daemon socket. A failed connection still yields a
    /// transport; every request is then answered with 503.
    pub async fn connect(bus: &MessageBus, socket_path: &Path) -> Self {
        let link = Arc::new(Mutex::new(Link::default()));

        let (writer, reader) = match UnixStream::connect(socket_path).await {
            Ok(stream) => {
                info!(socket = %socket_path.display(), "connected to daemon");
                link.lock().connected = true;
                let (read_half, write_half) = stream.into_split();
                let reader = tokio::spawn(read_responses(
                    read_half,
                    bus.clone(),
                    Arc::clone(&link),
                ));
                (Some(write_half), Some(reader))
            }
            Err(e) => {
                warn!(socket = %socket_path.display(), error = %e, "daemon unavailable");
                link.lock().reason = format!("daemon unavailable: {e}");
                (None, None)
            }
        };

        let subscription = bus.register(Arc::new(RemoteAdapter {
            bus: bus.clone(),
            link: Arc::clone(&link),
            writer: tokio::sync::Mutex::new(writer),
        }));

        Self {
            bus: bus.clone(),
            link,
            subscription,
            reader,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.link.lock().connected
    }

    fn detach(self) {
        self.bus.unsubscribe(self.subscription);
        if let Some(reader) = self.reader {
            reader.abort();
        }
        let failed = self.link.lock().disconnect("transport detached");
        fail(&self.bus, failed, "transport detached");
    }
}

struct RemoteAdapter {
    bus: MessageBus,
    link: Arc<Mutex<Link>>,
    writer: tokio::sync::Mutex<Option<OwnedWriteHalf>>,
}

#[async_trait]
impl Handler for RemoteAdapter {
    fn interests(&self) -> &[MessageKind] {
        MessageKind::REQUESTS
    }

    async fn handle(&self, message: Message) {
        let Message::Request(request) = message else {
            return;
        };

        {
            let mut link = self.link.lock();
            if !link.connected {
                let reason = link.reason.clone();
                drop(link);
                fail(
                    &self.bus,
                    vec![(request.id, request.command.kind())],
                    &reason,
                );
                return;
            }
            link.inflight.insert(request.id, request.command.kind());
        }

        if let Err(e) = self.send(&request).await {
            warn!(id = %request.id, error = %e, "failed to send request to daemon");
            let failed = self
                .link
                .lock()
                .disconnect(format!("connection to daemon lost: {e}"));
            fail(&self.bus, failed, &format!("connection to daemon lost: {e}"));
        }
    }
}

impl RemoteAdapter {
    async fn send(&self, request: &Request) -> Result<(), ProtocolError> {
        let mut writer = self.writer.lock().await;
        let Some(writer) = writer.as_mut() else {
            return Err(ProtocolError::ConnectionClosed);
        };
        protocol::write_frame(writer, request, DEFAULT_TIMEOUT).await
    }
}

/// Publish daemon responses until the connection ends, then fail whatever
/// is still in flight.
async fn read_responses(mut reader: OwnedReadHalf, bus: MessageBus, link: Arc<Mutex<Link>>) {
    let reason = loop {
        match protocol::read_frame::<Response, _>(&mut reader).await {
            Ok(response) => {
                let known = link.lock().inflight.remove(&response.request_id).is_some();
                if !known {
                    debug!(id = %response.request_id, "response for unknown request");
                }
                bus.publish(Message::Response(response));
            }
            Err(ProtocolError::ConnectionClosed) => break "connection to daemon closed".to_string(),
            Err(e) => break format!("connection to daemon lost: {e}"),
        }
    };

    warn!("{}", reason);
    let failed = link.lock().disconnect(reason.clone());
    fail(&bus, failed, &reason);
}

/// Answer each request with a synthetic 503.
fn fail(bus: &MessageBus, requests: Vec<(RequestId, CommandKind)>, reason: &str) {
    for (id, kind) in requests {
        debug!(%id, "failing request: {}", reason);
        bus.publish(Message::Response(Response::error_for(
            id,
            kind,
            StatusCode::UNAVAILABLE,
            reason,
        )));
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
