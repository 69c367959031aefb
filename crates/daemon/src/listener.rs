// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O.
//!
//! Each accepted connection gets its own task and stays open until the
//! client hangs up, answering requests in the order they arrive.

use std::sync::Arc;

use thiserror::Error;
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info, warn};
use wt_core::{Command, Request, Response};

use crate::protocol::{self, DEFAULT_TIMEOUT};
use crate::service::RequestHandler;

/// Listener task for accepting socket connections.
pub struct Listener {
    socket: UnixListener,
    handler: Arc<dyn RequestHandler>,
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),
}

impl Listener {
    pub fn new(socket: UnixListener, handler: Arc<dyn RequestHandler>) -> Self {
        Self { socket, handler }
    }

    /// Run the listener loop, spawning a task for each connection.
    pub async fn run(self) {
        loop {
            match self.socket.accept().await {
                Ok((stream, _)) => {
                    let handler = Arc::clone(&self.handler);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, handler).await {
                            match e {
                                ConnectionError::Protocol(protocol::ProtocolError::Timeout) => {
                                    warn!("Connection timeout")
                                }
                                _ => error!("Connection error: {}", e),
                            }
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single client connection until it closes.
async fn handle_connection(
    stream: UnixStream,
    handler: Arc<dyn RequestHandler>,
) -> Result<(), ConnectionError> {
    let (mut reader, mut writer) = stream.into_split();

    loop {
        let request: Request = match protocol::read_frame(&mut reader).await {
            Ok(request) => request,
            Err(protocol::ProtocolError::ConnectionClosed) => {
                debug!("Client disconnected");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        // Listing is polled by front ends; keep it out of the info log
        if matches!(request.command, Command::ListWatches) {
            debug!(id = %request.id, "received request");
        } else {
            info!(id = %request.id, command = ?request.command, "received request");
        }

        let response: Response = handler.handle(&request);
        protocol::write_frame(&mut writer, &response, DEFAULT_TIMEOUT).await?;
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
