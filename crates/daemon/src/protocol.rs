// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Framing for the `wtd` socket.
//!
//! Each frame is a big-endian `u32` byte count followed by one JSON
//! `Request` or `Response`. A connection stays open and carries any number
//! of requests; every response names the request it answers, so they need
//! not arrive in order.

use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Why a frame could not be read or written
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed frame body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame of {size} bytes exceeds the {max} byte limit")]
    MessageTooLarge { size: usize, max: usize },

    #[error("peer closed the socket")]
    ConnectionClosed,

    #[error("peer stopped reading")]
    Timeout,
}

/// Largest frame body either side will send or accept
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// How long a frame write may block on a slow peer
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Reported by `wtd --version` and written to the version file on startup
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

fn check_size(size: usize) -> Result<(), ProtocolError> {
    if size > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size,
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(())
}

/// A short read means the peer hung up mid-frame.
fn closed_on_eof(e: std::io::Error) -> ProtocolError {
    match e.kind() {
        std::io::ErrorKind::UnexpectedEof => ProtocolError::ConnectionClosed,
        _ => ProtocolError::Io(e),
    }
}

/// Serialize a request or response into a frame body.
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, ProtocolError> {
    let body = serde_json::to_vec(msg)?;
    check_size(body.len())?;
    Ok(body)
}

pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(body)?)
}

/// Read one frame body, without interpreting it.
pub async fn read_message<R: AsyncReadExt + Unpin>(
    reader: &mut R,
) -> Result<Vec<u8>, ProtocolError> {
    let mut header = [0u8; 4];
    reader.read_exact(&mut header).await.map_err(closed_on_eof)?;

    let size = u32::from_be_bytes(header) as usize;
    check_size(size)?;

    let mut body = vec![0u8; size];
    reader.read_exact(&mut body).await.map_err(closed_on_eof)?;
    Ok(body)
}

/// Write one frame body behind its byte count, then flush.
pub async fn write_message<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    body: &[u8],
) -> Result<(), ProtocolError> {
    check_size(body.len())?;

    writer.write_all(&(body.len() as u32).to_be_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}

/// Read and decode one frame. Waits as long as the peer stays connected.
pub async fn read_frame<T: DeserializeOwned, R: AsyncReadExt + Unpin>(
    reader: &mut R,
) -> Result<T, ProtocolError> {
    decode(&read_message(reader).await?)
}

/// Encode and write one frame, giving up after `timeout`.
pub async fn write_frame<T: Serialize, W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    msg: &T,
    timeout: Duration,
) -> Result<(), ProtocolError> {
    let body = encode(msg)?;
    tokio::time::timeout(timeout, write_message(writer, &body))
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
