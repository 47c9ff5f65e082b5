// SPDX-License-Identifier: MIT

//! Wire format: one JSON object per line over a Unix domain socket. Simpler
//! than a length-prefixed framing (no prefix to get wrong) and good enough
//! for payloads of this size; a `Request`/`Response`/`Event` never needs to
//! carry more than a handful of queued jobs or history rows at once.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};

use crate::{Request, Response};

/// One megabyte; generous for this protocol's payloads, tight enough to
/// reject a client that sends garbage with no newline.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("line exceeded {max} bytes")]
    LineTooLong { max: usize },

    #[error("connection closed")]
    ConnectionClosed,

    #[error("timed out waiting for a message")]
    Timeout,
}

pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, ProtocolError> {
    let mut line = serde_json::to_vec(msg)?;
    line.push(b'\n');
    Ok(line)
}

pub fn decode<T: DeserializeOwned>(line: &str) -> Result<T, ProtocolError> {
    Ok(serde_json::from_str(line)?)
}

/// Read one newline-delimited JSON message. `reader` must be a buffered
/// reader (`tokio::io::BufReader`) so repeated calls don't re-read from the
/// socket each time.
pub async fn read_message<R, T>(reader: &mut R) -> Result<T, ProtocolError>
where
    R: AsyncBufReadExt + Unpin,
    T: DeserializeOwned,
{
    let mut line = String::new();
    let n = reader.read_line(&mut line).await?;
    if n == 0 {
        return Err(ProtocolError::ConnectionClosed);
    }
    if line.len() > MAX_LINE_BYTES {
        return Err(ProtocolError::LineTooLong { max: MAX_LINE_BYTES });
    }
    decode(line.trim_end_matches('\n'))
}

pub async fn write_message<W, T>(writer: &mut W, msg: &T) -> Result<(), ProtocolError>
where
    W: AsyncWriteExt + Unpin,
    T: Serialize,
{
    let bytes = encode(msg)?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_request<R>(reader: &mut R, timeout: std::time::Duration) -> Result<Request, ProtocolError>
where
    R: AsyncBufReadExt + Unpin,
{
    tokio::time::timeout(timeout, read_message(reader)).await.map_err(|_| ProtocolError::Timeout)?
}

pub async fn write_response<W>(
    writer: &mut W,
    response: &Response,
    timeout: std::time::Duration,
) -> Result<(), ProtocolError>
where
    W: AsyncWriteExt + Unpin,
{
    tokio::time::timeout(timeout, write_message(writer, response)).await.map_err(|_| ProtocolError::Timeout)?
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
