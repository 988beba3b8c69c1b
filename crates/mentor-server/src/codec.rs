//! Wire framing: a 4-byte big-endian length, then that many bytes of UTF-8
//! JSON. Server and client share these helpers.

use std::future::Future;
use std::io;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const HEADER_LEN: usize = 4;
pub const DEFAULT_MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum FramingError {
    #[error("connection closed after {received} of {HEADER_LEN} header bytes")]
    IncompleteHeader { received: usize },
    #[error("connection closed after {received} of {expected} body bytes")]
    IncompleteBody { expected: usize, received: usize },
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: u64, max: u64 },
    #[error("socket operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reads one frame. Short reads are retried until the header and body are
/// complete or the peer closes.
pub async fn read_frame<R>(reader: &mut R, max_frame_bytes: usize) -> Result<Vec<u8>, FramingError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0_u8; HEADER_LEN];
    let got = fill(reader, &mut header).await?;
    if got < HEADER_LEN {
        return Err(FramingError::IncompleteHeader { received: got });
    }

    let len = u32::from_be_bytes(header);
    let expected = usize::try_from(len).unwrap_or(usize::MAX);
    if expected > max_frame_bytes {
        return Err(FramingError::FrameTooLarge {
            len: u64::from(len),
            max: max_frame_bytes as u64,
        });
    }

    let mut body = vec![0_u8; expected];
    let got = fill(reader, &mut body).await?;
    if got < expected {
        return Err(FramingError::IncompleteBody {
            expected,
            received: got,
        });
    }
    Ok(body)
}

/// Writes header and payload as one buffer, then flushes.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), FramingError>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(payload.len()).map_err(|_| FramingError::FrameTooLarge {
        len: payload.len() as u64,
        max: u64::from(u32::MAX),
    })?;

    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(payload);
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_json<R, T>(reader: &mut R, max_frame_bytes: usize) -> Result<T, FramingError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let body = read_frame(reader, max_frame_bytes).await?;
    Ok(serde_json::from_slice(&body)?)
}

pub async fn write_json<W, T>(writer: &mut W, value: &T) -> Result<(), FramingError>
where
    W: AsyncWrite + Unpin,
    T: Serialize + ?Sized,
{
    let payload = serde_json::to_vec(value)?;
    write_frame(writer, &payload).await
}

/// Bounds a socket operation by `limit`.
pub async fn within<F, T>(limit: Duration, op: F) -> Result<T, FramingError>
where
    F: Future<Output = Result<T, FramingError>>,
{
    tokio::time::timeout(limit, op)
        .await
        .map_err(|_| FramingError::Timeout(limit))?
}

async fn fill<R>(reader: &mut R, buf: &mut [u8]) -> Result<usize, FramingError>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while let Some(rest) = buf.get_mut(filled..).filter(|rest| !rest.is_empty()) {
        let n = reader.read(rest).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
