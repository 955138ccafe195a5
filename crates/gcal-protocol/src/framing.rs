//! Length-prefixed message framing.
//!
//! ```text
//! +----------------+------------------+
//! | length (4 BE)  |  JSON payload    |
//! +----------------+------------------+
//! ```
//!
//! [`encode_message`] and [`decode_message`] work on complete buffers;
//! [`read_frame`] and [`write_frame`] work on async streams and are what the
//! socket client and server use.

use serde::{Serialize, de::DeserializeOwned};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::MAX_MESSAGE_SIZE;
use crate::error::{ProtocolError, ProtocolResult};

const PREFIX_LEN: usize = 4;

fn check_len(len: usize) -> ProtocolResult<()> {
    if len > MAX_MESSAGE_SIZE as usize {
        return Err(ProtocolError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(())
}

/// Serializes `message` and prepends its length.
///
/// ```rust
/// use gcal_protocol::{encode_message, Envelope, Request};
///
/// let bytes = encode_message(&Envelope::request("req-1", Request::new("health"))).unwrap();
/// assert!(bytes.len() > 4);
/// ```
pub fn encode_message<T: Serialize>(message: &T) -> ProtocolResult<Vec<u8>> {
    let json = serde_json::to_vec(message)?;
    check_len(json.len())?;

    let mut buffer = Vec::with_capacity(PREFIX_LEN + json.len());
    buffer.extend_from_slice(&(json.len() as u32).to_be_bytes());
    buffer.extend_from_slice(&json);
    Ok(buffer)
}

/// Decodes one complete frame from `data`. Trailing bytes are ignored.
pub fn decode_message<T: DeserializeOwned>(data: &[u8]) -> ProtocolResult<T> {
    let Some((prefix, rest)) = data.split_first_chunk::<PREFIX_LEN>() else {
        return Err(ProtocolError::IncompleteMessage {
            expected: PREFIX_LEN,
            received: data.len(),
        });
    };

    let len = u32::from_be_bytes(*prefix) as usize;
    check_len(len)?;
    if len == 0 {
        return Err(ProtocolError::EmptyMessage);
    }

    let payload = rest.get(..len).ok_or(ProtocolError::IncompleteMessage {
        expected: PREFIX_LEN + len,
        received: data.len(),
    })?;
    Ok(serde_json::from_slice(payload)?)
}

/// Reads one frame from `reader`.
///
/// Returns `Ok(None)` on a clean end of stream before any prefix byte.
pub async fn read_frame<R, T>(reader: &mut R) -> ProtocolResult<Option<T>>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut prefix = [0u8; PREFIX_LEN];
    match reader.read_exact(&mut prefix).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(prefix) as usize;
    check_len(len)?;
    if len == 0 {
        return Err(ProtocolError::EmptyMessage);
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ProtocolError::IncompleteMessage {
                expected: len,
                received: 0,
            }
        } else {
            e.into()
        }
    })?;

    Ok(Some(serde_json::from_slice(&payload)?))
}

/// Writes one frame to `writer` and flushes it.
pub async fn write_frame<W, T>(writer: &mut W, message: &T) -> ProtocolResult<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let data = encode_message(message)?;
    writer.write_all(&data).await?;
    writer.flush().await?;
    Ok(())
}
