//! Length-prefixed frames.
//!
//! Each frame is a little-endian `i32` length followed by that many bytes of
//! UTF-8 JSON. Lengths outside `1..=MAX_FRAME_LEN` end the connection.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ControlError;

/// Largest accepted frame body (1 MiB).
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Read one frame.
///
/// # Returns
/// None when the peer closed the stream before sending a length prefix.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, ControlError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix: [u8; 4] = [0; 4];
    match reader.read_exact(&mut prefix).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len: i32 = i32::from_le_bytes(prefix);
    if len <= 0 || len as usize > MAX_FRAME_LEN {
        return Err(ControlError::InvalidFrameLength(i64::from(len)));
    }

    let mut body: Vec<u8> = vec![0; len as usize];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

/// Write one frame and flush.
pub async fn write_frame<W>(writer: &mut W, body: &[u8]) -> Result<(), ControlError>
where
    W: AsyncWrite + Unpin,
{
    if body.is_empty() || body.len() > MAX_FRAME_LEN {
        return Err(ControlError::InvalidFrameLength(body.len() as i64));
    }

    writer.write_all(&(body.len() as i32).to_le_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}
