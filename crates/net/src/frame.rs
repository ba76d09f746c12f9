//! Message framing over a byte stream
//!
//! Every message travels as a 4-byte big-endian payload length followed
//! by the JSON payload itself. Frames are capped at 1MB; anything larger
//! is treated as a protocol violation, not buffered.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::protocol::Message;

const MAX_FRAME_SIZE: u32 = 1024 * 1024;

/// EOF mid-frame means the peer went away, not a malformed stream
fn eof_as_closed(e: std::io::Error) -> Error {
    match e.kind() {
        std::io::ErrorKind::UnexpectedEof => Error::ConnectionClosed,
        _ => Error::Io(e),
    }
}

/// Read one frame and decode its message
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Message> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await.map_err(eof_as_closed)?;
    let len = u32::from_be_bytes(len_buf);

    if len == 0 {
        return Err(Error::Protocol("empty frame".into()));
    }
    if len > MAX_FRAME_SIZE {
        return Err(Error::Protocol(format!(
            "frame of {len} bytes exceeds the {MAX_FRAME_SIZE} cap"
        )));
    }

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await.map_err(eof_as_closed)?;

    Message::from_bytes(&payload)
        .map_err(|e| Error::Protocol(format!("undecodable payload: {e}")))
}

/// Encode a message and write it as one frame, flushed
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, msg: &Message) -> Result<()> {
    let payload = msg
        .to_bytes()
        .map_err(|e| Error::Protocol(format!("unencodable message: {e}")))?;

    let len = payload.len() as u32;
    if len > MAX_FRAME_SIZE {
        return Err(Error::Protocol(format!(
            "outgoing frame of {len} bytes exceeds the {MAX_FRAME_SIZE} cap"
        )));
    }

    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}
