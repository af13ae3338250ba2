//! Length-delimited packet framing over TCP.
//!
//! Each frame is a 4-byte big-endian length followed by a bincode-encoded
//! [`Packet`]. `MAX_FRAME_SIZE` bounds the allocation a malformed length
//! prefix can trigger; roster snapshots are the largest expected frames.

use crate::Packet;
use bincode::{deserialize, serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const MAX_FRAME_SIZE: u32 = 64 * 1024;

#[derive(Debug, Error)]
pub enum FramingError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("frame too large: {0} bytes")]
    TooLarge(usize),
}

impl FramingError {
    /// True when the peer closed the stream between frames.
    pub fn is_eof(&self) -> bool {
        matches!(self, FramingError::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
    }
}

pub async fn write_packet<W>(writer: &mut W, packet: &Packet) -> Result<(), FramingError>
where
    W: AsyncWrite + Unpin,
{
    let data = serialize(packet)?;
    if data.len() > MAX_FRAME_SIZE as usize {
        return Err(FramingError::TooLarge(data.len()));
    }

    writer.write_u32(data.len() as u32).await?;
    writer.write_all(&data).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_packet<R>(reader: &mut R) -> Result<Packet, FramingError>
where
    R: AsyncRead + Unpin,
{
    let len = reader.read_u32().await?;
    if len > MAX_FRAME_SIZE {
        return Err(FramingError::TooLarge(len as usize));
    }

    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).await?;
    Ok(deserialize(&buf)?)
}
