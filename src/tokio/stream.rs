use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::error::{Error, Result};
use crate::protocol::frame::{FRAME_HEADER_LEN, read_frame_header};

/// Buffered read half of the connection.
///
/// Owned by the handshake driver first, then handed to the read loop,
/// which is the only reader for the rest of the connection's life. The
/// BufReader keeps bytes that arrived beyond what a read consumed, so
/// frames and zero-terminated messages may span socket reads freely.
pub struct ReadStream {
    inner: BufReader<OwnedReadHalf>,
}

impl ReadStream {
    pub fn new(half: OwnedReadHalf) -> Self {
        Self {
            inner: BufReader::new(half),
        }
    }

    /// Read bytes up to and including the next 0x00 byte, looping across
    /// socket reads as needed. Returns the prefix without the terminator.
    pub async fn read_zero_terminated(&mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.inner.read_until(0, &mut buf).await?;
        if buf.last() != Some(&0) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed before message terminator",
            )));
        }
        buf.pop();
        Ok(buf)
    }

    /// Read one complete response frame into `buffer` (reused across
    /// calls), returning the frame's token.
    pub async fn read_frame(&mut self, buffer: &mut Vec<u8>) -> Result<u64> {
        let mut header = [0u8; FRAME_HEADER_LEN];
        self.inner.read_exact(&mut header).await?;
        let header = read_frame_header(&header)?;

        buffer.clear();
        buffer.resize(header.payload_len as usize, 0);
        self.inner.read_exact(buffer).await?;
        Ok(header.token)
    }
}

/// Write half of the connection. All writes go through the connection's
/// write lane, so this type needs no synchronization of its own.
#[derive(Debug)]
pub struct WriteStream {
    inner: OwnedWriteHalf,
}

impl WriteStream {
    pub fn new(half: OwnedWriteHalf) -> Self {
        Self { inner: half }
    }

    /// Write the whole buffer, or fail. Never partially enqueues.
    pub async fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.inner.write_all(buf).await?;
        self.inner.flush().await
    }

    pub async fn shutdown(&mut self) -> std::io::Result<()> {
        self.inner.shutdown().await
    }
}
