//! Newline-delimited frame extraction.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

const INITIAL_BUFFER_CAPACITY: usize = 4096;

/// Incrementally pulls `\n`-terminated frames out of a byte source.
///
/// A single underlying read may deliver several frames or a fraction of
/// one; whatever follows a terminator stays buffered for the next call.
/// This layer is byte-oriented only and knows nothing about JSON.
pub struct FrameReader<R> {
    source: R,
    buffer: BytesMut,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Returns the bytes of the next frame, without its terminator.
    ///
    /// `Ok(None)` means the peer closed the stream; an I/O error ends the
    /// stream just the same, but is reported so the caller can log it.
    pub async fn read_frame(&mut self) -> std::io::Result<Option<Bytes>> {
        loop {
            if let Some(frame) = self.take_buffered_frame() {
                return Ok(Some(frame));
            }
            let read = self.source.read_buf(&mut self.buffer).await?;
            if read == 0 {
                if !self.buffer.is_empty() {
                    debug!(
                        "discarding {} unterminated trailing bytes at end of stream",
                        self.buffer.len()
                    );
                }
                return Ok(None);
            }
        }
    }

    fn take_buffered_frame(&mut self) -> Option<Bytes> {
        let end = self.buffer.iter().position(|&byte| byte == b'\n')?;
        let mut frame = self.buffer.split_to(end + 1);
        frame.truncate(end);
        Some(frame.freeze())
    }
}
