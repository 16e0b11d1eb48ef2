//! Fixed-capacity chunk buffer.
//!
//! The chat protocol has no framing: whatever a single read returns is one
//! message. `ChunkBuffer` makes that policy explicit. Every fill clears the
//! previous contents and performs exactly one read of at most `capacity`
//! bytes, so nothing accumulates across calls. A peer message longer than
//! the capacity therefore arrives as several consecutive chunks.
//!
//! Each direction of a session owns its own buffer; buffers are never shared
//! between tasks.

use bytes::{Bytes, BytesMut};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Reference buffer capacity in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Reusable buffer holding the bytes of the most recent read.
#[derive(Debug)]
pub struct ChunkBuffer {
    buf: BytesMut,
    capacity: usize,
}

impl ChunkBuffer {
    /// Create a buffer that reads at most `capacity` bytes per fill.
    ///
    /// A zero capacity is raised to one byte; a zero-length read would be
    /// indistinguishable from an orderly close.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Maximum number of bytes a single fill can return.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of bytes from the last fill.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes from the last fill.
    pub fn chunk(&self) -> &[u8] {
        &self.buf
    }

    /// Copy the last chunk out so it can outlive the next fill.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self.chunk())
    }

    /// Clear the buffer and perform one read into it.
    ///
    /// Returns the number of bytes read. `Ok(0)` means the reader reached
    /// end of stream. On error the buffer is left empty.
    pub async fn fill_from<R>(&mut self, reader: &mut R) -> io::Result<usize>
    where
        R: AsyncRead + Unpin,
    {
        self.buf.clear();
        self.buf.resize(self.capacity, 0);

        match reader.read(&mut self.buf[..]).await {
            Ok(n) => {
                self.buf.truncate(n);
                Ok(n)
            }
            Err(e) => {
                self.buf.clear();
                Err(e)
            }
        }
    }
}

impl Default for ChunkBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[test]
    fn test_default_capacity() {
        let buf = ChunkBuffer::default();
        assert_eq!(buf.capacity(), 1024);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_zero_capacity_raised() {
        assert_eq!(ChunkBuffer::new(0).capacity(), 1);
    }

    #[tokio::test]
    async fn test_short_read_is_one_message() {
        let mut reader = Builder::new().read(b"hello\n").build();
        let mut buf = ChunkBuffer::new(1024);

        let n = buf.fill_from(&mut reader).await.unwrap();
        assert_eq!(n, 6);
        assert_eq!(buf.chunk(), b"hello\n");
        assert_eq!(buf.len(), 6);
    }

    #[tokio::test]
    async fn test_fill_discards_previous_chunk() {
        let mut reader = Builder::new().read(b"a longer line\n").read(b"hi\n").build();
        let mut buf = ChunkBuffer::new(64);

        buf.fill_from(&mut reader).await.unwrap();
        assert_eq!(buf.chunk(), b"a longer line\n");

        buf.fill_from(&mut reader).await.unwrap();
        assert_eq!(buf.chunk(), b"hi\n");
    }

    #[tokio::test]
    async fn test_oversized_message_split_at_capacity() {
        let mut reader = Builder::new().read(b"abcdefg").build();
        let mut buf = ChunkBuffer::new(4);

        assert_eq!(buf.fill_from(&mut reader).await.unwrap(), 4);
        assert_eq!(buf.chunk(), b"abcd");

        assert_eq!(buf.fill_from(&mut reader).await.unwrap(), 3);
        assert_eq!(buf.chunk(), b"efg");
    }

    #[tokio::test]
    async fn test_end_of_stream() {
        let mut reader = Builder::new().build();
        let mut buf = ChunkBuffer::new(16);

        assert_eq!(buf.fill_from(&mut reader).await.unwrap(), 0);
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn test_error_leaves_buffer_empty() {
        let mut reader = Builder::new()
            .read(b"data")
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .build();
        let mut buf = ChunkBuffer::new(16);

        buf.fill_from(&mut reader).await.unwrap();
        let err = buf.fill_from(&mut reader).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn test_to_bytes_outlives_refill() {
        let mut reader = Builder::new().read(b"first").read(b"second").build();
        let mut buf = ChunkBuffer::new(16);

        buf.fill_from(&mut reader).await.unwrap();
        let first = buf.to_bytes();
        buf.fill_from(&mut reader).await.unwrap();

        assert_eq!(&first[..], b"first");
        assert_eq!(buf.chunk(), b"second");
    }
}
