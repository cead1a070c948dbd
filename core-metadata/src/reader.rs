//! Stream reader seam used by the tag parser.
//!
//! The decoder owns the byte stream; the parser only asks it to read or skip a
//! known number of bytes. A reader that cannot satisfy a request yet (a feed
//! based decoder waiting for input) reports [`ReadError::NeedMore`] and leaves
//! its position untouched so the caller can retry the whole tag later.

use std::io::{self, Read};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Reader needs more data")]
    NeedMore,

    #[error("Read failed: {0}")]
    Io(#[from] io::Error),
}

/// Byte source the ID3v2 parser pulls a tag from.
pub trait TagReader {
    /// Fill `buf` completely or fail.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), ReadError>;

    /// Consume `count` bytes without looking at them.
    fn skip(&mut self, count: u64) -> Result<(), ReadError>;
}

impl<T: TagReader + ?Sized> TagReader for &mut T {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), ReadError> {
        (**self).read_exact(buf)
    }

    fn skip(&mut self, count: u64) -> Result<(), ReadError> {
        (**self).skip(count)
    }
}

/// Reader over bytes that are already in memory.
#[derive(Debug, Clone)]
pub struct SliceReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

impl TagReader for SliceReader<'_> {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), ReadError> {
        if buf.len() > self.remaining() {
            return Err(ReadError::NeedMore);
        }
        buf.copy_from_slice(&self.data[self.pos..self.pos + buf.len()]);
        self.pos += buf.len();
        Ok(())
    }

    fn skip(&mut self, count: u64) -> Result<(), ReadError> {
        let count = usize::try_from(count).map_err(|_| ReadError::NeedMore)?;
        if count > self.remaining() {
            return Err(ReadError::NeedMore);
        }
        self.pos += count;
        Ok(())
    }
}

/// Adapter for any blocking [`Read`] implementation.
///
/// End of stream in the middle of a request is reported as
/// [`ReadError::NeedMore`]; the bytes already pulled are lost.
#[derive(Debug)]
pub struct StreamReader<R> {
    inner: R,
}

impl<R: Read> StreamReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> TagReader for StreamReader<R> {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), ReadError> {
        self.inner.read_exact(buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => ReadError::NeedMore,
            _ => ReadError::Io(e),
        })
    }

    fn skip(&mut self, count: u64) -> Result<(), ReadError> {
        let copied = io::copy(&mut (&mut self.inner).take(count), &mut io::sink())?;
        if copied < count {
            return Err(ReadError::NeedMore);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_reader_reads_and_skips() {
        let data = [1u8, 2, 3, 4, 5, 6];
        let mut reader = SliceReader::new(&data);

        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [1, 2]);

        reader.skip(2).unwrap();
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [5, 6]);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_slice_reader_short_read_keeps_position() {
        let data = [1u8, 2, 3];
        let mut reader = SliceReader::new(&data);

        let mut buf = [0u8; 4];
        assert!(matches!(reader.read_exact(&mut buf), Err(ReadError::NeedMore)));
        assert!(matches!(reader.skip(4), Err(ReadError::NeedMore)));
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_stream_reader_eof_is_need_more() {
        let mut reader = StreamReader::new(&[7u8, 8, 9][..]);

        reader.skip(1).unwrap();
        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [8, 9]);

        assert!(matches!(reader.read_exact(&mut buf), Err(ReadError::NeedMore)));
        assert!(matches!(reader.skip(10), Err(ReadError::NeedMore)));
    }
}
