//! Results of a READ request.

use std::fs::File;
use std::io;
use std::os::unix::fs::FileExt;
use std::sync::Arc;

/// Data produced by [`RawFileSystem::read`](crate::RawFileSystem::read).
#[derive(Debug, Clone)]
pub enum ReadResult {
    /// The first `n` bytes of the buffer handed to `read` hold the data.
    Buffer(usize),
    /// Data in a buffer owned by the filesystem.
    Data(Vec<u8>),
    /// Data to be copied straight from an open file.
    Fd(FdSource),
}

/// A byte range of an open file, sent to the kernel without passing through
/// the filesystem's own buffers.
#[derive(Debug, Clone)]
pub struct FdSource {
    pub file: Arc<File>,
    pub offset: u64,
    pub size: usize,
}

impl FdSource {
    pub fn new(file: Arc<File>, offset: u64, size: usize) -> Self {
        Self { file, offset, size }
    }

    /// Reads the range with positional reads, stopping early at end of file.
    pub fn read_all(&self) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; self.size];
        let mut filled = 0;
        while filled < buf.len() {
            match self
                .file
                .read_at(&mut buf[filled..], self.offset + filled as u64)
            {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        buf.truncate(filled);
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn source(contents: &[u8], offset: u64, size: usize) -> FdSource {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(contents).unwrap();
        FdSource::new(Arc::new(file), offset, size)
    }

    #[test]
    fn test_read_range() {
        let src = source(b"0123456789", 2, 4);
        assert_eq!(src.read_all().unwrap(), b"2345");
    }

    #[test]
    fn test_read_stops_at_eof() {
        let src = source(b"short", 3, 100);
        assert_eq!(src.read_all().unwrap(), b"rt");
    }
}
