//! Directory listing encoder for READDIR replies.
//!
//! Each entry is a [`Dirent`] header followed by the name, padded with
//! zeros to an eight-byte boundary. The list never grows past the size the
//! kernel asked for; an entry that does not fit is refused and the
//! filesystem is expected to resume from that entry on the next READDIR.

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;

use fusewire_abi::{Dirent, FileMode, UNKNOWN_INO, record_size};
use zerocopy::IntoBytes;

const DIRENT_SIZE: usize = record_size::<Dirent>();

/// A directory entry as seen by the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry<'a> {
    pub name: &'a OsStr,
    /// Full mode word; only the type bits are encoded.
    pub mode: u32,
    /// Inode number, or 0 when unknown.
    pub ino: u64,
}

/// Bounded buffer of encoded directory entries.
#[derive(Debug)]
pub struct DirEntryList {
    buf: Vec<u8>,
    size: usize,
    offset: u64,
}

impl DirEntryList {
    /// Creates an empty list that reuses `buf`, holds at most `size` bytes
    /// and numbers entries after `offset`.
    pub fn new(mut buf: Vec<u8>, size: usize, offset: u64) -> Self {
        buf.clear();
        buf.reserve(size);
        Self { buf, size, offset }
    }

    /// Appends an entry; returns `false` if it does not fit.
    ///
    /// An inode number of 0 is reported to the kernel as unknown.
    pub fn add(&mut self, entry: &DirEntry<'_>) -> bool {
        let ino = if entry.ino == 0 { UNKNOWN_INO } else { entry.ino };
        self.add_raw(entry.name.as_bytes(), ino, entry.mode)
    }

    /// Appends an entry with an explicit inode number.
    pub fn add_raw(&mut self, name: &[u8], ino: u64, mode: u32) -> bool {
        let padding = (8 - (name.len() & 7)) & 7;
        let delta = DIRENT_SIZE + name.len() + padding;
        if self.buf.len() + delta > self.size {
            return false;
        }

        let dirent = Dirent {
            ino,
            // The kernel-supplied offset may be u64::MAX.
            off: self.offset.wrapping_add(1),
            namelen: name.len() as u32,
            typ: FileMode(mode).dirent_type(),
        };
        self.buf.extend_from_slice(dirent.as_bytes());
        self.buf.extend_from_slice(name);
        self.buf.resize(self.buf.len() + padding, 0);
        self.offset = dirent.off;
        true
    }

    /// Offset of the last entry added.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Encoded entries.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusewire_abi::read_record;

    fn entry(name: &str, mode: u32, ino: u64) -> DirEntry<'_> {
        DirEntry {
            name: OsStr::new(name),
            mode,
            ino,
        }
    }

    #[test]
    fn test_entry_layout() {
        let mut list = DirEntryList::new(Vec::new(), 4096, 10);
        assert!(list.add(&entry("abc", 0o100_644, 42)));
        assert_eq!(list.offset(), 11);

        let bytes = list.into_bytes();
        assert_eq!(bytes.len(), 32);
        let dirent: Dirent = read_record(&bytes).unwrap();
        assert_eq!(dirent.ino, 42);
        assert_eq!(dirent.off, 11);
        assert_eq!(dirent.namelen, 3);
        assert_eq!(dirent.typ, 8);
        assert_eq!(&bytes[24..27], b"abc");
        assert_eq!(&bytes[27..], &[0; 5]);
    }

    #[test]
    fn test_unknown_inode() {
        let mut list = DirEntryList::new(Vec::new(), 4096, 0);
        assert!(list.add(&entry("eightchr", 0o040_755, 0)));
        let bytes = list.into_bytes();
        // Names that are already aligned get no padding.
        assert_eq!(bytes.len(), 32);
        let dirent: Dirent = read_record(&bytes).unwrap();
        assert_eq!(dirent.ino, UNKNOWN_INO);
        assert_eq!(dirent.typ, 4);
    }

    #[test]
    fn test_refuses_entry_past_size() {
        let mut list = DirEntryList::new(vec![0xFF; 8], 40, 0);
        assert!(list.is_empty());
        assert!(list.add(&entry("a", 0o100_644, 1)));
        assert!(!list.add(&entry("b", 0o100_644, 2)));
        assert_eq!(list.len(), 32);
        assert_eq!(list.offset(), 1);
    }

    #[test]
    fn test_offset_wraps_at_maximum() {
        let mut list = DirEntryList::new(Vec::new(), 4096, u64::MAX);
        assert!(list.add(&entry("a", 0o100_644, 1)));
        assert_eq!(list.offset(), 0);

        let dirent: Dirent = read_record(&list.into_bytes()).unwrap();
        assert_eq!(dirent.off, 0);
    }
}

#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// The list never exceeds its size, stays eight-byte aligned and
        /// numbers accepted entries consecutively.
        #[test]
        fn list_stays_bounded_and_aligned(
            names in prop::collection::vec("[a-z]{1,20}", 0..40),
            size in 0usize..1024,
            start in 0u64..1000,
        ) {
            let mut list = DirEntryList::new(Vec::new(), size, start);
            let mut accepted = 0;
            for name in &names {
                if !list.add_raw(name.as_bytes(), 1, 0o100_644) {
                    break;
                }
                accepted += 1;
            }
            prop_assert!(list.len() <= size);
            prop_assert_eq!(list.len() % 8, 0);
            prop_assert_eq!(list.offset(), start + accepted);
        }
    }
}
