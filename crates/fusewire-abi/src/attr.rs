//! Attribute codec.
//!
//! Converts between the kernel's [`Attr`] record and Rust-side values:
//! file-type classification of a mode word, `(seconds, nanoseconds)`
//! timestamps and `stat` metadata from the standard library.

use std::fmt;
use std::fs::Metadata;
use std::os::unix::fs::MetadataExt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::records::Attr;

const S_IFMT: u32 = 0o170_000;
const S_IFSOCK: u32 = 0o140_000;
const S_IFLNK: u32 = 0o120_000;
const S_IFREG: u32 = 0o100_000;
const S_IFBLK: u32 = 0o060_000;
const S_IFDIR: u32 = 0o040_000;
const S_IFCHR: u32 = 0o020_000;
const S_IFIFO: u32 = 0o010_000;

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// File type encoded in the upper bits of a mode word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Fifo,
    CharDevice,
    Directory,
    BlockDevice,
    RegularFile,
    Symlink,
    Socket,
}

impl FileKind {
    /// Type bits of a mode word for this kind.
    pub fn mode_bits(self) -> u32 {
        match self {
            FileKind::Fifo => S_IFIFO,
            FileKind::CharDevice => S_IFCHR,
            FileKind::Directory => S_IFDIR,
            FileKind::BlockDevice => S_IFBLK,
            FileKind::RegularFile => S_IFREG,
            FileKind::Symlink => S_IFLNK,
            FileKind::Socket => S_IFSOCK,
        }
    }

    /// One-letter code used in request traces.
    pub fn code(self) -> char {
        match self {
            FileKind::Fifo => 'p',
            FileKind::CharDevice => 'c',
            FileKind::Directory => 'd',
            FileKind::BlockDevice => 'b',
            FileKind::RegularFile => 'f',
            FileKind::Symlink => 'l',
            FileKind::Socket => 's',
        }
    }
}

/// A raw mode word: type bits plus permission bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FileMode(pub u32);

impl FileMode {
    /// Classifies the type bits, or `None` when they name no known type.
    pub fn kind(self) -> Option<FileKind> {
        match self.0 & S_IFMT {
            S_IFIFO => Some(FileKind::Fifo),
            S_IFCHR => Some(FileKind::CharDevice),
            S_IFDIR => Some(FileKind::Directory),
            S_IFBLK => Some(FileKind::BlockDevice),
            S_IFREG => Some(FileKind::RegularFile),
            S_IFLNK => Some(FileKind::Symlink),
            S_IFSOCK => Some(FileKind::Socket),
            _ => None,
        }
    }

    /// Type field as stored in a directory entry (`d_type`).
    pub fn dirent_type(self) -> u32 {
        (self.0 & S_IFMT) >> 12
    }

    /// Permission and special bits without the type.
    pub fn permissions(self) -> u32 {
        self.0 & !S_IFMT
    }

    pub fn is_fifo(self) -> bool {
        self.0 & S_IFMT == S_IFIFO
    }

    pub fn is_char(self) -> bool {
        self.0 & S_IFMT == S_IFCHR
    }

    pub fn is_dir(self) -> bool {
        self.0 & S_IFMT == S_IFDIR
    }

    pub fn is_block(self) -> bool {
        self.0 & S_IFMT == S_IFBLK
    }

    pub fn is_regular(self) -> bool {
        self.0 & S_IFMT == S_IFREG
    }

    pub fn is_symlink(self) -> bool {
        self.0 & S_IFMT == S_IFLNK
    }

    pub fn is_socket(self) -> bool {
        self.0 & S_IFMT == S_IFSOCK
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Some(kind) => write!(f, "{}", kind.code()),
            None => f.write_str("?"),
        }
    }
}

/// A point in time as `(seconds, nanoseconds)` relative to the Unix epoch.
///
/// `nsec` is always below one billion; instants before the epoch have a
/// negative `sec` and a non-negative `nsec`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Timespec {
    pub sec: i64,
    pub nsec: u32,
}

impl Timespec {
    pub const fn new(sec: i64, nsec: u32) -> Self {
        Self { sec, nsec }
    }

    /// Converts to a `SystemTime`, or `None` if the platform cannot
    /// represent the instant.
    pub fn to_system_time(self) -> Option<SystemTime> {
        let nanos = Duration::from_nanos(u64::from(self.nsec));
        if self.sec >= 0 {
            UNIX_EPOCH
                .checked_add(Duration::from_secs(self.sec as u64))?
                .checked_add(nanos)
        } else {
            UNIX_EPOCH
                .checked_sub(Duration::from_secs(self.sec.unsigned_abs()))?
                .checked_add(nanos)
        }
    }
}

impl From<SystemTime> for Timespec {
    fn from(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(d) => Timespec::new(d.as_secs() as i64, d.subsec_nanos()),
            Err(e) => {
                let d = e.duration();
                let secs = d.as_secs() as i64;
                if d.subsec_nanos() == 0 {
                    Timespec::new(-secs, 0)
                } else {
                    Timespec::new(-secs - 1, NANOS_PER_SEC - d.subsec_nanos())
                }
            }
        }
    }
}

impl Attr {
    /// Mode word of this record.
    pub fn file_mode(&self) -> FileMode {
        FileMode(self.mode)
    }

    pub fn is_fifo(&self) -> bool {
        self.file_mode().is_fifo()
    }

    pub fn is_char(&self) -> bool {
        self.file_mode().is_char()
    }

    pub fn is_dir(&self) -> bool {
        self.file_mode().is_dir()
    }

    pub fn is_block(&self) -> bool {
        self.file_mode().is_block()
    }

    pub fn is_regular(&self) -> bool {
        self.file_mode().is_regular()
    }

    pub fn is_symlink(&self) -> bool {
        self.file_mode().is_symlink()
    }

    pub fn is_socket(&self) -> bool {
        self.file_mode().is_socket()
    }

    /// Overwrites the timestamps that are `Some`, leaving the others intact.
    pub fn set_times(
        &mut self,
        access: Option<Timespec>,
        modification: Option<Timespec>,
        change: Option<Timespec>,
    ) {
        if let Some(t) = access {
            self.atime = t.sec as u64;
            self.atimensec = t.nsec;
        }
        if let Some(t) = modification {
            self.mtime = t.sec as u64;
            self.mtimensec = t.nsec;
        }
        if let Some(t) = change {
            self.ctime = t.sec as u64;
            self.ctimensec = t.nsec;
        }
    }

    pub fn access_time(&self) -> Timespec {
        Timespec::new(self.atime as i64, self.atimensec)
    }

    pub fn mod_time(&self) -> Timespec {
        Timespec::new(self.mtime as i64, self.mtimensec)
    }

    pub fn change_time(&self) -> Timespec {
        Timespec::new(self.ctime as i64, self.ctimensec)
    }

    /// Builds an attribute record from `stat` metadata.
    pub fn from_metadata(meta: &Metadata) -> Attr {
        let mut attr = Attr {
            ino: meta.ino(),
            size: meta.size(),
            blocks: meta.blocks(),
            mode: meta.mode(),
            nlink: meta.nlink() as u32,
            uid: meta.uid(),
            gid: meta.gid(),
            rdev: meta.rdev() as u32,
            blksize: meta.blksize() as u32,
            ..Attr::default()
        };
        attr.set_times(
            Some(Timespec::new(meta.atime(), meta.atime_nsec() as u32)),
            Some(Timespec::new(meta.mtime(), meta.mtime_nsec() as u32)),
            Some(Timespec::new(meta.ctime(), meta.ctime_nsec() as u32)),
        );
        attr
    }
}

impl From<&Metadata> for Attr {
    fn from(meta: &Metadata) -> Self {
        Attr::from_metadata(meta)
    }
}
