//! Capability and field bitsets exchanged with the kernel.

use bitflags::bitflags;

bitflags! {
    /// Init request/reply flags (32-bit field at this protocol minor).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct InitFlags: u32 {
        /// asynchronous read requests
        const ASYNC_READ = 1 << 0;
        /// remote locking for POSIX file locks
        const POSIX_LOCKS = 1 << 1;
        /// kernel sends file handle for fstat, etc...
        const FILE_OPS = 1 << 2;
        /// handles the O_TRUNC open flag in the filesystem
        const ATOMIC_O_TRUNC = 1 << 3;
        /// filesystem handles lookups of "." and ".."
        const EXPORT_SUPPORT = 1 << 4;
        /// filesystem can handle write size larger than 4kB
        const BIG_WRITES = 1 << 5;
        /// don't apply umask to file mode on create operations
        const DONT_MASK = 1 << 6;
        /// kernel supports splice write on the device
        const SPLICE_WRITE = 1 << 7;
        /// kernel supports splice move on the device
        const SPLICE_MOVE = 1 << 8;
        /// kernel supports splice read on the device
        const SPLICE_READ = 1 << 9;
        /// remote locking for BSD style file locks
        const FLOCK_LOCKS = 1 << 10;
        /// kernel supports ioctl on directories
        const HAS_IOCTL_DIR = 1 << 11;
        /// automatically invalidate cached pages
        const AUTO_INVAL_DATA = 1 << 12;
        /// do READDIRPLUS (READDIR+LOOKUP in one)
        const DO_READDIRPLUS = 1 << 13;
        /// adaptive readdirplus
        const READDIRPLUS_AUTO = 1 << 14;
    }

    /// Fields present in a SETATTR request (`SetAttrIn::valid`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FattrFlags: u32 {
        const MODE = 1 << 0;
        const UID = 1 << 1;
        const GID = 1 << 2;
        const SIZE = 1 << 3;
        const ATIME = 1 << 4;
        const MTIME = 1 << 5;
        const FH = 1 << 6;
        const ATIME_NOW = 1 << 7;
        const MTIME_NOW = 1 << 8;
        const LOCKOWNER = 1 << 9;
    }

    /// Flags returned in an OPEN/CREATE/OPENDIR reply.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FopenFlags: u32 {
        /// bypass page cache for this open file
        const DIRECT_IO = 1 << 0;
        /// don't invalidate the data cache on open
        const KEEP_CACHE = 1 << 1;
        /// the file is not seekable
        const NONSEEKABLE = 1 << 2;
    }
}

impl InitFlags {
    /// Capabilities this implementation understands and will grant.
    pub const SUPPORTED: InitFlags = InitFlags::ASYNC_READ
        .union(InitFlags::BIG_WRITES)
        .union(InitFlags::FILE_OPS)
        .union(InitFlags::AUTO_INVAL_DATA);

    /// Intersects the peer's offer with [`InitFlags::SUPPORTED`].
    ///
    /// Bits this crate has no name for are dropped as well.
    pub fn negotiate(offered: u32) -> InitFlags {
        InitFlags::from_bits_truncate(offered) & InitFlags::SUPPORTED
    }
}

/// GETATTR flag: the `fh` field of `GetAttrIn` is valid.
pub const GETATTR_FH: u32 = 1 << 0;

/// RELEASE flag: flush the file before releasing it.
pub const RELEASE_FLUSH: u32 = 1 << 0;
