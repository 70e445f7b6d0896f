//! Fixed-layout wire records.
//!
//! Every record is `#[repr(C)]` with explicit padding fields, so `zerocopy`
//! can verify at compile time that it has no implicit padding and can be
//! decoded from any byte range of sufficient length. Decoding copies the
//! record out of the message once; the message buffer has no alignment
//! guarantee, so borrowing a typed view in place is not attempted.
//!
//! Layouts follow `fuse_kernel.h` at protocol 7.19.

#![allow(missing_docs)]

use std::mem::size_of;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Decodes a record from the front of `bytes`.
///
/// Returns `None` when fewer than `size_of::<T>()` bytes are available;
/// trailing bytes are ignored.
pub fn read_record<T: FromBytes>(bytes: &[u8]) -> Option<T> {
    T::read_from_prefix(bytes).ok().map(|(record, _)| record)
}

/// Byte size of a wire record.
pub const fn record_size<T>() -> usize {
    size_of::<T>()
}

macro_rules! wire_record {
    ($(#[$meta:meta])* pub struct $name:ident { $($(#[$fmeta:meta])* pub $field:ident : $ty:ty),* $(,)? }) => {
        $(#[$meta])*
        #[repr(C)]
        #[derive(
            Debug, Default, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
        )]
        pub struct $name {
            $($(#[$fmeta])* pub $field: $ty),*
        }
    };
}

wire_record! {
    /// Header preceding every kernel request.
    pub struct InHeader {
        pub len: u32,
        pub opcode: u32,
        pub unique: u64,
        pub node_id: u64,
        pub uid: u32,
        pub gid: u32,
        pub pid: u32,
        pub padding: u32,
    }
}

wire_record! {
    /// Header preceding every reply and notification.
    pub struct OutHeader {
        pub len: u32,
        pub error: i32,
        pub unique: u64,
    }
}

wire_record! {
    /// File attributes as the kernel expects them.
    ///
    /// Timestamps are stored as unsigned seconds on the wire; the attribute
    /// codec reinterprets them as signed so pre-epoch times survive.
    pub struct Attr {
        pub ino: u64,
        pub size: u64,
        pub blocks: u64,
        pub atime: u64,
        pub mtime: u64,
        pub ctime: u64,
        pub atimensec: u32,
        pub mtimensec: u32,
        pub ctimensec: u32,
        pub mode: u32,
        pub nlink: u32,
        pub uid: u32,
        pub gid: u32,
        pub rdev: u32,
        pub blksize: u32,
        pub padding: u32,
    }
}

wire_record! {
    pub struct EntryOut {
        pub node_id: u64,
        pub generation: u64,
        pub entry_valid: u64,
        pub attr_valid: u64,
        pub entry_valid_nsec: u32,
        pub attr_valid_nsec: u32,
        pub attr: Attr,
    }
}

wire_record! {
    pub struct AttrOut {
        pub attr_valid: u64,
        pub attr_valid_nsec: u32,
        pub dummy: u32,
        pub attr: Attr,
    }
}

wire_record! {
    pub struct GetAttrIn {
        pub flags: u32,
        pub dummy: u32,
        pub fh: u64,
    }
}

wire_record! {
    pub struct SetAttrIn {
        pub valid: u32,
        pub padding: u32,
        pub fh: u64,
        pub size: u64,
        pub lock_owner: u64,
        pub atime: u64,
        pub mtime: u64,
        pub unused2: u64,
        pub atimensec: u32,
        pub mtimensec: u32,
        pub unused3: u32,
        pub mode: u32,
        pub unused4: u32,
        pub uid: u32,
        pub gid: u32,
        pub unused5: u32,
    }
}

wire_record! {
    pub struct MknodIn {
        pub mode: u32,
        pub rdev: u32,
        pub umask: u32,
        pub padding: u32,
    }
}

wire_record! {
    pub struct MkdirIn {
        pub mode: u32,
        pub umask: u32,
    }
}

wire_record! {
    pub struct RenameIn {
        pub newdir: u64,
    }
}

wire_record! {
    pub struct LinkIn {
        pub old_node_id: u64,
    }
}

wire_record! {
    pub struct OpenIn {
        pub flags: u32,
        pub unused: u32,
    }
}

wire_record! {
    pub struct OpenOut {
        pub fh: u64,
        pub open_flags: u32,
        pub padding: u32,
    }
}

wire_record! {
    pub struct CreateIn {
        pub flags: u32,
        pub mode: u32,
        pub umask: u32,
        pub padding: u32,
    }
}

wire_record! {
    /// Reply to CREATE: the new entry followed by its open handle.
    pub struct CreateOut {
        pub entry: EntryOut,
        pub open: OpenOut,
    }
}

wire_record! {
    pub struct ReleaseIn {
        pub fh: u64,
        pub flags: u32,
        pub release_flags: u32,
        pub lock_owner: u64,
    }
}

wire_record! {
    pub struct FlushIn {
        pub fh: u64,
        pub unused: u32,
        pub padding: u32,
        pub lock_owner: u64,
    }
}

wire_record! {
    /// Input of READ and READDIR.
    pub struct ReadIn {
        pub fh: u64,
        pub offset: u64,
        pub size: u32,
        pub read_flags: u32,
        pub lock_owner: u64,
        pub flags: u32,
        pub padding: u32,
    }
}

wire_record! {
    pub struct WriteIn {
        pub fh: u64,
        pub offset: u64,
        pub size: u32,
        pub write_flags: u32,
        pub lock_owner: u64,
        pub flags: u32,
        pub padding: u32,
    }
}

wire_record! {
    pub struct WriteOut {
        pub size: u32,
        pub padding: u32,
    }
}

wire_record! {
    pub struct Kstatfs {
        pub blocks: u64,
        pub bfree: u64,
        pub bavail: u64,
        pub files: u64,
        pub ffree: u64,
        pub bsize: u32,
        pub namelen: u32,
        pub frsize: u32,
        pub padding: u32,
        pub spare: [u32; 6],
    }
}

wire_record! {
    pub struct StatfsOut {
        pub st: Kstatfs,
    }
}

wire_record! {
    /// Input of FSYNC and FSYNCDIR.
    pub struct FsyncIn {
        pub fh: u64,
        pub fsync_flags: u32,
        pub padding: u32,
    }
}

wire_record! {
    pub struct SetXAttrIn {
        pub size: u32,
        pub flags: u32,
    }
}

wire_record! {
    /// Input of GETXATTR and LISTXATTR; `size` zero asks for the size only.
    pub struct GetXAttrIn {
        pub size: u32,
        pub padding: u32,
    }
}

wire_record! {
    pub struct GetXAttrOut {
        pub size: u32,
        pub padding: u32,
    }
}

wire_record! {
    pub struct AccessIn {
        pub mask: u32,
        pub padding: u32,
    }
}

wire_record! {
    pub struct InitIn {
        pub major: u32,
        pub minor: u32,
        pub max_readahead: u32,
        pub flags: u32,
    }
}

wire_record! {
    pub struct InitOut {
        pub major: u32,
        pub minor: u32,
        pub max_readahead: u32,
        pub flags: u32,
        pub max_background: u16,
        pub congestion_threshold: u16,
        pub max_write: u32,
    }
}

wire_record! {
    pub struct InterruptIn {
        pub unique: u64,
    }
}

wire_record! {
    pub struct BmapIn {
        pub block: u64,
        pub blocksize: u32,
        pub padding: u32,
    }
}

wire_record! {
    pub struct BmapOut {
        pub block: u64,
    }
}

wire_record! {
    pub struct IoctlIn {
        pub fh: u64,
        pub flags: u32,
        pub cmd: u32,
        pub arg: u64,
        pub in_size: u32,
        pub out_size: u32,
    }
}

wire_record! {
    pub struct IoctlOut {
        pub result: i32,
        pub flags: u32,
        pub in_iovs: u32,
        pub out_iovs: u32,
    }
}

wire_record! {
    pub struct PollIn {
        pub fh: u64,
        pub kh: u64,
        pub flags: u32,
        pub padding: u32,
    }
}

wire_record! {
    pub struct PollOut {
        pub revents: u32,
        pub padding: u32,
    }
}

wire_record! {
    pub struct ForgetIn {
        pub nlookup: u64,
    }
}

wire_record! {
    /// One (node id, lookup count) pair of a BATCH_FORGET payload.
    pub struct ForgetOne {
        pub node_id: u64,
        pub nlookup: u64,
    }
}

wire_record! {
    /// BATCH_FORGET header; `count` [`ForgetOne`] entries follow it.
    pub struct BatchForgetIn {
        pub count: u32,
        pub dummy: u32,
    }
}

wire_record! {
    pub struct FallocateIn {
        pub fh: u64,
        pub offset: u64,
        pub length: u64,
        pub mode: u32,
        pub padding: u32,
    }
}

wire_record! {
    /// Directory entry header; `namelen` name bytes follow, padded to 8.
    pub struct Dirent {
        pub ino: u64,
        pub off: u64,
        pub namelen: u32,
        pub typ: u32,
    }
}

wire_record! {
    pub struct NotifyInvalInodeOut {
        pub ino: u64,
        pub off: i64,
        pub length: i64,
    }
}

wire_record! {
    pub struct NotifyInvalEntryOut {
        pub parent: u64,
        pub namelen: u32,
        pub padding: u32,
    }
}

wire_record! {
    pub struct NotifyInvalDeleteOut {
        pub parent: u64,
        pub child: u64,
        pub namelen: u32,
        pub padding: u32,
    }
}

/// Size of [`InHeader`].
pub const IN_HEADER_SIZE: usize = record_size::<InHeader>();

/// Size of [`OutHeader`].
pub const OUT_HEADER_SIZE: usize = record_size::<OutHeader>();

#[cfg(test)]
mod tests {
    use super::*;
    use zerocopy::IntoBytes;

    #[test]
    fn test_header_sizes() {
        assert_eq!(IN_HEADER_SIZE, 40);
        assert_eq!(OUT_HEADER_SIZE, 16);
    }

    #[test]
    fn test_record_sizes_match_kernel_abi() {
        let sizes = [
            ("Attr", record_size::<Attr>(), 88),
            ("EntryOut", record_size::<EntryOut>(), 128),
            ("AttrOut", record_size::<AttrOut>(), 104),
            ("GetAttrIn", record_size::<GetAttrIn>(), 16),
            ("SetAttrIn", record_size::<SetAttrIn>(), 88),
            ("MknodIn", record_size::<MknodIn>(), 16),
            ("MkdirIn", record_size::<MkdirIn>(), 8),
            ("RenameIn", record_size::<RenameIn>(), 8),
            ("LinkIn", record_size::<LinkIn>(), 8),
            ("OpenIn", record_size::<OpenIn>(), 8),
            ("OpenOut", record_size::<OpenOut>(), 16),
            ("CreateIn", record_size::<CreateIn>(), 16),
            ("CreateOut", record_size::<CreateOut>(), 144),
            ("ReleaseIn", record_size::<ReleaseIn>(), 24),
            ("FlushIn", record_size::<FlushIn>(), 24),
            ("ReadIn", record_size::<ReadIn>(), 40),
            ("WriteIn", record_size::<WriteIn>(), 40),
            ("WriteOut", record_size::<WriteOut>(), 8),
            ("StatfsOut", record_size::<StatfsOut>(), 80),
            ("FsyncIn", record_size::<FsyncIn>(), 16),
            ("SetXAttrIn", record_size::<SetXAttrIn>(), 8),
            ("GetXAttrIn", record_size::<GetXAttrIn>(), 8),
            ("GetXAttrOut", record_size::<GetXAttrOut>(), 8),
            ("AccessIn", record_size::<AccessIn>(), 8),
            ("InitIn", record_size::<InitIn>(), 16),
            ("InitOut", record_size::<InitOut>(), 24),
            ("InterruptIn", record_size::<InterruptIn>(), 8),
            ("BmapIn", record_size::<BmapIn>(), 16),
            ("BmapOut", record_size::<BmapOut>(), 8),
            ("IoctlIn", record_size::<IoctlIn>(), 32),
            ("IoctlOut", record_size::<IoctlOut>(), 16),
            ("PollIn", record_size::<PollIn>(), 24),
            ("PollOut", record_size::<PollOut>(), 8),
            ("ForgetIn", record_size::<ForgetIn>(), 8),
            ("ForgetOne", record_size::<ForgetOne>(), 16),
            ("BatchForgetIn", record_size::<BatchForgetIn>(), 8),
            ("FallocateIn", record_size::<FallocateIn>(), 32),
            ("Dirent", record_size::<Dirent>(), 24),
            ("NotifyInvalInodeOut", record_size::<NotifyInvalInodeOut>(), 24),
            ("NotifyInvalEntryOut", record_size::<NotifyInvalEntryOut>(), 16),
            ("NotifyInvalDeleteOut", record_size::<NotifyInvalDeleteOut>(), 24),
        ];
        for (name, actual, expected) in sizes {
            assert_eq!(actual, expected, "{name} has wrong wire size");
        }
    }

    #[test]
    fn test_read_record_rejects_short_input() {
        let bytes = [0u8; 15];
        assert!(read_record::<GetAttrIn>(&bytes).is_none());
    }

    #[test]
    fn test_read_record_is_little_endian_native() {
        let header = InHeader {
            len: 56,
            opcode: 3,
            unique: 0x1122_3344,
            node_id: 1,
            uid: 1000,
            gid: 100,
            pid: 4242,
            padding: 0,
        };
        let mut bytes = header.as_bytes().to_vec();
        bytes.extend_from_slice(&[0xAA; 16]);

        // Unaligned source: decode from an odd offset.
        let mut shifted = vec![0u8];
        shifted.extend_from_slice(&bytes);
        assert_eq!(read_record::<InHeader>(&shifted[1..]), Some(header));
    }
}
