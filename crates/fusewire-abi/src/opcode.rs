//! Operation codes carried in the request header.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;

/// Size of the opcode space, including the private NOTIFY_* range.
pub const OPCODE_COUNT: usize = 103;

/// Operation requested by a kernel message.
///
/// Values below 100 are fixed by the kernel protocol. The NOTIFY_* values are
/// private to this implementation: they key the notification records in the
/// operation registry and may change between builds.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
pub enum Opcode {
    Lookup = 1,
    Forget = 2, // no reply
    GetAttr = 3,
    SetAttr = 4,
    Readlink = 5,
    Symlink = 6,
    Mknod = 8,
    Mkdir = 9,
    Unlink = 10,
    Rmdir = 11,
    Rename = 12,
    Link = 13,
    Open = 14,
    Read = 15,
    Write = 16,
    StatFs = 17,
    Release = 18,
    Fsync = 20,
    SetXAttr = 21,
    GetXAttr = 22,
    ListXAttr = 23,
    RemoveXAttr = 24,
    Flush = 25,
    Init = 26,
    OpenDir = 27,
    ReadDir = 28,
    ReleaseDir = 29,
    FsyncDir = 30,
    GetLk = 31,
    SetLk = 32,
    SetLkW = 33,
    Access = 34,
    Create = 35,
    Interrupt = 36,
    Bmap = 37,
    Destroy = 38,
    Ioctl = 39,
    Poll = 40,
    NotifyReply = 41,
    BatchForget = 42, // no reply
    Fallocate = 43,   // protocol version 19
    ReadDirPlus = 44, // protocol version 21

    NotifyEntry = 100,
    NotifyInode = 101,
    NotifyDelete = 102, // protocol version 18
}

impl Opcode {
    /// Every opcode, in numeric order.
    pub const ALL: [Opcode; 45] = [
        Opcode::Lookup,
        Opcode::Forget,
        Opcode::GetAttr,
        Opcode::SetAttr,
        Opcode::Readlink,
        Opcode::Symlink,
        Opcode::Mknod,
        Opcode::Mkdir,
        Opcode::Unlink,
        Opcode::Rmdir,
        Opcode::Rename,
        Opcode::Link,
        Opcode::Open,
        Opcode::Read,
        Opcode::Write,
        Opcode::StatFs,
        Opcode::Release,
        Opcode::Fsync,
        Opcode::SetXAttr,
        Opcode::GetXAttr,
        Opcode::ListXAttr,
        Opcode::RemoveXAttr,
        Opcode::Flush,
        Opcode::Init,
        Opcode::OpenDir,
        Opcode::ReadDir,
        Opcode::ReleaseDir,
        Opcode::FsyncDir,
        Opcode::GetLk,
        Opcode::SetLk,
        Opcode::SetLkW,
        Opcode::Access,
        Opcode::Create,
        Opcode::Interrupt,
        Opcode::Bmap,
        Opcode::Destroy,
        Opcode::Ioctl,
        Opcode::Poll,
        Opcode::NotifyReply,
        Opcode::BatchForget,
        Opcode::Fallocate,
        Opcode::ReadDirPlus,
        Opcode::NotifyEntry,
        Opcode::NotifyInode,
        Opcode::NotifyDelete,
    ];

    /// Decodes a raw header value, returning `None` for unassigned codes.
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::try_from(raw).ok()
    }

    /// Raw header value.
    pub fn raw(self) -> u32 {
        self.into()
    }

    /// Index of this opcode in the registry table.
    pub fn index(self) -> usize {
        self.raw() as usize
    }

    /// Upper-case protocol name, as printed in request traces.
    pub fn name(self) -> &'static str {
        match self {
            Opcode::Lookup => "LOOKUP",
            Opcode::Forget => "FORGET",
            Opcode::GetAttr => "GETATTR",
            Opcode::SetAttr => "SETATTR",
            Opcode::Readlink => "READLINK",
            Opcode::Symlink => "SYMLINK",
            Opcode::Mknod => "MKNOD",
            Opcode::Mkdir => "MKDIR",
            Opcode::Unlink => "UNLINK",
            Opcode::Rmdir => "RMDIR",
            Opcode::Rename => "RENAME",
            Opcode::Link => "LINK",
            Opcode::Open => "OPEN",
            Opcode::Read => "READ",
            Opcode::Write => "WRITE",
            Opcode::StatFs => "STATFS",
            Opcode::Release => "RELEASE",
            Opcode::Fsync => "FSYNC",
            Opcode::SetXAttr => "SETXATTR",
            Opcode::GetXAttr => "GETXATTR",
            Opcode::ListXAttr => "LISTXATTR",
            Opcode::RemoveXAttr => "REMOVEXATTR",
            Opcode::Flush => "FLUSH",
            Opcode::Init => "INIT",
            Opcode::OpenDir => "OPENDIR",
            Opcode::ReadDir => "READDIR",
            Opcode::ReleaseDir => "RELEASEDIR",
            Opcode::FsyncDir => "FSYNCDIR",
            Opcode::GetLk => "GETLK",
            Opcode::SetLk => "SETLK",
            Opcode::SetLkW => "SETLKW",
            Opcode::Access => "ACCESS",
            Opcode::Create => "CREATE",
            Opcode::Interrupt => "INTERRUPT",
            Opcode::Bmap => "BMAP",
            Opcode::Destroy => "DESTROY",
            Opcode::Ioctl => "IOCTL",
            Opcode::Poll => "POLL",
            Opcode::NotifyReply => "NOTIFY_REPLY",
            Opcode::BatchForget => "BATCH_FORGET",
            Opcode::Fallocate => "FALLOCATE",
            Opcode::ReadDirPlus => "READDIRPLUS",
            Opcode::NotifyEntry => "NOTIFY_ENTRY",
            Opcode::NotifyInode => "NOTIFY_INODE",
            Opcode::NotifyDelete => "NOTIFY_DELETE",
        }
    }

    /// Whether the kernel expects a reply to this opcode.
    pub fn expects_reply(self) -> bool {
        !matches!(self, Opcode::Forget | Opcode::BatchForget)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
