//! The filesystem collaborator contract.
//!
//! [`RawFileSystem`] receives decoded kernel requests one call per
//! operation. Every method has a default: operations answer `ENOSYS` and
//! cleanup notifications do nothing, so an implementation only overrides
//! what it supports.
//!
//! Output records are passed in zeroed; an implementation fills the fields
//! it knows and returns a [`Status`]. The record is sent only when the
//! status is OK.

use std::ffi::OsStr;

use fusewire_abi::{
    AccessIn, AttrOut, CreateIn, CreateOut, EntryOut, FallocateIn, FlushIn, FsyncIn, GetAttrIn,
    LinkIn, MkdirIn, MknodIn, OpenIn, OpenOut, ReadIn, ReleaseIn, RenameIn, SetAttrIn,
    SetXAttrIn, StatfsOut, Status, WriteIn,
};

use crate::dirent::DirEntryList;
use crate::read::ReadResult;
use crate::request::Context;
use crate::session::KernelSettings;

/// Low-level filesystem operations, keyed by node id.
#[allow(unused_variables)]
pub trait RawFileSystem: Send + Sync {
    /// Called once after a successful handshake.
    fn init(&self, settings: &KernelSettings) {}

    /// Called when the kernel sends DESTROY.
    fn destroy(&self) {}

    fn lookup(&self, ctx: &Context, name: &OsStr, out: &mut EntryOut) -> Status {
        Status::ENOSYS
    }

    /// Drops `nlookup` references to `node_id`. No reply is sent.
    fn forget(&self, node_id: u64, nlookup: u64) {}

    fn get_attr(&self, ctx: &Context, input: &GetAttrIn, out: &mut AttrOut) -> Status {
        Status::ENOSYS
    }

    fn set_attr(&self, ctx: &Context, input: &SetAttrIn, out: &mut AttrOut) -> Status {
        Status::ENOSYS
    }

    /// Target of the symlink at `ctx.node_id`.
    fn readlink(&self, ctx: &Context) -> Result<Vec<u8>, Status> {
        Err(Status::ENOSYS)
    }

    fn mknod(&self, ctx: &Context, input: &MknodIn, name: &OsStr, out: &mut EntryOut) -> Status {
        Status::ENOSYS
    }

    fn mkdir(&self, ctx: &Context, input: &MkdirIn, name: &OsStr, out: &mut EntryOut) -> Status {
        Status::ENOSYS
    }

    fn unlink(&self, ctx: &Context, name: &OsStr) -> Status {
        Status::ENOSYS
    }

    fn rmdir(&self, ctx: &Context, name: &OsStr) -> Status {
        Status::ENOSYS
    }

    /// Creates `name` in `ctx.node_id` pointing at `target`.
    fn symlink(&self, ctx: &Context, target: &OsStr, name: &OsStr, out: &mut EntryOut) -> Status {
        Status::ENOSYS
    }

    fn rename(&self, ctx: &Context, input: &RenameIn, old_name: &OsStr, new_name: &OsStr) -> Status {
        Status::ENOSYS
    }

    fn link(&self, ctx: &Context, input: &LinkIn, name: &OsStr, out: &mut EntryOut) -> Status {
        Status::ENOSYS
    }

    fn access(&self, ctx: &Context, input: &AccessIn) -> Status {
        Status::ENOSYS
    }

    fn create(&self, ctx: &Context, input: &CreateIn, name: &OsStr, out: &mut CreateOut) -> Status {
        Status::ENOSYS
    }

    fn open(&self, ctx: &Context, input: &OpenIn, out: &mut OpenOut) -> Status {
        Status::ENOSYS
    }

    /// Reads up to `input.size` bytes; `buf` has exactly that length.
    fn read(&self, ctx: &Context, input: &ReadIn, buf: &mut [u8]) -> Result<ReadResult, Status> {
        Err(Status::ENOSYS)
    }

    /// Closes a file handle. The kernel always sees success.
    fn release(&self, ctx: &Context, input: &ReleaseIn) {}

    /// Writes `data` and returns the number of bytes accepted.
    fn write(&self, ctx: &Context, input: &WriteIn, data: &[u8]) -> Result<u32, Status> {
        Err(Status::ENOSYS)
    }

    fn flush(&self, ctx: &Context, input: &FlushIn) -> Status {
        Status::ENOSYS
    }

    fn fsync(&self, ctx: &Context, input: &FsyncIn) -> Status {
        Status::ENOSYS
    }

    fn open_dir(&self, ctx: &Context, input: &OpenIn, out: &mut OpenOut) -> Status {
        Status::ENOSYS
    }

    /// Adds entries following `input.offset` until the list is full.
    fn read_dir(&self, ctx: &Context, input: &ReadIn, entries: &mut DirEntryList) -> Status {
        Status::ENOSYS
    }

    /// Closes a directory handle. The kernel always sees success.
    fn release_dir(&self, ctx: &Context, input: &ReleaseIn) {}

    fn fsync_dir(&self, ctx: &Context, input: &FsyncIn) -> Status {
        Status::ENOSYS
    }

    fn stat_fs(&self, ctx: &Context, out: &mut StatfsOut) -> Status {
        Status::ENOSYS
    }

    /// Size of an attribute value, answering a size-only GETXATTR.
    fn get_xattr_size(&self, ctx: &Context, name: &OsStr) -> Result<u32, Status> {
        Err(Status::ENOSYS)
    }

    fn get_xattr_data(&self, ctx: &Context, name: &OsStr) -> Result<Vec<u8>, Status> {
        Err(Status::ENOSYS)
    }

    fn set_xattr(&self, ctx: &Context, input: &SetXAttrIn, name: &OsStr, value: &[u8]) -> Status {
        Status::ENOSYS
    }

    /// NUL-separated attribute names.
    fn list_xattr(&self, ctx: &Context) -> Result<Vec<u8>, Status> {
        Err(Status::ENOSYS)
    }

    fn remove_xattr(&self, ctx: &Context, name: &OsStr) -> Status {
        Status::ENOSYS
    }

    fn fallocate(&self, ctx: &Context, input: &FallocateIn) -> Status {
        Status::ENOSYS
    }
}
