//! Operation registry.
//!
//! One immutable [`Descriptor`] per known opcode, built on first use. A
//! descriptor records how a request of that opcode is laid out on the
//! wire (fixed input record, embedded filenames), how large its reply
//! record is, how to render both for traces, and which handler serves it.
//!
//! # Usage
//!
//! ```
//! use fusewire::registry::{self, REPLY_BUFFER_CAPACITY};
//!
//! let lookup = registry::describe(1).unwrap();
//! assert_eq!(lookup.name, "LOOKUP");
//! assert_eq!(lookup.filenames, 1);
//! assert!(registry::describe(7).is_none());
//! registry::check_reply_capacity(REPLY_BUFFER_CAPACITY).unwrap();
//! ```

use std::fmt::Debug;

use fusewire_abi::{
    AccessIn, AttrOut, BatchForgetIn, BmapIn, BmapOut, CreateIn, CreateOut, EntryOut,
    FallocateIn, FlushIn, ForgetIn, FsyncIn, GetAttrIn, GetXAttrIn, GetXAttrOut, InitIn, InitOut,
    InterruptIn, IoctlIn, IoctlOut, LinkIn, MkdirIn, MknodIn, NotifyInvalDeleteOut,
    NotifyInvalEntryOut, NotifyInvalInodeOut, OPCODE_COUNT, OUT_HEADER_SIZE, OpenIn, OpenOut,
    Opcode, PollIn, PollOut, ReadIn, ReleaseIn, RenameIn, SetAttrIn, SetXAttrIn, StatfsOut,
    WriteIn, WriteOut, read_record, record_size,
};
use once_cell::sync::Lazy;
use zerocopy::FromBytes;

use crate::dispatch::Handler;
use crate::error::{ServerError, ServerResult};
use crate::handlers::{dir, entry, file, forget, init, misc, xattr};

/// Bytes available for a reply header plus its fixed-size output record.
pub const REPLY_BUFFER_CAPACITY: usize = 160;

/// Renders a fixed-size record for request traces.
pub type DecodeFn = fn(&[u8]) -> Option<String>;

/// Static description of one opcode.
#[derive(Debug, Clone)]
pub struct Descriptor {
    pub opcode: Opcode,
    pub name: &'static str,
    /// Size of the fixed input record following the request header.
    pub input_size: usize,
    /// Size of the fixed output record following the reply header.
    pub output_size: usize,
    pub decode_in: Option<DecodeFn>,
    pub decode_out: Option<DecodeFn>,
    /// NUL-terminated names embedded after the input record.
    pub filenames: usize,
    /// Whether the reply payload is a name (rendered as text in traces).
    pub filename_out: bool,
    pub(crate) handler: Option<Handler>,
}

fn render<T: FromBytes + Debug>(bytes: &[u8]) -> Option<String> {
    read_record::<T>(bytes).map(|record| format!("{record:?}"))
}

impl Descriptor {
    fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            name: opcode.name(),
            input_size: 0,
            output_size: 0,
            decode_in: None,
            decode_out: None,
            filenames: 0,
            filename_out: false,
            handler: None,
        }
    }

    fn input<T: FromBytes + Debug>(mut self) -> Self {
        self.input_size = record_size::<T>();
        self.decode_in = Some(render::<T>);
        self
    }

    fn output<T: FromBytes + Debug>(mut self) -> Self {
        self.output_size = record_size::<T>();
        self.decode_out = Some(render::<T>);
        self
    }

    fn names(mut self, count: usize) -> Self {
        self.filenames = count;
        self
    }

    fn name_out(mut self) -> Self {
        self.filename_out = true;
        self
    }

    fn handler(mut self, handler: Handler) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Whether a handler serves this opcode.
    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Renders an input record, if this opcode has one.
    pub fn render_input(&self, bytes: &[u8]) -> Option<String> {
        self.decode_in.and_then(|decode| decode(bytes))
    }

    /// Renders an output record, if this opcode has one.
    pub fn render_output(&self, bytes: &[u8]) -> Option<String> {
        self.decode_out.and_then(|decode| decode(bytes))
    }
}

fn descriptor(op: Opcode) -> Descriptor {
    let d = Descriptor::new(op);
    match op {
        Opcode::Lookup => d.names(1).output::<EntryOut>().handler(entry::lookup),
        Opcode::Forget => d.input::<ForgetIn>().handler(forget::forget),
        Opcode::GetAttr => d
            .input::<GetAttrIn>()
            .output::<AttrOut>()
            .handler(file::get_attr),
        Opcode::SetAttr => d
            .input::<SetAttrIn>()
            .output::<AttrOut>()
            .handler(file::set_attr),
        Opcode::Readlink => d.name_out().handler(entry::readlink),
        Opcode::Symlink => d.names(2).output::<EntryOut>().handler(entry::symlink),
        Opcode::Mknod => d
            .input::<MknodIn>()
            .names(1)
            .output::<EntryOut>()
            .handler(entry::mknod),
        Opcode::Mkdir => d
            .input::<MkdirIn>()
            .names(1)
            .output::<EntryOut>()
            .handler(entry::mkdir),
        Opcode::Unlink => d.names(1).handler(entry::unlink),
        Opcode::Rmdir => d.names(1).handler(entry::rmdir),
        Opcode::Rename => d.input::<RenameIn>().names(2).handler(entry::rename),
        Opcode::Link => d
            .input::<LinkIn>()
            .names(1)
            .output::<EntryOut>()
            .handler(entry::link),
        Opcode::Open => d.input::<OpenIn>().output::<OpenOut>().handler(file::open),
        Opcode::Read => d.input::<ReadIn>().handler(file::read),
        Opcode::Write => d.input::<WriteIn>().output::<WriteOut>().handler(file::write),
        Opcode::StatFs => d.output::<StatfsOut>().handler(misc::stat_fs),
        Opcode::Release => d.input::<ReleaseIn>().handler(file::release),
        Opcode::Fsync => d.input::<FsyncIn>().handler(file::fsync),
        Opcode::SetXAttr => d.input::<SetXAttrIn>().handler(xattr::set_xattr),
        Opcode::GetXAttr => d
            .input::<GetXAttrIn>()
            .names(1)
            .output::<GetXAttrOut>()
            .handler(xattr::get_xattr),
        Opcode::ListXAttr => d
            .input::<GetXAttrIn>()
            .output::<GetXAttrOut>()
            .handler(xattr::get_xattr),
        Opcode::RemoveXAttr => d.names(1).handler(xattr::remove_xattr),
        Opcode::Flush => d.input::<FlushIn>().handler(file::flush),
        Opcode::Init => d.input::<InitIn>().output::<InitOut>().handler(init::init),
        Opcode::OpenDir => d.input::<OpenIn>().output::<OpenOut>().handler(dir::open_dir),
        Opcode::ReadDir => d.input::<ReadIn>().handler(dir::read_dir),
        Opcode::ReleaseDir => d.input::<ReleaseIn>().handler(dir::release_dir),
        Opcode::FsyncDir => d.input::<FsyncIn>().handler(dir::fsync_dir),
        Opcode::GetLk | Opcode::SetLk | Opcode::SetLkW => d,
        Opcode::Access => d.input::<AccessIn>().handler(file::access),
        Opcode::Create => d
            .input::<CreateIn>()
            .names(1)
            .output::<CreateOut>()
            .handler(file::create),
        Opcode::Interrupt => d.input::<InterruptIn>(),
        Opcode::Bmap => d.input::<BmapIn>().output::<BmapOut>(),
        Opcode::Destroy => d.handler(misc::destroy),
        Opcode::Ioctl => d.input::<IoctlIn>().output::<IoctlOut>().handler(misc::ioctl),
        Opcode::Poll => d.input::<PollIn>().output::<PollOut>(),
        Opcode::NotifyReply | Opcode::ReadDirPlus => d,
        Opcode::BatchForget => d.input::<BatchForgetIn>().handler(forget::batch_forget),
        Opcode::Fallocate => d.input::<FallocateIn>().handler(file::fallocate),
        Opcode::NotifyEntry => d.output::<NotifyInvalEntryOut>().name_out(),
        Opcode::NotifyInode => d.output::<NotifyInvalInodeOut>(),
        Opcode::NotifyDelete => d.output::<NotifyInvalDeleteOut>().name_out(),
    }
}

static REGISTRY: Lazy<[Option<Descriptor>; OPCODE_COUNT]> = Lazy::new(|| {
    std::array::from_fn(|raw| Opcode::from_raw(raw as u32).map(descriptor))
});

/// Looks up the descriptor for a raw opcode.
///
/// Returns `None` for values outside the opcode space and for codes the
/// protocol leaves unassigned.
pub fn describe(raw: u32) -> Option<&'static Descriptor> {
    REGISTRY.get(raw as usize)?.as_ref()
}

/// Name of a raw opcode, or "UNKNOWN".
pub fn operation_name(raw: u32) -> &'static str {
    describe(raw).map_or("UNKNOWN", |d| d.name)
}

/// Iterates over all descriptors in opcode order.
pub fn descriptors() -> impl Iterator<Item = &'static Descriptor> {
    REGISTRY.iter().flatten()
}

/// Verifies that every reply header plus output record fits `capacity`.
pub fn check_reply_capacity(capacity: usize) -> ServerResult<()> {
    for d in descriptors() {
        let needed = d.output_size + OUT_HEADER_SIZE;
        if needed > capacity {
            return Err(ServerError::ReplyCapacity {
                operation: d.name,
                needed,
                capacity,
            });
        }
    }
    Ok(())
}
