//! In-memory kernel channel and a recording filesystem.
//!
//! Tests build raw kernel messages, feed them to a [`Server`] over a
//! [`MemoryChannel`] and decode whatever the server wrote back.

// Not every test uses every helper
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::ffi::OsStr;
use std::fs::File;
use std::io;
use std::sync::{Arc, Once};

use bytes::Bytes;
use fusewire::abi::{
    AccessIn, AttrOut, CreateIn, CreateOut, EntryOut, FallocateIn, FlushIn, FsyncIn, GetAttrIn,
    IN_HEADER_SIZE, InHeader, InitIn, LinkIn, MkdirIn, MknodIn, OUT_HEADER_SIZE, OpenIn, OpenOut,
    Opcode, OutHeader, ReadIn, ReleaseIn, RenameIn, SetAttrIn, SetXAttrIn, StatfsOut, Status,
    WriteIn, read_record,
};
use fusewire::{
    Channel, Context, DirEntry, DirEntryList, FdSource, KernelSettings, RawFileSystem, ReadResult,
    Server, ServerOptions,
};
use parking_lot::Mutex;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use zerocopy::{FromBytes, IntoBytes};

/// Channel backed by a queue of inbound messages and a log of sent ones.
///
/// `receive` reports the channel closed once the queue is empty.
#[derive(Debug, Default)]
pub struct MemoryChannel {
    inbound: Mutex<VecDeque<Bytes>>,
    sent: Mutex<Vec<Vec<u8>>>,
    send_error: Mutex<Option<i32>>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages(messages: impl IntoIterator<Item = Bytes>) -> Self {
        let channel = Self::new();
        channel.inbound.lock().extend(messages);
        channel
    }

    pub fn push(&self, message: Bytes) {
        self.inbound.lock().push_back(message);
    }

    /// Makes every following `send` fail with `errno`.
    pub fn fail_sends(&self, errno: i32) {
        *self.send_error.lock() = Some(errno);
    }

    pub fn take_sent(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.sent.lock())
    }
}

impl Channel for MemoryChannel {
    fn receive(&self) -> io::Result<Option<Bytes>> {
        Ok(self.inbound.lock().pop_front())
    }

    fn send(&self, message: &[u8]) -> io::Result<()> {
        if let Some(errno) = *self.send_error.lock() {
            return Err(io::Error::from_raw_os_error(errno));
        }
        self.sent.lock().push(message.to_vec());
        Ok(())
    }
}

/// How [`RecordingFs::read`] hands out data.
#[derive(Debug, Clone, Default)]
pub enum ReadMode {
    /// Fill the dispatcher's buffer.
    #[default]
    Buffer,
    /// Return an owned vector.
    Data,
    /// Point at a range of this file.
    Fd(Arc<File>),
    /// Fill the buffer but claim this many more bytes than it holds.
    Overstated(usize),
}

/// Filesystem that records every call and serves canned answers.
#[derive(Debug, Default)]
pub struct RecordingFs {
    pub calls: Mutex<Vec<String>>,
    pub forgets: Mutex<Vec<(u64, u64)>>,
    pub settings: Mutex<Option<KernelSettings>>,
    pub xattrs: Mutex<HashMap<String, Vec<u8>>>,
    pub xattr_names: Vec<u8>,
    pub file_data: Vec<u8>,
    pub read_mode: ReadMode,
    pub dir_entries: Vec<(String, u64, u32)>,
    pub written: Mutex<Vec<u8>>,
}

impl RecordingFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_xattr(self, name: &str, value: &[u8]) -> Self {
        self.xattrs.lock().insert(name.to_string(), value.to_vec());
        self
    }

    pub fn with_xattr_names(mut self, names: &[u8]) -> Self {
        self.xattr_names = names.to_vec();
        self
    }

    pub fn with_file_data(mut self, data: &[u8], mode: ReadMode) -> Self {
        self.file_data = data.to_vec();
        self.read_mode = mode;
        self
    }

    pub fn with_dir_entry(mut self, name: &str, ino: u64, mode: u32) -> Self {
        self.dir_entries.push((name.to_string(), ino, mode));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Whether any recorded call starts with `prefix`.
    pub fn called(&self, prefix: &str) -> bool {
        self.calls.lock().iter().any(|c| c.starts_with(prefix))
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

impl RawFileSystem for RecordingFs {
    fn init(&self, settings: &KernelSettings) {
        self.record("init".to_string());
        *self.settings.lock() = Some(*settings);
    }

    fn destroy(&self) {
        self.record("destroy".to_string());
    }

    fn lookup(&self, ctx: &Context, name: &OsStr, out: &mut EntryOut) -> Status {
        self.record(format!("lookup {} {}", ctx.node_id, name.to_string_lossy()));
        if name != "hello" {
            return Status::ENOENT;
        }
        out.node_id = 2;
        out.attr.ino = 2;
        out.attr.mode = libc::S_IFREG as u32 | 0o644;
        Status::OK
    }

    fn forget(&self, node_id: u64, nlookup: u64) {
        self.forgets.lock().push((node_id, nlookup));
    }

    fn get_attr(&self, ctx: &Context, _input: &GetAttrIn, out: &mut AttrOut) -> Status {
        self.record(format!("getattr {}", ctx.node_id));
        out.attr.ino = ctx.node_id;
        out.attr.mode = libc::S_IFREG as u32 | 0o644;
        out.attr.size = self.file_data.len() as u64;
        Status::OK
    }

    fn readlink(&self, ctx: &Context) -> Result<Vec<u8>, Status> {
        self.record(format!("readlink {}", ctx.node_id));
        Ok(b"target".to_vec())
    }

    fn symlink(&self, _ctx: &Context, target: &OsStr, name: &OsStr, out: &mut EntryOut) -> Status {
        self.record(format!(
            "symlink {} -> {}",
            name.to_string_lossy(),
            target.to_string_lossy()
        ));
        out.node_id = 3;
        Status::OK
    }

    fn read(&self, _ctx: &Context, input: &ReadIn, buf: &mut [u8]) -> Result<ReadResult, Status> {
        self.record(format!("read {}+{}", input.offset, input.size));
        let start = (input.offset as usize).min(self.file_data.len());
        let end = (start + input.size as usize).min(self.file_data.len());
        let data = &self.file_data[start..end];
        match &self.read_mode {
            ReadMode::Buffer => {
                buf[..data.len()].copy_from_slice(data);
                Ok(ReadResult::Buffer(data.len()))
            }
            ReadMode::Data => Ok(ReadResult::Data(data.to_vec())),
            ReadMode::Fd(file) => Ok(ReadResult::Fd(FdSource::new(
                Arc::clone(file),
                input.offset,
                input.size as usize,
            ))),
            ReadMode::Overstated(extra) => {
                buf[..data.len()].copy_from_slice(data);
                Ok(ReadResult::Buffer(buf.len() + extra))
            }
        }
    }

    fn write(&self, _ctx: &Context, input: &WriteIn, data: &[u8]) -> Result<u32, Status> {
        self.record(format!("write {}+{}", input.offset, data.len()));
        self.written.lock().extend_from_slice(data);
        Ok(data.len() as u32)
    }

    fn read_dir(&self, _ctx: &Context, input: &ReadIn, entries: &mut DirEntryList) -> Status {
        self.record(format!("readdir {}", input.offset));
        for (name, ino, mode) in self.dir_entries.iter().skip(input.offset as usize) {
            let entry = DirEntry {
                name: OsStr::new(name),
                mode: *mode,
                ino: *ino,
            };
            if !entries.add(&entry) {
                break;
            }
        }
        Status::OK
    }

    fn stat_fs(&self, _ctx: &Context, out: &mut StatfsOut) -> Status {
        self.record("statfs".to_string());
        out.st.blocks = 100;
        out.st.bsize = 4096;
        Status::OK
    }

    fn get_xattr_size(&self, _ctx: &Context, name: &OsStr) -> Result<u32, Status> {
        self.record(format!("getxattr_size {}", name.to_string_lossy()));
        self.xattrs
            .lock()
            .get(&*name.to_string_lossy())
            .map(|v| v.len() as u32)
            .ok_or(Status::ENODATA)
    }

    fn get_xattr_data(&self, _ctx: &Context, name: &OsStr) -> Result<Vec<u8>, Status> {
        self.record(format!("getxattr_data {}", name.to_string_lossy()));
        self.xattrs
            .lock()
            .get(&*name.to_string_lossy())
            .cloned()
            .ok_or(Status::ENODATA)
    }

    fn set_xattr(&self, _ctx: &Context, _input: &SetXAttrIn, name: &OsStr, value: &[u8]) -> Status {
        self.record(format!("setxattr {}", name.to_string_lossy()));
        self.xattrs
            .lock()
            .insert(name.to_string_lossy().into_owned(), value.to_vec());
        Status::OK
    }

    fn list_xattr(&self, _ctx: &Context) -> Result<Vec<u8>, Status> {
        self.record("listxattr".to_string());
        Ok(self.xattr_names.clone())
    }

    fn remove_xattr(&self, _ctx: &Context, name: &OsStr) -> Status {
        self.record(format!("removexattr {}", name.to_string_lossy()));
        match self.xattrs.lock().remove(&*name.to_string_lossy()) {
            Some(_) => Status::OK,
            None => Status::ENODATA,
        }
    }

    fn set_attr(&self, ctx: &Context, input: &SetAttrIn, out: &mut AttrOut) -> Status {
        self.record(format!(
            "setattr {} valid={} size={} mode={:o}",
            ctx.node_id, input.valid, input.size, input.mode
        ));
        out.attr.ino = ctx.node_id;
        out.attr.size = input.size;
        out.attr.mode = libc::S_IFREG as u32 | input.mode;
        Status::OK
    }

    fn mknod(&self, ctx: &Context, input: &MknodIn, name: &OsStr, out: &mut EntryOut) -> Status {
        self.record(format!(
            "mknod {} {} {:o} rdev={}",
            ctx.node_id,
            name.to_string_lossy(),
            input.mode,
            input.rdev
        ));
        out.node_id = 10;
        out.attr.ino = 10;
        out.attr.mode = input.mode;
        Status::OK
    }

    fn mkdir(&self, ctx: &Context, input: &MkdirIn, name: &OsStr, out: &mut EntryOut) -> Status {
        self.record(format!(
            "mkdir {} {} {:o} umask={:o}",
            ctx.node_id,
            name.to_string_lossy(),
            input.mode,
            input.umask
        ));
        out.node_id = 11;
        out.attr.ino = 11;
        out.attr.mode = libc::S_IFDIR as u32 | input.mode;
        Status::OK
    }

    fn rename(&self, ctx: &Context, input: &RenameIn, old_name: &OsStr, new_name: &OsStr) -> Status {
        self.record(format!(
            "rename {}/{} -> {}/{}",
            ctx.node_id,
            old_name.to_string_lossy(),
            input.newdir,
            new_name.to_string_lossy()
        ));
        Status::OK
    }

    fn link(&self, ctx: &Context, input: &LinkIn, name: &OsStr, out: &mut EntryOut) -> Status {
        self.record(format!(
            "link {} -> {}/{}",
            input.old_node_id,
            ctx.node_id,
            name.to_string_lossy()
        ));
        out.node_id = input.old_node_id;
        out.attr.ino = input.old_node_id;
        out.attr.nlink = 2;
        Status::OK
    }

    fn access(&self, ctx: &Context, input: &AccessIn) -> Status {
        self.record(format!("access {} {}", ctx.node_id, input.mask));
        if input.mask & libc::W_OK as u32 != 0 {
            Status::EACCES
        } else {
            Status::OK
        }
    }

    fn create(&self, ctx: &Context, input: &CreateIn, name: &OsStr, out: &mut CreateOut) -> Status {
        self.record(format!(
            "create {} {} flags={} {:o}",
            ctx.node_id,
            name.to_string_lossy(),
            input.flags,
            input.mode
        ));
        out.entry.node_id = 12;
        out.entry.attr.ino = 12;
        out.entry.attr.mode = input.mode;
        out.open.fh = 99;
        Status::OK
    }

    fn open(&self, ctx: &Context, input: &OpenIn, out: &mut OpenOut) -> Status {
        self.record(format!("open {} flags={}", ctx.node_id, input.flags));
        out.fh = 7;
        Status::OK
    }

    fn flush(&self, _ctx: &Context, input: &FlushIn) -> Status {
        self.record(format!("flush {} owner={}", input.fh, input.lock_owner));
        Status::OK
    }

    fn fsync(&self, _ctx: &Context, input: &FsyncIn) -> Status {
        self.record(format!("fsync {} flags={}", input.fh, input.fsync_flags));
        Status::OK
    }

    fn open_dir(&self, ctx: &Context, _input: &OpenIn, out: &mut OpenOut) -> Status {
        self.record(format!("opendir {}", ctx.node_id));
        out.fh = 8;
        Status::OK
    }

    fn release_dir(&self, _ctx: &Context, input: &ReleaseIn) {
        self.record(format!("releasedir {}", input.fh));
    }

    fn fsync_dir(&self, _ctx: &Context, input: &FsyncIn) -> Status {
        self.record(format!("fsyncdir {} flags={}", input.fh, input.fsync_flags));
        Status::EIO
    }

    fn fallocate(&self, _ctx: &Context, input: &FallocateIn) -> Status {
        self.record(format!(
            "fallocate {} {}+{} mode={}",
            input.fh, input.offset, input.length, input.mode
        ));
        Status::OK
    }
}

/// Builds a kernel message: header, fixed record, then `extra` bytes.
pub fn message(opcode: Opcode, unique: u64, node_id: u64, record: &[u8], extra: &[u8]) -> Bytes {
    raw_message(opcode.raw(), unique, node_id, record, extra)
}

/// Like [`message`] but with an arbitrary opcode number.
pub fn raw_message(opcode: u32, unique: u64, node_id: u64, record: &[u8], extra: &[u8]) -> Bytes {
    let header = InHeader {
        len: (IN_HEADER_SIZE + record.len() + extra.len()) as u32,
        opcode,
        unique,
        node_id,
        uid: 1000,
        gid: 1000,
        pid: 42,
        padding: 0,
    };
    let mut buf = header.as_bytes().to_vec();
    buf.extend_from_slice(record);
    buf.extend_from_slice(extra);
    Bytes::from(buf)
}

pub fn init_message(unique: u64, major: u32, minor: u32, flags: u32) -> Bytes {
    let init = InitIn {
        major,
        minor,
        max_readahead: 128 * 1024,
        flags,
    };
    message(Opcode::Init, unique, 0, init.as_bytes(), &[])
}

/// A decoded reply or notification.
#[derive(Debug, Clone)]
pub struct ParsedReply {
    pub header: OutHeader,
    pub body: Vec<u8>,
}

impl ParsedReply {
    pub fn parse(bytes: &[u8]) -> Self {
        let header = read_record::<OutHeader>(bytes).expect("reply shorter than its header");
        assert_eq!(header.len as usize, bytes.len(), "reply length field");
        Self {
            header,
            body: bytes[OUT_HEADER_SIZE..].to_vec(),
        }
    }

    pub fn error(&self) -> i32 {
        self.header.error
    }

    pub fn is_status(&self, status: Status) -> bool {
        self.header.error == status.wire_error()
    }

    pub fn record<T: FromBytes>(&self) -> T {
        read_record::<T>(&self.body).expect("reply body shorter than record")
    }
}

static TRACING: Once = Once::new();

/// Installs a test-writer subscriber, filtered by `RUST_LOG` (default `warn`).
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_test_writer().with_target(false))
            .with(filter)
            .try_init();
    });
}

pub fn server(fs: Arc<RecordingFs>, options: ServerOptions) -> Server<MemoryChannel> {
    init_tracing();
    Server::new(fs, MemoryChannel::new(), options).expect("server construction")
}

/// Handles one message and returns the single reply written, if any.
pub fn roundtrip(server: &Server<MemoryChannel>, message: Bytes) -> Option<ParsedReply> {
    server.handle_message(message).expect("handle_message");
    let mut sent = server.channel().take_sent();
    assert!(sent.len() <= 1, "more than one reply: {sent:?}");
    sent.pop().map(|bytes| ParsedReply::parse(&bytes))
}

/// Completes the handshake at the given minor version.
pub fn handshake(server: &Server<MemoryChannel>, minor: u32) -> ParsedReply {
    let reply = roundtrip(server, init_message(1, 7, minor, u32::MAX)).expect("INIT reply");
    assert_eq!(reply.error(), 0, "handshake refused");
    reply
}
