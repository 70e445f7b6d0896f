//! Request decoding and reply encoding.
//!
//! A kernel message is split once, at parse time, into the header, the
//! fixed input record, the embedded filenames and the trailing argument
//! bytes. All slices share the message buffer. Typed input records are
//! decoded on demand with a single bounded copy.
//!
//! The reply of a request is its fixed output record (pre-sized from the
//! registry) followed by an optional payload. Error replies carry only the
//! header.

use std::ffi::OsStr;
use std::fmt;
use std::io;
use std::os::unix::ffi::OsStrExt;

use bytes::Bytes;
use fusewire_abi::{
    IN_HEADER_SIZE, InHeader, OUT_HEADER_SIZE, Opcode, OutHeader, Status, read_record,
};
use zerocopy::{FromBytes, Immutable, IntoBytes};

use crate::error::ParseError;
use crate::read::FdSource;
use crate::registry::{self, Descriptor};

/// Caller identity and target node of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Context {
    pub node_id: u64,
    pub uid: u32,
    pub gid: u32,
    pub pid: u32,
}

impl From<&InHeader> for Context {
    fn from(header: &InHeader) -> Self {
        Self {
            node_id: header.node_id,
            uid: header.uid,
            gid: header.gid,
            pid: header.pid,
        }
    }
}

/// Variable-length data following the output record of a reply.
#[derive(Debug, Clone, Default)]
pub enum Payload {
    #[default]
    None,
    Data(Vec<u8>),
    /// File range copied into the reply by the server.
    Fd(FdSource),
}

impl Payload {
    pub fn is_none(&self) -> bool {
        matches!(self, Payload::None)
    }
}

/// One decoded kernel request and the reply being built for it.
#[derive(Debug)]
pub struct Request {
    header: InHeader,
    descriptor: Option<&'static Descriptor>,
    input: Bytes,
    arg: Bytes,
    filenames: Vec<Bytes>,
    truncated: bool,
    out: Vec<u8>,
    payload: Payload,
    status: Status,
    buffer: Option<Vec<u8>>,
}

impl Request {
    /// Splits a raw kernel message.
    ///
    /// Fails only when the header itself is unusable. A body shorter than
    /// the opcode's input record, or missing one of its filenames, yields a
    /// request marked [`truncated`](Request::is_truncated).
    pub fn parse(message: Bytes) -> Result<Self, ParseError> {
        let header: InHeader = read_record(&message).ok_or(ParseError::ShortHeader {
            len: message.len(),
        })?;
        if header.len as usize != message.len() {
            return Err(ParseError::LengthMismatch {
                declared: header.len,
                actual: message.len(),
            });
        }

        let descriptor = registry::describe(header.opcode);
        let mut request = Request {
            header,
            descriptor,
            input: Bytes::new(),
            arg: Bytes::new(),
            filenames: Vec::new(),
            truncated: false,
            out: Vec::new(),
            payload: Payload::None,
            status: Status::OK,
            buffer: None,
        };
        let Some(desc) = descriptor else {
            return Ok(request);
        };

        let body = message.slice(IN_HEADER_SIZE..);
        if body.len() < desc.input_size {
            request.truncated = true;
            return Ok(request);
        }
        request.input = body.slice(..desc.input_size);

        let mut rest = body.slice(desc.input_size..);
        for _ in 0..desc.filenames {
            let Some(end) = rest.iter().position(|&b| b == 0) else {
                request.truncated = true;
                return Ok(request);
            };
            request.filenames.push(rest.slice(..end));
            rest = rest.slice(end + 1..);
        }
        request.arg = rest;
        request.out = vec![0; desc.output_size];
        Ok(request)
    }

    /// Supplies a buffer to reuse for READ and READDIR data.
    #[must_use]
    pub fn with_buffer(mut self, buffer: Vec<u8>) -> Self {
        self.buffer = Some(buffer);
        self
    }

    pub fn header(&self) -> &InHeader {
        &self.header
    }

    pub fn unique(&self) -> u64 {
        self.header.unique
    }

    /// Decoded opcode, or `None` for an unknown code.
    pub fn opcode(&self) -> Option<Opcode> {
        self.descriptor.map(|d| d.opcode)
    }

    pub fn descriptor(&self) -> Option<&'static Descriptor> {
        self.descriptor
    }

    pub fn context(&self) -> Context {
        Context::from(&self.header)
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    /// Whether the body was too short for the opcode's fixed layout.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Raw bytes of the fixed input record.
    pub fn input_bytes(&self) -> &[u8] {
        &self.input
    }

    /// Decodes the fixed input record.
    pub fn input<T: FromBytes>(&self) -> Option<T> {
        read_record(&self.input)
    }

    /// Embedded filename `index`, without its terminator.
    pub fn filename(&self, index: usize) -> Option<&OsStr> {
        self.filenames.get(index).map(|name| OsStr::from_bytes(name))
    }

    /// Bytes after the input record and filenames.
    pub fn arg(&self) -> &[u8] {
        &self.arg
    }

    /// Current output record bytes.
    pub fn output_bytes(&self) -> &[u8] {
        &self.out
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Replaces the output record.
    pub fn set_output<T: IntoBytes + Immutable>(&mut self, record: &T) {
        self.out.clear();
        self.out.extend_from_slice(record.as_bytes());
    }

    /// Drops the output record so the payload forms the whole reply body.
    pub fn clear_output(&mut self) {
        self.out.clear();
    }

    pub fn set_payload(&mut self, payload: Payload) {
        self.payload = payload;
    }

    /// Zeroed buffer of `size` bytes, reusing the supplied one if present.
    pub(crate) fn take_buffer(&mut self, size: usize) -> Vec<u8> {
        let mut buf = self.buffer.take().unwrap_or_default();
        buf.clear();
        buf.resize(size, 0);
        buf
    }

    /// Finishes the request.
    ///
    /// Returns `None` for opcodes the kernel expects no reply to.
    pub fn into_reply(self) -> Option<Reply> {
        if self.opcode().is_some_and(|op| !op.expects_reply()) {
            return None;
        }
        let (body, payload) = if self.status.is_ok() {
            (self.out, self.payload)
        } else {
            (Vec::new(), Payload::None)
        };
        Some(Reply {
            unique: self.header.unique,
            status: self.status,
            descriptor: self.descriptor,
            body,
            payload,
        })
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.descriptor.map_or("UNKNOWN", |d| d.name);
        write!(
            f,
            "{name}(unique={}, node={}, pid={})",
            self.header.unique, self.header.node_id, self.header.pid
        )?;
        if let Some(input) = self.descriptor.and_then(|d| d.render_input(&self.input)) {
            write!(f, " {input}")?;
        }
        if !self.filenames.is_empty() {
            let names: Vec<_> = self
                .filenames
                .iter()
                .map(|n| String::from_utf8_lossy(n))
                .collect();
            write!(f, " {names:?}")?;
        }
        if !self.arg.is_empty() {
            write!(f, " +{} bytes", self.arg.len())?;
        }
        Ok(())
    }
}

/// A reply ready to be written to the channel.
#[derive(Debug)]
pub struct Reply {
    unique: u64,
    status: Status,
    descriptor: Option<&'static Descriptor>,
    body: Vec<u8>,
    payload: Payload,
}

impl Reply {
    pub fn unique(&self) -> u64 {
        self.unique
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Fixed output record (empty for error replies).
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Encodes header, output record and `data` into one message.
    pub fn encode_with(&self, data: &[u8]) -> Vec<u8> {
        let len = OUT_HEADER_SIZE + self.body.len() + data.len();
        let header = OutHeader {
            len: len as u32,
            error: self.status.wire_error(),
            unique: self.unique,
        };
        let mut message = Vec::with_capacity(len);
        message.extend_from_slice(header.as_bytes());
        message.extend_from_slice(&self.body);
        message.extend_from_slice(data);
        message
    }

    /// Encodes a header-only reply carrying `status` in place of this one.
    pub fn encode_error(&self, status: Status) -> Vec<u8> {
        let header = OutHeader {
            len: OUT_HEADER_SIZE as u32,
            error: status.wire_error(),
            unique: self.unique,
        };
        header.as_bytes().to_vec()
    }

    /// Encodes the whole reply, reading file-backed payloads into memory.
    pub fn encode(&self) -> io::Result<Vec<u8>> {
        match &self.payload {
            Payload::None => Ok(self.encode_with(&[])),
            Payload::Data(data) => Ok(self.encode_with(data)),
            Payload::Fd(source) => Ok(self.encode_with(&source.read_all()?)),
        }
    }

    /// Returns the payload buffer for reuse by the next request.
    pub fn into_buffer(self) -> Option<Vec<u8>> {
        match self.payload {
            Payload::Data(buf) => Some(buf),
            Payload::None | Payload::Fd(_) => None,
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unique={} {}", self.unique, self.status)?;
        if let Some(out) = self.descriptor.and_then(|d| d.render_output(&self.body)) {
            write!(f, " {out}")?;
        }
        match &self.payload {
            Payload::None => Ok(()),
            Payload::Data(data) if self.descriptor.is_some_and(|d| d.filename_out) => {
                write!(f, " {:?}", String::from_utf8_lossy(data))
            }
            Payload::Data(data) => write!(f, " {} bytes data", data.len()),
            Payload::Fd(source) => write!(f, " fd range {}+{}", source.offset, source.size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusewire_abi::{GetAttrIn, LinkIn};

    fn message(opcode: u32, body: &[u8]) -> Bytes {
        let header = InHeader {
            len: (IN_HEADER_SIZE + body.len()) as u32,
            opcode,
            unique: 77,
            node_id: 9,
            uid: 1000,
            gid: 1000,
            pid: 1234,
            padding: 0,
        };
        let mut buf = header.as_bytes().to_vec();
        buf.extend_from_slice(body);
        Bytes::from(buf)
    }

    #[test]
    fn test_short_header() {
        let err = Request::parse(Bytes::from_static(&[0; 10])).unwrap_err();
        assert_eq!(err, ParseError::ShortHeader { len: 10 });
    }

    #[test]
    fn test_length_mismatch() {
        let mut raw = message(3, &[0; 16]).to_vec();
        raw.push(0);
        let err = Request::parse(Bytes::from(raw)).unwrap_err();
        assert!(matches!(err, ParseError::LengthMismatch { declared: 56, actual: 57 }));
    }

    #[test]
    fn test_input_record_and_context() {
        let input = GetAttrIn { flags: 1, dummy: 0, fh: 33 };
        let req = Request::parse(message(3, input.as_bytes())).unwrap();

        assert_eq!(req.opcode(), Some(Opcode::GetAttr));
        assert!(!req.is_truncated());
        assert_eq!(req.input::<GetAttrIn>(), Some(input));
        assert_eq!(req.output_bytes().len(), 104);
        let ctx = req.context();
        assert_eq!((ctx.node_id, ctx.uid, ctx.pid), (9, 1000, 1234));
    }

    #[test]
    fn test_short_input_is_truncated() {
        let req = Request::parse(message(3, &[0; 15])).unwrap();
        assert!(req.is_truncated());
    }

    #[test]
    fn test_filenames_and_arg() {
        let mut body = LinkIn { old_node_id: 4 }.as_bytes().to_vec();
        body.extend_from_slice(b"new-name\0tail");
        let req = Request::parse(message(13, &body)).unwrap();

        assert_eq!(req.filename(0), Some(OsStr::new("new-name")));
        assert_eq!(req.filename(1), None);
        assert_eq!(req.arg(), b"tail");
    }

    #[test]
    fn test_missing_filename_is_truncated() {
        let req = Request::parse(message(12, b"\x01\0\0\0\0\0\0\0old\0new")).unwrap();
        assert!(req.is_truncated());
    }

    #[test]
    fn test_unknown_opcode() {
        let req = Request::parse(message(7, b"whatever")).unwrap();
        assert_eq!(req.opcode(), None);
        assert!(req.to_string().starts_with("UNKNOWN(unique=77"));
    }

    #[test]
    fn test_error_reply_is_header_only() {
        let mut req = Request::parse(message(3, &[0; 16])).unwrap();
        req.set_status(Status::ENOENT);
        let reply = req.into_reply().unwrap();
        let bytes = reply.encode().unwrap();

        assert_eq!(bytes.len(), OUT_HEADER_SIZE);
        let header: OutHeader = read_record(&bytes).unwrap();
        assert_eq!(header.len as usize, OUT_HEADER_SIZE);
        assert_eq!(header.error, -libc::ENOENT);
        assert_eq!(header.unique, 77);
    }

    #[test]
    fn test_reply_with_payload() {
        let mut req = Request::parse(message(5, &[])).unwrap();
        req.set_payload(Payload::Data(b"/target".to_vec()));
        let reply = req.into_reply().unwrap();
        assert!(reply.to_string().contains("\"/target\""));

        let bytes = reply.encode().unwrap();
        assert_eq!(bytes.len(), OUT_HEADER_SIZE + 7);
        assert_eq!(&bytes[OUT_HEADER_SIZE..], b"/target");
    }

    #[test]
    fn test_forget_has_no_reply() {
        let req = Request::parse(message(2, &1u64.to_ne_bytes())).unwrap();
        assert!(req.into_reply().is_none());
    }

    #[test]
    fn test_buffer_reuse() {
        let mut req = Request::parse(message(15, &[0; 40]))
            .unwrap()
            .with_buffer(vec![7; 4]);
        let buf = req.take_buffer(8);
        assert_eq!(buf, vec![0; 8]);
    }
}
