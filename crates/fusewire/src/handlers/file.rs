//! File handle operations and attribute access.

use fusewire_abi::{
    AccessIn, AttrOut, CreateIn, CreateOut, FallocateIn, FlushIn, FsyncIn, GetAttrIn, OpenIn,
    OpenOut, ReadIn, ReleaseIn, SetAttrIn, Status, WriteIn, WriteOut,
};

use tracing::debug;

use super::{input, reply};
use crate::dispatch::Dispatcher;
use crate::read::ReadResult;
use crate::request::{Payload, Request};

pub(crate) fn get_attr(d: &Dispatcher, req: &mut Request) {
    let Some(args) = input::<GetAttrIn>(req) else {
        return;
    };
    let mut out = AttrOut::default();
    let status = d.fs().get_attr(&req.context(), &args, &mut out);
    reply(req, status, &out);
}

pub(crate) fn set_attr(d: &Dispatcher, req: &mut Request) {
    let Some(args) = input::<SetAttrIn>(req) else {
        return;
    };
    let mut out = AttrOut::default();
    let status = d.fs().set_attr(&req.context(), &args, &mut out);
    reply(req, status, &out);
}

pub(crate) fn access(d: &Dispatcher, req: &mut Request) {
    let Some(args) = input::<AccessIn>(req) else {
        return;
    };
    let status = d.fs().access(&req.context(), &args);
    req.set_status(status);
}

pub(crate) fn open(d: &Dispatcher, req: &mut Request) {
    let Some(args) = input::<OpenIn>(req) else {
        return;
    };
    let mut out = OpenOut::default();
    let status = d.fs().open(&req.context(), &args, &mut out);
    reply(req, status, &out);
}

pub(crate) fn create(d: &Dispatcher, req: &mut Request) {
    let Some(args) = input::<CreateIn>(req) else {
        return;
    };
    let ctx = req.context();
    let mut out = CreateOut::default();
    let status = req
        .filename(0)
        .map_or(Status::EIO, |name| d.fs().create(&ctx, &args, name, &mut out));
    reply(req, status, &out);
}

/// The filesystem fills a buffer of the requested size, returns its own
/// bytes, or points at a file range for the server to send.
pub(crate) fn read(d: &Dispatcher, req: &mut Request) {
    let Some(args) = input::<ReadIn>(req) else {
        return;
    };
    let mut buf = req.take_buffer(args.size as usize);
    match d.fs().read(&req.context(), &args, &mut buf) {
        Ok(ReadResult::Buffer(n)) => {
            if n > buf.len() {
                debug!(reported = n, size = buf.len(), "read result clamped to buffer size");
            }
            buf.truncate(n.min(buf.len()));
            req.set_payload(Payload::Data(buf));
            req.set_status(Status::OK);
        }
        Ok(ReadResult::Data(data)) => {
            req.set_payload(Payload::Data(data));
            req.set_status(Status::OK);
        }
        Ok(ReadResult::Fd(source)) => {
            req.set_payload(Payload::Fd(source));
            req.set_status(Status::OK);
        }
        Err(status) => req.set_status(status),
    }
}

pub(crate) fn write(d: &Dispatcher, req: &mut Request) {
    let Some(args) = input::<WriteIn>(req) else {
        return;
    };
    let data = req.arg();
    let data = &data[..data.len().min(args.size as usize)];
    let (size, status) = match d.fs().write(&req.context(), &args, data) {
        Ok(n) => (n, Status::OK),
        Err(status) => (0, status),
    };
    reply(req, status, &WriteOut { size, padding: 0 });
}

pub(crate) fn flush(d: &Dispatcher, req: &mut Request) {
    let Some(args) = input::<FlushIn>(req) else {
        return;
    };
    let status = d.fs().flush(&req.context(), &args);
    req.set_status(status);
}

pub(crate) fn fsync(d: &Dispatcher, req: &mut Request) {
    let Some(args) = input::<FsyncIn>(req) else {
        return;
    };
    let status = d.fs().fsync(&req.context(), &args);
    req.set_status(status);
}

pub(crate) fn release(d: &Dispatcher, req: &mut Request) {
    let Some(args) = input::<ReleaseIn>(req) else {
        return;
    };
    d.fs().release(&req.context(), &args);
    req.set_status(Status::OK);
}

pub(crate) fn fallocate(d: &Dispatcher, req: &mut Request) {
    let Some(args) = input::<FallocateIn>(req) else {
        return;
    };
    let status = d.fs().fallocate(&req.context(), &args);
    req.set_status(status);
}
