//! Namespace operations: lookups and entry creation or removal.

use fusewire_abi::{EntryOut, LinkIn, MkdirIn, MknodIn, RenameIn, Status};

use super::{input, reply};
use crate::dispatch::Dispatcher;
use crate::request::{Payload, Request};

pub(crate) fn lookup(d: &Dispatcher, req: &mut Request) {
    let ctx = req.context();
    let mut out = EntryOut::default();
    let status = req
        .filename(0)
        .map_or(Status::EIO, |name| d.fs().lookup(&ctx, name, &mut out));
    reply(req, status, &out);
}

pub(crate) fn mknod(d: &Dispatcher, req: &mut Request) {
    let Some(args) = input::<MknodIn>(req) else {
        return;
    };
    let ctx = req.context();
    let mut out = EntryOut::default();
    let status = req
        .filename(0)
        .map_or(Status::EIO, |name| d.fs().mknod(&ctx, &args, name, &mut out));
    reply(req, status, &out);
}

pub(crate) fn mkdir(d: &Dispatcher, req: &mut Request) {
    let Some(args) = input::<MkdirIn>(req) else {
        return;
    };
    let ctx = req.context();
    let mut out = EntryOut::default();
    let status = req
        .filename(0)
        .map_or(Status::EIO, |name| d.fs().mkdir(&ctx, &args, name, &mut out));
    reply(req, status, &out);
}

pub(crate) fn unlink(d: &Dispatcher, req: &mut Request) {
    let ctx = req.context();
    let status = req
        .filename(0)
        .map_or(Status::EIO, |name| d.fs().unlink(&ctx, name));
    req.set_status(status);
}

pub(crate) fn rmdir(d: &Dispatcher, req: &mut Request) {
    let ctx = req.context();
    let status = req
        .filename(0)
        .map_or(Status::EIO, |name| d.fs().rmdir(&ctx, name));
    req.set_status(status);
}

/// The body carries the new entry's name, then the link target.
pub(crate) fn symlink(d: &Dispatcher, req: &mut Request) {
    let ctx = req.context();
    let mut out = EntryOut::default();
    let status = match (req.filename(0), req.filename(1)) {
        (Some(name), Some(target)) => d.fs().symlink(&ctx, target, name, &mut out),
        _ => Status::EIO,
    };
    reply(req, status, &out);
}

pub(crate) fn rename(d: &Dispatcher, req: &mut Request) {
    let Some(args) = input::<RenameIn>(req) else {
        return;
    };
    let ctx = req.context();
    let status = match (req.filename(0), req.filename(1)) {
        (Some(old_name), Some(new_name)) => d.fs().rename(&ctx, &args, old_name, new_name),
        _ => Status::EIO,
    };
    req.set_status(status);
}

pub(crate) fn link(d: &Dispatcher, req: &mut Request) {
    let Some(args) = input::<LinkIn>(req) else {
        return;
    };
    let ctx = req.context();
    let mut out = EntryOut::default();
    let status = req
        .filename(0)
        .map_or(Status::EIO, |name| d.fs().link(&ctx, &args, name, &mut out));
    reply(req, status, &out);
}

pub(crate) fn readlink(d: &Dispatcher, req: &mut Request) {
    match d.fs().readlink(&req.context()) {
        Ok(target) => {
            req.set_payload(Payload::Data(target));
            req.set_status(Status::OK);
        }
        Err(status) => req.set_status(status),
    }
}
