//! Directory handle operations.

use fusewire_abi::{FsyncIn, OpenIn, OpenOut, ReadIn, ReleaseIn, Status};

use super::{input, reply};
use crate::dirent::DirEntryList;
use crate::dispatch::Dispatcher;
use crate::request::{Payload, Request};

pub(crate) fn open_dir(d: &Dispatcher, req: &mut Request) {
    let Some(args) = input::<OpenIn>(req) else {
        return;
    };
    let mut out = OpenOut::default();
    let status = d.fs().open_dir(&req.context(), &args, &mut out);
    reply(req, status, &out);
}

pub(crate) fn read_dir(d: &Dispatcher, req: &mut Request) {
    let Some(args) = input::<ReadIn>(req) else {
        return;
    };
    let size = args.size as usize;
    let mut entries = DirEntryList::new(req.take_buffer(0), size, args.offset);
    let status = d.fs().read_dir(&req.context(), &args, &mut entries);
    req.set_payload(Payload::Data(entries.into_bytes()));
    req.set_status(status);
}

pub(crate) fn release_dir(d: &Dispatcher, req: &mut Request) {
    let Some(args) = input::<ReleaseIn>(req) else {
        return;
    };
    d.fs().release_dir(&req.context(), &args);
    req.set_status(Status::OK);
}

pub(crate) fn fsync_dir(d: &Dispatcher, req: &mut Request) {
    let Some(args) = input::<FsyncIn>(req) else {
        return;
    };
    let status = d.fs().fsync_dir(&req.context(), &args);
    req.set_status(status);
}
