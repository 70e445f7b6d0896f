use fusewire_abi::{Status, StatfsOut};
use tracing::{debug, info};

use super::reply;
use crate::dispatch::Dispatcher;
use crate::request::Request;

pub(crate) fn stat_fs(d: &Dispatcher, req: &mut Request) {
    let mut out = StatfsOut::default();
    let status = d.fs().stat_fs(&req.context(), &mut out);
    reply(req, status, &out);
}

pub(crate) fn destroy(d: &Dispatcher, req: &mut Request) {
    info!(stats = %d.stats().snapshot(), "kernel sent DESTROY");
    d.fs().destroy();
    req.set_status(Status::OK);
}

pub(crate) fn ioctl(_d: &Dispatcher, req: &mut Request) {
    debug!(unique = req.unique(), "ioctl is not supported");
    req.set_status(Status::ENOSYS);
}
