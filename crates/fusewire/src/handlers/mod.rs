//! Opcode handlers.
//!
//! Each handler has the [`Handler`](crate::dispatch::Handler) signature and
//! is wired to its opcode in the registry. Handlers run only after the
//! dispatcher has checked the request's length and the handshake, so a
//! failed decode here means the registry and the handler disagree.

use fusewire_abi::Status;
use zerocopy::{FromBytes, Immutable, IntoBytes};

use crate::request::Request;

pub(crate) mod dir;
pub(crate) mod entry;
pub(crate) mod file;
pub(crate) mod forget;
pub(crate) mod init;
pub(crate) mod misc;
pub(crate) mod xattr;

/// Decodes the fixed input record, answering EIO when it is missing.
fn input<T: FromBytes>(req: &mut Request) -> Option<T> {
    let record = req.input::<T>();
    if record.is_none() {
        req.set_status(Status::EIO);
    }
    record
}

/// Stores the handler's output record and status.
fn reply<T: IntoBytes + Immutable>(req: &mut Request, status: Status, out: &T) {
    req.set_output(out);
    req.set_status(status);
}
