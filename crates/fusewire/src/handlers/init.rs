//! Protocol handshake.
//!
//! The first INIT decides the session: a peer with another major version,
//! or a minor version older than we accept, is refused with EIO and the
//! session stays unnegotiated. An accepted peer gets the intersection of
//! its capabilities with ours and the lower of the two minor versions.

use fusewire_abi::{
    InitFlags, InitIn, InitOut, KERNEL_VERSION, MINIMUM_MINOR_VERSION, OUR_MINOR_VERSION,
    SPLICE_MINOR_VERSION, Status,
};
use tracing::{debug, warn};

use super::input;
use crate::dispatch::Dispatcher;
use crate::request::Request;
use crate::session::KernelSettings;

pub(crate) fn init(d: &Dispatcher, req: &mut Request) {
    let Some(args) = input::<InitIn>(req) else {
        return;
    };

    if args.major != KERNEL_VERSION {
        warn!(
            given = args.major,
            want = KERNEL_VERSION,
            "major protocol version does not match"
        );
        req.set_status(Status::EIO);
        return;
    }
    if args.minor < MINIMUM_MINOR_VERSION {
        warn!(
            given = args.minor,
            minimum = MINIMUM_MINOR_VERSION,
            "minor protocol version is older than supported"
        );
        req.set_status(Status::EIO);
        return;
    }

    let settings = KernelSettings {
        major: args.major,
        minor: args.minor,
        max_readahead: args.max_readahead,
        flags: InitFlags::negotiate(args.flags),
    };
    let splice = args.minor >= SPLICE_MINOR_VERSION;
    if !d.session().establish(settings, splice) {
        warn!(unique = req.unique(), "duplicate INIT after handshake");
        req.set_status(Status::EIO);
        return;
    }
    d.fs().init(&settings);

    let options = d.options();
    let out = InitOut {
        major: KERNEL_VERSION,
        minor: OUR_MINOR_VERSION.min(args.minor),
        max_readahead: args.max_readahead,
        flags: settings.flags.bits(),
        max_background: options.max_background,
        congestion_threshold: options.congestion_threshold(),
        max_write: options.max_write,
    };
    debug!(
        peer_minor = args.minor,
        minor = out.minor,
        flags = ?settings.flags,
        splice,
        "handshake complete"
    );
    req.set_output(&out);
    req.set_status(Status::OK);
}
