//! FORGET and BATCH_FORGET.
//!
//! Neither gets a reply, so a batch that holds fewer entries than its
//! header declares can only be reported through the log and statistics.

use fusewire_abi::{BatchForgetIn, ForgetIn, ForgetOne, read_record, record_size};
use tracing::{trace, warn};

use super::input;
use crate::dispatch::Dispatcher;
use crate::request::Request;

const FORGET_ONE_SIZE: usize = record_size::<ForgetOne>();

/// What happened to a BATCH_FORGET payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BatchForgetOutcome {
    /// Every declared entry was present and forwarded.
    Complete { forwarded: usize },
    /// The payload ended early; the entries present were forwarded.
    Truncated { declared: usize, forwarded: usize },
}

/// Forwards the complete entries of a batch, at most `declared` of them.
pub(crate) fn forget_batch(
    payload: &[u8],
    declared: usize,
    mut forget: impl FnMut(u64, u64),
) -> BatchForgetOutcome {
    let mut forwarded = 0;
    for chunk in payload.chunks_exact(FORGET_ONE_SIZE).take(declared) {
        if let Some(entry) = read_record::<ForgetOne>(chunk) {
            forget(entry.node_id, entry.nlookup);
            forwarded += 1;
        }
    }
    if forwarded < declared {
        BatchForgetOutcome::Truncated {
            declared,
            forwarded,
        }
    } else {
        BatchForgetOutcome::Complete { forwarded }
    }
}

pub(crate) fn forget(d: &Dispatcher, req: &mut Request) {
    let Some(args) = input::<ForgetIn>(req) else {
        return;
    };
    if d.options().remember_inodes {
        return;
    }
    d.fs().forget(req.context().node_id, args.nlookup);
    d.stats().record_forgets(1);
}

pub(crate) fn batch_forget(d: &Dispatcher, req: &mut Request) {
    let Some(args) = input::<BatchForgetIn>(req) else {
        return;
    };
    if d.options().remember_inodes {
        return;
    }

    let fs = d.fs();
    match forget_batch(req.arg(), args.count as usize, |node, n| fs.forget(node, n)) {
        BatchForgetOutcome::Complete { forwarded } => {
            d.stats().record_forgets(forwarded as u64);
            trace!(forwarded, "batch forget");
        }
        BatchForgetOutcome::Truncated {
            declared,
            forwarded,
        } => {
            d.stats().record_forgets(forwarded as u64);
            d.stats().record_truncated_batch();
            warn!(
                declared,
                forwarded,
                bytes = req.arg().len(),
                want = declared * FORGET_ONE_SIZE,
                "too few bytes for batch forget"
            );
        }
    }
}
