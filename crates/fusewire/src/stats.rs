//! Statistics for the request dispatcher.
//!
//! Lock-free counters recorded on every dispatched request. Statistics
//! include:
//!
//! - Requests per opcode
//! - Error replies and unknown opcodes
//! - Requests refused before the handshake
//! - Forget notifications forwarded, and batches that arrived truncated
//! - Reply and notification writes
//!
//! # Usage
//!
//! ```
//! use fusewire::stats::DispatchStats;
//! use fusewire::abi::Opcode;
//! use std::sync::Arc;
//!
//! let stats = Arc::new(DispatchStats::new());
//! stats.record_request(Opcode::Lookup);
//! assert_eq!(stats.snapshot().total_requests, 1);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use fusewire_abi::{OPCODE_COUNT, Opcode};

/// Counters for dispatcher activity.
///
/// All counters use `AtomicU64` with relaxed ordering; values read while
/// workers are running may be slightly stale.
#[derive(Debug)]
pub struct DispatchStats {
    by_opcode: [AtomicU64; OPCODE_COUNT],
    /// Total requests decoded, including unknown opcodes.
    pub total_requests: AtomicU64,
    /// Replies carrying a non-zero status.
    pub error_replies: AtomicU64,
    /// Requests whose opcode has no descriptor.
    pub unknown_opcodes: AtomicU64,
    /// Requests refused because the handshake had not completed.
    pub rejected_before_init: AtomicU64,
    /// (node id, count) pairs forwarded to the filesystem.
    pub forgets_forwarded: AtomicU64,
    /// BATCH_FORGET messages holding fewer entries than declared.
    pub truncated_batch_forgets: AtomicU64,
    /// Replies written to the channel.
    pub replies_sent: AtomicU64,
    /// Replies the channel refused.
    pub reply_failures: AtomicU64,
    /// Unsolicited notifications written to the channel.
    pub notifications_sent: AtomicU64,
}

impl Default for DispatchStats {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchStats {
    /// Create new dispatch statistics.
    pub fn new() -> Self {
        Self {
            by_opcode: std::array::from_fn(|_| AtomicU64::new(0)),
            total_requests: AtomicU64::new(0),
            error_replies: AtomicU64::new(0),
            unknown_opcodes: AtomicU64::new(0),
            rejected_before_init: AtomicU64::new(0),
            forgets_forwarded: AtomicU64::new(0),
            truncated_batch_forgets: AtomicU64::new(0),
            replies_sent: AtomicU64::new(0),
            reply_failures: AtomicU64::new(0),
            notifications_sent: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_request(&self, opcode: Opcode) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if let Some(counter) = self.by_opcode.get(opcode.index()) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_unknown(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.unknown_opcodes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_error(&self) {
        self.error_replies.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_rejected_before_init(&self) {
        self.rejected_before_init.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_forgets(&self, count: u64) {
        self.forgets_forwarded.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_truncated_batch(&self) {
        self.truncated_batch_forgets.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_reply(&self) {
        self.replies_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_reply_failure(&self) {
        self.reply_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_notification(&self) {
        self.notifications_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of requests seen for one opcode.
    pub fn count_for(&self, opcode: Opcode) -> u64 {
        self.by_opcode
            .get(opcode.index())
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        for counter in &self.by_opcode {
            counter.store(0, Ordering::Relaxed);
        }
        for counter in [
            &self.total_requests,
            &self.error_replies,
            &self.unknown_opcodes,
            &self.rejected_before_init,
            &self.forgets_forwarded,
            &self.truncated_batch_forgets,
            &self.replies_sent,
            &self.reply_failures,
            &self.notifications_sent,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Create a snapshot of current values.
    pub fn snapshot(&self) -> DispatchStatsSnapshot {
        let per_opcode = Opcode::ALL
            .iter()
            .filter_map(|&op| {
                let n = self.count_for(op);
                (n > 0).then_some((op, n))
            })
            .collect();
        DispatchStatsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            error_replies: self.error_replies.load(Ordering::Relaxed),
            unknown_opcodes: self.unknown_opcodes.load(Ordering::Relaxed),
            rejected_before_init: self.rejected_before_init.load(Ordering::Relaxed),
            forgets_forwarded: self.forgets_forwarded.load(Ordering::Relaxed),
            truncated_batch_forgets: self.truncated_batch_forgets.load(Ordering::Relaxed),
            replies_sent: self.replies_sent.load(Ordering::Relaxed),
            reply_failures: self.reply_failures.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            per_opcode,
        }
    }
}

/// Point-in-time copy of [`DispatchStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchStatsSnapshot {
    pub total_requests: u64,
    pub error_replies: u64,
    pub unknown_opcodes: u64,
    pub rejected_before_init: u64,
    pub forgets_forwarded: u64,
    pub truncated_batch_forgets: u64,
    pub replies_sent: u64,
    pub reply_failures: u64,
    pub notifications_sent: u64,
    /// Opcodes seen at least once, in numeric order.
    pub per_opcode: Vec<(Opcode, u64)>,
}

impl DispatchStatsSnapshot {
    /// Fraction of requests answered with an error (0.0 to 1.0).
    pub fn error_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.error_replies as f64 / self.total_requests as f64
        }
    }

    /// One-line summary for log output.
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DispatchStatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requests, {} errors ({:.1}%), {} unknown, {} forgets",
            self.total_requests,
            self.error_replies,
            self.error_rate() * 100.0,
            self.unknown_opcodes,
            self.forgets_forwarded,
        )?;
        if self.truncated_batch_forgets > 0 {
            write!(f, ", {} truncated batches", self.truncated_batch_forgets)?;
        }
        Ok(())
    }
}
