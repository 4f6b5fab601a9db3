//! Per-job shared counters mutated by workers and read by the sampler.

use std::sync::atomic::{AtomicU64, Ordering};

/// Shared counter state for one job run.
///
/// Constructed per job and handed to every worker, handler, and sampler task
/// belonging to that run; never shared across jobs. Single increments are
/// atomic; check-then-act sequences over these counters are not, which is
/// where the bounded send overshoot comes from (see
/// [`SendDriver`](crate::SendDriver)).
#[derive(Debug, Default)]
pub struct JobCounters {
    sent: AtomicU64,
    received: AtomicU64,
    unclassified_errors: AtomicU64,
}

impl JobCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Adds `n` to the sent counter, returning the updated value.
    pub fn add_sent(&self, n: u64) -> u64 {
        self.sent.fetch_add(n, Ordering::Relaxed) + n
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Counts one delivered message, returning the updated value. The unique
    /// return value lets exactly one handler observe the target crossing.
    pub fn add_received(&self) -> u64 {
        self.received.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn unclassified_errors(&self) -> u64 {
        self.unclassified_errors.load(Ordering::Relaxed)
    }

    pub fn add_unclassified_error(&self) -> u64 {
        self.unclassified_errors.fetch_add(1, Ordering::Relaxed) + 1
    }
}
