//! Job descriptions for one send or receive run.

use std::time::Duration;

/// How a send worker hands messages to the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    /// One message per send call.
    Single,
    /// Pack messages into size-bounded batches dispatched as one unit.
    Batched { max_batch_bytes: usize },
}

/// One send run: repeat `payload` toward `total_target` messages on `queue`
/// using `max_inflight_workers` concurrent workers.
///
/// Created per request; lives for exactly one run.
#[derive(Debug, Clone)]
pub struct SendJob {
    pub queue: String,
    pub total_target: u64,
    pub max_inflight_workers: usize,
    pub payload: Vec<u8>,
    pub batch: BatchMode,
    pub session_id: Option<String>,
    /// Bounds a run whose target is never reached. `None` reproduces the
    /// original unbounded behavior.
    pub run_timeout: Option<Duration>,
}

impl SendJob {
    pub fn new(
        queue: impl Into<String>,
        total_target: u64,
        max_inflight_workers: usize,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            queue: queue.into(),
            total_target,
            max_inflight_workers,
            payload,
            batch: BatchMode::Single,
            session_id: None,
            run_timeout: None,
        }
    }

    pub fn with_batching(mut self, max_batch_bytes: usize) -> Self {
        self.batch = BatchMode::Batched { max_batch_bytes };
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_run_timeout(mut self, run_timeout: Duration) -> Self {
        self.run_timeout = Some(run_timeout);
        self
    }
}

/// One receive run: drain `queue` until `total_target` messages have been
/// counted, across `receiver_count` independent receivers.
#[derive(Debug, Clone)]
pub struct ReceiveJob {
    pub queue: String,
    pub total_target: u64,
    pub receiver_count: usize,
    /// Concurrent handler invocations per receiver. Collapses to 1 on a
    /// session-scoped run so broker-side FIFO is never broken locally.
    pub max_concurrent_calls: usize,
    pub session_id: Option<String>,
    pub run_timeout: Option<Duration>,
}

impl ReceiveJob {
    pub fn new(
        queue: impl Into<String>,
        total_target: u64,
        receiver_count: usize,
        max_concurrent_calls: usize,
    ) -> Self {
        Self {
            queue: queue.into(),
            total_target,
            receiver_count,
            max_concurrent_calls,
            session_id: None,
            run_timeout: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_run_timeout(mut self, run_timeout: Duration) -> Self {
        self.run_timeout = Some(run_timeout);
        self
    }
}
