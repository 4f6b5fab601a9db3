//! Canonical structured event names used across `mq-loadgen`.

// Send-driver events.
pub const SEND_JOB_START: &str = "send_job_start";
pub const SEND_JOB_OK: &str = "send_job_ok";
pub const SEND_JOB_FAILED: &str = "send_job_failed";
pub const SEND_BATCH_DISPATCH: &str = "send_batch_dispatch";
pub const SENDER_CLOSE_FAILED: &str = "sender_close_failed";

// Receive-driver and handler events.
pub const RECEIVE_JOB_START: &str = "receive_job_start";
pub const RECEIVE_JOB_OK: &str = "receive_job_ok";
pub const RECEIVE_JOB_FAILED: &str = "receive_job_failed";
pub const RECEIVER_TARGET_REACHED: &str = "receiver_target_reached";
pub const RECEIVER_ABORTED: &str = "receiver_aborted";
pub const RECEIVER_ERROR_IGNORED: &str = "receiver_error_ignored";
pub const RECEIVER_RETRY_BACKOFF: &str = "receiver_retry_backoff";
pub const RECEIVER_RETRY_EXHAUSTED: &str = "receiver_retry_exhausted";
pub const RECEIVER_ERROR_UNCLASSIFIED: &str = "receiver_error_unclassified";
pub const RECEIVER_CLOSE_FAILED: &str = "receiver_close_failed";

// Session-driver events.
pub const SESSION_CONCURRENCY_COLLAPSED: &str = "session_concurrency_collapsed";

// Sampler events.
pub const SAMPLE_TICK: &str = "sample_tick";
pub const SAMPLER_RELEASED: &str = "sampler_released";
