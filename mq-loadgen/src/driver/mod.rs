//! Driver layer.
//!
//! Owns job execution: bounded send fan-out, receiver subscription
//! management, and the session specialization. Each run constructs its own
//! [`JobCounters`](crate::JobCounters) and sampler task, launches the worker
//! set, and awaits both before returning a [`RunReport`].

use crate::client::BrokerError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

mod receive;
mod send;
mod session;

pub use receive::ReceiveDriver;
pub use send::SendDriver;
pub use session::SessionDriver;

/// Outcome of one completed job run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Messages sent or received, depending on the driver.
    pub delivered: u64,
    pub elapsed: Duration,
    pub average_mps: f64,
    pub peak_mps: f64,
    /// Broker errors no classification existed for. Zero on a clean run.
    pub unclassified_errors: u64,
}

impl Display for RunReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} messages in {:.3}s (avg {:.0} MPS, peak {:.0} MPS, {} unclassified errors)",
            self.delivered,
            self.elapsed.as_secs_f64(),
            self.average_mps,
            self.peak_mps,
            self.unclassified_errors
        )
    }
}

/// Failures for job execution.
#[derive(Debug)]
pub enum DriverError {
    InvalidJob(String),
    FailedToCreateSender(BrokerError),
    FailedToCreateReceiver(BrokerError),
    FailedToSubscribe(BrokerError),
    /// A send worker hit a broker error; the job fails fast.
    SendFailed(BrokerError),
    /// The payload cannot fit even in an empty batch.
    MessageExceedsBatchLimit {
        payload_bytes: usize,
        max_batch_bytes: usize,
    },
    /// The caller-supplied run timeout elapsed before the target was reached.
    TimedOut { after: Duration },
    WorkerPanicked,
}

impl Display for DriverError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverError::InvalidJob(reason) => write!(f, "invalid job: {reason}"),
            DriverError::FailedToCreateSender(err) => {
                write!(f, "failed to create sender: {err}")
            }
            DriverError::FailedToCreateReceiver(err) => {
                write!(f, "failed to create receiver: {err}")
            }
            DriverError::FailedToSubscribe(err) => {
                write!(f, "failed to subscribe receiver: {err}")
            }
            DriverError::SendFailed(err) => write!(f, "send failed: {err}"),
            DriverError::MessageExceedsBatchLimit {
                payload_bytes,
                max_batch_bytes,
            } => write!(
                f,
                "message of {payload_bytes} bytes cannot fit a {max_batch_bytes}-byte batch"
            ),
            DriverError::TimedOut { after } => {
                write!(f, "job did not reach its target within {after:?}")
            }
            DriverError::WorkerPanicked => write!(f, "a worker task panicked"),
        }
    }
}

impl Error for DriverError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DriverError::FailedToCreateSender(err)
            | DriverError::FailedToCreateReceiver(err)
            | DriverError::FailedToSubscribe(err)
            | DriverError::SendFailed(err) => Some(err),
            _ => None,
        }
    }
}
