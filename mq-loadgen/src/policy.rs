//! Broker-error triage: maps classifiable codes onto receiver actions.

use crate::client::{BrokerError, BrokerErrorCode};
use std::time::Duration;

const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 5;

/// What a receiver does with a broker-reported error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Back off for `delay` before the pump proceeds. Throttling is expected
    /// to clear on its own.
    Retry { delay: Duration },
    /// Log only; the broker redelivers, no local state changes.
    Ignore,
    /// Unrecoverable configuration error. Stop the affected subscription;
    /// sibling receivers keep running.
    Abort,
    /// No mapping for this code. Logged and counted, never dropped.
    Unclassified,
}

/// Classification policy consumed by receive workers.
#[derive(Debug, Clone)]
pub struct ErrorPolicy {
    retry_delay: Duration,
    max_retry_attempts: u32,
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        Self {
            retry_delay: DEFAULT_RETRY_DELAY,
            max_retry_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
        }
    }
}

impl ErrorPolicy {
    pub fn new(retry_delay: Duration, max_retry_attempts: u32) -> Self {
        Self {
            retry_delay,
            max_retry_attempts,
        }
    }

    pub fn classify(&self, error: &BrokerError) -> ErrorAction {
        match &error.code {
            BrokerErrorCode::EntityDisabled
            | BrokerErrorCode::EntityNotFound
            | BrokerErrorCode::UnauthorizedAccess => ErrorAction::Abort,
            BrokerErrorCode::MessageLockLost => ErrorAction::Ignore,
            BrokerErrorCode::ServiceBusy => ErrorAction::Retry {
                delay: self.retry_delay,
            },
            BrokerErrorCode::Other(_) => ErrorAction::Unclassified,
        }
    }

    /// Retry attempts a single receiver may spend before the policy
    /// escalates to [`ErrorAction::Abort`]. Bounds the otherwise-unreviewed
    /// infinite retry loop.
    pub fn max_retry_attempts(&self) -> u32 {
        self.max_retry_attempts
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }
}
