//! Session-constrained specialization of the send and receive drivers.

use crate::client::QueueClient;
use crate::driver::{DriverError, ReceiveDriver, RunReport, SendDriver};
use crate::job::{ReceiveJob, SendJob};
use crate::observability::events;
use crate::policy::ErrorPolicy;
use std::sync::Arc;
use tracing::info;

const COMPONENT: &str = "session_driver";

/// Constrains a job to a single caller-supplied session identifier on a
/// session-capable queue.
///
/// Send path: every message carries the same session id and a single worker
/// suffices, since session affinity removes any concurrency benefit. Receive
/// path: one session-scoped receiver with sequential dispatch, preserving the
/// broker's in-order delivery within the session end to end.
pub struct SessionDriver {
    client: Arc<dyn QueueClient>,
    policy: ErrorPolicy,
}

impl SessionDriver {
    pub fn new(client: Arc<dyn QueueClient>) -> Self {
        Self {
            client,
            policy: ErrorPolicy::default(),
        }
    }

    pub fn with_policy(client: Arc<dyn QueueClient>, policy: ErrorPolicy) -> Self {
        Self { client, policy }
    }

    pub async fn send(
        &self,
        job: SendJob,
        session_id: impl Into<String>,
    ) -> Result<RunReport, DriverError> {
        let session_id = session_id.into();
        if job.max_inflight_workers > 1 {
            info!(
                event = events::SESSION_CONCURRENCY_COLLAPSED,
                component = COMPONENT,
                session_id = session_id.as_str(),
                requested = job.max_inflight_workers,
                "session affinity removes send concurrency; using one worker"
            );
        }

        let job = SendJob {
            max_inflight_workers: 1,
            session_id: Some(session_id),
            ..job
        };
        SendDriver::new(self.client.clone()).run(job).await
    }

    pub async fn receive(
        &self,
        job: ReceiveJob,
        session_id: impl Into<String>,
    ) -> Result<RunReport, DriverError> {
        let session_id = session_id.into();
        if job.receiver_count > 1 || job.max_concurrent_calls > 1 {
            info!(
                event = events::SESSION_CONCURRENCY_COLLAPSED,
                component = COMPONENT,
                session_id = session_id.as_str(),
                requested_receivers = job.receiver_count,
                requested_calls = job.max_concurrent_calls,
                "one session delivers to one receiver, one message at a time"
            );
        }

        let job = ReceiveJob {
            receiver_count: 1,
            max_concurrent_calls: 1,
            session_id: Some(session_id),
            ..job
        };
        ReceiveDriver::with_policy(self.client.clone(), self.policy.clone())
            .run(job)
            .await
    }
}
