/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Bounded fan-out of concurrent send workers against one queue.

use crate::client::{QueueClient, QueueSender};
use crate::counters::JobCounters;
use crate::driver::{DriverError, RunReport};
use crate::job::{BatchMode, SendJob};
use crate::message::{Message, MessageBatch};
use crate::observability::{events, fields};
use crate::sampler::ThroughputSampler;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

const COMPONENT: &str = "send_driver";

/// Drives one send job: `max_inflight_workers` concurrent workers share a
/// single sender bound to the job's queue, racing a per-job `sent` counter
/// toward the target while a sampler task reports throughput.
///
/// The counter check and the post-send increment are deliberately not one
/// atomic gate: workers may observe the same stale count and each send one
/// extra unit before re-checking, so the final count lands in
/// `target ..= target + workers - 1`. Send failures are not retried; the
/// first broker error fails the job fast.
pub struct SendDriver {
    client: Arc<dyn QueueClient>,
}

impl SendDriver {
    pub fn new(client: Arc<dyn QueueClient>) -> Self {
        Self { client }
    }

    pub async fn run(&self, job: SendJob) -> Result<RunReport, DriverError> {
        validate(&job)?;
        self.drive(&job).await
    }

    async fn drive(&self, job: &SendJob) -> Result<RunReport, DriverError> {
        let job_id = Uuid::new_v4().to_string();
        let counters = Arc::new(JobCounters::new());

        info!(
            event = events::SEND_JOB_START,
            component = COMPONENT,
            job_id = job_id.as_str(),
            queue = job.queue.as_str(),
            target = job.total_target,
            workers = job.max_inflight_workers,
            session_id = fields::format_session_id(job.session_id.as_deref()),
            "starting send job"
        );

        let sender = self
            .client
            .create_sender(&job.queue)
            .await
            .map_err(DriverError::FailedToCreateSender)?;

        let template = match &job.session_id {
            Some(session_id) => Message::with_session(job.payload.clone(), session_id.clone()),
            None => Message::new(job.payload.clone()),
        };

        let (release_tx, release_rx) = watch::channel(false);
        let sampler_counters = counters.clone();
        let target = job.total_target;
        let sampler = tokio::spawn(async move {
            ThroughputSampler::new()
                .run(move || sampler_counters.sent(), target, release_rx)
                .await
        });

        let mut workers = JoinSet::new();
        for _ in 0..job.max_inflight_workers {
            let sender = sender.clone();
            let counters = counters.clone();
            let template = template.clone();
            let batch_mode = job.batch;
            workers.spawn(async move {
                send_worker(sender, counters, template, batch_mode, target).await
            });
        }

        let first_error = match job.run_timeout {
            Some(limit) => match tokio::time::timeout(limit, drain_workers(&mut workers)).await {
                Ok(first_error) => first_error,
                Err(_) => {
                    // stalled workers are abandoned; the sender is still
                    // closed below
                    workers.abort_all();
                    while workers.join_next().await.is_some() {}
                    Some(DriverError::TimedOut { after: limit })
                }
            },
            None => drain_workers(&mut workers).await,
        };

        // workers are done either way; release the sampler and collect rates
        let _ = release_tx.send(true);
        let rates = sampler.await.map_err(|_| DriverError::WorkerPanicked)?;

        if let Err(err) = sender.close().await {
            warn!(
                event = events::SENDER_CLOSE_FAILED,
                component = COMPONENT,
                job_id = job_id.as_str(),
                err = %err,
                "failed to close sender"
            );
        }

        if let Some(err) = first_error {
            error!(
                event = events::SEND_JOB_FAILED,
                component = COMPONENT,
                job_id = job_id.as_str(),
                total = counters.sent(),
                err = %err,
                "send job failed"
            );
            return Err(err);
        }

        let report = RunReport {
            delivered: counters.sent(),
            elapsed: rates.elapsed,
            average_mps: rates.average_mps,
            peak_mps: rates.peak_mps,
            unclassified_errors: counters.unclassified_errors(),
        };

        info!(
            event = events::SEND_JOB_OK,
            component = COMPONENT,
            job_id = job_id.as_str(),
            total = report.delivered,
            avg_mps = fields::round_mps(report.average_mps),
            max_mps = fields::round_mps(report.peak_mps),
            "send job complete"
        );

        Ok(report)
    }
}

/// Awaits every worker, keeping the first failure.
async fn drain_workers(
    workers: &mut JoinSet<Result<(), DriverError>>,
) -> Option<DriverError> {
    let mut first_error = None;
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
            Err(_) => {
                if first_error.is_none() {
                    first_error = Some(DriverError::WorkerPanicked);
                }
            }
        }
    }
    first_error
}

fn validate(job: &SendJob) -> Result<(), DriverError> {
    if job.total_target == 0 {
        return Err(DriverError::InvalidJob("total_target must be > 0".into()));
    }
    if job.max_inflight_workers == 0 {
        return Err(DriverError::InvalidJob(
            "max_inflight_workers must be > 0".into(),
        ));
    }
    Ok(())
}

/// One inflight worker: loop until the shared counter reaches the target,
/// sending either single messages or size-bounded batches.
async fn send_worker(
    sender: Arc<dyn QueueSender>,
    counters: Arc<JobCounters>,
    template: Message,
    batch_mode: BatchMode,
    target: u64,
) -> Result<(), DriverError> {
    while counters.sent() < target {
        match batch_mode {
            BatchMode::Single => {
                sender
                    .send(template.clone())
                    .await
                    .map_err(DriverError::SendFailed)?;
                counters.add_sent(1);
            }
            BatchMode::Batched { max_batch_bytes } => {
                let Some(batch) = pack_batch(&counters, target, &template, max_batch_bytes)?
                else {
                    break;
                };

                let count = batch.count() as u64;
                tracing::debug!(
                    event = events::SEND_BATCH_DISPATCH,
                    component = COMPONENT,
                    count,
                    bytes = batch.encoded_len(),
                    "dispatching batch"
                );
                sender
                    .send_batch(batch)
                    .await
                    .map_err(DriverError::SendFailed)?;
                counters.add_sent(count);
            }
        }
    }

    Ok(())
}

/// Assembles the next batch for a worker: pack copies of `template` while
/// the batch stays within its byte limit and the remaining target.
///
/// `Ok(None)` means sibling workers covered the target between the worker's
/// loop check and this one; the worker is done, not in error. A payload that
/// an empty batch rejects can never be dispatched and fails the job.
fn pack_batch(
    counters: &JobCounters,
    target: u64,
    template: &Message,
    max_batch_bytes: usize,
) -> Result<Option<MessageBatch>, DriverError> {
    let mut batch = MessageBatch::new(max_batch_bytes);
    while counters.sent() + (batch.count() as u64) < target {
        if !batch.try_add(template.clone()) {
            if batch.is_empty() {
                return Err(DriverError::MessageExceedsBatchLimit {
                    payload_bytes: template.encoded_len(),
                    max_batch_bytes,
                });
            }
            break;
        }
    }

    if batch.is_empty() {
        return Ok(None);
    }
    Ok(Some(batch))
}

#[cfg(test)]
mod tests {
    use super::{pack_batch, SendDriver};
    use crate::client::{
        BrokerError, BrokerErrorCode, ErrorSource, QueueClient, QueueReceiver, QueueSender,
        ReceiverOptions,
    };
    use crate::counters::JobCounters;
    use crate::driver::DriverError;
    use crate::job::SendJob;
    use crate::message::{Message, MessageBatch};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingSender {
        sends: AtomicU64,
        batch_log: Mutex<Vec<(usize, usize)>>,
        fail_after: Option<u64>,
    }

    impl CountingSender {
        fn failing_after(sends: u64) -> Self {
            Self {
                fail_after: Some(sends),
                ..Default::default()
            }
        }

        fn sends(&self) -> u64 {
            self.sends.load(Ordering::Relaxed)
        }
    }

    #[async_trait]
    impl QueueSender for CountingSender {
        async fn send(&self, _message: Message) -> Result<(), BrokerError> {
            let done = self.sends.fetch_add(1, Ordering::Relaxed);
            if let Some(limit) = self.fail_after {
                if done >= limit {
                    return Err(BrokerError::new(
                        BrokerErrorCode::ServiceBusy,
                        ErrorSource::Accept,
                        "sender rejected",
                    ));
                }
            }
            Ok(())
        }

        async fn send_batch(&self, batch: MessageBatch) -> Result<(), BrokerError> {
            self.batch_log
                .lock()
                .expect("batch log lock")
                .push((batch.count(), batch.encoded_len()));
            self.sends.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        async fn close(&self) -> Result<(), BrokerError> {
            Ok(())
        }
    }

    struct SingleSenderClient {
        sender: Arc<CountingSender>,
    }

    #[async_trait]
    impl QueueClient for SingleSenderClient {
        async fn create_sender(&self, _queue: &str) -> Result<Arc<dyn QueueSender>, BrokerError> {
            Ok(self.sender.clone())
        }

        async fn create_receiver(
            &self,
            _queue: &str,
            _options: ReceiverOptions,
        ) -> Result<Arc<dyn QueueReceiver>, BrokerError> {
            Err(BrokerError::new(
                BrokerErrorCode::Other("unimplemented".into()),
                ErrorSource::Accept,
                "receivers are not used in send driver tests",
            ))
        }
    }

    fn driver_with(sender: Arc<CountingSender>) -> SendDriver {
        SendDriver::new(Arc::new(SingleSenderClient { sender }))
    }

    #[tokio::test(start_paused = true)]
    async fn unbatched_send_lands_within_the_overshoot_band() {
        let sender = Arc::new(CountingSender::default());
        let driver = driver_with(sender.clone());

        let report = driver
            .run(SendJob::new("q", 100, 4, vec![0u8; 8]))
            .await
            .expect("send job should succeed");

        assert!((100..=103).contains(&report.delivered));
        assert_eq!(report.delivered, sender.sends());
        assert_eq!(report.unclassified_errors, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn single_worker_sends_exactly_the_target() {
        let sender = Arc::new(CountingSender::default());
        let driver = driver_with(sender.clone());

        let report = driver
            .run(SendJob::new("q", 25, 1, vec![0u8; 8]))
            .await
            .expect("send job should succeed");

        assert_eq!(report.delivered, 25);
    }

    #[tokio::test(start_paused = true)]
    async fn batched_send_respects_byte_limit_and_remaining_target() {
        let sender = Arc::new(CountingSender::default());
        let driver = driver_with(sender.clone());

        // 8-byte payload, 32-byte batches: at most 4 messages per batch
        let report = driver
            .run(SendJob::new("q", 10, 1, vec![0u8; 8]).with_batching(32))
            .await
            .expect("send job should succeed");

        assert_eq!(report.delivered, 10);

        let log = sender.batch_log.lock().expect("batch log lock").clone();
        let mut dispatched = 0u64;
        for (count, bytes) in log {
            assert!(bytes <= 32);
            assert!(count as u64 <= 10 - dispatched);
            dispatched += count as u64;
        }
        assert_eq!(dispatched, 10);
    }

    #[test]
    fn empty_batch_from_a_covered_target_is_not_an_error() {
        // a sibling worker can push the counter to the target between the
        // worker's loop check and packing; that worker is simply done
        let counters = JobCounters::new();
        counters.add_sent(5);

        let packed = pack_batch(&counters, 5, &Message::new(vec![0u8; 8]), 32)
            .expect("a covered target must not be reported as a batch-limit error");

        assert!(packed.is_none());
    }

    #[test]
    fn pack_batch_stops_at_the_remaining_target() {
        let counters = JobCounters::new();
        counters.add_sent(3);

        let batch = pack_batch(&counters, 5, &Message::new(vec![0u8; 8]), 64)
            .expect("packing should succeed")
            .expect("two messages remain");

        assert_eq!(batch.count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_payload_fails_instead_of_spinning() {
        let driver = driver_with(Arc::new(CountingSender::default()));

        let err = driver
            .run(SendJob::new("q", 10, 1, vec![0u8; 64]).with_batching(32))
            .await
            .expect_err("payload larger than the batch limit should fail");

        assert!(matches!(
            err,
            DriverError::MessageExceedsBatchLimit {
                payload_bytes: 64,
                max_batch_bytes: 32
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn broker_send_error_fails_the_job_fast() {
        let sender = Arc::new(CountingSender::failing_after(10));
        let driver = driver_with(sender.clone());

        let err = driver
            .run(SendJob::new("q", 1000, 2, vec![0u8; 8]))
            .await
            .expect_err("job should fail once the sender rejects");

        assert!(matches!(err, DriverError::SendFailed(_)));
        assert!(sender.sends() < 1000);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_workers_is_rejected_up_front() {
        let driver = driver_with(Arc::new(CountingSender::default()));

        let err = driver
            .run(SendJob::new("q", 10, 0, vec![]))
            .await
            .expect_err("a job with no workers can never finish");

        assert!(matches!(err, DriverError::InvalidJob(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn session_jobs_stamp_every_message_with_the_session_id() {
        struct SessionAssertingSender {
            sends: AtomicU64,
        }

        #[async_trait]
        impl QueueSender for SessionAssertingSender {
            async fn send(&self, message: Message) -> Result<(), BrokerError> {
                assert_eq!(message.session_id(), Some("s1"));
                self.sends.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }

            async fn send_batch(&self, _batch: MessageBatch) -> Result<(), BrokerError> {
                unreachable!("session send test is unbatched");
            }

            async fn close(&self) -> Result<(), BrokerError> {
                Ok(())
            }
        }

        struct SessionClient {
            sender: Arc<SessionAssertingSender>,
        }

        #[async_trait]
        impl QueueClient for SessionClient {
            async fn create_sender(
                &self,
                _queue: &str,
            ) -> Result<Arc<dyn QueueSender>, BrokerError> {
                Ok(self.sender.clone())
            }

            async fn create_receiver(
                &self,
                _queue: &str,
                _options: ReceiverOptions,
            ) -> Result<Arc<dyn QueueReceiver>, BrokerError> {
                unreachable!("receivers are not used in send driver tests");
            }
        }

        let sender = Arc::new(SessionAssertingSender {
            sends: AtomicU64::new(0),
        });
        let driver = SendDriver::new(Arc::new(SessionClient {
            sender: sender.clone(),
        }));

        let report = driver
            .run(SendJob::new("q", 5, 1, b"hello".to_vec()).with_session("s1"))
            .await
            .expect("session send should succeed");

        assert_eq!(report.delivered, 5);
        assert_eq!(sender.sends.load(Ordering::Relaxed), 5);
    }
}
