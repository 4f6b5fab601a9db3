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

//! Fan-out of independent delete-on-receive subscriptions against one queue.

use crate::client::{
    BrokerError, QueueClient, QueueReceiver, ReceiveHandler, ReceiveMode, ReceiverOptions,
};
use crate::counters::JobCounters;
use crate::driver::{DriverError, RunReport};
use crate::job::ReceiveJob;
use crate::message::Message;
use crate::observability::{events, fields};
use crate::policy::{ErrorAction, ErrorPolicy};
use crate::sampler::ThroughputSampler;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const COMPONENT: &str = "receive_driver";

/// Drives one receive job: `receiver_count` independent subscription handles,
/// each invoking the counting handler on up to `max_concurrent_calls`
/// messages concurrently, gated on a sampler watching the shared `received`
/// counter.
///
/// A handler that observes the counter reach the target closes its own
/// receiver only; sibling receivers are not signaled mid-run and keep running
/// until they observe the target themselves or the run returns and cleans up.
pub struct ReceiveDriver {
    client: Arc<dyn QueueClient>,
    policy: ErrorPolicy,
}

impl ReceiveDriver {
    pub fn new(client: Arc<dyn QueueClient>) -> Self {
        Self {
            client,
            policy: ErrorPolicy::default(),
        }
    }

    pub fn with_policy(client: Arc<dyn QueueClient>, policy: ErrorPolicy) -> Self {
        Self { client, policy }
    }

    pub async fn run(&self, job: ReceiveJob) -> Result<RunReport, DriverError> {
        validate(&job)?;
        self.drive(&job).await
    }

    async fn drive(&self, job: &ReceiveJob) -> Result<RunReport, DriverError> {
        let job_id = Uuid::new_v4().to_string();
        let counters = Arc::new(JobCounters::new());

        // broker-side session FIFO must not be broken by local dispatch
        let concurrency = if job.session_id.is_some() {
            1
        } else {
            job.max_concurrent_calls
        };

        info!(
            event = events::RECEIVE_JOB_START,
            component = COMPONENT,
            job_id = job_id.as_str(),
            queue = job.queue.as_str(),
            target = job.total_target,
            receivers = job.receiver_count,
            max_concurrent_calls = concurrency,
            session_id = fields::format_session_id(job.session_id.as_deref()),
            "starting receive job"
        );

        let mut receivers: Vec<Arc<dyn QueueReceiver>> = Vec::with_capacity(job.receiver_count);
        for index in 0..job.receiver_count {
            let options = ReceiverOptions {
                mode: ReceiveMode::DeleteOnReceive,
                session_id: job.session_id.clone(),
            };
            // a failure partway through setup must not leave earlier
            // subscriptions pumping
            let receiver = match self.client.create_receiver(&job.queue, options).await {
                Ok(receiver) => receiver,
                Err(err) => {
                    close_receivers(&job_id, &receivers).await;
                    return Err(DriverError::FailedToCreateReceiver(err));
                }
            };
            receivers.push(receiver.clone());

            let handler = Arc::new(CountingHandler {
                label: format!("{job_id}/receiver-{index}"),
                receiver: receiver.clone(),
                counters: counters.clone(),
                target: job.total_target,
                policy: self.policy.clone(),
                retry_attempts: AtomicU32::new(0),
            });
            if let Err(err) = receiver.subscribe(handler, concurrency).await {
                close_receivers(&job_id, &receivers).await;
                return Err(DriverError::FailedToSubscribe(err));
            }
        }

        // the sampler is the completion gate; keep the release sender alive
        // so only a timeout or the target ends the run
        let (release_tx, release_rx) = watch::channel(false);
        let sampler_counters = counters.clone();
        let sampler = ThroughputSampler::new();
        let gate = sampler.run(
            move || sampler_counters.received(),
            job.total_target,
            release_rx,
        );

        let rates = match job.run_timeout {
            Some(limit) => match tokio::time::timeout(limit, gate).await {
                Ok(rates) => rates,
                Err(_) => {
                    warn!(
                        event = events::RECEIVE_JOB_FAILED,
                        component = COMPONENT,
                        job_id = job_id.as_str(),
                        total = counters.received(),
                        target = job.total_target,
                        "target not reached before timeout"
                    );
                    close_receivers(&job_id, &receivers).await;
                    return Err(DriverError::TimedOut { after: limit });
                }
            },
            None => gate.await,
        };
        drop(release_tx);

        // receivers that never observed the target themselves are still open
        close_receivers(&job_id, &receivers).await;

        let report = RunReport {
            delivered: counters.received(),
            elapsed: rates.elapsed,
            average_mps: rates.average_mps,
            peak_mps: rates.peak_mps,
            unclassified_errors: counters.unclassified_errors(),
        };

        info!(
            event = events::RECEIVE_JOB_OK,
            component = COMPONENT,
            job_id = job_id.as_str(),
            total = report.delivered,
            avg_mps = fields::round_mps(report.average_mps),
            max_mps = fields::round_mps(report.peak_mps),
            unclassified_errors = report.unclassified_errors,
            "receive job complete"
        );

        Ok(report)
    }
}

/// Closes every receiver in `receivers`, logging failures without failing.
/// `close` is idempotent, so receivers that already self-closed are fine.
async fn close_receivers(job_id: &str, receivers: &[Arc<dyn QueueReceiver>]) {
    for receiver in receivers {
        if let Err(err) = receiver.close().await {
            debug!(
                event = events::RECEIVER_CLOSE_FAILED,
                component = COMPONENT,
                job_id,
                err = %err,
                "failed to close receiver during cleanup"
            );
        }
    }
}

fn validate(job: &ReceiveJob) -> Result<(), DriverError> {
    if job.total_target == 0 {
        return Err(DriverError::InvalidJob("total_target must be > 0".into()));
    }
    if job.receiver_count == 0 {
        return Err(DriverError::InvalidJob("receiver_count must be > 0".into()));
    }
    if job.max_concurrent_calls == 0 {
        return Err(DriverError::InvalidJob(
            "max_concurrent_calls must be > 0".into(),
        ));
    }
    Ok(())
}

/// Subscription callback pair for one receiver: counts deliveries toward the
/// shared target and triages broker errors through the policy.
struct CountingHandler {
    label: String,
    receiver: Arc<dyn QueueReceiver>,
    counters: Arc<JobCounters>,
    target: u64,
    policy: ErrorPolicy,
    retry_attempts: AtomicU32,
}

#[async_trait]
impl ReceiveHandler for CountingHandler {
    async fn on_message(&self, _message: Message) {
        let received = self.counters.add_received();
        if received == self.target {
            // exactly one handler observes the crossing; it stops only its
            // own receiver
            info!(
                event = events::RECEIVER_TARGET_REACHED,
                component = COMPONENT,
                receiver = self.label.as_str(),
                total = received,
                "target reached; closing this receiver"
            );
            if let Err(err) = self.receiver.close().await {
                debug!(
                    event = events::RECEIVER_CLOSE_FAILED,
                    component = COMPONENT,
                    receiver = self.label.as_str(),
                    err = %err,
                    "failed to close receiver at target"
                );
            }
        }
    }

    async fn on_error(&self, broker_error: BrokerError) {
        match self.policy.classify(&broker_error) {
            ErrorAction::Abort => {
                error!(
                    event = events::RECEIVER_ABORTED,
                    component = COMPONENT,
                    receiver = self.label.as_str(),
                    err = %broker_error,
                    "unrecoverable error; stopping this receiver"
                );
                let _ = self.receiver.close().await;
            }
            ErrorAction::Ignore => {
                info!(
                    event = events::RECEIVER_ERROR_IGNORED,
                    component = COMPONENT,
                    receiver = self.label.as_str(),
                    err = %broker_error,
                    "broker will redeliver; no local action"
                );
            }
            ErrorAction::Retry { delay } => {
                let attempt = self.retry_attempts.fetch_add(1, Ordering::Relaxed) + 1;
                if attempt > self.policy.max_retry_attempts() {
                    warn!(
                        event = events::RECEIVER_RETRY_EXHAUSTED,
                        component = COMPONENT,
                        receiver = self.label.as_str(),
                        attempt,
                        err = %broker_error,
                        "retry budget exhausted; stopping this receiver"
                    );
                    let _ = self.receiver.close().await;
                } else {
                    debug!(
                        event = events::RECEIVER_RETRY_BACKOFF,
                        component = COMPONENT,
                        receiver = self.label.as_str(),
                        attempt,
                        err = %broker_error,
                        "backing off before the pump proceeds"
                    );
                    // the pump awaits this callback, so the sleep delays the
                    // next delivery attempt
                    tokio::time::sleep(delay).await;
                }
            }
            ErrorAction::Unclassified => {
                let total = self.counters.add_unclassified_error();
                warn!(
                    event = events::RECEIVER_ERROR_UNCLASSIFIED,
                    component = COMPONENT,
                    receiver = self.label.as_str(),
                    total,
                    err = %broker_error,
                    "no classification for broker error"
                );
            }
        }
    }
}
