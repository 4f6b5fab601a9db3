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

//! An in-process [`QueueClient`] implementation used by integration tests and
//! the demo binary.
//!
//! [`MemoryBroker`] keeps each queue as an in-memory FIFO and honors the same
//! delivery contract a real broker client would: delete-on-receive semantics,
//! bounded concurrent handler invocation per subscription, session-filtered
//! FIFO delivery, and idempotent `close`. On top of that it records what the
//! harness did to it (per-queue delivery order, per-receiver delivery counts,
//! dispatched batch sizes) and can inject scripted broker errors at a chosen
//! delivery attempt of a chosen receiver, so tests can exercise the error
//! policy deterministically.

use async_trait::async_trait;
use mq_loadgen::{
    BrokerError, BrokerErrorCode, ErrorSource, Message, MessageBatch, QueueClient, QueueReceiver,
    QueueSender, ReceiveHandler, ReceiverOptions,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{watch, Notify, Semaphore};
use tracing::debug;

const COMPONENT: &str = "memory_broker";

/// A broker error scripted to fire when a specific receiver reaches a
/// specific delivery attempt. Single-shot; claimed on first match.
struct ScriptedFault {
    receiver_index: usize,
    at_attempt: u64,
    code: BrokerErrorCode,
}

struct QueueState {
    messages: Mutex<VecDeque<Message>>,
    /// Wakes delivery pumps parked on an empty (or session-filtered-empty)
    /// queue. Pumps register interest before re-checking the queue.
    available: Notify,
    delivery_log: Mutex<Vec<Message>>,
    batch_log: Mutex<Vec<usize>>,
    delivered_per_receiver: Mutex<Vec<u64>>,
    receiver_seq: AtomicUsize,
    faults: Mutex<Vec<ScriptedFault>>,
}

impl QueueState {
    fn new() -> Self {
        Self {
            messages: Mutex::new(VecDeque::new()),
            available: Notify::new(),
            delivery_log: Mutex::new(Vec::new()),
            batch_log: Mutex::new(Vec::new()),
            delivered_per_receiver: Mutex::new(Vec::new()),
            receiver_seq: AtomicUsize::new(0),
            faults: Mutex::new(Vec::new()),
        }
    }

    /// Pops the next deliverable message: front of the queue, or the first
    /// message belonging to `session` when the receiver is session-scoped.
    fn pop_matching(&self, session: Option<&str>) -> Option<Message> {
        let mut messages = self.messages.lock().unwrap();
        match session {
            None => messages.pop_front(),
            Some(id) => {
                let position = messages.iter().position(|m| m.session_id() == Some(id))?;
                messages.remove(position)
            }
        }
    }

    fn claim_fault(&self, receiver_index: usize, attempt: u64) -> Option<BrokerErrorCode> {
        let mut faults = self.faults.lock().unwrap();
        let position = faults
            .iter()
            .position(|f| f.receiver_index == receiver_index && f.at_attempt == attempt)?;
        Some(faults.remove(position).code)
    }
}

/// In-memory queue service with recording and fault injection.
///
/// Cloneable handle; clones share the same queues.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    queues: Arc<Mutex<HashMap<String, Arc<QueueState>>>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue_state(&self, queue: &str) -> Arc<QueueState> {
        let mut queues = self.queues.lock().unwrap();
        Arc::clone(
            queues
                .entry(queue.to_string())
                .or_insert_with(|| Arc::new(QueueState::new())),
        )
    }

    /// Scripts a broker error for the `receiver_index`-th receiver created on
    /// `queue` (creation order, zero-based), firing on its `at_attempt`-th
    /// delivery attempt (one-based). The message that triggered the attempt
    /// is requeued at the front, so a receiver that survives the error sees
    /// it again. Each call scripts one firing.
    pub fn inject_fault(
        &self,
        queue: &str,
        receiver_index: usize,
        at_attempt: u64,
        code: BrokerErrorCode,
    ) {
        self.queue_state(queue).faults.lock().unwrap().push(ScriptedFault {
            receiver_index,
            at_attempt,
            code,
        });
    }

    /// Messages delivered on `queue`, in delivery order across all receivers.
    pub fn delivery_log(&self, queue: &str) -> Vec<Message> {
        self.queue_state(queue).delivery_log.lock().unwrap().clone()
    }

    /// Batch sizes dispatched to `queue` via `send_batch`, in dispatch order.
    pub fn batch_log(&self, queue: &str) -> Vec<usize> {
        self.queue_state(queue).batch_log.lock().unwrap().clone()
    }

    /// Delivery counts indexed by receiver creation order.
    pub fn delivered_by_receiver(&self, queue: &str) -> Vec<u64> {
        self.queue_state(queue)
            .delivered_per_receiver
            .lock()
            .unwrap()
            .clone()
    }

    /// Messages still queued (sent but not yet delivered).
    pub fn queued(&self, queue: &str) -> usize {
        self.queue_state(queue).messages.lock().unwrap().len()
    }
}

#[async_trait]
impl QueueClient for MemoryBroker {
    async fn create_sender(&self, queue: &str) -> Result<Arc<dyn QueueSender>, BrokerError> {
        Ok(Arc::new(MemorySender {
            state: self.queue_state(queue),
            closed: AtomicBool::new(false),
        }))
    }

    async fn create_receiver(
        &self,
        queue: &str,
        options: ReceiverOptions,
    ) -> Result<Arc<dyn QueueReceiver>, BrokerError> {
        let state = self.queue_state(queue);
        let index = state.receiver_seq.fetch_add(1, Ordering::SeqCst);
        {
            let mut counts = state.delivered_per_receiver.lock().unwrap();
            if counts.len() <= index {
                counts.resize(index + 1, 0);
            }
        }
        let (close_tx, _) = watch::channel(false);
        Ok(Arc::new(MemoryReceiver {
            state,
            index,
            session_id: options.session_id,
            close_tx,
            subscribed: AtomicBool::new(false),
        }))
    }
}

struct MemorySender {
    state: Arc<QueueState>,
    closed: AtomicBool,
}

impl MemorySender {
    fn ensure_open(&self) -> Result<(), BrokerError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BrokerError::new(
                BrokerErrorCode::Other("SenderClosed".to_string()),
                ErrorSource::Accept,
                "send on a closed sender",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl QueueSender for MemorySender {
    async fn send(&self, message: Message) -> Result<(), BrokerError> {
        self.ensure_open()?;
        self.state.messages.lock().unwrap().push_back(message);
        self.state.available.notify_waiters();
        Ok(())
    }

    async fn send_batch(&self, batch: MessageBatch) -> Result<(), BrokerError> {
        self.ensure_open()?;
        let messages = batch.into_messages();
        self.state.batch_log.lock().unwrap().push(messages.len());
        {
            let mut queued = self.state.messages.lock().unwrap();
            queued.extend(messages);
        }
        self.state.available.notify_waiters();
        Ok(())
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct MemoryReceiver {
    state: Arc<QueueState>,
    index: usize,
    session_id: Option<String>,
    close_tx: watch::Sender<bool>,
    subscribed: AtomicBool,
}

#[async_trait]
impl QueueReceiver for MemoryReceiver {
    async fn subscribe(
        &self,
        handler: Arc<dyn ReceiveHandler>,
        max_concurrent_calls: usize,
    ) -> Result<(), BrokerError> {
        if self.subscribed.swap(true, Ordering::SeqCst) {
            return Err(BrokerError::new(
                BrokerErrorCode::Other("AlreadySubscribed".to_string()),
                ErrorSource::Receive,
                "receiver already has an active subscription",
            ));
        }

        let state = Arc::clone(&self.state);
        let session_id = self.session_id.clone();
        let index = self.index;
        let close_rx = self.close_tx.subscribe();
        tokio::spawn(pump(
            state,
            index,
            session_id,
            handler,
            max_concurrent_calls,
            close_rx,
        ));
        Ok(())
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.close_tx.send_replace(true);
        Ok(())
    }
}

/// Delivery pump for one subscription. Pops messages one at a time, holding a
/// concurrency permit across each handler invocation, and stops as soon as
/// the receiver's close signal fires.
async fn pump(
    state: Arc<QueueState>,
    index: usize,
    session_id: Option<String>,
    handler: Arc<dyn ReceiveHandler>,
    max_concurrent_calls: usize,
    mut close_rx: watch::Receiver<bool>,
) {
    let semaphore = Arc::new(Semaphore::new(max_concurrent_calls.max(1)));
    let mut attempt: u64 = 0;

    loop {
        if *close_rx.borrow() {
            break;
        }

        let permit = tokio::select! {
            biased;
            changed = close_rx.changed() => {
                if changed.is_err() || *close_rx.borrow() {
                    break;
                }
                continue;
            }
            permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let message = loop {
            if let Some(message) = state.pop_matching(session_id.as_deref()) {
                break message;
            }
            // Register interest before re-checking so a send that lands
            // between the check and the await still wakes us.
            let notified = state.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if let Some(message) = state.pop_matching(session_id.as_deref()) {
                break message;
            }
            tokio::select! {
                biased;
                changed = close_rx.changed() => {
                    if changed.is_err() || *close_rx.borrow() {
                        return;
                    }
                }
                _ = notified => {}
            }
        };

        attempt += 1;
        if let Some(code) = state.claim_fault(index, attempt) {
            debug!(
                component = COMPONENT,
                receiver_index = index,
                attempt,
                code = %code,
                "firing scripted fault, requeueing message"
            );
            {
                let mut queued = state.messages.lock().unwrap();
                queued.push_front(message);
            }
            state.available.notify_waiters();
            // The pump stalls on the handler here, so a retry delay inside
            // on_error holds up subsequent deliveries to this receiver.
            handler
                .on_error(BrokerError::new(
                    code,
                    ErrorSource::Receive,
                    "scripted broker fault",
                ))
                .await;
            drop(permit);
            continue;
        }

        state.delivery_log.lock().unwrap().push(message.clone());
        state.delivered_per_receiver.lock().unwrap()[index] += 1;

        let task_handler = Arc::clone(&handler);
        tokio::spawn(async move {
            task_handler.on_message(message).await;
            drop(permit);
        });
    }
}
