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

//! Collaborator seam for the message-queue service client.
//!
//! The harness never talks a broker protocol itself; it drives whatever
//! implementation of these traits it is handed. Connection management, wire
//! format, message locking, and session assignment all live behind this seam.

use crate::message::{Message, MessageBatch};
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Classifiable error code reported by the broker client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerErrorCode {
    EntityDisabled,
    EntityNotFound,
    UnauthorizedAccess,
    MessageLockLost,
    ServiceBusy,
    /// A code the harness has no mapping for. Carried verbatim so it can be
    /// logged and counted instead of dropped.
    Other(String),
}

impl Display for BrokerErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BrokerErrorCode::EntityDisabled => write!(f, "entity_disabled"),
            BrokerErrorCode::EntityNotFound => write!(f, "entity_not_found"),
            BrokerErrorCode::UnauthorizedAccess => write!(f, "unauthorized_access"),
            BrokerErrorCode::MessageLockLost => write!(f, "message_lock_lost"),
            BrokerErrorCode::ServiceBusy => write!(f, "service_busy"),
            BrokerErrorCode::Other(code) => write!(f, "other({code})"),
        }
    }
}

/// Where in the client a broker error surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSource {
    /// Accepting the queue or building a sender/receiver handle.
    Accept,
    /// The delivery pump or a message-handling callback.
    Receive,
    /// Session acquisition or a session-scoped operation.
    Session,
}

impl Display for ErrorSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSource::Accept => write!(f, "accept"),
            ErrorSource::Receive => write!(f, "receive"),
            ErrorSource::Session => write!(f, "session"),
        }
    }
}

/// An error reported by the broker client, exposing a classifiable code and
/// the operation it arose from.
#[derive(Debug, Clone)]
pub struct BrokerError {
    pub code: BrokerErrorCode,
    pub source: ErrorSource,
    pub detail: String,
}

impl BrokerError {
    pub fn new(code: BrokerErrorCode, source: ErrorSource, detail: impl Into<String>) -> Self {
        Self {
            code,
            source,
            detail: detail.into(),
        }
    }
}

impl Display for BrokerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "broker error from {}: {} ({})",
            self.source, self.code, self.detail
        )
    }
}

impl Error for BrokerError {}

/// Receive mode requested from the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiveMode {
    /// The broker removes a message as soon as it is delivered; there is no
    /// acknowledgment step.
    #[default]
    DeleteOnReceive,
}

/// Options for building a receiver handle.
#[derive(Debug, Clone, Default)]
pub struct ReceiverOptions {
    pub mode: ReceiveMode,
    /// When set, the receiver is scoped to one broker session and delivery is
    /// FIFO within that session.
    pub session_id: Option<String>,
}

/// Entry point to the queue service: builds senders and receivers bound to a
/// named queue. Passed into job execution explicitly, never held as a
/// process-wide singleton.
#[async_trait]
pub trait QueueClient: Send + Sync {
    async fn create_sender(&self, queue: &str) -> Result<Arc<dyn QueueSender>, BrokerError>;

    async fn create_receiver(
        &self,
        queue: &str,
        options: ReceiverOptions,
    ) -> Result<Arc<dyn QueueReceiver>, BrokerError>;
}

/// Send primitive bound to one queue.
#[async_trait]
pub trait QueueSender: Send + Sync {
    async fn send(&self, message: Message) -> Result<(), BrokerError>;

    /// Dispatches a locally packed batch as a single send operation.
    async fn send_batch(&self, batch: MessageBatch) -> Result<(), BrokerError>;

    async fn close(&self) -> Result<(), BrokerError>;
}

/// Subscription handle. `close` must be idempotent: a handler may close its
/// own receiver from inside a callback while the driver later closes it again
/// during cleanup.
#[async_trait]
pub trait QueueReceiver: Send + Sync {
    /// Starts delivering messages to `handler`, invoking it on up to
    /// `max_concurrent_calls` messages concurrently. Errors raised by the
    /// pump are routed to `handler.on_error`, which is awaited before
    /// delivery proceeds.
    async fn subscribe(
        &self,
        handler: Arc<dyn ReceiveHandler>,
        max_concurrent_calls: usize,
    ) -> Result<(), BrokerError>;

    async fn close(&self) -> Result<(), BrokerError>;
}

/// Callback pair a subscription drives. The receive-side analog of the send
/// primitives above; implemented inside the harness by the counting handler.
#[async_trait]
pub trait ReceiveHandler: Send + Sync {
    async fn on_message(&self, message: Message);

    async fn on_error(&self, error: BrokerError);
}
