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

//! # mq-loadgen
//!
//! `mq-loadgen` drives configurable numbers of concurrent producers and
//! consumers against a durable message-queue service and reports live
//! throughput while a run is in progress. The queue service itself sits
//! behind the [`QueueClient`] trait seam; the crate ships no broker protocol
//! and gives no delivery guarantees of its own.
//!
//! Typical usage is API-first and centered on the three drivers:
//! [`SendDriver`], [`ReceiveDriver`], and [`SessionDriver`]. Each run builds
//! its own [`JobCounters`] and throughput sampler, launches its worker set,
//! and awaits both before returning a [`RunReport`].
//!
//! ## Driving a send job
//!
//! ```
//! use std::sync::Arc;
//! use mq_loadgen::{QueueClient, SendDriver, SendJob};
//!
//! # pub mod mock_client {
//! #     use async_trait::async_trait;
//! #     use mq_loadgen::{
//! #         BrokerError, Message, MessageBatch, QueueClient, QueueReceiver, QueueSender,
//! #         ReceiverOptions,
//! #     };
//! #     use std::sync::Arc;
//! #
//! #     pub struct MockClient;
//! #     struct MockSender;
//! #
//! #     #[async_trait]
//! #     impl QueueSender for MockSender {
//! #         async fn send(&self, _message: Message) -> Result<(), BrokerError> {
//! #             Ok(())
//! #         }
//! #         async fn send_batch(&self, _batch: MessageBatch) -> Result<(), BrokerError> {
//! #             Ok(())
//! #         }
//! #         async fn close(&self) -> Result<(), BrokerError> {
//! #             Ok(())
//! #         }
//! #     }
//! #
//! #     #[async_trait]
//! #     impl QueueClient for MockClient {
//! #         async fn create_sender(
//! #             &self,
//! #             _queue: &str,
//! #         ) -> Result<Arc<dyn QueueSender>, BrokerError> {
//! #             Ok(Arc::new(MockSender))
//! #         }
//! #         async fn create_receiver(
//! #             &self,
//! #             _queue: &str,
//! #             _options: ReceiverOptions,
//! #         ) -> Result<Arc<dyn QueueReceiver>, BrokerError> {
//! #             unimplemented!("not needed for this doctest")
//! #         }
//! #     }
//! # }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let client: Arc<dyn QueueClient> = Arc::new(mock_client::MockClient);
//! let driver = SendDriver::new(client);
//!
//! let report = driver
//!     .run(SendJob::new("orders", 100, 4, vec![0u8; 64]))
//!     .await
//!     .unwrap();
//!
//! // check-then-act counting may overshoot by up to workers - 1
//! assert!((100..=103).contains(&report.delivered));
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - Collaborator seam: [`QueueClient`] / [`QueueSender`] / [`QueueReceiver`]
//! - Drivers: bounded send fan-out, receiver subscription management,
//!   session specialization
//! - Sampler: periodic counter snapshots into formatted rate lines
//! - Policy: broker-error triage into retry / ignore / abort actions
//!
//! ## Observability model
//!
//! The workspace uses `tracing` for logs/events. Library code emits
//! events/spans and does not unconditionally initialize a global subscriber.
//! Binaries and tests are responsible for one-time `tracing_subscriber`
//! initialization at process boundaries.

mod client;
pub use client::{
    BrokerError, BrokerErrorCode, ErrorSource, QueueClient, QueueReceiver, QueueSender,
    ReceiveHandler, ReceiveMode, ReceiverOptions,
};

mod counters;
pub use counters::JobCounters;

mod driver;
pub use driver::{DriverError, ReceiveDriver, RunReport, SendDriver, SessionDriver};

mod job;
pub use job::{BatchMode, ReceiveJob, SendJob};

mod message;
pub use message::{Message, MessageBatch};

#[doc(hidden)]
pub mod observability;

mod policy;
pub use policy::{ErrorAction, ErrorPolicy};

mod sampler;
pub use sampler::{RateSummary, ThroughputSampler};
