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

mod support;

use memory_broker::MemoryBroker;
use mq_loadgen::{BrokerErrorCode, QueueClient, ReceiveDriver, ReceiveJob};
use std::sync::Arc;

#[tokio::test]
async fn receive_job_drains_the_queue_exactly_once() {
    support::init_logging();
    let broker = MemoryBroker::new();
    support::prefill(&broker, "orders", 200, &[0u8; 64]).await;
    let client: Arc<dyn QueueClient> = Arc::new(broker.clone());

    let report = ReceiveDriver::new(client)
        .run(ReceiveJob::new("orders", 200, 2, 4))
        .await
        .expect("receive job should succeed");

    assert_eq!(report.delivered, 200);
    assert_eq!(broker.queued("orders"), 0);
    assert_eq!(
        broker.delivered_by_receiver("orders").iter().sum::<u64>(),
        200
    );
}

#[tokio::test]
async fn unmapped_broker_code_is_counted_and_surfaced() {
    support::init_logging();
    let broker = MemoryBroker::new();
    support::prefill(&broker, "orders", 5, &[0u8; 64]).await;
    broker.inject_fault(
        "orders",
        0,
        1,
        BrokerErrorCode::Other("QuotaExceeded".to_string()),
    );
    let client: Arc<dyn QueueClient> = Arc::new(broker.clone());

    let report = ReceiveDriver::new(client)
        .run(ReceiveJob::new("orders", 5, 1, 1))
        .await
        .expect("receive job should succeed");

    // the faulted message is requeued, so the run still drains everything
    assert_eq!(report.delivered, 5);
    assert_eq!(report.unclassified_errors, 1);
    assert_eq!(broker.queued("orders"), 0);
}
