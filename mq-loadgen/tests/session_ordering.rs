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
use mq_loadgen::{QueueClient, ReceiveJob, SendJob, SessionDriver};
use std::sync::Arc;

#[tokio::test]
async fn session_receive_preserves_fifo_within_the_session() {
    support::init_logging();
    let broker = MemoryBroker::new();
    support::prefill_session(
        &broker,
        "orders",
        &[
            ("s1", b"m1"),
            ("s2", b"x1"),
            ("s1", b"m2"),
            ("s2", b"x2"),
            ("s1", b"m3"),
        ],
    )
    .await;
    let client: Arc<dyn QueueClient> = Arc::new(broker.clone());

    // the driver collapses the requested concurrency to one for sessions
    let report = SessionDriver::new(client)
        .receive(ReceiveJob::new("orders", 3, 4, 8), "s1")
        .await
        .expect("session receive should succeed");

    assert_eq!(report.delivered, 3);

    let bodies: Vec<Vec<u8>> = broker
        .delivery_log("orders")
        .iter()
        .map(|m| m.body().to_vec())
        .collect();
    assert_eq!(bodies, vec![b"m1".to_vec(), b"m2".to_vec(), b"m3".to_vec()]);

    // the other session's messages are left untouched
    assert_eq!(broker.queued("orders"), 2);
}

#[tokio::test]
async fn concurrent_session_send_and_receive_meet_in_the_middle() {
    support::init_logging();
    let broker = MemoryBroker::new();
    let client: Arc<dyn QueueClient> = Arc::new(broker.clone());

    let send_driver = SessionDriver::new(Arc::clone(&client));
    let receive_driver = SessionDriver::new(Arc::clone(&client));

    let (send_report, receive_report) = futures::future::try_join(
        send_driver.send(SendJob::new("orders", 10, 1, vec![0u8; 32]), "s9"),
        receive_driver.receive(ReceiveJob::new("orders", 10, 1, 1), "s9"),
    )
    .await
    .expect("both session jobs should succeed");

    assert_eq!(send_report.delivered, 10);
    assert_eq!(receive_report.delivered, 10);
    assert_eq!(broker.queued("orders"), 0);
    assert!(broker
        .delivery_log("orders")
        .iter()
        .all(|m| m.session_id() == Some("s9")));
}
