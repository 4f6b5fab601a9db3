use memory_broker::MemoryBroker;
use mq_loadgen::{Message, QueueClient};

pub(crate) fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[allow(dead_code)]
pub(crate) async fn prefill(broker: &MemoryBroker, queue: &str, count: usize, payload: &[u8]) {
    let sender = broker
        .create_sender(queue)
        .await
        .expect("sender creation should succeed");
    for _ in 0..count {
        sender
            .send(Message::new(payload.to_vec()))
            .await
            .expect("prefill send should succeed");
    }
    sender.close().await.expect("sender close should succeed");
}

#[allow(dead_code)]
pub(crate) async fn prefill_session(
    broker: &MemoryBroker,
    queue: &str,
    entries: &[(&str, &[u8])],
) {
    let sender = broker
        .create_sender(queue)
        .await
        .expect("sender creation should succeed");
    for (session_id, body) in entries {
        sender
            .send(Message::with_session(body.to_vec(), *session_id))
            .await
            .expect("prefill send should succeed");
    }
    sender.close().await.expect("sender close should succeed");
}
