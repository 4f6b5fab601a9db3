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

//! Message schema and size-bounded batch packing.

/// A queue message: an opaque payload plus an optional session identifier.
///
/// Immutable once constructed; ownership transfers to the sender on dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    body: Vec<u8>,
    session_id: Option<String>,
}

impl Message {
    /// Creates a sessionless message.
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            session_id: None,
        }
    }

    /// Creates a message bound to a broker session.
    pub fn with_session(body: Vec<u8>, session_id: impl Into<String>) -> Self {
        Self {
            body,
            session_id: Some(session_id.into()),
        }
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Serialized size used for batch accounting: payload bytes plus the
    /// session-id bytes carried on the wire.
    pub fn encoded_len(&self) -> usize {
        self.body.len() + self.session_id.as_ref().map_or(0, String::len)
    }
}

/// A size-bounded group of messages dispatched to the broker as one unit.
///
/// Packing is local; the batch is handed to
/// [`QueueSender::send_batch`](crate::QueueSender::send_batch) once assembled.
#[derive(Debug, Clone)]
pub struct MessageBatch {
    max_bytes: usize,
    bytes: usize,
    messages: Vec<Message>,
}

impl MessageBatch {
    /// Creates an empty batch constrained to `max_bytes` of encoded payload.
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            bytes: 0,
            messages: Vec::new(),
        }
    }

    /// Adds a message unless doing so would exceed the byte limit.
    ///
    /// Returns `false` and drops the message when it does not fit. An
    /// oversized payload never fits, not even in an empty batch.
    pub fn try_add(&mut self, message: Message) -> bool {
        let added = self.bytes + message.encoded_len();
        if added > self.max_bytes {
            return false;
        }

        self.bytes = added;
        self.messages.push(message);
        true
    }

    pub fn count(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Encoded size of everything packed so far.
    pub fn encoded_len(&self) -> usize {
        self.bytes
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Consumes the batch, yielding its messages in packing order.
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}
