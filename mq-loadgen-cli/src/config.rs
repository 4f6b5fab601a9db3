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

use serde::{Deserialize, Serialize};

/// Run description parsed from a JSON5 file.
///
/// `endpoint` is mandatory: a run against the wrong broker is worse than no
/// run, so there is no fallback value. Jobs execute sequentially in file
/// order, all against the same queue.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub(crate) endpoint: String,
    pub(crate) queue: String,
    pub(crate) jobs: Vec<JobConfig>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobConfig {
    Send {
        total_messages: u64,
        #[serde(default = "default_workers")]
        max_inflight_workers: usize,
        #[serde(default = "default_payload_bytes")]
        payload_bytes: usize,
        /// Enables batched dispatch when set.
        #[serde(default)]
        max_batch_bytes: Option<usize>,
        #[serde(default)]
        run_timeout_secs: Option<u64>,
    },
    Receive {
        total_messages: u64,
        #[serde(default = "default_receiver_count")]
        receiver_count: usize,
        #[serde(default = "default_concurrent_calls")]
        max_concurrent_calls: usize,
        #[serde(default)]
        run_timeout_secs: Option<u64>,
    },
    SessionSend {
        total_messages: u64,
        #[serde(default = "default_payload_bytes")]
        payload_bytes: usize,
        #[serde(default = "default_session_id")]
        session_id: String,
        #[serde(default)]
        run_timeout_secs: Option<u64>,
    },
    SessionReceive {
        total_messages: u64,
        #[serde(default = "default_session_id")]
        session_id: String,
        #[serde(default)]
        run_timeout_secs: Option<u64>,
    },
}

fn default_workers() -> usize {
    4
}

fn default_payload_bytes() -> usize {
    1024
}

fn default_receiver_count() -> usize {
    1
}

fn default_concurrent_calls() -> usize {
    4
}

fn default_session_id() -> String {
    "session-1".to_string()
}
