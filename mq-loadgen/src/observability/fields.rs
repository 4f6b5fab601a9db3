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

//! Canonical structured field keys and value-format helpers.

use std::time::Duration;

pub const EVENT: &str = "event";
pub const COMPONENT: &str = "component";
pub const JOB_ID: &str = "job_id";
pub const WORKER: &str = "worker";
pub const RECEIVER: &str = "receiver";
pub const QUEUE: &str = "queue";
pub const SESSION_ID: &str = "session_id";
pub const TARGET: &str = "target";
pub const TOTAL: &str = "total";
pub const CUR_MPS: &str = "cur_mps";
pub const AVG_MPS: &str = "avg_mps";
pub const MAX_MPS: &str = "max_mps";
pub const ATTEMPT: &str = "attempt";
pub const ERR: &str = "err";

pub const NONE: &str = "none";

const TIMESTAMP_FORMAT: &str = "%H:%M:%S%.3f";

/// Rounds a rate to whole messages per second for display.
pub fn round_mps(rate: f64) -> u64 {
    if rate.is_finite() && rate > 0.0 {
        rate.round() as u64
    } else {
        0
    }
}

/// Messages per second over a window, `0.0` for an empty window.
pub fn rate_per_sec(count: u64, window: Duration) -> f64 {
    if window.is_zero() {
        0.0
    } else {
        count as f64 / window.as_secs_f64()
    }
}

pub fn format_session_id(session_id: Option<&str>) -> String {
    session_id.unwrap_or(NONE).to_string()
}

/// One status line per sampler tick, timestamp-prefixed:
/// total delivered, current rate, running average, and peak, in MPS.
pub fn format_rate_line(total: u64, cur_mps: f64, avg_mps: f64, max_mps: f64) -> String {
    format!(
        "[{}]\tTot Msg\t{}\tCur MPS\t{}\tAvg MPS\t{}\tMax MPS\t{}",
        chrono::Local::now().format(TIMESTAMP_FORMAT),
        total,
        round_mps(cur_mps),
        round_mps(avg_mps),
        round_mps(max_mps),
    )
}
