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

//! Periodic throughput sampling over a job counter.

use crate::observability::{events, fields};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

const COMPONENT: &str = "sampler";
const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Final rate figures for one job run.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSummary {
    pub total: u64,
    pub elapsed: Duration,
    pub average_mps: f64,
    pub peak_mps: f64,
}

/// Sampler-private window state between ticks.
struct SampleWindow {
    last_count: u64,
    last_elapsed: Duration,
    peak_mps: f64,
}

/// Samples a shared counter on a fixed one-second timer and emits one
/// formatted status line per tick.
///
/// [`run`](ThroughputSampler::run) returns once the counter reaches `target`,
/// or as soon as the release signal fires so a failed job does not leave the
/// sampler ticking forever. Peak rate is monotonically non-decreasing across
/// ticks by construction.
pub struct ThroughputSampler;

impl ThroughputSampler {
    pub fn new() -> Self {
        Self
    }

    pub async fn run<F>(
        &self,
        read_count: F,
        target: u64,
        mut release: watch::Receiver<bool>,
    ) -> RateSummary
    where
        F: Fn() -> u64 + Send,
    {
        let start = Instant::now();
        let mut window = SampleWindow {
            last_count: 0,
            last_elapsed: Duration::ZERO,
            peak_mps: 0.0,
        };

        let mut interval = tokio::time::interval(SAMPLE_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick of a tokio interval completes immediately
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                changed = release.changed() => {
                    if changed.is_err() || *release.borrow() {
                        debug!(
                            event = events::SAMPLER_RELEASED,
                            component = COMPONENT,
                            total = read_count(),
                            "sampler released before target"
                        );
                        break;
                    }
                    continue;
                }
            }

            let count = read_count();
            let elapsed = start.elapsed();
            let tick_count = count - window.last_count;
            let tick_elapsed = elapsed - window.last_elapsed;

            let cur_mps = fields::rate_per_sec(tick_count, tick_elapsed);
            let avg_mps = fields::rate_per_sec(count, elapsed);
            if cur_mps > window.peak_mps {
                window.peak_mps = cur_mps;
            }
            window.last_count = count;
            window.last_elapsed = elapsed;

            info!(
                event = events::SAMPLE_TICK,
                component = COMPONENT,
                total = count,
                cur_mps = fields::round_mps(cur_mps),
                avg_mps = fields::round_mps(avg_mps),
                max_mps = fields::round_mps(window.peak_mps),
                "{}",
                fields::format_rate_line(count, cur_mps, avg_mps, window.peak_mps)
            );

            if count >= target {
                break;
            }
        }

        let total = read_count();
        let elapsed = start.elapsed();
        RateSummary {
            total,
            elapsed,
            average_mps: fields::rate_per_sec(total, elapsed),
            peak_mps: window.peak_mps,
        }
    }
}

impl Default for ThroughputSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::ThroughputSampler;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::watch;

    fn reader(counter: &Arc<AtomicU64>) -> impl Fn() -> u64 + Send {
        let counter = counter.clone();
        move || counter.load(Ordering::Relaxed)
    }

    #[tokio::test(start_paused = true)]
    async fn returns_after_one_tick_when_counter_already_at_target() {
        let counter = Arc::new(AtomicU64::new(50));
        let (_release_tx, release_rx) = watch::channel(false);

        let summary = ThroughputSampler::new()
            .run(reader(&counter), 50, release_rx)
            .await;

        assert_eq!(summary.total, 50);
        assert_eq!(summary.elapsed, Duration::from_secs(1));
        assert!((summary.average_mps - 50.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn peak_is_max_of_per_tick_rates_and_average_is_total_over_elapsed() {
        let counter = Arc::new(AtomicU64::new(0));
        let (_release_tx, release_rx) = watch::channel(false);

        let sampler_counter = counter.clone();
        let sampler = tokio::spawn(async move {
            ThroughputSampler::new()
                .run(
                    move || sampler_counter.load(Ordering::Relaxed),
                    100,
                    release_rx,
                )
                .await
        });
        // let the sampler register its interval before the clock moves
        tokio::task::yield_now().await;

        // per-second deltas: 10, 20, 30, 40 -> peak 40, average 100/4 = 25
        for step in [10u64, 30, 60, 100] {
            counter.store(step, Ordering::Relaxed);
            tokio::time::advance(Duration::from_secs(1)).await;
            tokio::task::yield_now().await;
        }

        let summary = sampler.await.expect("sampler task should complete");

        assert_eq!(summary.total, 100);
        assert_eq!(summary.elapsed, Duration::from_secs(4));
        assert!((summary.peak_mps - 40.0).abs() < 1e-9);
        assert!((summary.average_mps - 25.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn samples_exactly_once_per_elapsed_second() {
        let counter = Arc::new(AtomicU64::new(0));
        let reads = Arc::new(AtomicU64::new(0));
        let (_release_tx, release_rx) = watch::channel(false);

        let sampler_counter = counter.clone();
        let sampler_reads = reads.clone();
        let sampler = tokio::spawn(async move {
            ThroughputSampler::new()
                .run(
                    move || {
                        sampler_reads.fetch_add(1, Ordering::Relaxed);
                        sampler_counter.load(Ordering::Relaxed)
                    },
                    30,
                    release_rx,
                )
                .await
        });
        // let the sampler register its interval before the clock moves
        tokio::task::yield_now().await;

        for step in [10u64, 20, 30] {
            counter.store(step, Ordering::Relaxed);
            tokio::time::advance(Duration::from_secs(1)).await;
            tokio::task::yield_now().await;
        }

        let summary = sampler.await.expect("sampler task should complete");

        assert_eq!(summary.elapsed, Duration::from_secs(3));
        // one read per tick over three seconds, plus the final summary read
        assert_eq!(reads.load(Ordering::Relaxed), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn release_signal_stops_a_sampler_that_would_never_reach_target() {
        let counter = Arc::new(AtomicU64::new(0));
        let (release_tx, release_rx) = watch::channel(false);

        let summary_task = {
            let read = reader(&counter);
            tokio::spawn(async move { ThroughputSampler::new().run(read, 100, release_rx).await })
        };

        release_tx.send(true).expect("sampler should be listening");
        let summary = summary_task.await.expect("sampler task should complete");

        assert_eq!(summary.total, 0);
        assert_eq!(summary.peak_mps, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_release_sender_also_stops_the_sampler() {
        let counter = Arc::new(AtomicU64::new(0));
        let (release_tx, release_rx) = watch::channel(false);
        drop(release_tx);

        let summary = ThroughputSampler::new()
            .run(reader(&counter), 100, release_rx)
            .await;

        assert_eq!(summary.total, 0);
    }
}
