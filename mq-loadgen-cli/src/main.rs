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

mod config;

use crate::config::{Config, JobConfig};
use clap::Parser;
use memory_broker::MemoryBroker;
use mq_loadgen::{
    DriverError, QueueClient, ReceiveDriver, ReceiveJob, RunReport, SendDriver, SendJob,
    SessionDriver,
};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(about = "Load-generation harness for durable message queues")]
struct LoadgenArgs {
    #[arg(short, long, value_name = "FILE")]
    config: String,
}

#[derive(Debug)]
enum CliError {
    Config(String),
    Run(DriverError),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Config(detail) => write!(f, "configuration error: {detail}"),
            CliError::Run(error) => write!(f, "job failed: {error}"),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CliError::Config(_) => None,
            CliError::Run(error) => Some(error),
        }
    }
}

/// One line of the machine-readable run summary printed after all jobs.
#[derive(Serialize)]
struct JobSummary {
    kind: &'static str,
    delivered: u64,
    elapsed_secs: f64,
    average_mps: f64,
    peak_mps: f64,
    unclassified_errors: u64,
}

impl JobSummary {
    fn new(kind: &'static str, report: &RunReport) -> Self {
        Self {
            kind,
            delivered: report.delivered,
            elapsed_secs: report.elapsed.as_secs_f64(),
            average_mps: report.average_mps,
            peak_mps: report.peak_mps,
            unclassified_errors: report.unclassified_errors,
        }
    }
}

fn job_kind(job: &JobConfig) -> &'static str {
    match job {
        JobConfig::Send { .. } => "send",
        JobConfig::Receive { .. } => "receive",
        JobConfig::SessionSend { .. } => "session_send",
        JobConfig::SessionReceive { .. } => "session_receive",
    }
}

async fn run_job(
    client: Arc<dyn QueueClient>,
    queue: &str,
    job: &JobConfig,
) -> Result<RunReport, DriverError> {
    match job.clone() {
        JobConfig::Send {
            total_messages,
            max_inflight_workers,
            payload_bytes,
            max_batch_bytes,
            run_timeout_secs,
        } => {
            let mut send_job = SendJob::new(
                queue,
                total_messages,
                max_inflight_workers,
                vec![0u8; payload_bytes],
            );
            if let Some(max_bytes) = max_batch_bytes {
                send_job = send_job.with_batching(max_bytes);
            }
            if let Some(secs) = run_timeout_secs {
                send_job = send_job.with_run_timeout(Duration::from_secs(secs));
            }
            SendDriver::new(client).run(send_job).await
        }
        JobConfig::Receive {
            total_messages,
            receiver_count,
            max_concurrent_calls,
            run_timeout_secs,
        } => {
            let mut receive_job =
                ReceiveJob::new(queue, total_messages, receiver_count, max_concurrent_calls);
            if let Some(secs) = run_timeout_secs {
                receive_job = receive_job.with_run_timeout(Duration::from_secs(secs));
            }
            ReceiveDriver::new(client).run(receive_job).await
        }
        JobConfig::SessionSend {
            total_messages,
            payload_bytes,
            session_id,
            run_timeout_secs,
        } => {
            let mut send_job = SendJob::new(queue, total_messages, 1, vec![0u8; payload_bytes]);
            if let Some(secs) = run_timeout_secs {
                send_job = send_job.with_run_timeout(Duration::from_secs(secs));
            }
            SessionDriver::new(client).send(send_job, session_id).await
        }
        JobConfig::SessionReceive {
            total_messages,
            session_id,
            run_timeout_secs,
        } => {
            let mut receive_job = ReceiveJob::new(queue, total_messages, 1, 1);
            if let Some(secs) = run_timeout_secs {
                receive_job = receive_job.with_run_timeout(Duration::from_secs(secs));
            }
            SessionDriver::new(client)
                .receive(receive_job, session_id)
                .await
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    // a subscriber may already be installed when run under a test harness
    let _ = tracing_subscriber::fmt::try_init();

    let args = LoadgenArgs::parse();

    let mut file = File::open(&args.config)
        .map_err(|e| CliError::Config(format!("cannot open {}: {e}", args.config)))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| CliError::Config(format!("cannot read {}: {e}", args.config)))?;

    let config: Config = json5::from_str(&contents)
        .map_err(|e| CliError::Config(format!("cannot parse {}: {e}", args.config)))?;

    if config.jobs.is_empty() {
        return Err(CliError::Config("no jobs configured".to_string()));
    }

    let client: Arc<dyn QueueClient> = match config.endpoint.as_str() {
        endpoint if endpoint.starts_with("memory://") => Arc::new(MemoryBroker::new()),
        endpoint => {
            return Err(CliError::Config(format!(
                "unsupported endpoint scheme: {endpoint} (only memory:// is built in)"
            )));
        }
    };

    info!(
        endpoint = %config.endpoint,
        queue = %config.queue,
        jobs = config.jobs.len(),
        "starting load run"
    );

    let mut summaries = Vec::with_capacity(config.jobs.len());
    for job in &config.jobs {
        let report = run_job(Arc::clone(&client), &config.queue, job)
            .await
            .map_err(CliError::Run)?;
        println!("{}: {report}", job_kind(job));
        summaries.push(JobSummary::new(job_kind(job), &report));
    }

    let summary = serde_json::to_string_pretty(&summaries)
        .map_err(|e| CliError::Config(format!("cannot serialize summary: {e}")))?;
    println!("{summary}");

    Ok(())
}
