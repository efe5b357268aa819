// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

//! Logging setup and delivery metrics.

use junit_traces_adapters::config::LoggingConfig;
use std::time::Duration;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Deliveries by outcome.
pub const DELIVERIES_TOTAL: &str = "junit_receiver_deliveries_total";
/// Spans handed to the consumer.
pub const SPANS_EMITTED_TOTAL: &str = "junit_receiver_spans_emitted_total";
/// Wall-clock time spent per processed delivery.
pub const DELIVERY_DURATION_SECONDS: &str = "junit_receiver_delivery_duration_seconds";

/// How a delivery ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Trace handed to the consumer
    Accepted,
    /// Completed run without report artifacts
    NoReports,
    /// Event type or action the receiver does not handle
    Ignored,
    /// Signature check failed
    Unauthorized,
    /// Undecodable delivery
    Rejected,
    /// Retrieval, assembly or hand-off failed
    Failed,
}

impl Outcome {
    /// Label value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Accepted => "accepted",
            Outcome::NoReports => "no_reports",
            Outcome::Ignored => "ignored",
            Outcome::Unauthorized => "unauthorized",
            Outcome::Rejected => "rejected",
            Outcome::Failed => "failed",
        }
    }
}

/// Register metric descriptions with the installed recorder.
pub fn describe_metrics() {
    metrics::describe_counter!(DELIVERIES_TOTAL, "Webhook deliveries by outcome");
    metrics::describe_counter!(SPANS_EMITTED_TOTAL, "Spans handed to the trace consumer");
    metrics::describe_histogram!(
        DELIVERY_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Time spent processing a completed-run delivery"
    );
}

/// Count one delivery.
pub fn record_outcome(outcome: Outcome) {
    metrics::counter!(DELIVERIES_TOTAL, "outcome" => outcome.as_str()).increment(1);
}

/// Count spans handed downstream.
pub fn record_spans(count: usize) {
    metrics::counter!(SPANS_EMITTED_TOTAL).increment(count as u64);
}

/// Record processing time of one delivery.
pub fn record_duration(elapsed: Duration) {
    metrics::histogram!(DELIVERY_DURATION_SECONDS).record(elapsed.as_secs_f64());
}

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let registry = tracing_subscriber::registry().with(filter);
    if config.json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    }
}
