// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

use junit_traces_adapters::config::ReceiverConfig;
use junit_traces_adapters::consumer::TraceConsumer;
use junit_traces_adapters::upstream::GithubClient;
use junit_traces_adapters::{Pipeline, PipelineSettings, Result};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Shared, read-only state of the receiver.
///
/// Deliveries share nothing else; each one owns its run, archives and trace.
pub struct AppState {
    /// Receiver configuration
    pub config: ReceiverConfig,
    /// Run-to-trace pipeline
    pub pipeline: Pipeline,
    /// Destination of assembled traces
    pub consumer: Arc<dyn TraceConsumer>,
    /// Prometheus exposition, when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// State from explicit parts.
    pub fn new(config: ReceiverConfig, pipeline: Pipeline, consumer: Arc<dyn TraceConsumer>) -> Self {
        Self {
            config,
            pipeline,
            consumer,
            metrics: None,
        }
    }

    /// State talking to the GitHub API named in `config`.
    pub fn from_config(config: ReceiverConfig, consumer: Arc<dyn TraceConsumer>) -> Result<Self> {
        let token = config.github.token.expose();
        let client = GithubClient::new(&config.github.api_url, Some(token))?;
        let pipeline = Pipeline::new(Arc::new(client), PipelineSettings::from(&config.artifacts));
        Ok(Self::new(config, pipeline, consumer))
    }

    /// Attach a Prometheus handle for `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
