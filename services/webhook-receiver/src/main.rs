// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

//! junit-webhook-receiver entry point.

use anyhow::Context;
use junit_traces_adapters::config::ReceiverConfig;
use junit_traces_adapters::consumer::LogConsumer;
use junit_webhook_receiver::{router, telemetry, AppState};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Explicit configuration file path.
const CONFIG_FILE_ENV: &str = "JUNIT_RECEIVER_CONFIG_FILE";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config_file = std::env::var_os(CONFIG_FILE_ENV).map(PathBuf::from);
    let config = ReceiverConfig::load(config_file.as_deref()).context("loading configuration")?;
    telemetry::init_tracing(&config.logging).context("installing log subscriber")?;

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("installing metrics recorder")?;
    telemetry::describe_metrics();

    if config.github.webhook_secret.is_empty() {
        warn!("No webhook secret configured, signature verification is disabled");
    }
    if config.github.token.is_empty() {
        warn!("No GitHub token configured, artifact downloads will be rejected");
    }

    let endpoint = config.server.endpoint.clone();
    let path = config.server.path.clone();
    let state = AppState::from_config(config, Arc::new(LogConsumer))
        .context("creating GitHub client")?
        .with_metrics(metrics);

    let listener = TcpListener::bind(&endpoint)
        .await
        .with_context(|| format!("binding {endpoint}"))?;
    info!(endpoint = %endpoint, path = %path, "Webhook receiver listening");

    axum::serve(listener, router(Arc::new(state)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving")?;

    info!("Webhook receiver stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
