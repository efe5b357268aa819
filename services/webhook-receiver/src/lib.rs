// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

//! GitHub Actions webhook receiver.
//!
//! Accepts `workflow_run` deliveries, turns the JUnit report artifacts of
//! every completed run into a trace and hands it to a [`TraceConsumer`].
//!
//! Routes:
//! - `POST <server.path>` - webhook deliveries (signature checked)
//! - `GET /health` - liveness
//! - `GET /metrics` - Prometheus exposition
//!
//! [`TraceConsumer`]: junit_traces_adapters::consumer::TraceConsumer

#![deny(unsafe_code)]

pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use error::ReceiverError;
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the receiver's router.
pub fn router(state: Arc<AppState>) -> Router {
    let webhook = Router::new()
        .route(&state.config.server.path, post(routes::webhook::receive_delivery))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::verify_signature,
        ))
        .layer(DefaultBodyLimit::max(middleware::MAX_PAYLOAD_BYTES));

    Router::new()
        .merge(webhook)
        .route("/health", get(routes::health::health))
        .route("/metrics", get(routes::health::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
