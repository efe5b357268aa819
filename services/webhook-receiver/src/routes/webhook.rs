// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::error::ReceiverError;
use crate::state::AppState;
use crate::telemetry::{self, Outcome};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use junit_traces_core::{RunEvent, WebhookEvent};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Event type header.
pub const EVENT_HEADER: &str = "x-github-event";
/// Delivery GUID header.
pub const DELIVERY_HEADER: &str = "x-github-delivery";

#[derive(Debug, Serialize)]
pub struct DeliveryResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spans: Option<usize>,
}

impl DeliveryResponse {
    fn outcome(outcome: Outcome) -> Self {
        Self {
            status: outcome.as_str(),
            trace_id: None,
            spans: None,
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[instrument(skip_all, fields(delivery = header(&headers, DELIVERY_HEADER).unwrap_or_default()))]
pub async fn receive_delivery(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<DeliveryResponse>), ReceiverError> {
    let event_type = header(&headers, EVENT_HEADER)
        .ok_or_else(|| ReceiverError::BadRequest(format!("header '{EVENT_HEADER}' is required")))?;
    let event = WebhookEvent::parse(event_type, &body)
        .map_err(|e| ReceiverError::BadRequest(e.to_string()))?;

    let Some(completed) = event.completed_run() else {
        debug!(event_type, "Ignoring event");
        telemetry::record_outcome(Outcome::Ignored);
        return Ok((StatusCode::OK, Json(DeliveryResponse::outcome(Outcome::Ignored))));
    };
    let run = RunEvent::try_from(completed).map_err(|e| ReceiverError::BadRequest(e.to_string()))?;

    info!(
        run_id = run.run_id,
        run_attempt = run.run_attempt,
        repo = %run.repo_full_name,
        conclusion = run.conclusion.as_str(),
        "Processing completed run"
    );
    let started = Instant::now();
    let result = deliver(&state, &run).await;
    telemetry::record_duration(started.elapsed());

    let (outcome, response) = result?;
    telemetry::record_outcome(outcome);
    Ok((StatusCode::OK, Json(response)))
}

async fn deliver(
    state: &AppState,
    run: &RunEvent,
) -> Result<(Outcome, DeliveryResponse), ReceiverError> {
    let trace = state.pipeline.process(run).await?;
    let trace_id = trace.trace_id().to_string();

    if trace.is_root_only() {
        info!(trace_id = %trace_id, "No test reports for run");
        let response = DeliveryResponse {
            trace_id: Some(trace_id),
            ..DeliveryResponse::outcome(Outcome::NoReports)
        };
        return Ok((Outcome::NoReports, response));
    }

    let spans = trace.span_count();
    state.consumer.consume(trace).await?;
    telemetry::record_spans(spans);
    info!(trace_id = %trace_id, spans, "Trace handed to consumer");

    let response = DeliveryResponse {
        status: Outcome::Accepted.as_str(),
        trace_id: Some(trace_id),
        spans: Some(spans),
    };
    Ok((Outcome::Accepted, response))
}
