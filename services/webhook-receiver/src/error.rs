// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

//! Delivery errors and their HTTP mapping.

use crate::telemetry::{self, Outcome};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use junit_traces_adapters::AdapterError;
use serde_json::json;
use tracing::{error, warn};

/// Why a delivery was not accepted.
#[derive(Debug, thiserror::Error)]
pub enum ReceiverError {
    /// Missing or wrong webhook signature
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The delivery cannot be decoded
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Retrieval, assembly or hand-off failed
    #[error(transparent)]
    Pipeline(#[from] AdapterError),
}

impl ReceiverError {
    /// HTTP status of the response.
    pub fn status(&self) -> StatusCode {
        match self {
            ReceiverError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ReceiverError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ReceiverError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            ReceiverError::Unauthorized(_) => "INVALID_SIGNATURE",
            ReceiverError::BadRequest(_) => "INVALID_EVENT",
            ReceiverError::Pipeline(_) => "DELIVERY_FAILED",
        }
    }

    /// Delivery outcome recorded in metrics.
    pub fn outcome(&self) -> Outcome {
        match self {
            ReceiverError::Unauthorized(_) => Outcome::Unauthorized,
            ReceiverError::BadRequest(_) => Outcome::Rejected,
            ReceiverError::Pipeline(_) => Outcome::Failed,
        }
    }
}

impl IntoResponse for ReceiverError {
    fn into_response(self) -> Response {
        match &self {
            ReceiverError::Pipeline(e) => error!(error = %e, "Delivery failed"),
            other => warn!(error = %other, "Delivery rejected"),
        }
        telemetry::record_outcome(self.outcome());

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            },
            "meta": {
                "timestamp": Utc::now().to_rfc3339(),
            }
        }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ReceiverError::Unauthorized("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ReceiverError::BadRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        let err = ReceiverError::from(AdapterError::MissingLocation);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.outcome(), Outcome::Failed);
    }

    #[tokio::test]
    async fn test_error_body() {
        let response = ReceiverError::BadRequest("no event type".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "INVALID_EVENT");
        assert_eq!(body["error"]["message"], "Bad request: no event type");
    }
}
