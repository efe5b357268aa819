// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

//! Webhook signature verification.
//!
//! GitHub signs every delivery with HMAC-SHA256 over the raw body and sends
//! the result as `X-Hub-Signature-256: sha256=<hex>`. The middleware buffers
//! the body, checks the signature and hands the request on with the same
//! bytes. An empty configured secret disables the check.

use crate::error::ReceiverError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use ring::hmac;
use std::sync::Arc;
use tracing::debug;

/// Signature header.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Largest accepted delivery body (GitHub caps payloads at 25 MB).
pub const MAX_PAYLOAD_BYTES: usize = 25 * 1024 * 1024;

const SIGNATURE_PREFIX: &str = "sha256=";

/// Check `signature` (`sha256=<hex>`) against `body`.
pub fn verify(secret: &[u8], body: &[u8], signature: &str) -> Result<(), ReceiverError> {
    let hex_tag = signature.strip_prefix(SIGNATURE_PREFIX).ok_or_else(|| {
        ReceiverError::Unauthorized(format!("signature must start with '{SIGNATURE_PREFIX}'"))
    })?;
    let tag = hex::decode(hex_tag)
        .map_err(|_| ReceiverError::Unauthorized("signature is not hex".to_string()))?;

    let key = hmac::Key::new(hmac::HMAC_SHA256, secret);
    hmac::verify(&key, body, &tag)
        .map_err(|_| ReceiverError::Unauthorized("signature mismatch".to_string()))
}

/// Produce the header value GitHub would send for `body`.
pub fn sign(secret: &[u8], body: &[u8]) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret);
    format!(
        "{SIGNATURE_PREFIX}{}",
        hex::encode(hmac::sign(&key, body).as_ref())
    )
}

/// Middleware rejecting deliveries without a valid signature.
pub async fn verify_signature(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, ReceiverError> {
    let secret = state.config.github.webhook_secret.expose();
    if secret.is_empty() {
        return Ok(next.run(req).await);
    }

    let (parts, body) = req.into_parts();
    let signature = parts
        .headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            ReceiverError::Unauthorized(format!("header '{SIGNATURE_HEADER}' is required"))
        })?
        .to_string();

    let bytes = axum::body::to_bytes(body, MAX_PAYLOAD_BYTES)
        .await
        .map_err(|e| ReceiverError::BadRequest(format!("unreadable body: {e}")))?;
    verify(secret.as_bytes(), &bytes, &signature)?;
    debug!("Webhook signature verified");

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}
