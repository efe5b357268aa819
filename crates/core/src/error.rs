// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types for the core mapping crate.

use thiserror::Error;

/// Errors raised while decoding events, parsing reports, or deriving identifiers.
#[derive(Debug, Error)]
pub enum Error {
    /// Input failed validation before any work was attempted
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A stable identifier could not be derived from its key fields
    #[error("Failed to derive {kind} identifier: {reason}")]
    IdentifierDerivation {
        /// Identifier kind (trace, root span, suite span, test span)
        kind: &'static str,
        /// What went wrong
        reason: String,
    },

    /// A test report could not be parsed
    #[error("Report parse error: {0}")]
    ReportParse(String),

    /// A webhook payload could not be decoded
    #[error("Event parse error: {0}")]
    EventParse(#[from] serde_json::Error),

    /// A trace could not be encoded for export
    #[error("Encode error: {0}")]
    Encode(String),
}

impl Error {
    /// Shorthand for [`Error::InvalidInput`].
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Shorthand for [`Error::ReportParse`].
    pub fn report_parse(msg: impl Into<String>) -> Self {
        Error::ReportParse(msg.into())
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;
