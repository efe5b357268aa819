// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types for artifact retrieval and delivery.

use thiserror::Error;

/// Errors raised while retrieving artifacts or delivering a trace.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Error from the mapping core
    #[error(transparent)]
    Core(#[from] junit_traces_core::Error),

    /// Transport error talking to the remote API
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote API answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body, verbatim
        message: String,
    },

    /// The download URL endpoint answered with something other than a redirect
    #[error("Unexpected status {status} while resolving the download URL")]
    UnexpectedRedirect {
        /// HTTP status code
        status: u16,
    },

    /// Redirect bound exceeded
    #[error("Too many redirects (limit {0})")]
    TooManyRedirects(u8),

    /// Redirect without a usable `Location` header
    #[error("Redirect response has no Location header")]
    MissingLocation,

    /// Scratch file I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The downloaded file is not a readable archive
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// A blocking archive task panicked or was cancelled
    #[error("Blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// The downstream consumer rejected the trace
    #[error("Consumer error: {0}")]
    Consumer(String),
}

impl AdapterError {
    /// Whether the error came from a remote call (listing, resolving, downloading).
    pub fn is_retrieval(&self) -> bool {
        matches!(
            self,
            AdapterError::Http(_)
                | AdapterError::Api { .. }
                | AdapterError::UnexpectedRedirect { .. }
                | AdapterError::TooManyRedirects(_)
                | AdapterError::MissingLocation
        )
    }

    /// Shorthand for a [`AdapterError::Config`] carrying a message.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        AdapterError::Config(config::ConfigError::Message(msg.into()))
    }
}

/// Result type for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;
