// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

//! Artifact retrieval and trace delivery.
//!
//! This crate connects the pure mapping in `junit-traces-core` to the outside
//! world:
//!
//! - [`upstream::github`] - GitHub Actions REST client behind the
//!   [`upstream::github::ArtifactApi`] seam
//! - [`locator`] - Complete, unpaginated artifact listing and suffix filter
//! - [`fetcher`] - Download to scratch storage and open as an archive
//! - [`extractor`] - Test suites from every report in an archive
//! - [`pipeline`] - One delivery from run to trace
//! - [`consumer`] - Downstream hand-off of assembled traces
//! - [`config`] - Layered receiver configuration

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod config;
pub mod consumer;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod locator;
pub mod pipeline;
pub mod upstream;

pub use error::{AdapterError, Result};
pub use pipeline::{Pipeline, PipelineSettings};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::ReceiverConfig;
    pub use crate::consumer::{LogConsumer, OtlpWriter, TraceConsumer};
    pub use crate::error::{AdapterError, Result};
    pub use crate::pipeline::{Pipeline, PipelineSettings};
    pub use crate::upstream::prelude::*;
}
