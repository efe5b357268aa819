// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core types for turning CI test reports into traces.
//!
//! A completed workflow run ([`event::RunEvent`]) and the test suites parsed
//! from its report artifacts ([`report::TestSuite`]) are mapped onto a span
//! tree with stable identifiers:
//!
//! ```text
//! Run (root span)
//!   └─ Suite (one per test suite)
//!       └─ Test (one per test case)
//! ```
//!
//! Nothing here performs I/O. Retrieval of artifacts lives in
//! `junit-traces-adapters`.
//!
//! # Modules
//!
//! - [`event`] - Inbound webhook events and the validated [`event::RunEvent`]
//! - [`report`] - JUnit XML grammar and the suite/test model
//! - [`ids`] - Deterministic trace and span identifiers
//! - [`attributes`] - Attribute maps, semantic keys, resource attributes
//! - [`span`] - The [`span::SpanNode`] output unit
//! - [`builder`] - Root, suite and test span construction
//! - [`trace`] - Trace assembly and validation
//! - [`otlp`] - Projection onto the OTLP wire model

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod attributes;
pub mod builder;
pub mod error;
pub mod event;
pub mod ids;
pub mod otlp;
pub mod report;
pub mod span;
pub mod trace;

pub use error::{Error, Result};
pub use event::{RunEvent, WebhookEvent};
pub use ids::{SpanId, TraceId};
pub use report::{TestCase, TestStatus, TestSuite};
pub use span::SpanNode;
pub use trace::Trace;
