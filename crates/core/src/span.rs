// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

//! The span tree's output unit.
//!
//! # Invariants
//!
//! A finished trace always has the shape:
//!
//! ```text
//! Root (exactly one, no parent)
//!   └─ Suite (parent = root)
//!       └─ Test (parent = its suite)
//! ```
//!
//! [`SpanNodeBuilder::build`] enforces the local half of this (a root has no
//! parent, suites and tests have one); [`crate::trace::Trace::validate`]
//! checks the tree as a whole.

use crate::attributes::{AttributeValue, Attributes};
use crate::error::{Error, Result};
use crate::ids::{SpanId, TraceId};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Position of a span in the run tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanNodeKind {
    /// The workflow run.
    Root,
    /// A test suite.
    Suite,
    /// A test case.
    Test,
}

/// Status code of a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatusCode {
    /// No status was set.
    #[default]
    Unset,
    /// Completed successfully.
    Ok,
    /// Completed with an error.
    Error,
}

/// A link from one span to another trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpanLink {
    /// Linked trace
    pub trace_id: TraceId,
    /// Linked span within that trace, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_id: Option<SpanId>,
}

/// One span of a run trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpanNode {
    /// Trace the span belongs to
    pub trace_id: TraceId,
    /// Span identifier
    pub span_id: SpanId,
    /// Parent span, `None` only for the root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<SpanId>,
    /// Root, suite or test
    pub kind: SpanNodeKind,
    /// Span name
    pub name: String,
    /// Start time
    pub start_time: DateTime<Utc>,
    /// End time
    pub end_time: DateTime<Utc>,
    /// Status code
    pub status: StatusCode,
    /// Status message
    #[serde(skip_serializing_if = "String::is_empty")]
    pub status_message: String,
    /// Span attributes
    pub attributes: Attributes,
    /// Links to other traces
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<SpanLink>,
}

impl SpanNode {
    /// Create a new builder.
    pub fn builder() -> SpanNodeBuilder {
        SpanNodeBuilder::default()
    }

    /// Whether this is the root span.
    pub fn is_root(&self) -> bool {
        self.kind == SpanNodeKind::Root
    }

    /// Span duration.
    pub fn duration(&self) -> chrono::Duration {
        self.end_time.signed_duration_since(self.start_time)
    }
}

/// Builder for [`SpanNode`] instances.
#[derive(Default)]
pub struct SpanNodeBuilder {
    trace_id: Option<TraceId>,
    span_id: Option<SpanId>,
    parent_span_id: Option<SpanId>,
    kind: Option<SpanNodeKind>,
    name: Option<String>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    status: StatusCode,
    status_message: String,
    attributes: Attributes,
    links: Vec<SpanLink>,
}

impl SpanNodeBuilder {
    /// Set trace ID (required).
    pub fn trace_id(mut self, id: TraceId) -> Self {
        self.trace_id = Some(id);
        self
    }

    /// Set span ID (required).
    pub fn span_id(mut self, id: SpanId) -> Self {
        self.span_id = Some(id);
        self
    }

    /// Set parent span ID (required for suite and test spans).
    pub fn parent_span_id(mut self, id: SpanId) -> Self {
        self.parent_span_id = Some(id);
        self
    }

    /// Set span kind (required).
    pub fn kind(mut self, kind: SpanNodeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Set name (required).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set start and end time (required).
    pub fn time_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    /// Set status code (default: unset).
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Set status message.
    pub fn status_message(mut self, message: impl Into<String>) -> Self {
        self.status_message = message.into();
        self
    }

    /// Add an attribute.
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.put(key, value);
        self
    }

    /// Replace all attributes.
    pub fn attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Add a link.
    pub fn link(mut self, link: SpanLink) -> Self {
        self.links.push(link);
        self
    }

    /// Build the [`SpanNode`]. Returns `Err` if required fields are missing.
    pub fn build(self) -> Result<SpanNode> {
        let trace_id = self
            .trace_id
            .ok_or_else(|| Error::invalid_input("trace_id is required"))?;
        let span_id = self
            .span_id
            .ok_or_else(|| Error::invalid_input("span_id is required"))?;
        let kind = self
            .kind
            .ok_or_else(|| Error::invalid_input("kind is required"))?;
        let name = self
            .name
            .ok_or_else(|| Error::invalid_input("name is required"))?;
        let start_time = self
            .start_time
            .ok_or_else(|| Error::invalid_input("start_time is required"))?;
        let end_time = self.end_time.unwrap_or(start_time);

        match (kind, self.parent_span_id) {
            (SpanNodeKind::Root, Some(_)) => {
                return Err(Error::invalid_input("root span must not have a parent"));
            }
            (SpanNodeKind::Suite | SpanNodeKind::Test, None) => {
                return Err(Error::invalid_input(
                    "parent_span_id is required for suite and test spans",
                ));
            }
            _ => {}
        }

        Ok(SpanNode {
            trace_id,
            span_id,
            parent_span_id: self.parent_span_id,
            kind,
            name,
            start_time,
            end_time,
            status: self.status,
            status_message: self.status_message,
            attributes: self.attributes,
            links: self.links,
        })
    }
}
