// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

//! Trace assembly.
//!
//! A [`Trace`] is created once per delivery from a [`RunEvent`] and the
//! suites found in its reports, and is not mutated afterwards.

use crate::attributes::{resource_attributes, Attributes};
use crate::builder::SpanTreeBuilder;
use crate::error::Result;
use crate::event::RunEvent;
use crate::ids::TraceId;
use crate::report::TestSuite;
use crate::span::{SpanNode, SpanNodeKind, StatusCode};
use serde::Serialize;
use std::collections::HashSet;

/// The complete span tree of one run attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trace {
    /// Resource attributes, attached once per trace
    pub resource: Attributes,
    /// The run's root span
    pub root: SpanNode,
    /// One span per suite, in report order
    pub suites: Vec<SpanNode>,
    /// One span per test case, grouped by suite in report order
    pub tests: Vec<SpanNode>,
}

impl Trace {
    /// Build the full tree for `run` from its parsed suites.
    ///
    /// An empty `suites` slice yields a root-only trace.
    pub fn assemble(run: &RunEvent, suites: &[TestSuite]) -> Result<Self> {
        let builder = SpanTreeBuilder::new(run)?;
        let root = builder.root_span()?;

        let mut suite_spans = Vec::with_capacity(suites.len());
        let mut test_spans = Vec::new();
        for suite in suites {
            let (suite_span, tests) = builder.suite_tree(suite)?;
            suite_spans.push(suite_span);
            test_spans.extend(tests);
        }

        Ok(Self {
            resource: resource_attributes(run),
            root,
            suites: suite_spans,
            tests: test_spans,
        })
    }

    /// Trace ID shared by every span.
    pub fn trace_id(&self) -> TraceId {
        self.root.trace_id
    }

    /// Total number of spans, root included.
    pub fn span_count(&self) -> usize {
        1 + self.suites.len() + self.tests.len()
    }

    /// Whether the trace holds only the root span (no reports were found).
    pub fn is_root_only(&self) -> bool {
        self.suites.is_empty() && self.tests.is_empty()
    }

    /// Every span, root first, then suites, then tests.
    pub fn spans(&self) -> impl Iterator<Item = &SpanNode> {
        std::iter::once(&self.root)
            .chain(self.suites.iter())
            .chain(self.tests.iter())
    }

    /// Number of spans whose status is error.
    pub fn error_count(&self) -> usize {
        self.spans()
            .filter(|s| s.status == StatusCode::Error)
            .count()
    }

    /// Check the tree shape. Returns one message per broken rule.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        // Rule: the root is a root
        if self.root.kind != SpanNodeKind::Root || self.root.parent_span_id.is_some() {
            errors.push(format!("Span {} is not a valid root span", self.root.span_id));
        }

        // Rule: every span shares the root's trace id
        for span in self.spans() {
            if span.trace_id != self.root.trace_id {
                errors.push(format!(
                    "Span {} has trace_id {} but expected {}",
                    span.span_id, span.trace_id, self.root.trace_id
                ));
            }
        }

        // Rule: every suite span hangs off the root
        for suite in &self.suites {
            if suite.kind != SpanNodeKind::Suite || suite.parent_span_id != Some(self.root.span_id)
            {
                errors.push(format!(
                    "Suite span {} is not a child of root span {}",
                    suite.span_id, self.root.span_id
                ));
            }
        }

        // Rule: every test span hangs off a suite span
        let suite_ids: HashSet<_> = self.suites.iter().map(|s| s.span_id).collect();
        for test in &self.tests {
            let parented = test
                .parent_span_id
                .map(|parent| suite_ids.contains(&parent))
                .unwrap_or(false);
            if test.kind != SpanNodeKind::Test || !parented {
                errors.push(format!(
                    "Test span {} is not a child of any suite span",
                    test.span_id
                ));
            }
        }

        // Rule: no two suites share an id
        let mut seen = HashSet::new();
        for suite in &self.suites {
            if !seen.insert(suite.span_id) {
                errors.push(format!("Duplicate suite span_id: {}", suite.span_id));
            }
        }

        errors
    }
}
