// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

//! Root, suite and test span construction.
//!
//! Test reports carry no start times, so every suite and test span is
//! anchored at the run's start time and lasts for its reported duration.

use crate::attributes::{keys, Attributes};
use crate::error::Result;
use crate::event::{Conclusion, RunEvent};
use crate::ids::{self, SpanId, TraceId};
use crate::report::{TestCase, TestStatus, TestSuite};
use crate::span::{SpanLink, SpanNode, SpanNodeKind, StatusCode};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Status of the root span for a run conclusion.
pub fn root_status(conclusion: &Conclusion) -> StatusCode {
    match conclusion {
        Conclusion::Success => StatusCode::Ok,
        Conclusion::Failure => StatusCode::Error,
        Conclusion::Other(_) => StatusCode::Unset,
    }
}

/// Status of a test span for a test status.
pub fn test_status(status: TestStatus) -> StatusCode {
    match status {
        TestStatus::Passed | TestStatus::Skipped => StatusCode::Ok,
        TestStatus::Failed | TestStatus::Error => StatusCode::Error,
    }
}

/// Status of a suite span: error as soon as one test carries an error detail.
pub fn suite_status(suite: &TestSuite) -> StatusCode {
    if suite.has_errors() {
        StatusCode::Error
    } else {
        StatusCode::Ok
    }
}

/// Builds the spans of one run attempt.
///
/// Identifiers for the trace and the root span are derived once up front;
/// every span produced by one builder shares them.
#[derive(Debug)]
pub struct SpanTreeBuilder<'a> {
    run: &'a RunEvent,
    trace_id: TraceId,
    root_span_id: SpanId,
}

impl<'a> SpanTreeBuilder<'a> {
    /// Derive the run-level identifiers.
    pub fn new(run: &'a RunEvent) -> Result<Self> {
        Ok(Self {
            run,
            trace_id: ids::trace_id(run.run_id, run.run_attempt)?,
            root_span_id: ids::root_span_id(run.run_id, run.run_attempt)?,
        })
    }

    /// Trace ID of the run attempt.
    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// Span ID of the root span.
    pub fn root_span_id(&self) -> SpanId {
        self.root_span_id
    }

    /// The run's root span.
    pub fn root_span(&self) -> Result<SpanNode> {
        let run = self.run;
        let mut builder = SpanNode::builder()
            .trace_id(self.trace_id)
            .span_id(self.root_span_id)
            .kind(SpanNodeKind::Root)
            .name(&run.name)
            .time_range(run.started_at, run.updated_at)
            .status(root_status(&run.conclusion))
            .status_message(run.conclusion.as_str());

        if let Some(link) = self.previous_attempt_link() {
            builder = builder.link(link);
        }

        builder.build()
    }

    fn previous_attempt_link(&self) -> Option<SpanLink> {
        let run = self.run;
        if !run.links_previous_attempt() {
            return None;
        }
        let previous = run.run_attempt - 1;
        let linked = ids::trace_id(run.run_id, previous)
            .and_then(|trace_id| Ok((trace_id, ids::root_span_id(run.run_id, previous)?)));
        match linked {
            Ok((trace_id, span_id)) => {
                debug!(
                    run_id = run.run_id,
                    previous_attempt = previous,
                    previous_trace_id = %trace_id,
                    "Linking root span to previous attempt"
                );
                Some(SpanLink {
                    trace_id,
                    span_id: Some(span_id),
                })
            }
            Err(e) => {
                warn!(
                    run_id = run.run_id,
                    previous_attempt = previous,
                    error = %e,
                    "Failed to link previous attempt"
                );
                None
            }
        }
    }

    /// The span of one suite. Its parent is the root span.
    pub fn suite_span(&self, suite: &TestSuite) -> Result<SpanNode> {
        let run = self.run;
        let span_id = ids::suite_span_id(run.run_id, run.run_attempt, &suite.name)?;
        let totals = suite.totals();

        let mut attributes = Attributes::new();
        attributes.put(keys::CODE_NAMESPACE, &suite.package);
        attributes.put(keys::SUITE_NAME, &suite.name);
        attributes.put(keys::SUITE_SYSTEM_ERR, &suite.system_err);
        attributes.put(keys::SUITE_SYSTEM_OUT, &suite.system_out);
        attributes.put(keys::SUITE_DURATION, millis(suite.duration));
        attributes.put(keys::SUITE_TOTAL, totals.tests);
        attributes.put(keys::SUITE_PASSED, totals.passed);
        attributes.put(keys::SUITE_FAILED, totals.failed);
        attributes.put(keys::SUITE_ERROR, totals.error);
        attributes.put(keys::SUITE_SKIPPED, totals.skipped);
        put_properties(&mut attributes, &suite.properties);

        SpanNode::builder()
            .trace_id(self.trace_id)
            .span_id(span_id)
            .parent_span_id(self.root_span_id)
            .kind(SpanNodeKind::Suite)
            .name(&suite.name)
            .time_range(run.started_at, anchored_end(run.started_at, suite.duration))
            .status(suite_status(suite))
            .attributes(attributes)
            .build()
    }

    /// The span of one test. Its parent is the span of `suite`.
    pub fn test_span(&self, suite: &TestSuite, test: &TestCase) -> Result<SpanNode> {
        let run = self.run;
        let parent = ids::suite_span_id(run.run_id, run.run_attempt, &suite.name)?;
        let span_id = ids::test_span_id(
            run.run_id,
            run.run_attempt,
            &suite.name,
            &test.classname,
            &test.name,
        )?;

        let mut attributes = Attributes::new();
        attributes.put(keys::CASE_DURATION, millis(test.duration));
        attributes.put(keys::CODE_FUNCTION, &test.name);
        attributes.put(keys::CASE_CLASSNAME, &test.classname);
        attributes.put(keys::CASE_MESSAGE, &test.message);
        attributes.put(keys::CASE_STATUS, test.status().as_str());
        attributes.put(keys::CASE_SYSTEM_ERR, &test.system_err);
        attributes.put(keys::CASE_SYSTEM_OUT, &test.system_out);
        let mut status_message = String::new();
        if let Some(error) = test.error() {
            status_message = error.to_string();
            attributes.put(keys::CASE_ERROR, status_message.clone());
        }
        put_properties(&mut attributes, &test.properties);

        SpanNode::builder()
            .trace_id(self.trace_id)
            .span_id(span_id)
            .parent_span_id(parent)
            .kind(SpanNodeKind::Test)
            .name(&test.name)
            .time_range(run.started_at, anchored_end(run.started_at, test.duration))
            .status(test_status(test.status()))
            .status_message(status_message)
            .attributes(attributes)
            .build()
    }

    /// The suite span followed by one span per test, in document order.
    ///
    /// Tests sharing a name are kept apart; nothing is merged.
    pub fn suite_tree(&self, suite: &TestSuite) -> Result<(SpanNode, Vec<SpanNode>)> {
        let suite_span = self.suite_span(suite)?;
        let tests = suite
            .tests
            .iter()
            .map(|test| self.test_span(suite, test))
            .collect::<Result<Vec<_>>>()?;
        Ok((suite_span, tests))
    }
}

fn put_properties(attributes: &mut Attributes, properties: &IndexMap<String, String>) {
    for (key, value) in properties {
        if !attributes.put_if_absent(key, value) {
            debug!(key = %key, "Property shadows a built-in attribute, skipped");
        }
    }
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

fn anchored_end(start: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|d| start.checked_add_signed(d))
        .unwrap_or(start)
}
