// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

//! JUnit XML test reports.
//!
//! Accepts the common dialects: a `<testsuites>` document, a bare
//! `<testsuite>`, and suites nested inside suites (flattened in document
//! order). Each `<testcase>` becomes a [`TestCase`] whose status is taken
//! from its `<failure>`, `<error>` or `<skipped>` child.
//!
//! Reports are parsed from a fully buffered byte slice.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fmt;
use std::time::Duration;

/// Outcome of a single test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestStatus {
    /// Test passed.
    Passed,
    /// Test ran and an assertion failed.
    Failed,
    /// Test did not run.
    Skipped,
    /// Test could not complete because of an unexpected error.
    Error,
}

impl TestStatus {
    /// Lowercase name, as written into span attributes.
    pub fn as_str(self) -> &'static str {
        match self {
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::Skipped => "skipped",
            TestStatus::Error => "error",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Details of a `<failure>` or `<error>` element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorDetail {
    /// `message` attribute
    pub message: String,
    /// `type` attribute
    pub kind: String,
    /// Element body, usually a stack trace
    pub body: String,
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            f.write_str(&self.body)
        } else {
            f.write_str(&self.message)
        }
    }
}

/// A single test result.
///
/// Status and error detail are kept consistent: a case carrying an error
/// detail is never reported as passed or skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    /// Test name
    pub name: String,
    /// Class (or module) the test belongs to
    pub classname: String,
    /// Reported duration
    pub duration: Duration,
    /// Message from the failure, error or skipped element
    pub message: String,
    /// Captured standard output
    pub system_out: String,
    /// Captured standard error
    pub system_err: String,
    /// Free-form `<property>` values
    pub properties: IndexMap<String, String>,
    status: TestStatus,
    error: Option<ErrorDetail>,
}

impl TestCase {
    /// A passed test with no output.
    pub fn new(name: impl Into<String>, classname: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            classname: classname.into(),
            duration: Duration::ZERO,
            message: String::new(),
            system_out: String::new(),
            system_err: String::new(),
            properties: IndexMap::new(),
            status: TestStatus::Passed,
            error: None,
        }
    }

    /// Set the duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Mark as failed with the given detail.
    pub fn failed(mut self, detail: ErrorDetail) -> Self {
        self.set_outcome(TestStatus::Failed, Some(detail));
        self
    }

    /// Mark as errored with the given detail.
    pub fn errored(mut self, detail: ErrorDetail) -> Self {
        self.set_outcome(TestStatus::Error, Some(detail));
        self
    }

    /// Mark as skipped.
    pub fn skipped(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self.set_outcome(TestStatus::Skipped, None);
        self
    }

    /// Set status and error detail together.
    ///
    /// A detail given with [`TestStatus::Passed`] or [`TestStatus::Skipped`]
    /// turns the case into [`TestStatus::Failed`].
    pub fn set_outcome(&mut self, status: TestStatus, error: Option<ErrorDetail>) {
        self.status = match (status, &error) {
            (TestStatus::Passed | TestStatus::Skipped, Some(_)) => TestStatus::Failed,
            (status, _) => status,
        };
        if let Some(detail) = &error {
            if self.message.is_empty() {
                self.message = detail.message.clone();
            }
        }
        self.error = error;
    }

    /// Test outcome.
    pub fn status(&self) -> TestStatus {
        self.status
    }

    /// Failure or error detail, if any.
    pub fn error(&self) -> Option<&ErrorDetail> {
        self.error.as_ref()
    }
}

/// Aggregated counts for a suite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    /// Number of test cases
    pub tests: usize,
    /// Passed test cases
    pub passed: usize,
    /// Skipped test cases
    pub skipped: usize,
    /// Failed test cases
    pub failed: usize,
    /// Errored test cases
    pub error: usize,
}

/// A parsed `<testsuite>`.
#[derive(Debug, Clone, PartialEq)]
pub struct TestSuite {
    /// Suite name
    pub name: String,
    /// `package` attribute
    pub package: String,
    /// Aggregate duration. Independent of the child test durations.
    pub duration: Duration,
    /// Captured standard output
    pub system_out: String,
    /// Captured standard error
    pub system_err: String,
    /// Free-form `<property>` values
    pub properties: IndexMap<String, String>,
    /// Test cases in document order
    pub tests: Vec<TestCase>,
}

impl TestSuite {
    /// An empty suite.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package: String::new(),
            duration: Duration::ZERO,
            system_out: String::new(),
            system_err: String::new(),
            properties: IndexMap::new(),
            tests: Vec::new(),
        }
    }

    /// Counts per status.
    pub fn totals(&self) -> Totals {
        let mut totals = Totals {
            tests: self.tests.len(),
            ..Totals::default()
        };
        for test in &self.tests {
            match test.status() {
                TestStatus::Passed => totals.passed += 1,
                TestStatus::Skipped => totals.skipped += 1,
                TestStatus::Failed => totals.failed += 1,
                TestStatus::Error => totals.error += 1,
            }
        }
        totals
    }

    /// Whether any test carries an error detail.
    pub fn has_errors(&self) -> bool {
        self.tests.iter().any(|t| t.error().is_some())
    }
}

/// Parse a JUnit XML document into its suites.
///
/// Fails when the bytes are not well-formed XML or contain no suite.
pub fn parse_report(bytes: &[u8]) -> Result<Vec<TestSuite>> {
    let roots = parse_nodes(bytes)?;
    let mut suites = Vec::new();
    for root in &roots {
        collect_suites(root, &mut suites);
    }
    if suites.is_empty() {
        return Err(Error::report_parse("no test suites"));
    }
    Ok(suites)
}

/// Parse a duration written in seconds (`"1.5"`, `"1,234.5"`).
pub fn parse_seconds(raw: &str) -> Option<Duration> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    match cleaned.parse::<f64>() {
        Ok(secs) if secs >= 0.0 => Duration::try_from_secs_f64(secs).ok(),
        _ => None,
    }
}

#[derive(Debug, Default)]
struct Node {
    name: String,
    attrs: Vec<(String, String)>,
    text: String,
    children: Vec<Node>,
}

impl Node {
    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| Error::report_parse(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| Error::report_parse(e.to_string()))?
                .into_owned();
            attrs.push((key, value));
        }
        Ok(Self {
            name,
            attrs,
            ..Self::default()
        })
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn attr_or_empty(&self, key: &str) -> String {
        self.attr(key).unwrap_or_default().to_string()
    }

    fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    fn child_text(&self, name: &str) -> String {
        self.child(name)
            .map(|c| c.text.trim().to_string())
            .unwrap_or_default()
    }
}

fn attach(stack: &mut [Node], roots: &mut Vec<Node>, node: Node) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

fn parse_nodes(bytes: &[u8]) -> Result<Vec<Node>> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Node> = Vec::new();
    let mut roots = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::report_parse(format!("at byte {}: {e}", reader.buffer_position())))?;
        match event {
            Event::Start(start) => stack.push(Node::from_start(&start)?),
            Event::Empty(start) => {
                let node = Node::from_start(&start)?;
                attach(&mut stack, &mut roots, node);
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| Error::report_parse("unexpected closing tag"))?;
                attach(&mut stack, &mut roots, node);
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    let text = text
                        .unescape()
                        .map_err(|e| Error::report_parse(e.to_string()))?;
                    top.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(Error::report_parse(format!(
            "unclosed element <{}>",
            open.name
        )));
    }
    Ok(roots)
}

fn collect_suites(node: &Node, out: &mut Vec<TestSuite>) {
    if node.name == "testsuite" {
        out.push(ingest_suite(node));
    }
    for child in &node.children {
        if child.name == "testsuite" || child.name == "testsuites" {
            collect_suites(child, out);
        }
    }
}

fn ingest_properties(node: &Node) -> IndexMap<String, String> {
    let mut properties = IndexMap::new();
    let Some(list) = node.child("properties") else {
        return properties;
    };
    for property in list.children.iter().filter(|c| c.name == "property") {
        let Some(name) = property.attr("name") else {
            continue;
        };
        let value = property
            .attr("value")
            .map(str::to_string)
            .unwrap_or_else(|| property.text.trim().to_string());
        properties.insert(name.to_string(), value);
    }
    properties
}

fn ingest_suite(node: &Node) -> TestSuite {
    let tests: Vec<TestCase> = node
        .children
        .iter()
        .filter(|c| c.name == "testcase")
        .map(ingest_test)
        .collect();

    let duration = node
        .attr("time")
        .and_then(parse_seconds)
        .unwrap_or_else(|| tests.iter().map(|t| t.duration).sum());

    TestSuite {
        name: node.attr_or_empty("name"),
        package: node.attr_or_empty("package"),
        duration,
        system_out: node.child_text("system-out"),
        system_err: node.child_text("system-err"),
        properties: ingest_properties(node),
        tests,
    }
}

fn error_detail(node: &Node) -> ErrorDetail {
    ErrorDetail {
        message: node.attr_or_empty("message"),
        kind: node.attr_or_empty("type"),
        body: node.text.trim().to_string(),
    }
}

fn ingest_test(node: &Node) -> TestCase {
    let mut test = TestCase::new(node.attr_or_empty("name"), node.attr_or_empty("classname"))
        .with_duration(node.attr("time").and_then(parse_seconds).unwrap_or_default());
    test.system_out = node.child_text("system-out");
    test.system_err = node.child_text("system-err");
    test.properties = ingest_properties(node);

    // error wins over failure, failure over skipped
    if let Some(error) = node.child("error") {
        test.set_outcome(TestStatus::Error, Some(error_detail(error)));
    } else if let Some(failure) = node.child("failure") {
        test.set_outcome(TestStatus::Failed, Some(error_detail(failure)));
    } else if let Some(skipped) = node.child("skipped") {
        test.message = skipped.attr_or_empty("message");
        test.set_outcome(TestStatus::Skipped, None);
    }
    test
}
