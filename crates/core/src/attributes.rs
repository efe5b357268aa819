// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

//! Span and resource attributes.
//!
//! [`Attributes`] is an insertion-ordered map with unique keys. Resource
//! attributes describe the run once per trace and are computed by the pure
//! [`resource_attributes`] function; suite and test attribute keys live in
//! [`keys`].

use crate::event::RunEvent;
use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Attribute key names.
pub mod keys {
    /// Service name resource attribute.
    pub const SERVICE_NAME: &str = "service.name";
    /// Namespace of the code under test.
    pub const CODE_NAMESPACE: &str = "code.namespace";
    /// Function under test.
    pub const CODE_FUNCTION: &str = "code.function";

    /// Number of failed tests in a suite.
    pub const SUITE_FAILED: &str = "tests.suite.failed";
    /// Number of errored tests in a suite.
    pub const SUITE_ERROR: &str = "tests.suite.error";
    /// Number of passed tests in a suite.
    pub const SUITE_PASSED: &str = "tests.suite.passed";
    /// Number of skipped tests in a suite.
    pub const SUITE_SKIPPED: &str = "tests.suite.skipped";
    /// Suite duration in milliseconds.
    pub const SUITE_DURATION: &str = "tests.suite.duration";
    /// Suite name.
    pub const SUITE_NAME: &str = "tests.suite.suitename";
    /// Suite standard error.
    pub const SUITE_SYSTEM_ERR: &str = "tests.suite.systemerr";
    /// Suite standard output.
    pub const SUITE_SYSTEM_OUT: &str = "tests.suite.systemout";
    /// Number of tests in a suite.
    pub const SUITE_TOTAL: &str = "tests.suite.total";

    /// Test classname.
    pub const CASE_CLASSNAME: &str = "tests.case.classname";
    /// Test duration in milliseconds.
    pub const CASE_DURATION: &str = "tests.case.duration";
    /// Failure or error text.
    pub const CASE_ERROR: &str = "tests.case.error";
    /// Test message.
    pub const CASE_MESSAGE: &str = "tests.case.message";
    /// Test status.
    pub const CASE_STATUS: &str = "tests.case.status";
    /// Test standard error.
    pub const CASE_SYSTEM_ERR: &str = "tests.case.systemerr";
    /// Test standard output.
    pub const CASE_SYSTEM_OUT: &str = "tests.case.systemout";

    /// CI system name.
    pub const CI_SYSTEM: &str = "ci.system";
    /// Prefix of workflow run resource attributes.
    pub const CI_RUN_PREFIX: &str = "ci.github.workflow.run";
    /// SCM system name.
    pub const SCM_SYSTEM: &str = "scm.system";
    /// Prefix of git resource attributes.
    pub const SCM_GIT_PREFIX: &str = "scm.git";
}

/// An attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// String value
    Str(String),
    /// Integer value
    Int(i64),
}

impl AttributeValue {
    /// The string value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Str(s) => Some(s),
            AttributeValue::Int(_) => None,
        }
    }

    /// The integer value, if this is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(i) => Some(*i),
            AttributeValue::Str(_) => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Str(s) => f.write_str(s),
            AttributeValue::Int(i) => write!(f, "{i}"),
        }
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Str(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Str(value.to_string())
    }
}

impl From<&String> for AttributeValue {
    fn from(value: &String) -> Self {
        AttributeValue::Str(value.clone())
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<u32> for AttributeValue {
    fn from(value: u32) -> Self {
        AttributeValue::Int(i64::from(value))
    }
}

impl From<usize> for AttributeValue {
    fn from(value: usize) -> Self {
        AttributeValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<u64> for AttributeValue {
    fn from(value: u64) -> Self {
        AttributeValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

/// Ordered attribute map with unique keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Attributes(IndexMap<String, AttributeValue>);

impl Attributes {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value. A replaced key keeps its position.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Insert a value unless the key is already present.
    ///
    /// Returns `false` when the key was taken.
    pub fn put_if_absent(
        &mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> bool {
        match self.0.entry(key.into()) {
            indexmap::map::Entry::Occupied(_) => false,
            indexmap::map::Entry::Vacant(slot) => {
                slot.insert(value.into());
                true
            }
        }
    }

    /// Look up a value.
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.0.get(key)
    }

    /// Look up a string value.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(AttributeValue::as_str)
    }

    /// Look up an integer value.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(AttributeValue::as_int)
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<AttributeValue>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (k, v) in iter {
            attrs.put(k, v);
        }
        attrs
    }
}

/// Service name for a repository: lowercase, `/` and `_` become `-`.
pub fn service_name(repo_full_name: &str) -> String {
    repo_full_name.replace(['/', '_'], "-").to_lowercase()
}

/// Turn a pull request API URL into its browsable form.
///
/// `https://api.github.com/repos/o/r/pulls/7` becomes
/// `https://github.com/o/r/pull/7`.
pub fn pull_request_html_url(api_url: &str) -> String {
    api_url
        .replacen("/repos", "", 1)
        .replacen("/pulls", "/pull", 1)
        .replacen("api.", "", 1)
}

/// Turn a GitHub API URL into its browsable form.
pub fn github_html_url(api_url: &str) -> String {
    api_url.replacen("api.github.com/repos", "github.com", 1)
}

fn rfc3339(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Resource attributes describing one run.
///
/// Attached once per trace, never per span.
pub fn resource_attributes(run: &RunEvent) -> Attributes {
    let mut attrs = Attributes::new();
    let ci = |key: &str| format!("{}.{key}", keys::CI_RUN_PREFIX);
    let git = |key: &str| format!("{}.{key}", keys::SCM_GIT_PREFIX);

    attrs.put(keys::SERVICE_NAME, service_name(&run.repo_full_name));

    attrs.put(ci("actor.login"), &run.actor);
    attrs.put(ci("conclusion"), run.conclusion.as_str());
    attrs.put(ci("created_at"), rfc3339(run.created_at));
    attrs.put(ci("display_title"), &run.display_title);
    attrs.put(ci("event"), &run.trigger_event);
    attrs.put(ci("head_branch"), &run.head_branch);
    attrs.put(ci("head_sha"), &run.head_sha);
    attrs.put(ci("html_url"), &run.html_url);
    attrs.put(ci("id"), run.run_id);
    attrs.put(ci("name"), &run.name);
    attrs.put(ci("path"), &run.workflow_path);
    if let Some(url) = &run.previous_attempt_url {
        attrs.put(ci("previous_attempt_url"), github_html_url(url));
    }
    if !run.referenced_workflows.is_empty() {
        attrs.put(ci("referenced_workflows"), run.referenced_workflows.join(";"));
    }
    attrs.put(ci("run_attempt"), run.run_attempt);
    attrs.put(ci("run_started_at"), rfc3339(run.started_at));
    attrs.put(ci("status"), &run.status);
    attrs.put(ci("sender.login"), &run.sender);
    attrs.put(ci("triggering_actor.login"), &run.triggering_actor);
    attrs.put(ci("updated_at"), rfc3339(run.updated_at));
    attrs.put(ci("duration_millis"), run.duration().num_milliseconds());

    attrs.put(keys::CI_SYSTEM, "github");
    attrs.put(keys::SCM_SYSTEM, "git");

    attrs.put(git("head_branch"), &run.head_branch);
    let commit = run.head_commit.clone().unwrap_or_default();
    attrs.put(git("head_commit.author.email"), commit.author.email);
    attrs.put(git("head_commit.author.name"), commit.author.name);
    attrs.put(git("head_commit.committer.email"), commit.committer.email);
    attrs.put(git("head_commit.committer.name"), commit.committer.name);
    attrs.put(git("head_commit.message"), commit.message);
    attrs.put(
        git("head_commit.timestamp"),
        commit.timestamp.map(rfc3339).unwrap_or_default(),
    );
    attrs.put(git("head_sha"), &run.head_sha);
    if !run.pull_request_urls.is_empty() {
        let urls: Vec<String> = run
            .pull_request_urls
            .iter()
            .map(|url| pull_request_html_url(url))
            .collect();
        attrs.put(git("pull_requests.url"), urls.join(";"));
    }
    attrs.put(git("repo"), &run.repo_full_name);

    attrs
}
