// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

//! Inbound webhook events.
//!
//! [`WebhookEvent`] is the closed set of event kinds the receiver reacts to.
//! A `workflow_run` payload decodes into [`WorkflowRunEvent`], which mirrors
//! the GitHub webhook JSON. Only completed runs are projected into a
//! [`RunEvent`], the immutable value the rest of the pipeline works from.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Webhook event type header value for workflow runs.
pub const WORKFLOW_RUN_EVENT: &str = "workflow_run";

/// Action value of a finished run.
pub const COMPLETED_ACTION: &str = "completed";

/// A decoded webhook delivery.
#[derive(Debug, Clone)]
pub enum WebhookEvent {
    /// A `workflow_run` event (any action).
    WorkflowRun(Box<WorkflowRunEvent>),
    /// Any other event type. Not decoded.
    Other {
        /// Value of the event type header
        kind: String,
    },
}

impl WebhookEvent {
    /// Decode a payload according to its event type.
    pub fn parse(event_type: &str, payload: &[u8]) -> Result<Self> {
        match event_type {
            WORKFLOW_RUN_EVENT => Ok(WebhookEvent::WorkflowRun(Box::new(
                serde_json::from_slice(payload)?,
            ))),
            other => Ok(WebhookEvent::Other {
                kind: other.to_string(),
            }),
        }
    }

    /// The completed run carried by this event, if any.
    pub fn completed_run(&self) -> Option<&WorkflowRunEvent> {
        match self {
            WebhookEvent::WorkflowRun(event) if event.is_completed() => Some(event),
            _ => None,
        }
    }
}

/// Login of a GitHub user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Login {
    /// User login
    #[serde(default)]
    pub login: String,
}

/// Git identity on a commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitIdentity {
    /// Name
    #[serde(default)]
    pub name: String,
    /// Email address
    #[serde(default)]
    pub email: String,
}

/// Head commit of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadCommit {
    /// Commit message
    #[serde(default)]
    pub message: String,
    /// Commit timestamp
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Author
    #[serde(default)]
    pub author: CommitIdentity,
    /// Committer
    #[serde(default)]
    pub committer: CommitIdentity,
}

/// Entry of `referenced_workflows`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencedWorkflow {
    /// Workflow file path
    #[serde(default)]
    pub path: String,
}

/// Entry of `pull_requests`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRef {
    /// API URL of the pull request
    #[serde(default)]
    pub url: String,
}

/// The `workflow_run` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRun {
    /// Run ID
    pub id: u64,
    /// Workflow name
    #[serde(default)]
    pub name: String,
    /// Attempt number, starting at 1
    #[serde(default)]
    pub run_attempt: u32,
    /// Run status (`completed`, `in_progress`, ...)
    #[serde(default)]
    pub status: String,
    /// Run conclusion (`success`, `failure`, ...)
    #[serde(default)]
    pub conclusion: Option<String>,
    /// Triggering event (`push`, `pull_request`, ...)
    #[serde(default)]
    pub event: String,
    /// Title shown in the UI
    #[serde(default)]
    pub display_title: String,
    /// Browsable URL of the run
    #[serde(default)]
    pub html_url: String,
    /// Branch the run was triggered on
    #[serde(default)]
    pub head_branch: Option<String>,
    /// Commit SHA the run was triggered on
    #[serde(default)]
    pub head_sha: String,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Start of this attempt
    #[serde(default)]
    pub run_started_at: Option<DateTime<Utc>>,
    /// API URL of the previous attempt
    #[serde(default)]
    pub previous_attempt_url: Option<String>,
    /// Reusable workflows used by the run
    #[serde(default)]
    pub referenced_workflows: Vec<ReferencedWorkflow>,
    /// Associated pull requests
    #[serde(default)]
    pub pull_requests: Vec<PullRequestRef>,
    /// User who started the first attempt
    #[serde(default)]
    pub actor: Login,
    /// User who started this attempt
    #[serde(default)]
    pub triggering_actor: Login,
    /// Head commit details
    #[serde(default)]
    pub head_commit: Option<HeadCommit>,
}

/// The `workflow` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    /// Workflow file path
    #[serde(default)]
    pub path: String,
}

/// The `repository` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// `owner/name`
    #[serde(default)]
    pub full_name: String,
    /// Repository name
    #[serde(default)]
    pub name: String,
    /// Owning account
    #[serde(default)]
    pub owner: Login,
}

/// A `workflow_run` webhook payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRunEvent {
    /// `requested`, `in_progress` or `completed`
    #[serde(default)]
    pub action: String,
    /// The run
    pub workflow_run: WorkflowRun,
    /// The workflow definition
    #[serde(default)]
    pub workflow: Workflow,
    /// The repository
    #[serde(default)]
    pub repository: Repository,
    /// Account that delivered the event
    #[serde(default)]
    pub sender: Login,
}

impl WorkflowRunEvent {
    /// Whether the run has finished.
    pub fn is_completed(&self) -> bool {
        self.action == COMPLETED_ACTION
    }
}

/// Final state of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conclusion {
    /// Run succeeded.
    Success,
    /// Run failed.
    Failure,
    /// Anything else (`cancelled`, `skipped`, `timed_out`, ...), verbatim.
    Other(String),
}

impl Conclusion {
    /// The conclusion as GitHub spells it.
    pub fn as_str(&self) -> &str {
        match self {
            Conclusion::Success => "success",
            Conclusion::Failure => "failure",
            Conclusion::Other(value) => value,
        }
    }
}

impl From<&str> for Conclusion {
    fn from(value: &str) -> Self {
        match value {
            "success" => Conclusion::Success,
            "failure" => Conclusion::Failure,
            other => Conclusion::Other(other.to_string()),
        }
    }
}

/// Owner and name of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoCoordinates {
    /// Owner login
    pub owner: String,
    /// Repository name
    pub name: String,
}

impl RepoCoordinates {
    /// Build coordinates, rejecting empty parts.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let owner = owner.into();
        let name = name.into();
        if owner.is_empty() || name.is_empty() {
            return Err(Error::invalid_input(
                "repository owner and name must be non-empty",
            ));
        }
        Ok(Self { owner, name })
    }

    /// Parse `owner/name`.
    pub fn parse(full_name: &str) -> Result<Self> {
        let (owner, name) = full_name
            .split_once('/')
            .ok_or_else(|| Error::invalid_input(format!("expected owner/name, got {full_name:?}")))?;
        Self::new(owner, name)
    }

    /// `owner/name`.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// One completed run, validated and ready for mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunEvent {
    /// Run ID
    pub run_id: u64,
    /// Attempt number, at least 1
    pub run_attempt: u32,
    /// Workflow name
    pub name: String,
    /// Final state
    pub conclusion: Conclusion,
    /// Run status string
    pub status: String,
    /// Repository coordinates
    pub repo: RepoCoordinates,
    /// `owner/name` as reported by the event
    pub repo_full_name: String,
    /// Head branch
    pub head_branch: String,
    /// Head commit SHA
    pub head_sha: String,
    /// First-attempt actor
    pub actor: String,
    /// Actor of this attempt
    pub triggering_actor: String,
    /// Account that delivered the event
    pub sender: String,
    /// Triggering event
    pub trigger_event: String,
    /// Display title
    pub display_title: String,
    /// Browsable run URL
    pub html_url: String,
    /// Workflow file path
    pub workflow_path: String,
    /// Run creation time
    pub created_at: DateTime<Utc>,
    /// Start of this attempt
    pub started_at: DateTime<Utc>,
    /// Last update
    pub updated_at: DateTime<Utc>,
    /// API URL of the previous attempt
    pub previous_attempt_url: Option<String>,
    /// Paths of reusable workflows
    pub referenced_workflows: Vec<String>,
    /// API URLs of associated pull requests
    pub pull_request_urls: Vec<String>,
    /// Head commit, when the event carries one
    pub head_commit: Option<HeadCommit>,
}

impl RunEvent {
    /// Whether a span link to the previous attempt should be emitted.
    pub fn links_previous_attempt(&self) -> bool {
        self.run_attempt > 1 && self.previous_attempt_url.is_some()
    }

    /// Wall-clock duration of this attempt.
    pub fn duration(&self) -> chrono::Duration {
        self.updated_at.signed_duration_since(self.started_at)
    }
}

impl TryFrom<&WorkflowRunEvent> for RunEvent {
    type Error = Error;

    fn try_from(event: &WorkflowRunEvent) -> Result<Self> {
        let run = &event.workflow_run;
        if run.id == 0 {
            return Err(Error::invalid_input("workflow_run.id is required"));
        }

        let repo = if event.repository.owner.login.is_empty() || event.repository.name.is_empty() {
            RepoCoordinates::parse(&event.repository.full_name)?
        } else {
            RepoCoordinates::new(&event.repository.owner.login, &event.repository.name)?
        };

        let created_at = run
            .created_at
            .or(run.run_started_at)
            .ok_or_else(|| Error::invalid_input("workflow_run.created_at is required"))?;
        let started_at = run.run_started_at.unwrap_or(created_at);
        let updated_at = run.updated_at.unwrap_or(started_at);

        Ok(RunEvent {
            run_id: run.id,
            run_attempt: run.run_attempt.max(1),
            name: run.name.clone(),
            conclusion: Conclusion::from(run.conclusion.as_deref().unwrap_or_default()),
            status: run.status.clone(),
            repo_full_name: if event.repository.full_name.is_empty() {
                repo.full_name()
            } else {
                event.repository.full_name.clone()
            },
            repo,
            head_branch: run.head_branch.clone().unwrap_or_default(),
            head_sha: run.head_sha.clone(),
            actor: run.actor.login.clone(),
            triggering_actor: run.triggering_actor.login.clone(),
            sender: event.sender.login.clone(),
            trigger_event: run.event.clone(),
            display_title: run.display_title.clone(),
            html_url: run.html_url.clone(),
            workflow_path: event.workflow.path.clone(),
            created_at,
            started_at,
            updated_at,
            previous_attempt_url: run
                .previous_attempt_url
                .clone()
                .filter(|url| !url.is_empty()),
            referenced_workflows: run
                .referenced_workflows
                .iter()
                .map(|w| w.path.clone())
                .collect(),
            pull_request_urls: run.pull_requests.iter().map(|p| p.url.clone()).collect(),
            head_commit: run.head_commit.clone(),
        })
    }
}
