// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

//! GitHub Actions REST adapter.
//!
//! [`ArtifactApi`] is the seam the locator, the fetcher and the CLI replay
//! command work against. [`GithubClient`] implements it with `reqwest`.
//!
//! # Example
//!
//! ```ignore
//! use junit_traces_adapters::upstream::github::{ArtifactApi, GithubClient};
//!
//! let client = GithubClient::new("https://api.github.com", Some(token))?;
//! let page = client.list_artifacts(&repo, run_id, 1, 100).await?;
//! ```

use crate::error::{AdapterError, Result};
use async_trait::async_trait;
use junit_traces_core::event::{
    RepoCoordinates, Repository, Workflow, WorkflowRun, WorkflowRunEvent, COMPLETED_ACTION,
};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{redirect, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Default GitHub REST API base URL.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// A remote-stored archive attached to a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Artifact ID
    pub id: u64,
    /// Artifact name
    pub name: String,
    /// Archive size
    #[serde(default, rename = "size_in_bytes")]
    pub size: u64,
    /// Whether the archive has expired
    #[serde(default)]
    pub expired: bool,
}

/// One page of an artifact listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactPage {
    /// Artifacts on this page
    pub artifacts: Vec<Artifact>,
    /// Next page cursor, `None` on the last page
    pub next_page: Option<u32>,
}

/// Operations consumed from the remote artifact API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArtifactApi: Send + Sync {
    /// List one page of the artifacts attached to a run.
    async fn list_artifacts(
        &self,
        repo: &RepoCoordinates,
        run_id: u64,
        page: u32,
        per_page: u32,
    ) -> Result<ArtifactPage>;

    /// Resolve the time-limited download URL of an artifact.
    async fn artifact_download_url(
        &self,
        repo: &RepoCoordinates,
        artifact_id: u64,
        max_redirects: u8,
    ) -> Result<String>;

    /// Stream the body at `url` into `dest`. Returns the number of bytes written.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64>;

    /// Fetch a workflow run, optionally a specific attempt of it.
    async fn workflow_run(
        &self,
        repo: &RepoCoordinates,
        run_id: u64,
        attempt: Option<u32>,
    ) -> Result<WorkflowRunEvent>;
}

#[derive(Debug, Deserialize)]
struct ArtifactList {
    #[serde(default)]
    artifacts: Vec<Artifact>,
}

#[derive(Debug, Deserialize)]
struct RunResponse {
    #[serde(flatten)]
    run: WorkflowRun,
    #[serde(default)]
    path: String,
    #[serde(default)]
    repository: Repository,
}

/// `reqwest` implementation of [`ArtifactApi`].
///
/// Redirects are never followed automatically: the download URL lives in
/// the `Location` header of the artifact endpoint's redirect.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    storage: reqwest::Client,
    base_url: Url,
}

impl GithubClient {
    /// Create a client for `api_url`, authenticated with `token` when given.
    pub fn new(api_url: &str, token: Option<&str>) -> Result<Self> {
        let base = if api_url.ends_with('/') {
            api_url.to_string()
        } else {
            format!("{api_url}/")
        };
        let base_url = Url::parse(&base)
            .map_err(|e| AdapterError::invalid_config(format!("invalid api url {api_url:?}: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static(API_VERSION),
        );
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| AdapterError::invalid_config("github token is not a valid header value"))?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .redirect(redirect::Policy::none())
            .build()?;
        // Signed storage URLs reject the API's bearer token.
        let storage = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            http,
            storage,
            base_url,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| AdapterError::invalid_config(format!("invalid endpoint {path:?}: {e}")))
    }

    async fn get(&self, url: Url) -> Result<Response> {
        debug!(url = %url, "GET");
        Ok(self.http.get(url).send().await?)
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(AdapterError::Api {
        status: status.as_u16(),
        message,
    })
}

/// The `page` cursor of the `rel="next"` entry of a `Link` header.
pub fn next_page(link_header: &str) -> Option<u32> {
    link_header.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|param| param.trim() == r#"rel="next""#);
        if !is_next {
            return None;
        }
        let url = Url::parse(target.strip_prefix('<')?.strip_suffix('>')?).ok()?;
        let page = url
            .query_pairs()
            .find(|(key, _)| key == "page")
            .and_then(|(_, value)| value.parse().ok());
        page
    })
}

#[async_trait]
impl ArtifactApi for GithubClient {
    async fn list_artifacts(
        &self,
        repo: &RepoCoordinates,
        run_id: u64,
        page: u32,
        per_page: u32,
    ) -> Result<ArtifactPage> {
        let mut url = self.endpoint(&format!(
            "repos/{}/{}/actions/runs/{run_id}/artifacts",
            repo.owner, repo.name
        ))?;
        url.query_pairs_mut()
            .append_pair("per_page", &per_page.to_string())
            .append_pair("page", &page.to_string());

        let response = ensure_success(self.get(url).await?).await?;
        let next = response
            .headers()
            .get(header::LINK)
            .and_then(|value| value.to_str().ok())
            .and_then(next_page);
        let list: ArtifactList = response.json().await?;

        Ok(ArtifactPage {
            artifacts: list.artifacts,
            next_page: next,
        })
    }

    async fn artifact_download_url(
        &self,
        repo: &RepoCoordinates,
        artifact_id: u64,
        max_redirects: u8,
    ) -> Result<String> {
        let mut url = self.endpoint(&format!(
            "repos/{}/{}/actions/artifacts/{artifact_id}/zip",
            repo.owner, repo.name
        ))?;

        let mut redirects = 0u8;
        loop {
            let response = self.get(url.clone()).await?;
            match response.status() {
                StatusCode::FOUND => return location(&response),
                StatusCode::MOVED_PERMANENTLY => {
                    if redirects >= max_redirects {
                        return Err(AdapterError::TooManyRedirects(max_redirects));
                    }
                    redirects += 1;
                    let next = location(&response)?;
                    url = url.join(&next).map_err(|_| AdapterError::MissingLocation)?;
                    debug!(artifact_id, redirects, "Following permanent redirect");
                }
                status if status.is_client_error() || status.is_server_error() => {
                    return Err(AdapterError::Api {
                        status: status.as_u16(),
                        message: response.text().await.unwrap_or_default(),
                    });
                }
                status => {
                    return Err(AdapterError::UnexpectedRedirect {
                        status: status.as_u16(),
                    });
                }
            }
        }
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let url = Url::parse(url).map_err(|_| AdapterError::MissingLocation)?;
        debug!(dest = %dest.display(), "Downloading artifact archive");
        let mut response = ensure_success(self.storage.get(url).send().await?).await?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }

    async fn workflow_run(
        &self,
        repo: &RepoCoordinates,
        run_id: u64,
        attempt: Option<u32>,
    ) -> Result<WorkflowRunEvent> {
        let path = match attempt {
            Some(attempt) => format!(
                "repos/{}/{}/actions/runs/{run_id}/attempts/{attempt}",
                repo.owner, repo.name
            ),
            None => format!("repos/{}/{}/actions/runs/{run_id}", repo.owner, repo.name),
        };
        let response = ensure_success(self.get(self.endpoint(&path)?).await?).await?;
        let body: RunResponse = response.json().await?;

        let mut repository = body.repository;
        if repository.full_name.is_empty() {
            repository.full_name = repo.full_name();
        }
        Ok(WorkflowRunEvent {
            action: COMPLETED_ACTION.to_string(),
            sender: body.run.triggering_actor.clone(),
            workflow_run: body.run,
            workflow: Workflow { path: body.path },
            repository,
        })
    }
}

fn location(response: &Response) -> Result<String> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or(AdapterError::MissingLocation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_page_from_link_header() {
        let link = r#"<https://api.github.com/repositories/1/actions/runs/42/artifacts?per_page=100&page=2>; rel="next", <https://api.github.com/repositories/1/actions/runs/42/artifacts?per_page=100&page=3>; rel="last""#;
        assert_eq!(next_page(link), Some(2));
    }

    #[test]
    fn test_next_page_absent_on_last_page() {
        let link = r#"<https://api.github.com/x?page=1>; rel="prev", <https://api.github.com/x?page=1>; rel="first""#;
        assert_eq!(next_page(link), None);
        assert_eq!(next_page(""), None);
    }

    #[test]
    fn test_artifact_deserialization() {
        let artifact: Artifact = serde_json::from_value(serde_json::json!({
            "id": 11,
            "name": "unit-junit",
            "size_in_bytes": 2048,
            "expired": false,
            "archive_download_url": "https://api.github.com/repos/o/r/actions/artifacts/11/zip"
        }))
        .unwrap();
        assert_eq!(artifact.id, 11);
        assert_eq!(artifact.size, 2048);
    }

    #[test]
    fn test_client_rejects_invalid_base_url() {
        assert!(GithubClient::new("not a url", None).is_err());
        assert!(GithubClient::new(DEFAULT_API_URL, Some("token")).is_ok());
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = GithubClient::new("https://ghe.example.com/api/v3", None).unwrap();
        let url = client.endpoint("repos/o/r/actions/runs/1/artifacts").unwrap();
        assert_eq!(
            url.as_str(),
            "https://ghe.example.com/api/v3/repos/o/r/actions/runs/1/artifacts"
        );
    }
}
