// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

//! `GithubClient` against an in-process fake of the GitHub REST API.

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use junit_traces_adapters::locator::ArtifactLocator;
use junit_traces_adapters::upstream::github::{ArtifactApi, GithubClient};
use junit_traces_adapters::AdapterError;
use junit_traces_core::event::RepoCoordinates;
use junit_traces_core::RunEvent;
use std::collections::HashMap;

const TOKEN: &str = "test-token";
const ARCHIVE: &[u8] = b"PK\x05\x06\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0";

#[derive(Clone)]
struct Fake {
    base: String,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {TOKEN}"))
        .unwrap_or(false)
}

async fn list_artifacts(
    State(fake): State<Fake>,
    Path((_owner, _repo, run_id)): Path<(String, String, u64)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "Bad credentials").into_response();
    }
    let page: u64 = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let per_page: u64 = query
        .get("per_page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(30);
    let count = if page < 3 { per_page } else { 17 };
    let first = (page - 1) * per_page;
    let artifacts: Vec<_> = (first..first + count)
        .map(|id| {
            serde_json::json!({
                "id": id + 1,
                "name": if id % 2 == 0 { format!("a{id}-junit") } else { format!("a{id}-coverage") },
                "size_in_bytes": 10
            })
        })
        .collect();
    let body = Json(serde_json::json!({ "total_count": 217, "artifacts": artifacts }));

    let self_url = format!("{}/repos/octo/calc/actions/runs/{run_id}/artifacts", fake.base);
    if page < 3 {
        let link = format!(
            "<{self_url}?per_page={per_page}&page={}>; rel=\"next\", <{self_url}?per_page={per_page}&page=3>; rel=\"last\"",
            page + 1
        );
        ([(header::LINK, link)], body).into_response()
    } else {
        body.into_response()
    }
}

async fn artifact_zip(
    State(fake): State<Fake>,
    Path((_owner, _repo, id)): Path<(String, String, u64)>,
) -> Response {
    let artifact_url = |id: u64| format!("{}/repos/octo/calc/actions/artifacts/{id}/zip", fake.base);
    match id {
        7 => (
            StatusCode::FOUND,
            [(header::LOCATION, format!("{}/blob/7", fake.base))],
        )
            .into_response(),
        8 => (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, artifact_url(7))]).into_response(),
        9 => (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, artifact_url(9))]).into_response(),
        10 => (StatusCode::SEE_OTHER, [(header::LOCATION, artifact_url(7))]).into_response(),
        12 => StatusCode::FOUND.into_response(),
        _ => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}

async fn blob(headers: HeaderMap) -> Response {
    if headers.contains_key(header::AUTHORIZATION) {
        return (StatusCode::BAD_REQUEST, "storage rejects api tokens").into_response();
    }
    ARCHIVE.to_vec().into_response()
}

async fn workflow_run(Path((_owner, _repo, run_id)): Path<(String, String, u64)>) -> Response {
    run_body(run_id, 2).into_response()
}

async fn workflow_run_attempt(
    Path((_owner, _repo, run_id, attempt)): Path<(String, String, u64, u32)>,
) -> Response {
    run_body(run_id, attempt).into_response()
}

fn run_body(run_id: u64, attempt: u32) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "id": run_id,
        "name": "CI",
        "run_attempt": attempt,
        "status": "completed",
        "conclusion": "success",
        "path": ".github/workflows/ci.yml",
        "head_branch": "main",
        "head_sha": "abc123",
        "created_at": "2024-05-01T10:00:00Z",
        "run_started_at": "2024-05-01T10:01:00Z",
        "updated_at": "2024-05-01T10:05:30Z",
        "actor": {"login": "alice"},
        "triggering_actor": {"login": "bob"},
        "repository": {"full_name": "octo/calc", "name": "calc", "owner": {"login": "octo"}}
    }))
}

async fn spawn_fake() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let app = Router::new()
        .route(
            "/repos/:owner/:repo/actions/runs/:run_id/artifacts",
            get(list_artifacts),
        )
        .route(
            "/repos/:owner/:repo/actions/artifacts/:id/zip",
            get(artifact_zip),
        )
        .route("/repos/:owner/:repo/actions/runs/:run_id", get(workflow_run))
        .route(
            "/repos/:owner/:repo/actions/runs/:run_id/attempts/:attempt",
            get(workflow_run_attempt),
        )
        .route("/blob/:id", get(blob))
        .with_state(Fake { base: base.clone() });
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    base
}

fn repo() -> RepoCoordinates {
    RepoCoordinates::new("octo", "calc").unwrap()
}

#[tokio::test]
async fn test_list_all_follows_link_pagination() {
    let base = spawn_fake().await;
    let client = GithubClient::new(&base, Some(TOKEN)).unwrap();

    let first = client.list_artifacts(&repo(), 42, 1, 100).await.unwrap();
    assert_eq!(first.artifacts.len(), 100);
    assert_eq!(first.next_page, Some(2));

    let all = ArtifactLocator::new(&client).list_all(&repo(), 42).await.unwrap();
    assert_eq!(all.len(), 217);
    let mut ids: Vec<_> = all.iter().map(|a| a.id).collect();
    ids.dedup();
    assert_eq!(ids.len(), 217);
}

#[tokio::test]
async fn test_missing_token_surfaces_api_error() {
    let base = spawn_fake().await;
    let client = GithubClient::new(&base, None).unwrap();
    let err = client.list_artifacts(&repo(), 42, 1, 100).await.unwrap_err();
    match err {
        AdapterError::Api { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Bad credentials");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_download_url_from_found_redirect() {
    let base = spawn_fake().await;
    let client = GithubClient::new(&base, Some(TOKEN)).unwrap();
    let url = client.artifact_download_url(&repo(), 7, 3).await.unwrap();
    assert_eq!(url, format!("{base}/blob/7"));
}

#[tokio::test]
async fn test_download_url_follows_permanent_redirects() {
    let base = spawn_fake().await;
    let client = GithubClient::new(&base, Some(TOKEN)).unwrap();
    let url = client.artifact_download_url(&repo(), 8, 3).await.unwrap();
    assert_eq!(url, format!("{base}/blob/7"));

    let err = client.artifact_download_url(&repo(), 8, 0).await.unwrap_err();
    assert!(matches!(err, AdapterError::TooManyRedirects(0)));
}

#[tokio::test]
async fn test_download_url_redirect_bound() {
    let base = spawn_fake().await;
    let client = GithubClient::new(&base, Some(TOKEN)).unwrap();
    let err = client.artifact_download_url(&repo(), 9, 3).await.unwrap_err();
    assert!(matches!(err, AdapterError::TooManyRedirects(3)));
}

#[tokio::test]
async fn test_download_url_error_statuses() {
    let base = spawn_fake().await;
    let client = GithubClient::new(&base, Some(TOKEN)).unwrap();

    let err = client.artifact_download_url(&repo(), 10, 3).await.unwrap_err();
    assert!(matches!(err, AdapterError::UnexpectedRedirect { status: 303 }));

    let err = client.artifact_download_url(&repo(), 11, 3).await.unwrap_err();
    assert!(matches!(err, AdapterError::Api { status: 404, .. }));

    let err = client.artifact_download_url(&repo(), 12, 3).await.unwrap_err();
    assert!(matches!(err, AdapterError::MissingLocation));
}

#[tokio::test]
async fn test_download_streams_to_file_without_token() {
    let base = spawn_fake().await;
    let client = GithubClient::new(&base, Some(TOKEN)).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("a.zip");

    let written = client
        .download(&format!("{base}/blob/7"), &dest)
        .await
        .unwrap();
    assert_eq!(written, ARCHIVE.len() as u64);
    assert_eq!(std::fs::read(&dest).unwrap(), ARCHIVE);
}

#[tokio::test]
async fn test_workflow_run_lookup() {
    let base = spawn_fake().await;
    let client = GithubClient::new(&base, Some(TOKEN)).unwrap();

    let event = client.workflow_run(&repo(), 42, None).await.unwrap();
    assert!(event.is_completed());
    assert_eq!(event.workflow.path, ".github/workflows/ci.yml");
    let run = RunEvent::try_from(&event).unwrap();
    assert_eq!(run.run_id, 42);
    assert_eq!(run.run_attempt, 2);
    assert_eq!(run.repo_full_name, "octo/calc");
    assert_eq!(run.sender, "bob");

    let event = client.workflow_run(&repo(), 42, Some(1)).await.unwrap();
    assert_eq!(event.workflow_run.run_attempt, 1);
}
