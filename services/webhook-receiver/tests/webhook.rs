// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

//! End-to-end delivery handling against a fake artifact API.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use junit_traces_adapters::config::{ReceiverConfig, Secret};
use junit_traces_adapters::consumer::TraceConsumer;
use junit_traces_adapters::upstream::github::{Artifact, ArtifactApi, ArtifactPage};
use junit_traces_adapters::{AdapterError, Pipeline, PipelineSettings, Result};
use junit_traces_core::event::{RepoCoordinates, WorkflowRunEvent};
use junit_traces_core::span::StatusCode as SpanStatus;
use junit_traces_core::Trace;
use junit_webhook_receiver::middleware::signature::sign;
use junit_webhook_receiver::{router, AppState};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const SECRET: &str = "hook-secret";
const PATH: &str = "/githubactionsjunit";

const CALC: &str = r#"<testsuite name="Calc" time="0.3">
    <testcase name="add" classname="CalcTest" time="0.1"/>
    <testcase name="sub" classname="CalcTest" time="0.2">
        <failure message="mismatch">expected 1 got 2</failure>
    </testcase>
</testsuite>"#;

#[derive(Default)]
struct FakeApi {
    artifacts: Vec<Artifact>,
    archives: HashMap<u64, Vec<u8>>,
    listing_error: Option<u16>,
}

impl FakeApi {
    fn with_report(mut self, id: u64, name: &str, xml: &str) -> Self {
        self.artifacts.push(Artifact {
            id,
            name: name.to_string(),
            size: 0,
            expired: false,
        });
        self.archives.insert(id, zip_bytes(&[("report.xml", xml)]));
        self
    }

    fn with_artifact(mut self, id: u64, name: &str) -> Self {
        self.artifacts.push(Artifact {
            id,
            name: name.to_string(),
            size: 0,
            expired: false,
        });
        self
    }
}

#[async_trait]
impl ArtifactApi for FakeApi {
    async fn list_artifacts(
        &self,
        _repo: &RepoCoordinates,
        _run_id: u64,
        _page: u32,
        _per_page: u32,
    ) -> Result<ArtifactPage> {
        if let Some(status) = self.listing_error {
            return Err(AdapterError::Api {
                status,
                message: "listing failed".to_string(),
            });
        }
        Ok(ArtifactPage {
            artifacts: self.artifacts.clone(),
            next_page: None,
        })
    }

    async fn artifact_download_url(
        &self,
        _repo: &RepoCoordinates,
        artifact_id: u64,
        _max_redirects: u8,
    ) -> Result<String> {
        Ok(format!("https://storage.example/{artifact_id}"))
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let id: u64 = url.rsplit('/').next().and_then(|s| s.parse().ok()).unwrap_or(0);
        let body = self.archives.get(&id).cloned().unwrap_or_default();
        std::fs::write(dest, &body)?;
        Ok(body.len() as u64)
    }

    async fn workflow_run(
        &self,
        _repo: &RepoCoordinates,
        _run_id: u64,
        _attempt: Option<u32>,
    ) -> Result<WorkflowRunEvent> {
        Err(AdapterError::Api {
            status: 404,
            message: "Not Found".to_string(),
        })
    }
}

#[derive(Default)]
struct RecordingConsumer {
    traces: Mutex<Vec<Trace>>,
    fail: bool,
}

#[async_trait]
impl TraceConsumer for RecordingConsumer {
    async fn consume(&self, trace: Trace) -> Result<()> {
        if self.fail {
            return Err(AdapterError::Consumer("backend unavailable".to_string()));
        }
        self.traces.lock().unwrap().push(trace);
        Ok(())
    }
}

fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, body) in entries {
        writer
            .start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

struct Harness {
    app: Router,
    consumer: Arc<RecordingConsumer>,
    _scratch: tempfile::TempDir,
}

fn harness(api: FakeApi, consumer: RecordingConsumer, secret: &str) -> Harness {
    let scratch = tempfile::tempdir().unwrap();
    let mut config = ReceiverConfig::default();
    config.github.webhook_secret = Secret::new(secret);
    config.artifacts.scratch_dir = scratch.path().to_path_buf();

    let pipeline = Pipeline::new(Arc::new(api), PipelineSettings::from(&config.artifacts));
    let consumer = Arc::new(consumer);
    let state = AppState::new(config, pipeline, consumer.clone());
    Harness {
        app: router(Arc::new(state)),
        consumer,
        _scratch: scratch,
    }
}

fn payload(action: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "action": action,
        "workflow_run": {
            "id": 42,
            "name": "CI",
            "run_attempt": 1,
            "status": "completed",
            "conclusion": "failure",
            "head_branch": "main",
            "head_sha": "abc123",
            "created_at": "2024-05-01T10:00:00Z",
            "run_started_at": "2024-05-01T10:01:00Z",
            "updated_at": "2024-05-01T10:05:30Z",
            "actor": {"login": "alice"}
        },
        "workflow": {"path": ".github/workflows/ci.yml"},
        "repository": {"full_name": "octo/calc", "name": "calc", "owner": {"login": "octo"}},
        "sender": {"login": "alice"}
    }))
    .unwrap()
}

fn delivery(event: &str, body: Vec<u8>, signature: Option<String>) -> Request<Body> {
    let mut builder = Request::post(PATH)
        .header("content-type", "application/json")
        .header("x-github-event", event)
        .header("x-github-delivery", "72d3162e-cc78-11e3-81ab-4c9367dc0958");
    if let Some(signature) = signature {
        builder = builder.header("x-hub-signature-256", signature);
    }
    builder.body(Body::from(body)).unwrap()
}

fn signed(event: &str, body: Vec<u8>) -> Request<Body> {
    let signature = sign(SECRET.as_bytes(), &body);
    delivery(event, body, Some(signature))
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let h = harness(FakeApi::default(), RecordingConsumer::default(), SECRET);
    let response = h
        .app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let h = harness(FakeApi::default(), RecordingConsumer::default(), SECRET);
    let response = h
        .app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_completed_run_is_traced_and_consumed() {
    let api = FakeApi::default()
        .with_report(1, "unit-junit", CALC)
        .with_artifact(2, "coverage");
    let h = harness(api, RecordingConsumer::default(), SECRET);

    let response = h
        .app
        .oneshot(signed("workflow_run", payload("completed")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "accepted");
    assert_eq!(body["spans"], 4);
    assert_eq!(body["trace_id"], "0330c15a8d3e153086738dd3191a6497");

    let traces = h.consumer.traces.lock().unwrap();
    assert_eq!(traces.len(), 1);
    let trace = &traces[0];
    assert_eq!(trace.root.status, SpanStatus::Error);
    assert_eq!(trace.suites[0].name, "Calc");
    assert_eq!(trace.suites[0].status, SpanStatus::Error);
    assert_eq!(trace.tests.len(), 2);
}

#[tokio::test]
async fn test_missing_signature_is_unauthorized() {
    let api = FakeApi::default().with_report(1, "unit-junit", CALC);
    let h = harness(api, RecordingConsumer::default(), SECRET);
    let response = h
        .app
        .oneshot(delivery("workflow_run", payload("completed"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(h.consumer.traces.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_wrong_signature_is_unauthorized() {
    let h = harness(FakeApi::default(), RecordingConsumer::default(), SECRET);
    let body = payload("completed");
    let signature = sign(b"another-secret", &body);
    let response = h
        .app
        .oneshot(delivery("workflow_run", body, Some(signature)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"]["code"], "INVALID_SIGNATURE");
}

#[tokio::test]
async fn test_empty_secret_skips_verification() {
    let api = FakeApi::default().with_report(1, "unit-junit", CALC);
    let h = harness(api, RecordingConsumer::default(), "");
    let response = h
        .app
        .oneshot(delivery("workflow_run", payload("completed"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.consumer.traces.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unparseable_payload_is_bad_request() {
    let h = harness(FakeApi::default(), RecordingConsumer::default(), SECRET);
    let response = h
        .app
        .oneshot(signed("workflow_run", b"{not json".to_vec()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_event_type_is_bad_request() {
    let h = harness(FakeApi::default(), RecordingConsumer::default(), "");
    let request = Request::post(PATH)
        .body(Body::from(payload("completed")))
        .unwrap();
    let response = h.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_other_events_are_ignored() {
    let api = FakeApi::default().with_report(1, "unit-junit", CALC);
    let h = harness(api, RecordingConsumer::default(), SECRET);
    let response = h
        .app
        .oneshot(signed("push", b"{\"ref\":\"refs/heads/main\"}".to_vec()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ignored");
    assert!(h.consumer.traces.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_runs_in_progress_are_ignored() {
    let api = FakeApi::default().with_report(1, "unit-junit", CALC);
    let h = harness(api, RecordingConsumer::default(), SECRET);
    let response = h
        .app
        .oneshot(signed("workflow_run", payload("in_progress")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ignored");
    assert!(h.consumer.traces.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_run_without_reports_is_accepted_without_consuming() {
    let api = FakeApi::default().with_artifact(2, "coverage");
    let h = harness(api, RecordingConsumer::default(), SECRET);
    let response = h
        .app
        .oneshot(signed("workflow_run", payload("completed")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "no_reports");
    assert!(h.consumer.traces.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_listing_failure_is_internal_error() {
    let api = FakeApi {
        listing_error: Some(403),
        ..FakeApi::default()
    };
    let h = harness(api, RecordingConsumer::default(), SECRET);
    let response = h
        .app
        .oneshot(signed("workflow_run", payload("completed")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["error"]["code"], "DELIVERY_FAILED");
}

#[tokio::test]
async fn test_consumer_failure_is_internal_error() {
    let api = FakeApi::default().with_report(1, "unit-junit", CALC);
    let consumer = RecordingConsumer {
        fail: true,
        ..RecordingConsumer::default()
    };
    let h = harness(api, consumer, SECRET);
    let response = h
        .app
        .oneshot(signed("workflow_run", payload("completed")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_redelivery_yields_identical_trace() {
    let api = FakeApi::default().with_report(1, "unit-junit", CALC);
    let h = harness(api, RecordingConsumer::default(), SECRET);
    for _ in 0..2 {
        let response = h
            .app
            .clone()
            .oneshot(signed("workflow_run", payload("completed")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    let traces = h.consumer.traces.lock().unwrap();
    assert_eq!(traces.len(), 2);
    let ids = |t: &Trace| t.spans().map(|s| s.span_id).collect::<Vec<_>>();
    assert_eq!(ids(&traces[0]), ids(&traces[1]));
}
