// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

//! Per-delivery pipeline: locate, filter, fetch, extract, build, assemble.
//!
//! One delivery runs sequentially from start to finish and owns everything
//! it creates. Separate deliveries share only the API client.

use crate::config::ArtifactsConfig;
use crate::error::Result;
use crate::extractor::extract_suites;
use crate::fetcher::{default_scratch_dir, ArtifactFetcher, DEFAULT_MAX_REDIRECTS};
use crate::locator::{filter_report_artifacts, ArtifactLocator, DEFAULT_REPORT_SUFFIX, PAGE_SIZE};
use crate::upstream::github::ArtifactApi;
use junit_traces_core::{RunEvent, Trace};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Tunables of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Name suffix of report artifacts
    pub suffix: String,
    /// Scratch directory for downloaded archives
    pub scratch_dir: PathBuf,
    /// Redirect bound when resolving download URLs
    pub max_redirects: u8,
    /// Listing page size
    pub page_size: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_REPORT_SUFFIX.to_string(),
            scratch_dir: default_scratch_dir(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            page_size: PAGE_SIZE,
        }
    }
}

impl From<&ArtifactsConfig> for PipelineSettings {
    fn from(config: &ArtifactsConfig) -> Self {
        Self {
            suffix: config.suffix.clone(),
            scratch_dir: config.scratch_dir.clone(),
            max_redirects: config.max_redirects,
            page_size: config.page_size,
        }
    }
}

/// Turns a completed run into its trace.
#[derive(Clone)]
pub struct Pipeline {
    api: Arc<dyn ArtifactApi>,
    settings: PipelineSettings,
}

impl Pipeline {
    /// Pipeline over `api`.
    pub fn new(api: Arc<dyn ArtifactApi>, settings: PipelineSettings) -> Self {
        Self { api, settings }
    }

    /// Current settings.
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Build the trace of `run`.
    ///
    /// No report artifacts yields a root-only trace. The first retrieval
    /// failure aborts the delivery and discards suites gathered so far;
    /// unparseable report entries are skipped.
    #[instrument(skip_all, fields(run_id = run.run_id, run_attempt = run.run_attempt, repo = %run.repo_full_name))]
    pub async fn process(&self, run: &RunEvent) -> Result<Trace> {
        let api = self.api.as_ref();

        let artifacts = ArtifactLocator::new(api)
            .with_page_size(self.settings.page_size)
            .list_all(&run.repo, run.run_id)
            .await?;
        let total = artifacts.len();
        let reports = filter_report_artifacts(artifacts, &self.settings.suffix);
        debug!(total, reports = reports.len(), "Located artifacts");

        if reports.is_empty() {
            info!(suffix = %self.settings.suffix, "No report artifacts found");
            return Ok(Trace::assemble(run, &[])?);
        }

        let fetcher = ArtifactFetcher::new(api, &self.settings.scratch_dir)
            .with_max_redirects(self.settings.max_redirects);
        let mut suites = Vec::new();
        for artifact in &reports {
            let mut fetched = fetcher.fetch(run, artifact).await?;
            let extracted =
                tokio::task::spawn_blocking(move || extract_suites(&mut fetched.archive)).await?;
            debug!(artifact = %artifact.name, suites = extracted.len(), "Extracted suites");
            suites.extend(extracted);
        }

        let trace = Trace::assemble(run, &suites)?;
        for problem in trace.validate() {
            warn!(trace_id = %trace.trace_id(), %problem, "Trace shape check failed");
        }
        info!(
            trace_id = %trace.trace_id(),
            artifacts = reports.len(),
            suites = trace.suites.len(),
            spans = trace.span_count(),
            "Assembled trace"
        );
        Ok(trace)
    }
}
