// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

//! Artifact Fetcher: download an artifact archive to scratch storage and
//! open it.
//!
//! Scratch files are never removed here; retention is left to whoever owns
//! the scratch directory.

use crate::error::Result;
use crate::upstream::github::{Artifact, ArtifactApi};
use chrono::{DateTime, Utc};
use junit_traces_core::RunEvent;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::ZipArchive;

/// Subdirectory of the system temp dir used when none is configured.
pub const DEFAULT_SCRATCH_SUBDIR: &str = "junit-artifacts";

/// Default bound on followed redirects when resolving a download URL.
pub const DEFAULT_MAX_REDIRECTS: u8 = 3;

/// Default scratch directory.
pub fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_SCRATCH_SUBDIR)
}

/// Scratch file for one artifact of one run attempt:
/// `<dir>/<artifact-name>-<run-id>-<run-start-epoch>.zip`.
pub fn scratch_path(
    dir: &Path,
    artifact_name: &str,
    run_id: u64,
    run_started_at: DateTime<Utc>,
) -> PathBuf {
    let name: String = artifact_name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    dir.join(format!("{name}-{run_id}-{}.zip", run_started_at.timestamp()))
}

/// A downloaded archive, open for reading.
pub struct FetchedArchive {
    /// Scratch file holding the archive
    pub path: PathBuf,
    /// Size of the archive on disk
    pub bytes: u64,
    /// Archive reader
    pub archive: ZipArchive<File>,
}

impl std::fmt::Debug for FetchedArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchedArchive")
            .field("path", &self.path)
            .field("bytes", &self.bytes)
            .field("entries", &self.archive.len())
            .finish()
    }
}

/// Downloads artifacts into a scratch directory.
pub struct ArtifactFetcher<'a, A: ArtifactApi + ?Sized> {
    api: &'a A,
    scratch_dir: PathBuf,
    max_redirects: u8,
}

impl<'a, A: ArtifactApi + ?Sized> ArtifactFetcher<'a, A> {
    /// Fetcher writing into `scratch_dir`.
    pub fn new(api: &'a A, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            api,
            scratch_dir: scratch_dir.into(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }

    /// Override the redirect bound.
    pub fn with_max_redirects(mut self, max_redirects: u8) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Resolve, download and open one artifact of `run`.
    pub async fn fetch(&self, run: &RunEvent, artifact: &Artifact) -> Result<FetchedArchive> {
        let url = self
            .api
            .artifact_download_url(&run.repo, artifact.id, self.max_redirects)
            .await?;

        tokio::fs::create_dir_all(&self.scratch_dir).await?;
        let path = scratch_path(&self.scratch_dir, &artifact.name, run.run_id, run.started_at);
        debug!(
            artifact = %artifact.name,
            artifact_id = artifact.id,
            path = %path.display(),
            "Downloading artifact"
        );

        let bytes = self.api.download(&url, &path).await?;
        let archive = open_archive(path.clone()).await?;
        info!(
            artifact = %artifact.name,
            bytes,
            entries = archive.len(),
            "Fetched artifact archive"
        );

        Ok(FetchedArchive {
            path,
            bytes,
            archive,
        })
    }
}

async fn open_archive(path: PathBuf) -> Result<ZipArchive<File>> {
    tokio::task::spawn_blocking(move || -> Result<ZipArchive<File>> {
        Ok(ZipArchive::new(File::open(&path)?)?)
    })
    .await?
}
