// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

//! Artifact Locator: the complete artifact list of a run.

use crate::error::{AdapterError, Result};
use crate::upstream::github::{Artifact, ArtifactApi};
use junit_traces_core::event::RepoCoordinates;
use tracing::debug;

/// Page size of every listing call.
pub const PAGE_SIZE: u32 = 100;

/// Default suffix of report artifact names.
pub const DEFAULT_REPORT_SUFFIX: &str = "junit";

/// Walks the paginated artifact listing of a run.
pub struct ArtifactLocator<'a, A: ArtifactApi + ?Sized> {
    api: &'a A,
    per_page: u32,
}

impl<'a, A: ArtifactApi + ?Sized> ArtifactLocator<'a, A> {
    /// Locator using [`PAGE_SIZE`].
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            per_page: PAGE_SIZE,
        }
    }

    /// Override the page size (1..=100).
    pub fn with_page_size(mut self, per_page: u32) -> Self {
        self.per_page = per_page.clamp(1, PAGE_SIZE);
        self
    }

    /// Every artifact attached to `run_id`, across all pages.
    ///
    /// Any failed page aborts the listing; no partial list is returned.
    pub async fn list_all(&self, repo: &RepoCoordinates, run_id: u64) -> Result<Vec<Artifact>> {
        if run_id == 0 {
            return Err(AdapterError::Core(junit_traces_core::Error::invalid_input(
                "run id is required",
            )));
        }
        if repo.owner.is_empty() || repo.name.is_empty() {
            return Err(AdapterError::Core(junit_traces_core::Error::invalid_input(
                "repository owner and name are required",
            )));
        }

        let mut artifacts = Vec::new();
        let mut page = 1;
        loop {
            let listing = self
                .api
                .list_artifacts(repo, run_id, page, self.per_page)
                .await?;
            debug!(
                run_id,
                page,
                count = listing.artifacts.len(),
                "Listed artifact page"
            );
            artifacts.extend(listing.artifacts);
            match listing.next_page {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }
        Ok(artifacts)
    }
}

/// Artifacts whose name ends with `suffix` (case-sensitive), in listing order.
pub fn filter_report_artifacts(artifacts: Vec<Artifact>, suffix: &str) -> Vec<Artifact> {
    artifacts
        .into_iter()
        .filter(|artifact| artifact.name.ends_with(suffix))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::github::{ArtifactPage, MockArtifactApi};
    use mockall::predicate::*;
    use std::collections::HashSet;

    fn artifact(id: u64, name: &str) -> Artifact {
        Artifact {
            id,
            name: name.to_string(),
            size: 1,
            expired: false,
        }
    }

    fn repo() -> RepoCoordinates {
        RepoCoordinates::new("octo", "calc").unwrap()
    }

    #[tokio::test]
    async fn test_pagination_collects_every_page() {
        let mut api = MockArtifactApi::new();
        for (page, count, next) in [(1u32, 100u64, Some(2u32)), (2, 100, Some(3)), (3, 17, None)] {
            api.expect_list_artifacts()
                .with(always(), eq(42u64), eq(page), eq(100u32))
                .times(1)
                .returning(move |_, _, _, _| {
                    let offset = u64::from(page - 1) * 100;
                    Ok(ArtifactPage {
                        artifacts: (0..count)
                            .map(|i| artifact(offset + i + 1, &format!("a{}", offset + i)))
                            .collect(),
                        next_page: next,
                    })
                });
        }

        let all = ArtifactLocator::new(&api).list_all(&repo(), 42).await.unwrap();
        assert_eq!(all.len(), 217);
        let unique: HashSet<_> = all.iter().map(|a| a.id).collect();
        assert_eq!(unique.len(), 217);
    }

    #[tokio::test]
    async fn test_listing_error_aborts() {
        let mut api = MockArtifactApi::new();
        api.expect_list_artifacts()
            .with(always(), always(), eq(1u32), always())
            .returning(|_, _, _, _| {
                Ok(ArtifactPage {
                    artifacts: vec![artifact(1, "x-junit")],
                    next_page: Some(2),
                })
            });
        api.expect_list_artifacts()
            .with(always(), always(), eq(2u32), always())
            .returning(|_, _, _, _| {
                Err(AdapterError::Api {
                    status: 502,
                    message: "bad gateway".into(),
                })
            });

        let err = ArtifactLocator::new(&api)
            .list_all(&repo(), 42)
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Api { status: 502, .. }));
    }

    #[tokio::test]
    async fn test_zero_run_id_is_rejected_without_calls() {
        let api = MockArtifactApi::new();
        let err = ArtifactLocator::new(&api).list_all(&repo(), 0).await.unwrap_err();
        assert!(matches!(err, AdapterError::Core(_)));
    }

    #[tokio::test]
    async fn test_stale_next_page_terminates() {
        let mut api = MockArtifactApi::new();
        api.expect_list_artifacts().times(1).returning(|_, _, _, _| {
            Ok(ArtifactPage {
                artifacts: vec![artifact(1, "a")],
                next_page: Some(1),
            })
        });
        let all = ArtifactLocator::new(&api).list_all(&repo(), 42).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_filter_is_case_sensitive_suffix_match() {
        let artifacts = vec![
            artifact(1, "unit-junit"),
            artifact(2, "coverage"),
            artifact(3, "integration-JUNIT"),
            artifact(4, "junit-logs"),
            artifact(5, "junit"),
        ];
        let reports = filter_report_artifacts(artifacts, DEFAULT_REPORT_SUFFIX);
        let ids: Vec<_> = reports.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 5]);
    }

    #[test]
    fn test_filter_empty_is_not_an_error() {
        assert!(filter_report_artifacts(vec![artifact(1, "coverage")], "junit").is_empty());
    }

    #[test]
    fn test_page_size_is_clamped() {
        let api = MockArtifactApi::new();
        assert_eq!(ArtifactLocator::new(&api).with_page_size(500).per_page, 100);
        assert_eq!(ArtifactLocator::new(&api).with_page_size(0).per_page, 1);
    }
}
