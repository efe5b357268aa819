// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

//! Upstream integration adapters.
//!
//! - **GitHub Actions**: artifact listing, download URL resolution, archive
//!   download and workflow run lookup
//!
//! Each adapter is a thin wrapper around the remote API, exposing only the
//! operations the pipeline consumes behind a trait so they can be swapped in
//! tests.

pub mod github;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use super::github::{Artifact, ArtifactApi, ArtifactPage, GithubClient};
}

pub use github::GithubClient;
