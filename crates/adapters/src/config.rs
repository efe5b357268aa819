// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

//! Receiver configuration.
//!
//! Layered with the `config` crate: built-in defaults, then an optional file,
//! then `JUNIT_RECEIVER_*` environment variables (`__` separates sections,
//! e.g. `JUNIT_RECEIVER_GITHUB__TOKEN`).
//!
//! # Example
//!
//! ```ignore
//! use junit_traces_adapters::config::ReceiverConfig;
//!
//! let config = ReceiverConfig::load(Some("junit-receiver.toml".as_ref()))?;
//! println!("listening on {}{}", config.server.endpoint, config.server.path);
//! ```

use crate::error::{AdapterError, Result};
use crate::fetcher::{default_scratch_dir, DEFAULT_MAX_REDIRECTS};
use crate::locator::{DEFAULT_REPORT_SUFFIX, PAGE_SIZE};
use crate::upstream::github::DEFAULT_API_URL;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "JUNIT_RECEIVER";

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "junit-receiver";

/// Highest accepted redirect bound.
pub const MAX_REDIRECT_LIMIT: u8 = 10;

/// A value that never shows up in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wrap a value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The secret value.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether no value is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("Secret(\"\")")
        } else {
            f.write_str("Secret(****)")
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// `host:port` to bind
    pub endpoint: String,
    /// Path webhook deliveries are posted to
    pub path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint: "localhost:33333".to_string(),
            path: "/githubactionsjunit".to_string(),
        }
    }
}

/// GitHub credentials and API location.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// Webhook signing secret; empty disables signature checks
    pub webhook_secret: Secret,
    /// API token
    pub token: Secret,
    /// REST API base URL
    pub api_url: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            webhook_secret: Secret::default(),
            token: Secret::default(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

/// Artifact selection and retrieval settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Name suffix of report artifacts
    pub suffix: String,
    /// Where downloaded archives are written
    pub scratch_dir: PathBuf,
    /// Redirect bound when resolving download URLs
    pub max_redirects: u8,
    /// Listing page size
    pub page_size: u32,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_REPORT_SUFFIX.to_string(),
            scratch_dir: default_scratch_dir(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            page_size: PAGE_SIZE,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    pub level: String,
    /// Emit JSON lines instead of text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete receiver configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// HTTP listener
    pub server: ServerConfig,
    /// GitHub access
    pub github: GithubConfig,
    /// Artifact handling
    pub artifacts: ArtifactsConfig,
    /// Logging
    pub logging: LoggingConfig,
}

impl ReceiverConfig {
    /// Load from defaults, `file` (or `junit-receiver.*` if present) and the
    /// process environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::load_with_env(file, None)
    }

    /// Load with an explicit environment map instead of the process environment.
    pub fn load_with_env(file: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let file_source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config: ReceiverConfig = Config::builder()
            .add_source(file_source)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the receiver cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.server.path.is_empty() || !self.server.path.starts_with('/') {
            return Err(AdapterError::invalid_config(format!(
                "server.path must start with '/', got {:?}",
                self.server.path
            )));
        }
        if self.server.endpoint.is_empty() {
            return Err(AdapterError::invalid_config("server.endpoint is required"));
        }
        if self.artifacts.max_redirects > MAX_REDIRECT_LIMIT {
            return Err(AdapterError::invalid_config(format!(
                "artifacts.max_redirects must be at most {MAX_REDIRECT_LIMIT}"
            )));
        }
        if !(1..=PAGE_SIZE).contains(&self.artifacts.page_size) {
            return Err(AdapterError::invalid_config(format!(
                "artifacts.page_size must be within 1..={PAGE_SIZE}"
            )));
        }
        if self.artifacts.suffix.is_empty() {
            return Err(AdapterError::invalid_config("artifacts.suffix is required"));
        }
        Ok(())
    }
}
