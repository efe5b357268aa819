// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

//! CLI for junit-traces.
//!
//! `convert` builds a trace offline from a saved `workflow_run` payload and
//! local report files. `replay` fetches a run from the GitHub API and runs
//! the full artifact pipeline. Both write an OTLP export request.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use junit_traces_adapters::config::ReceiverConfig;
use junit_traces_adapters::consumer::{OtlpWriter, TraceConsumer};
use junit_traces_adapters::extractor::extract_suites;
use junit_traces_adapters::upstream::github::{ArtifactApi, GithubClient};
use junit_traces_adapters::{Pipeline, PipelineSettings};
use junit_traces_core::event::{RepoCoordinates, WebhookEvent, WORKFLOW_RUN_EVENT};
use junit_traces_core::otlp::Encoding;
use junit_traces_core::report::{parse_report, TestSuite};
use junit_traces_core::{RunEvent, Trace};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// junit-traces CLI.
#[derive(Parser, Debug)]
#[command(name = "junit-traces")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a trace from a saved webhook payload and local reports.
    Convert {
        /// `workflow_run` webhook payload (JSON).
        #[arg(short, long)]
        event: PathBuf,

        /// JUnit XML file or zipped artifact; repeatable.
        #[arg(short, long = "report")]
        reports: Vec<PathBuf>,

        /// Output encoding.
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Output file (stdout when omitted).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fetch a run from GitHub and build its trace from the run's artifacts.
    Replay {
        /// Repository as `owner/name`.
        #[arg(long)]
        repo: String,

        /// Workflow run ID.
        #[arg(long)]
        run_id: u64,

        /// Run attempt (latest when omitted).
        #[arg(long)]
        attempt: Option<u32>,

        /// API token.
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Receiver configuration file for API URL and artifact settings.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output encoding.
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Output file (stdout when omitted).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Output encoding of the export request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// OTLP/JSON
    Json,
    /// OTLP protobuf
    Proto,
}

impl From<OutputFormat> for Encoding {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => Encoding::Json,
            OutputFormat::Proto => Encoding::Protobuf,
        }
    }
}

/// Install a stderr log subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Run the CLI with parsed arguments.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Convert {
            event,
            reports,
            format,
            output,
        } => {
            let run = load_event(&event)?;
            let suites = load_reports(&reports)?;
            let trace = Trace::assemble(&run, &suites).context("assembling trace")?;
            info!(trace_id = %trace.trace_id(), spans = trace.span_count(), "Converted run");
            write_trace(trace, format, output.as_deref()).await
        }
        Commands::Replay {
            repo,
            run_id,
            attempt,
            token,
            config,
            format,
            output,
        } => {
            let config = ReceiverConfig::load(config.as_deref()).context("loading configuration")?;
            let token = token.unwrap_or_else(|| config.github.token.expose().to_string());
            let client = GithubClient::new(&config.github.api_url, Some(token.as_str()))?;
            let trace = replay(
                Arc::new(client),
                PipelineSettings::from(&config.artifacts),
                &repo,
                run_id,
                attempt,
            )
            .await?;
            write_trace(trace, format, output.as_deref()).await
        }
    }
}

/// Fetch `run_id` of `repo` and run it through the pipeline.
pub async fn replay(
    api: Arc<dyn ArtifactApi>,
    settings: PipelineSettings,
    repo: &str,
    run_id: u64,
    attempt: Option<u32>,
) -> anyhow::Result<Trace> {
    let coordinates = RepoCoordinates::parse(repo)?;
    let event = api
        .workflow_run(&coordinates, run_id, attempt)
        .await
        .with_context(|| format!("fetching run {run_id} of {repo}"))?;
    let run = RunEvent::try_from(&event)?;
    info!(run_id, run_attempt = run.run_attempt, "Replaying run");

    let trace = Pipeline::new(api, settings)
        .process(&run)
        .await
        .context("building trace from artifacts")?;
    if trace.is_root_only() {
        warn!("Run has no report artifacts");
    }
    Ok(trace)
}

/// Read a saved `workflow_run` payload.
pub fn load_event(path: &Path) -> anyhow::Result<RunEvent> {
    let bytes =
        std::fs::read(path).with_context(|| format!("reading event {}", path.display()))?;
    let event = WebhookEvent::parse(WORKFLOW_RUN_EVENT, &bytes)
        .with_context(|| format!("decoding event {}", path.display()))?;
    let WebhookEvent::WorkflowRun(event) = event else {
        bail!("{} is not a workflow_run payload", path.display());
    };
    if !event.is_completed() {
        warn!(action = %event.action, "Run is not completed");
    }
    Ok(RunEvent::try_from(&*event)?)
}

/// Parse report files; `.zip` files are read as artifact archives.
pub fn load_reports(paths: &[PathBuf]) -> anyhow::Result<Vec<TestSuite>> {
    let mut suites = Vec::new();
    for path in paths {
        let is_archive = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("zip"))
            .unwrap_or(false);
        if is_archive {
            let file =
                File::open(path).with_context(|| format!("opening {}", path.display()))?;
            let mut archive = zip::ZipArchive::new(file)
                .with_context(|| format!("reading archive {}", path.display()))?;
            suites.extend(extract_suites(&mut archive));
        } else {
            let bytes =
                std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            suites.extend(
                parse_report(&bytes).with_context(|| format!("parsing {}", path.display()))?,
            );
        }
    }
    Ok(suites)
}

async fn write_trace(trace: Trace, format: OutputFormat, output: Option<&Path>) -> anyhow::Result<()> {
    let out: Box<dyn Write + Send> = match output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout()),
    };
    OtlpWriter::new(out, format.into())
        .consume(trace)
        .await
        .context("writing trace")?;
    Ok(())
}
