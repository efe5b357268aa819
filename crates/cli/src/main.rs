// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

//! junit-traces CLI entry point.

use clap::Parser;
use junit_traces_cli::{init_tracing, run, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run(cli).await
}
