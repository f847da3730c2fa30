// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! shipflow - Deployment Pipeline Orchestrator
//!
//! Declare, validate, and drive deployment pipelines.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shipflow::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shipflow=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    // Dispatch to command handlers
    match cli.command {
        Commands::Init { name, template } => {
            shipflow::cli::init::run(name, template, cli.verbose).await
        }
        Commands::Validate { pipeline } => {
            shipflow::cli::validate::run(pipeline, cli.verbose).await
        }
        Commands::Graph { pipeline, format } => {
            shipflow::cli::graph::run(pipeline, format, cli.verbose).await
        }
        Commands::Policy {
            pipeline,
            identity,
            format,
        } => shipflow::cli::policy::run(pipeline, identity, format, cli.verbose).await,
        Commands::Run {
            pipeline,
            dry_run,
            auto_approve,
            approval_timeout,
        } => {
            shipflow::cli::run::run(pipeline, dry_run, auto_approve, approval_timeout, cli.verbose)
                .await
        }
        Commands::Watch { pipeline, debounce } => {
            shipflow::cli::watch::run(pipeline, debounce, cli.verbose).await
        }
    }
}
