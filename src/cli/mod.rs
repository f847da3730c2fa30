// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for shipflow.

pub mod graph;
pub mod init;
pub mod policy;
pub mod run;
pub mod validate;
pub mod watch;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Deployment pipeline orchestrator
///
/// Declare, validate, and drive deployment pipelines.
#[derive(Parser, Debug)]
#[clap(
    name = "shipflow",
    version,
    about = "Deployment pipeline orchestrator: declarative stages, artifact flow, and policy-aware execution",
    long_about = None,
    after_help = "Examples:\n\
        shipflow init                   Initialize a new project\n\
        shipflow validate               Check the pipeline definition\n\
        shipflow graph --format dot     Render the artifact flow\n\
        shipflow run --auto-approve     Drive the reference engine\n\n\
        See 'shipflow <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new shipflow project
    Init {
        /// Pipeline name (defaults to current directory name)
        name: Option<String>,

        /// Use a template (serverless, minimal)
        #[clap(short, long)]
        template: Option<String>,
    },

    /// Validate pipeline configuration
    Validate {
        /// Pipeline file to validate
        #[clap(default_value = ".shipflow.yaml")]
        pipeline: PathBuf,
    },

    /// Show the artifact flow as a graph
    Graph {
        /// Pipeline file
        #[clap(default_value = ".shipflow.yaml")]
        pipeline: PathBuf,

        /// Output format
        #[clap(short, long, default_value = "text", value_enum)]
        format: GraphFormat,
    },

    /// Show effective policies per execution identity
    Policy {
        /// Pipeline file
        #[clap(default_value = ".shipflow.yaml")]
        pipeline: PathBuf,

        /// Only this identity
        #[clap(short, long)]
        identity: Option<String>,

        /// Output format
        #[clap(short, long, default_value = "text", value_enum)]
        format: OutputFormat,
    },

    /// Run the pipeline through the reference engine
    Run {
        /// Pipeline file
        #[clap(short, long, default_value = ".shipflow.yaml")]
        pipeline: PathBuf,

        /// Show the plan without executing
        #[clap(long)]
        dry_run: bool,

        /// Grant manual approvals without prompting
        #[clap(long)]
        auto_approve: bool,

        /// Fail pending approvals after this many seconds
        #[clap(long, value_name = "SECS")]
        approval_timeout: Option<u64>,
    },

    /// Watch mode - revalidate on definition changes
    Watch {
        /// Pipeline file
        #[clap(short, long, default_value = ".shipflow.yaml")]
        pipeline: PathBuf,

        /// Debounce delay in milliseconds
        #[clap(long, default_value = "500")]
        debounce: u64,
    },
}

/// Output format for the policy command
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Graph output format
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
}
