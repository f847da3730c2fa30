// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! # shipflow - Deployment Pipeline Orchestrator
//!
//! `shipflow` models deployment pipelines as validated graphs: ordered
//! stages of actions that consume and produce artifacts, with per-action
//! policy grants and run-order gates.
//!
//! ## Features
//!
//! - **Declarative definitions** - Pipelines in YAML or TOML, or built in code
//! - **Whole-graph validation** - Artifact wiring, run orders, and source
//!   actions checked before anything runs
//! - **Run-order scheduling** - Concurrent groups, manual approval gates
//! - **Policy model** - Additive grants per execution identity
//!
//! ## Quick Start
//!
//! ```bash
//! # Initialize a new project
//! shipflow init my-project
//!
//! # Validate the pipeline definition
//! shipflow validate
//!
//! # Inspect the artifact flow
//! shipflow graph --format mermaid
//!
//! # Drive the reference engine
//! shipflow run --auto-approve
//! ```

pub mod cli;
pub mod errors;
pub mod pipeline;
pub mod runners;
pub mod utils;

// Re-export commonly used types
pub use errors::{ShipflowError, ShipflowResult};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineEngine, PipelineGraph, Stage};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
