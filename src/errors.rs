// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Error types for pipeline definition, validation, and execution
//!
//! Every structural problem is fatal to construction: `build()` returns no
//! partial graph. Runtime errors are reported per action and never corrupt
//! the immutable definition.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for shipflow operations
pub type ShipflowResult<T> = Result<T, ShipflowError>;

/// Main error type for shipflow
#[derive(Error, Debug, Diagnostic)]
pub enum ShipflowError {
    // ─────────────────────────────────────────────────────────────────────────
    // Artifact Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Artifact '{name}' is declared as an output more than once")]
    #[diagnostic(
        code(shipflow::duplicate_artifact),
        help("Artifact names must be unique across the whole pipeline")
    )]
    DuplicateArtifact { name: String },

    #[error("Artifact '{name}' is not produced by any action")]
    #[diagnostic(code(shipflow::unknown_artifact))]
    UnknownArtifact { name: String },

    #[error("Action '{action}' in stage '{stage}' consumes artifact '{artifact}' which no earlier action produces")]
    #[diagnostic(
        code(shipflow::missing_input),
        help("Declare '{artifact}' as an output of an action in an earlier stage")
    )]
    MissingInput {
        artifact: String,
        stage: String,
        action: String,
    },

    #[error("Artifact '{artifact}' flows backwards: produced in stage '{producer_stage}' but consumed in stage '{consumer_stage}'")]
    #[diagnostic(
        code(shipflow::forward_or_same_stage_reference),
        help("Inputs may only reference artifacts produced in a strictly earlier stage")
    )]
    ForwardOrSameStageReference {
        artifact: String,
        producer_stage: String,
        consumer_stage: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Structure Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Pipeline has no stages")]
    #[diagnostic(
        code(shipflow::empty_pipeline),
        help("Add at least one stage before building")
    )]
    EmptyPipeline,

    #[error("Stage '{stage}' has no actions")]
    #[diagnostic(code(shipflow::empty_stage))]
    EmptyStage { stage: String },

    #[error("Duplicate stage name: '{stage}'")]
    #[diagnostic(code(shipflow::duplicate_stage_name))]
    DuplicateStageName { stage: String },

    #[error("Duplicate action name '{action}' in stage '{stage}'")]
    #[diagnostic(code(shipflow::duplicate_action_name))]
    DuplicateActionName { stage: String, action: String },

    #[error("Action '{action}' in stage '{stage}' has run order {run_order}; run orders start at 1")]
    #[diagnostic(code(shipflow::invalid_run_order))]
    InvalidRunOrder {
        stage: String,
        action: String,
        run_order: u32,
    },

    #[error("Invalid {context}")]
    #[diagnostic(code(shipflow::invalid_name))]
    InvalidName { context: String },

    #[error("First stage must contain at least one action with no inputs")]
    #[diagnostic(
        code(shipflow::no_source_action),
        help("The entry stage needs a source action (e.g. a checkout) that produces the initial artifacts")
    )]
    NoSourceAction,

    // ─────────────────────────────────────────────────────────────────────────
    // Execution Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("No runner registered for action kind '{kind}'")]
    #[diagnostic(
        code(shipflow::runner_not_found),
        help("Built-in runners: checkout, build, manual-approval, deploy")
    )]
    RunnerNotFound { kind: String },

    #[error("Approval for action '{action}' was rejected: {reason}")]
    #[diagnostic(code(shipflow::approval_rejected))]
    ApprovalRejected { action: String, reason: String },

    #[error("Approval for action '{action}' timed out")]
    #[diagnostic(
        code(shipflow::approval_timeout),
        help("Signal the approval before the configured deadline, or raise --approval-timeout")
    )]
    ApprovalTimeout { action: String },

    #[error("Execution failed: {message}")]
    #[diagnostic(code(shipflow::execution_failed))]
    ExecutionFailed {
        message: String,
        #[help]
        help: Option<String>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // File Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Pipeline file not found: {path}")]
    #[diagnostic(
        code(shipflow::pipeline_not_found),
        help("Create a pipeline with 'shipflow init' or create .shipflow.yaml manually")
    )]
    PipelineNotFound { path: PathBuf },

    #[error("Unsupported pipeline file format: {path}")]
    #[diagnostic(
        code(shipflow::unsupported_format),
        help("Supported extensions: .yaml, .yml, .toml")
    )]
    UnsupportedFormat { path: PathBuf },

    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(shipflow::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(shipflow::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(shipflow::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(shipflow::yaml_error))]
    Yaml { message: String },

    #[error("JSON parsing error: {message}")]
    #[diagnostic(code(shipflow::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(shipflow::toml_error))]
    Toml { message: String },

    #[error("Glob pattern error: {message}")]
    #[diagnostic(code(shipflow::glob_error))]
    GlobPattern { message: String },
}

impl From<std::io::Error> for ShipflowError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for ShipflowError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for ShipflowError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for ShipflowError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl From<glob::PatternError> for ShipflowError {
    fn from(e: glob::PatternError) -> Self {
        Self::GlobPattern { message: e.to_string() }
    }
}

impl ShipflowError {
    /// Create an execution failure with helpful context
    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            message: message.into(),
            help: None,
        }
    }

    /// True for errors detected during `build()` rather than at run time
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateArtifact { .. }
                | Self::UnknownArtifact { .. }
                | Self::MissingInput { .. }
                | Self::ForwardOrSameStageReference { .. }
                | Self::EmptyPipeline
                | Self::EmptyStage { .. }
                | Self::DuplicateStageName { .. }
                | Self::DuplicateActionName { .. }
                | Self::InvalidRunOrder { .. }
                | Self::InvalidName { .. }
                | Self::NoSourceAction
        )
    }
}
