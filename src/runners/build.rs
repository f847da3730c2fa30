// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Build runner
//!
//! Runs a build/test project against input artifacts. Actual command
//! execution is out of scope; the runner checks that every declared input
//! was materialized by an earlier stage and simulates the build.

use async_trait::async_trait;
use tracing::info;

use super::{ActionRunner, RunContext, RunnerOutcome};
use crate::errors::{ShipflowError, ShipflowResult};
use crate::pipeline::{Action, ActionKind};

/// Build runner
pub struct BuildRunner;

impl BuildRunner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BuildRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Check that every input artifact is already materialized
///
/// Shared by the build and deploy runners; validation guarantees this holds
/// for any graph the engine accepts, so a miss is reported as a failure
/// rather than a panic.
pub(super) async fn check_inputs(action: &Action, ctx: &RunContext) -> Option<RunnerOutcome> {
    let produced = ctx.artifacts.read().await;
    for input in &action.inputs {
        if !produced.contains(input) {
            return Some(RunnerOutcome::failure(format!(
                "input artifact '{}' was never materialized",
                input
            )));
        }
    }
    None
}

#[async_trait]
impl ActionRunner for BuildRunner {
    fn kind(&self) -> &'static str {
        "build"
    }

    fn validate_action(&self, action: &Action) -> ShipflowResult<()> {
        if !matches!(action.kind, ActionKind::Build { .. }) {
            return Err(ShipflowError::execution_failed(format!(
                "build runner received '{}' action '{}'",
                action.kind, action.name
            )));
        }
        Ok(())
    }

    async fn execute(
        &self,
        action: Action,
        path: String,
        ctx: RunContext,
    ) -> ShipflowResult<RunnerOutcome> {
        if let Some(failure) = check_inputs(&action, &ctx).await {
            return Ok(failure);
        }

        let ActionKind::Build { environment, buildspec } = &action.kind else {
            return Err(ShipflowError::execution_failed(format!(
                "build runner received '{}' action '{}'",
                action.kind, path
            )));
        };

        info!(
            action = %path,
            image = %environment.image,
            compute = %environment.compute,
            buildspec = ?buildspec,
            "running build project"
        );

        Ok(RunnerOutcome::success())
    }
}
