// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Checkout runner
//!
//! Fetches sources from an external repository reference. The reference is
//! an opaque name/branch pair; the actual source-control protocol belongs to
//! a collaborator, so this runner simulates the fetch.

use async_trait::async_trait;
use tracing::info;

use super::{ActionRunner, RunContext, RunnerOutcome};
use crate::errors::{ShipflowError, ShipflowResult};
use crate::pipeline::{Action, ActionKind};

/// Checkout runner
pub struct CheckoutRunner;

impl CheckoutRunner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CheckoutRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionRunner for CheckoutRunner {
    fn kind(&self) -> &'static str {
        "checkout"
    }

    fn validate_action(&self, action: &Action) -> ShipflowResult<()> {
        let ActionKind::Checkout { repository, .. } = &action.kind else {
            return Err(ShipflowError::execution_failed(format!(
                "checkout runner received '{}' action '{}'",
                action.kind, action.name
            )));
        };

        if repository.is_empty() {
            return Err(ShipflowError::InvalidName {
                context: format!("repository on checkout action '{}' (empty)", action.name),
            });
        }

        Ok(())
    }

    async fn execute(
        &self,
        action: Action,
        path: String,
        ctx: RunContext,
    ) -> ShipflowResult<RunnerOutcome> {
        let ActionKind::Checkout { repository, branch } = &action.kind else {
            return Err(ShipflowError::execution_failed(format!(
                "checkout runner received '{}' action '{}'",
                action.kind, path
            )));
        };

        let branch = branch.clone().unwrap_or_else(|| ctx.default_branch.clone());
        info!(
            action = %path,
            repository = %repository,
            branch = %branch,
            "checking out sources"
        );

        Ok(RunnerOutcome::success())
    }
}
