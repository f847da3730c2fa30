// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Deploy runner
//!
//! Rolls out a built artifact through a deployment project. Like the build
//! runner it only simulates: provisioning is the execution collaborator's
//! concern.

use async_trait::async_trait;
use tracing::info;

use super::build::check_inputs;
use super::{ActionRunner, RunContext, RunnerOutcome};
use crate::errors::{ShipflowError, ShipflowResult};
use crate::pipeline::{Action, ActionKind};

/// Deploy runner
pub struct DeployRunner;

impl DeployRunner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DeployRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionRunner for DeployRunner {
    fn kind(&self) -> &'static str {
        "deploy"
    }

    fn validate_action(&self, action: &Action) -> ShipflowResult<()> {
        if !matches!(action.kind, ActionKind::Deploy { .. }) {
            return Err(ShipflowError::execution_failed(format!(
                "deploy runner received '{}' action '{}'",
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

        let ActionKind::Deploy { environment, buildspec } = &action.kind else {
            return Err(ShipflowError::execution_failed(format!(
                "deploy runner received '{}' action '{}'",
                action.kind, path
            )));
        };

        info!(
            action = %path,
            image = %environment.image,
            compute = %environment.compute,
            buildspec = ?buildspec,
            "running deploy project"
        );

        Ok(RunnerOutcome::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::BuildEnvironment;
    use crate::runners::test_support::test_context;

    #[tokio::test]
    async fn test_execute_after_inputs_materialize() {
        let runner = DeployRunner::new();
        let ctx = test_context();
        ctx.artifacts.write().await.insert("bin".into());

        let action = Action {
            name: "deploy".into(),
            kind: ActionKind::Deploy {
                environment: BuildEnvironment::default(),
                buildspec: Some("buildspec_deploy.yml".into()),
            },
            inputs: vec!["bin".into()],
            outputs: vec![],
            run_order: 2,
            identity: None,
            grants: vec![],
        };

        let outcome = runner
            .execute(action, "Deploy/deploy".into(), ctx)
            .await
            .unwrap();
        assert!(outcome.success);
    }
}
