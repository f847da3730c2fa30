// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Action runners
//!
//! This module provides the runner trait and implementations for the four
//! action kinds (checkout, build, manual approval, deploy). The shipped
//! runners simulate their effects: real provisioning lives behind this trait
//! in a collaborator, never in the orchestration core.

mod approval;
mod build;
mod checkout;
mod deploy;

pub use approval::{ApprovalDecision, ApprovalHub, ApprovalRunner, PendingApproval};
pub use build::BuildRunner;
pub use checkout::CheckoutRunner;
pub use deploy::DeployRunner;

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::errors::ShipflowResult;
use crate::pipeline::Action;

/// Terminal outcome of one action
#[derive(Debug, Clone)]
pub struct RunnerOutcome {
    /// Whether the action succeeded
    pub success: bool,

    /// Failure reason or informational note
    pub detail: Option<String>,
}

impl RunnerOutcome {
    /// Create a successful outcome
    pub fn success() -> Self {
        Self {
            success: true,
            detail: None,
        }
    }

    /// Create a failed outcome with a reason
    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            detail: Some(reason.into()),
        }
    }
}

/// Shared state handed to every runner invocation
#[derive(Clone)]
pub struct RunContext {
    /// Identifier of the in-flight run
    pub run_id: String,

    /// Branch applied to checkout actions without an explicit one
    pub default_branch: String,

    /// Artifacts materialized so far; read-only once inserted
    pub artifacts: Arc<RwLock<HashSet<String>>>,

    /// Approval signal boundary
    pub approvals: Arc<ApprovalHub>,

    /// Deadline for pending approvals (none: pending indefinitely)
    pub approval_timeout: Option<Duration>,

    /// Grant approvals without an external signal
    pub auto_approve: bool,
}

/// Trait for action runners
#[async_trait]
pub trait ActionRunner: Send + Sync {
    /// Kind key this runner serves (`checkout`, `build`, ...)
    fn kind(&self) -> &'static str;

    /// Validate action configuration before any run starts
    fn validate_action(&self, action: &Action) -> ShipflowResult<()>;

    /// Execute an action
    ///
    /// # Arguments
    /// * `action` - The action declaration
    /// * `path` - `stage/action` report key
    /// * `ctx` - Shared run state
    async fn execute(
        &self,
        action: Action,
        path: String,
        ctx: RunContext,
    ) -> ShipflowResult<RunnerOutcome>;
}

/// Create the standard runner set, one per action kind
pub fn create_default_runners() -> HashMap<String, Arc<dyn ActionRunner>> {
    let runners: Vec<Arc<dyn ActionRunner>> = vec![
        Arc::new(CheckoutRunner::new()),
        Arc::new(BuildRunner::new()),
        Arc::new(ApprovalRunner::new()),
        Arc::new(DeployRunner::new()),
    ];

    runners
        .into_iter()
        .map(|r| (r.kind().to_string(), r))
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Minimal run context for runner unit tests
    pub fn test_context() -> RunContext {
        RunContext {
            run_id: "run-test".to_string(),
            default_branch: "master".to_string(),
            artifacts: Arc::new(RwLock::new(HashSet::new())),
            approvals: Arc::new(ApprovalHub::new()),
            approval_timeout: None,
            auto_approve: false,
        }
    }
}
