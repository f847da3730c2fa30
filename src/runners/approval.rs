// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Manual approval gate
//!
//! A manual approval is a pseudo-action with no inputs or outputs: it parks
//! until an external actor signals through the `ApprovalHub`, and thereby
//! blocks every action in its stage with a strictly higher run order. The
//! hub's `approve`/`reject` entry points are the only mutators of in-flight
//! approval state.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::info;

use super::{ActionRunner, RunContext, RunnerOutcome};
use crate::errors::{ShipflowError, ShipflowResult};
use crate::pipeline::{Action, ActionKind};

/// Decision delivered to a pending approval
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalDecision {
    Approved,
    Rejected(String),
}

/// A gate currently waiting for a signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingApproval {
    pub run_id: String,
    pub action: String,
}

/// Approval signal boundary between a run and external actors
#[derive(Default)]
pub struct ApprovalHub {
    pending: Mutex<HashMap<String, (String, oneshot::Sender<ApprovalDecision>)>>,
    notify: Mutex<Option<mpsc::UnboundedSender<PendingApproval>>>,
}

impl ApprovalHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive a notification whenever a gate starts waiting
    ///
    /// Only one watcher at a time; a later call replaces the earlier one.
    pub fn watch_pending(&self) -> mpsc::UnboundedReceiver<PendingApproval> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.notify.lock().expect("approval notify lock poisoned") = Some(tx);
        rx
    }

    /// Gates currently waiting, in no particular order
    pub fn pending(&self) -> Vec<PendingApproval> {
        self.pending
            .lock()
            .expect("approval state lock poisoned")
            .iter()
            .map(|(action, (run_id, _))| PendingApproval {
                run_id: run_id.clone(),
                action: action.clone(),
            })
            .collect()
    }

    /// Approve a pending gate; false if nothing matches
    pub fn approve(&self, run_id: &str, action: &str) -> bool {
        self.resolve(run_id, action, ApprovalDecision::Approved)
    }

    /// Reject a pending gate with a reason; false if nothing matches
    pub fn reject(&self, run_id: &str, action: &str, reason: &str) -> bool {
        self.resolve(run_id, action, ApprovalDecision::Rejected(reason.to_string()))
    }

    fn resolve(&self, run_id: &str, action: &str, decision: ApprovalDecision) -> bool {
        let mut pending = self.pending.lock().expect("approval state lock poisoned");
        match pending.remove(action) {
            Some((id, tx)) if id == run_id => tx.send(decision).is_ok(),
            Some(entry) => {
                // Wrong run id: put the gate back untouched.
                pending.insert(action.to_string(), entry);
                false
            }
            None => false,
        }
    }

    /// Park a gate and hand back the channel its decision arrives on
    pub(crate) fn register(
        &self,
        run_id: &str,
        action: &str,
    ) -> oneshot::Receiver<ApprovalDecision> {
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .expect("approval state lock poisoned")
            .insert(action.to_string(), (run_id.to_string(), tx));

        if let Some(notify) = self.notify.lock().expect("approval notify lock poisoned").as_ref() {
            let _ = notify.send(PendingApproval {
                run_id: run_id.to_string(),
                action: action.to_string(),
            });
        }

        rx
    }
}

/// Runner for manual approval gates
pub struct ApprovalRunner;

impl ApprovalRunner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ApprovalRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionRunner for ApprovalRunner {
    fn kind(&self) -> &'static str {
        "manual-approval"
    }

    fn validate_action(&self, action: &Action) -> ShipflowResult<()> {
        if !matches!(action.kind, ActionKind::ManualApproval) {
            return Err(ShipflowError::execution_failed(format!(
                "approval runner received '{}' action '{}'",
                action.kind, action.name
            )));
        }
        Ok(())
    }

    async fn execute(
        &self,
        _action: Action,
        path: String,
        ctx: RunContext,
    ) -> ShipflowResult<RunnerOutcome> {
        if ctx.auto_approve {
            info!(action = %path, "approval auto-granted");
            return Ok(RunnerOutcome::success());
        }

        let rx = ctx.approvals.register(&ctx.run_id, &path);
        info!(action = %path, "waiting for approval signal");

        let decision = match ctx.approval_timeout {
            Some(limit) => tokio::time::timeout(limit, rx)
                .await
                .map_err(|_| ShipflowError::ApprovalTimeout {
                    action: path.clone(),
                })?
                .map_err(|_| ShipflowError::execution_failed("approval channel closed"))?,
            None => rx
                .await
                .map_err(|_| ShipflowError::execution_failed("approval channel closed"))?,
        };

        match decision {
            ApprovalDecision::Approved => {
                info!(action = %path, "approval granted");
                Ok(RunnerOutcome::success())
            }
            ApprovalDecision::Rejected(reason) => Err(ShipflowError::ApprovalRejected {
                action: path,
                reason,
            }),
        }
    }
}
