// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Reference execution engine
//!
//! Walks a built pipeline graph: stages strictly in order, actions within a
//! stage by ascending run-order group, every action in a group concurrently.
//! A group advances only once all of its actions are terminal; a manual
//! approval therefore blocks everything behind it. Action semantics live in
//! registered runners; the engine owns sequencing, approval plumbing,
//! failure halting, and cancellation.

use colored::Colorize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, RwLock};
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::errors::{ShipflowError, ShipflowResult};
use crate::pipeline::builder::PipelineGraph;
use crate::pipeline::definition::{ActionKind, Stage};
use crate::runners::{create_default_runners, ActionRunner, ApprovalHub, RunContext};

/// Engine options for one run
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Print the plan without executing anything
    pub dry_run: bool,
    /// Grant manual approvals without an external signal
    pub auto_approve: bool,
    /// Deadline for pending approvals (none: pending indefinitely)
    pub approval_timeout: Option<Duration>,
    /// Verbose output
    pub verbose: bool,
}

/// Terminal state of one action, reported per run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionStatus {
    Succeeded,
    Failed(String),
    Pending,
    Skipped,
}

/// Per-stage scheduling state
///
/// `Blocked(n)` is `RunOrderGroupActive(n)` with a manual approval holding
/// the group open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    NotStarted,
    RunOrderGroupActive(u32),
    Blocked(u32),
    Completed,
}

impl std::fmt::Display for StageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not started"),
            Self::RunOrderGroupActive(n) => write!(f, "run order {} active", n),
            Self::Blocked(n) => write!(f, "blocked at run order {}", n),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Result of executing a pipeline
#[derive(Debug)]
pub struct RunReport {
    /// Identifier of this run
    pub run_id: String,
    /// Terminal status per action, keyed by `stage/action`
    pub actions: HashMap<String, ActionStatus>,
    /// Final scheduling state per stage, in pipeline order
    pub stage_states: Vec<(String, StageState)>,
    /// Total execution time
    pub duration: Duration,
    /// Whether every action succeeded
    pub success: bool,
}

impl RunReport {
    /// Status of one action by its `stage/action` path
    pub fn status(&self, path: &str) -> Option<&ActionStatus> {
        self.actions.get(path)
    }
}

/// Handle for cancelling an in-flight run
///
/// Cancellation propagates to the active run-order group and prevents later
/// groups and stages from starting; terminal actions are unaffected.
#[derive(Clone)]
pub struct CancelHandle(Arc<watch::Sender<bool>>);

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.0.send(true);
    }
}

/// Pipeline execution engine
pub struct PipelineEngine {
    /// Registered runners by action kind
    runners: HashMap<String, Arc<dyn ActionRunner>>,
    /// Approval signal boundary shared with external actors
    approvals: Arc<ApprovalHub>,
    cancel_tx: Arc<watch::Sender<bool>>,
    cancel_rx: watch::Receiver<bool>,
}

impl PipelineEngine {
    /// Create an engine with no runners registered
    pub fn new() -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        Self {
            runners: HashMap::new(),
            approvals: Arc::new(ApprovalHub::new()),
            cancel_tx: Arc::new(cancel_tx),
            cancel_rx,
        }
    }

    /// Create an engine with the standard simulated runners
    pub fn with_default_runners() -> Self {
        let mut engine = Self::new();
        for (_, runner) in create_default_runners() {
            engine.register_runner(runner);
        }
        engine
    }

    /// Register a runner for its action kind
    pub fn register_runner(&mut self, runner: Arc<dyn ActionRunner>) {
        self.runners.insert(runner.kind().to_string(), runner);
    }

    /// Approval boundary for this engine's runs
    pub fn approvals(&self) -> Arc<ApprovalHub> {
        self.approvals.clone()
    }

    /// Handle that cancels the in-flight run
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(self.cancel_tx.clone())
    }

    fn cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }

    /// Execute a built pipeline graph
    pub async fn run(
        &self,
        graph: &PipelineGraph,
        options: &EngineOptions,
    ) -> ShipflowResult<RunReport> {
        let start = Instant::now();
        let run_id = format!("run-{}", &graph.fingerprint()[..12]);

        // Fail before starting anything if an action has no runner or a
        // runner rejects its configuration.
        for stage in graph.stages() {
            for action in &stage.actions {
                let runner = self.runners.get(action.kind.key()).ok_or_else(|| {
                    ShipflowError::RunnerNotFound {
                        kind: action.kind.key().to_string(),
                    }
                })?;
                runner.validate_action(action)?;
            }
        }

        self.print_execution_plan(graph);

        let mut statuses: HashMap<String, ActionStatus> = graph
            .stages()
            .iter()
            .flat_map(|s| {
                s.actions
                    .iter()
                    .map(move |a| (format!("{}/{}", s.name, a.name), ActionStatus::Pending))
            })
            .collect();
        let mut stage_states: Vec<(String, StageState)> = graph
            .stages()
            .iter()
            .map(|s| (s.name.clone(), StageState::NotStarted))
            .collect();

        if options.dry_run {
            return Ok(RunReport {
                run_id,
                actions: statuses,
                stage_states,
                duration: start.elapsed(),
                success: true,
            });
        }

        let outputs_by_path: HashMap<String, Vec<String>> = graph
            .stages()
            .iter()
            .flat_map(|s| {
                s.actions
                    .iter()
                    .map(move |a| (format!("{}/{}", s.name, a.name), a.outputs.clone()))
            })
            .collect();

        let ctx = RunContext {
            run_id: run_id.clone(),
            default_branch: graph.definition().config.default_branch.clone(),
            artifacts: Arc::new(RwLock::new(HashSet::new())),
            approvals: self.approvals.clone(),
            approval_timeout: options.approval_timeout,
            auto_approve: options.auto_approve,
        };

        let mut halted = false;

        for (stage_index, stage) in graph.stages().iter().enumerate() {
            if halted || self.cancelled() {
                break;
            }

            println!();
            println!("{} {}", "Stage:".bold(), stage.name.bold());

            let (state, stop) = self
                .run_stage(stage, &ctx, &outputs_by_path, &mut statuses)
                .await;
            stage_states[stage_index].1 = state;
            if stop {
                halted = true;
            }
        }

        let was_cancelled = self.cancelled();
        if halted || was_cancelled {
            // Everything that never started is skipped, not failed.
            for status in statuses.values_mut() {
                if *status == ActionStatus::Pending {
                    *status = ActionStatus::Skipped;
                }
            }
        }

        let success = statuses
            .values()
            .all(|s| matches!(s, ActionStatus::Succeeded));
        let duration = start.elapsed();

        println!();
        if success {
            println!(
                "{}",
                format!("Pipeline completed successfully in {:.2}s", duration.as_secs_f64())
                    .green()
            );
        } else if was_cancelled {
            println!(
                "{}",
                format!("Pipeline cancelled after {:.2}s", duration.as_secs_f64()).yellow()
            );
        } else {
            println!(
                "{}",
                format!("Pipeline failed after {:.2}s", duration.as_secs_f64()).red()
            );
        }

        Ok(RunReport {
            run_id,
            actions: statuses,
            stage_states,
            duration,
            success,
        })
    }

    /// Run one stage's groups in ascending run order
    ///
    /// Returns the stage's final state and whether the run must halt.
    async fn run_stage(
        &self,
        stage: &Stage,
        ctx: &RunContext,
        outputs_by_path: &HashMap<String, Vec<String>>,
        statuses: &mut HashMap<String, ActionStatus>,
    ) -> (StageState, bool) {
        let mut state = StageState::NotStarted;

        let groups: Vec<(u32, Vec<crate::pipeline::Action>)> = stage
            .run_order_groups()
            .into_iter()
            .map(|(n, actions)| (n, actions.into_iter().cloned().collect()))
            .collect();

        for (run_order, group) in groups {
            if self.cancelled() {
                return (state, true);
            }

            let gated = group
                .iter()
                .any(|a| matches!(a.kind, ActionKind::ManualApproval))
                && !ctx.auto_approve;
            state = if gated {
                println!(
                    "  {} run order {} waiting on manual approval",
                    "⧗".yellow(),
                    run_order
                );
                StageState::Blocked(run_order)
            } else {
                StageState::RunOrderGroupActive(run_order)
            };
            debug!(stage = %stage.name, run_order, state = %state, "starting run-order group");

            let mut tasks = JoinSet::new();
            for action in group {
                let path = format!("{}/{}", stage.name, action.name);
                let Some(runner) = self.runners.get(action.kind.key()).cloned() else {
                    // Checked before the run started; a miss here is a bug.
                    statuses.insert(path, ActionStatus::Failed("no runner registered".into()));
                    return (state, true);
                };

                let task_ctx = ctx.clone();
                let mut cancel = self.cancel_rx.clone();
                tasks.spawn(async move {
                    let started = Instant::now();
                    let status = tokio::select! {
                        res = runner.execute(action, path.clone(), task_ctx) => match res {
                            Ok(outcome) if outcome.success => ActionStatus::Succeeded,
                            Ok(outcome) => ActionStatus::Failed(
                                outcome.detail.unwrap_or_else(|| "action failed".to_string()),
                            ),
                            Err(e) => ActionStatus::Failed(e.to_string()),
                        },
                        _ = wait_cancelled(&mut cancel) => ActionStatus::Skipped,
                    };
                    (path, status, started.elapsed())
                });
            }

            let mut group_failed = false;
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((path, status, elapsed)) => {
                        match &status {
                            ActionStatus::Succeeded => {
                                println!(
                                    "  {} {} ({:.2}s)",
                                    "✓".green(),
                                    path,
                                    elapsed.as_secs_f64()
                                );
                                if let Some(outputs) = outputs_by_path.get(&path) {
                                    let mut produced = ctx.artifacts.write().await;
                                    for output in outputs {
                                        produced.insert(output.clone());
                                    }
                                }
                            }
                            ActionStatus::Failed(reason) => {
                                println!("  {} {}: {}", "✗".red(), path, reason.dimmed());
                                group_failed = true;
                            }
                            ActionStatus::Skipped => {
                                println!("  {} {} {}", "○".dimmed(), path, "(cancelled)".dimmed());
                            }
                            ActionStatus::Pending => {}
                        }
                        statuses.insert(path, status);
                    }
                    Err(join_err) => {
                        error!(stage = %stage.name, error = %join_err, "action task aborted");
                        group_failed = true;
                    }
                }
            }

            if group_failed || self.cancelled() {
                return (state, true);
            }
        }

        (StageState::Completed, false)
    }

    /// Print the execution plan, stage by stage
    fn print_execution_plan(&self, graph: &PipelineGraph) {
        println!();
        println!("{}: {}", "Pipeline".bold(), graph.name());
        println!("{}", "═".repeat(50));
        print!("{}", graph.flow().to_text(graph.definition()));
    }
}

impl Default for PipelineEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve once the cancel flag flips to true
async fn wait_cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender gone without cancelling: never resolves.
            std::future::pending::<()>().await;
        }
    }
}
