// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Run command - drive the pipeline through the reference engine

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::pipeline::{ActionStatus, EngineOptions, Pipeline, PipelineEngine, PipelineGraph};
use crate::runners::ApprovalHub;

/// Run the pipeline
pub async fn run(
    pipeline_path: PathBuf,
    dry_run: bool,
    auto_approve: bool,
    approval_timeout: Option<u64>,
    verbose: bool,
) -> Result<()> {
    // Check pipeline exists
    if !pipeline_path.exists() {
        return Err(miette::miette!(
            "Pipeline file not found: {}\n\n\
             Run 'shipflow init' to create a new project.",
            pipeline_path.display()
        ));
    }

    // Load and build
    let definition = Pipeline::from_file(&pipeline_path)?;
    let graph = PipelineGraph::compile(definition)?;

    let engine = Arc::new(PipelineEngine::with_default_runners());

    let options = EngineOptions {
        dry_run,
        auto_approve,
        approval_timeout: approval_timeout.map(Duration::from_secs),
        verbose,
    };

    // Ctrl+C cancels the active run-order group and everything after it.
    let cancel = engine.cancel_handle();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!();
            println!("{}", "Cancelling...".yellow());
            cancel.cancel();
        }
    });

    // Console approvals, unless the run auto-approves
    let prompt_task = if !auto_approve && !dry_run {
        Some(spawn_approval_prompt(engine.approvals()))
    } else {
        None
    };

    let report = engine.run(&graph, &options).await?;

    signal_task.abort();
    if let Some(task) = prompt_task {
        task.abort();
    }

    if dry_run {
        println!();
        println!("{}", "Dry run: nothing executed.".dimmed());
        return Ok(());
    }

    if verbose {
        println!();
        println!("{} ({})", "Run report".bold(), report.run_id);
        for (stage, state) in &report.stage_states {
            println!("  {} {}", stage, format!("[{}]", state).dimmed());
        }
    }

    if !report.success {
        // Find which action failed
        for (path, status) in &report.actions {
            if let ActionStatus::Failed(reason) = status {
                eprintln!();
                eprintln!("{}", format!("Action '{}' failed:", path).red().bold());
                eprintln!("{}", reason.dimmed());
                break;
            }
        }
        return Err(miette::miette!("Pipeline run failed"));
    }

    Ok(())
}

/// Prompt on the console for every approval the run parks on
fn spawn_approval_prompt(hub: Arc<ApprovalHub>) -> tokio::task::JoinHandle<()> {
    let mut pending_rx = hub.watch_pending();

    tokio::spawn(async move {
        while let Some(pending) = pending_rx.recv().await {
            let action = pending.action.clone();
            let answer = tokio::task::spawn_blocking(move || {
                use std::io::Write;
                print!("  Approve '{}'? [y/N] ", action);
                let _ = std::io::stdout().flush();
                let mut line = String::new();
                let _ = std::io::stdin().read_line(&mut line);
                line.trim().eq_ignore_ascii_case("y")
            })
            .await
            .unwrap_or(false);

            if answer {
                hub.approve(&pending.run_id, &pending.action);
            } else {
                hub.reject(&pending.run_id, &pending.action, "rejected at the console");
            }
        }
    })
}
