// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Watch command - revalidate the definition on changes

use colored::Colorize;
use miette::Result;
use notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Duration;

use crate::pipeline::{Pipeline, PipelineGraph};
use crate::utils::create_spinner;

/// Run the watch command
pub async fn run(pipeline_path: PathBuf, debounce_ms: u64, verbose: bool) -> Result<()> {
    // Check pipeline exists
    if !pipeline_path.exists() {
        return Err(miette::miette!(
            "Pipeline file not found: {}\n\n\
             Run 'shipflow init' to create a new project.",
            pipeline_path.display()
        ));
    }

    println!("{}", "Starting watch mode...".bold());
    println!("Revalidating on change (debounce: {}ms)", debounce_ms);
    println!("Press {} to exit.", "Ctrl+C".cyan());
    println!();

    // Create channel for receiving events
    let (tx, rx) = channel();

    // Create debounced watcher
    let mut debouncer = new_debouncer(Duration::from_millis(debounce_ms), tx)
        .map_err(|e| miette::miette!("Failed to create file watcher: {}", e))?;

    // Watch the directory holding the definition
    let watch_dir = pipeline_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();
    debouncer
        .watcher()
        .watch(&watch_dir, RecursiveMode::NonRecursive)
        .map_err(|e| miette::miette!("Failed to start watching: {}", e))?;

    // Initial validation
    validate_once(&pipeline_path, verbose);

    let spinner = create_spinner("Waiting for changes...");

    // Watch for changes
    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let file_name = pipeline_path.file_name();
                let relevant: Vec<_> = events
                    .iter()
                    .filter(|e| file_name.map(|n| e.path.ends_with(n)).unwrap_or(false))
                    .filter(|e| matches!(e.kind, DebouncedEventKind::Any))
                    .collect();

                if !relevant.is_empty() {
                    spinner.suspend(|| {
                        println!();
                        println!("{}", "─".repeat(50).dimmed());
                        println!("{}", "Change detected".yellow());
                        println!();
                        validate_once(&pipeline_path, verbose);
                    });
                }
            }
            Ok(Err(e)) => {
                spinner.suspend(|| {
                    eprintln!("{}: {:?}", "Watch error".red(), e);
                });
            }
            Err(e) => {
                // Channel closed
                spinner.finish_and_clear();
                eprintln!("{}: {}", "Channel error".red(), e);
                break;
            }
        }
    }

    Ok(())
}

fn validate_once(pipeline_path: &Path, verbose: bool) {
    let definition = match Pipeline::from_file(pipeline_path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("  {} {}", "✗".red(), e);
            return;
        }
    };

    match PipelineGraph::compile(definition) {
        Ok(graph) => {
            println!(
                "  {} {} ({} stages, {} artifacts)",
                "✓".green(),
                "Pipeline is valid".green(),
                graph.stages().len(),
                graph.artifacts().len()
            );
            if verbose {
                println!("  fingerprint: {}", graph.fingerprint().dimmed());
            }
        }
        Err(e) => {
            eprintln!("  {} {}", "✗".red(), e);
        }
    }
}
