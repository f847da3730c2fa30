// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Validate command - check pipeline configuration

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use crate::pipeline::{Pipeline, PipelineGraph};

/// Run the validate command
pub async fn run(pipeline_path: PathBuf, verbose: bool) -> Result<()> {
    println!("{}", "Validating pipeline...".bold());
    println!();

    // Check pipeline exists
    if !pipeline_path.exists() {
        return Err(miette::miette!(
            "Pipeline file not found: {}\n\n\
             Run 'shipflow init' to create a new project.",
            pipeline_path.display()
        ));
    }

    // Load pipeline
    let definition = match Pipeline::from_file(&pipeline_path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("  {} Failed to parse pipeline", "✗".red());
            eprintln!();
            return Err(e.into());
        }
    };

    println!("  {} Pipeline file parses", "✓".green());

    // Whole-graph validation, fail-fast
    let graph = match PipelineGraph::compile(definition) {
        Ok(g) => g,
        Err(e) => {
            println!();
            println!("{}:", "Errors".red().bold());
            println!("  {} {}", "✗".red(), e);
            println!();
            return Err(e.into());
        }
    };

    println!("  {} Graph validates", "✓".green());

    if verbose {
        println!();
        println!("{}:", "Pipeline summary".bold());
        println!("  Name: {}", graph.name());
        println!("  Fingerprint: {}", graph.fingerprint());
        println!("  Stages: {}", graph.stages().len());
        for stage in graph.stages() {
            println!("    - {} ({} actions)", stage.name, stage.actions.len());
        }
        println!("  Artifacts: {}", graph.artifacts().len());
        for name in graph.artifacts().names() {
            let producer = graph
                .artifacts()
                .reference(name)
                .map(|p| format!("{}/{}", p.stage_name, p.action_name))
                .unwrap_or_default();
            println!("    - {} {}", name, format!("(from {})", producer).dimmed());
        }
    }

    println!();
    println!("{}", "Pipeline is valid!".green().bold());
    Ok(())
}
