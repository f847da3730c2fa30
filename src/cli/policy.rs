// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Policy command - show effective policies per execution identity

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::OutputFormat;
use crate::pipeline::{Identity, Pipeline, PipelineGraph};

/// Run the policy command
pub async fn run(
    pipeline_path: PathBuf,
    identity: Option<String>,
    format: OutputFormat,
    _verbose: bool,
) -> Result<()> {
    if !pipeline_path.exists() {
        return Err(miette::miette!(
            "Pipeline file not found: {}\n\n\
             Run 'shipflow init' to create a new project.",
            pipeline_path.display()
        ));
    }

    let definition = Pipeline::from_file(&pipeline_path)?;
    let graph = PipelineGraph::compile(definition)?;
    let policies = graph.policies();

    let identities: Vec<Identity> = match identity {
        Some(name) => vec![Identity::new(name)],
        None => policies.identities().cloned().collect(),
    };

    if identities.is_empty() {
        println!("No policy grants declared.");
        return Ok(());
    }

    match format {
        OutputFormat::Json => {
            let documents: Vec<serde_json::Value> =
                identities.iter().map(|id| policies.document(id)).collect();
            let rendered = serde_json::to_string_pretty(&documents)
                .map_err(|e| miette::miette!("Failed to render policy documents: {}", e))?;
            println!("{}", rendered);
        }
        OutputFormat::Text => {
            for id in &identities {
                let statements = policies.effective_policy(id);
                println!("{}", id.as_str().bold());
                if statements.is_empty() {
                    println!("  {}", "(no statements)".dimmed());
                }
                // Attachment order; every statement applies simultaneously.
                for (i, grant) in statements.iter().enumerate() {
                    println!(
                        "  {}. {} actions=[{}] resources=[{}]",
                        i + 1,
                        grant.effect,
                        grant.actions.join(", "),
                        grant.resources.join(", ")
                    );
                }
                println!();
            }
        }
    }

    Ok(())
}
