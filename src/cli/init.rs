// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Init command - create a new shipflow project

use colored::Colorize;
use miette::Result;
use std::path::Path;

/// Run the init command
pub async fn run(name: Option<String>, template: Option<String>, verbose: bool) -> Result<()> {
    let pipeline_name = name.unwrap_or_else(|| {
        std::env::current_dir()
            .ok()
            .and_then(|p| p.file_name().map(|s| s.to_string_lossy().to_string()))
            .unwrap_or_else(|| "my-pipeline".to_string())
    });

    println!("{}", "Initializing shipflow project...".bold());
    println!();

    // Check if .shipflow.yaml already exists
    if Path::new(".shipflow.yaml").exists() {
        return Err(miette::miette!(
            ".shipflow.yaml already exists. Remove it first to re-initialize."
        ));
    }

    // Generate pipeline based on template
    let pipeline_content = match template.as_deref() {
        Some("serverless") | None => generate_serverless_template(&pipeline_name),
        Some("minimal") => generate_minimal_template(&pipeline_name),
        Some(t) => {
            return Err(miette::miette!(
                "Unknown template: '{}'\n\nAvailable templates:\n\
                 • serverless  - Checkout → build/test → gated deploy (default)\n\
                 • minimal     - Checkout → build",
                t
            ));
        }
    };

    // Write pipeline file
    std::fs::write(".shipflow.yaml", &pipeline_content)
        .map_err(|e| miette::miette!("Failed to write .shipflow.yaml: {}", e))?;

    println!("  {} Created .shipflow.yaml", "✓".green());

    println!();
    println!("{}", "Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to define your pipeline", ".shipflow.yaml".cyan());
    println!("  2. Run {} to check the graph", "shipflow validate".cyan());
    println!("  3. Run {} to drive the engine", "shipflow run".cyan());
    println!();

    if verbose {
        println!("{}", "Generated pipeline:".dimmed());
        println!("{}", "─".repeat(50).dimmed());
        println!("{}", pipeline_content.dimmed());
    }

    Ok(())
}

fn generate_serverless_template(name: &str) -> String {
    format!(
        r#"# shipflow pipeline configuration
version: "1"
name: "{name}"
description: "Build, test, and deploy with a manual gate"

config:
  project: "{name}"
  default_branch: "master"

stages:
  - name: "Source"
    actions:
      - name: "checkout"
        kind:
          type: checkout
          repository: "{name}-repo"
        outputs: [src]

  - name: "Build-Test"
    actions:
      - name: "build_test"
        kind:
          type: build
          environment:
            image: amazon-linux-2
            compute: small
        inputs: [src]
        outputs: [bin]
        grants:
          - resources: ["*"]
            actions: ["s3:*"]
            effect: allow

  - name: "Deploy"
    actions:
      - name: "approve"
        kind:
          type: manual-approval
        run_order: 1
      - name: "deploy"
        kind:
          type: deploy
          buildspec: buildspec_deploy.yml
        inputs: [bin]
        run_order: 2
        grants:
          - resources: ["*"]
            actions:
              - "apigateway:*"
              - "s3:*"
              - "lambda:*"
              - "cloudformation:*"
              - "iam:*"
            effect: allow

# Grants attached to the pipeline's own execution role
grants:
  - resources: ["*"]
    actions: ["s3:*"]
    effect: allow
"#
    )
}

fn generate_minimal_template(name: &str) -> String {
    format!(
        r#"# shipflow pipeline configuration
version: "1"
name: "{name}"

stages:
  - name: "Source"
    actions:
      - name: "checkout"
        kind:
          type: checkout
          repository: "{name}-repo"
        outputs: [src]

  - name: "Build"
    actions:
      - name: "build"
        kind:
          type: build
        inputs: [src]
        outputs: [bin]
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Pipeline, PipelineGraph};

    #[test]
    fn test_serverless_template_builds() {
        let yaml = generate_serverless_template("serverless-cicd-demo");
        let definition = Pipeline::from_yaml(&yaml).unwrap();
        let graph = PipelineGraph::compile(definition).unwrap();

        assert_eq!(graph.stages().len(), 3);
        assert_eq!(graph.artifacts().len(), 2);
        assert!(!graph.policies().is_empty());
    }

    #[test]
    fn test_minimal_template_builds() {
        let yaml = generate_minimal_template("demo");
        let definition = Pipeline::from_yaml(&yaml).unwrap();
        assert!(PipelineGraph::compile(definition).is_ok());
    }
}
