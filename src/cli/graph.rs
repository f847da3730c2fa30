// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Graph command - visualize the artifact flow

use miette::Result;
use std::path::PathBuf;

use super::GraphFormat;
use crate::pipeline::{Pipeline, PipelineGraph};

/// Run the graph command
pub async fn run(pipeline_path: PathBuf, format: GraphFormat, _verbose: bool) -> Result<()> {
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

    // Output in requested format
    let output = match format {
        GraphFormat::Text => graph.flow().to_text(graph.definition()),
        GraphFormat::Dot => graph.flow().to_dot(graph.definition()),
        GraphFormat::Mermaid => graph.flow().to_mermaid(graph.definition()),
    };

    println!("{}", output);

    Ok(())
}
