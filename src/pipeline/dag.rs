// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Artifact-flow DAG over pipeline actions
//!
//! One node per action, one edge per artifact hand-off from producer to
//! consumer. The strictly-earlier-stage rule already guarantees acyclicity;
//! the toposort here asserts that invariant and the graph answers
//! producer/consumer queries for the CLI and the engine.

use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use crate::errors::ShipflowError;
use crate::pipeline::artifact::ArtifactStore;
use crate::pipeline::definition::Pipeline;

/// An action node in the flow graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionNode {
    pub stage: String,
    pub action: String,
    pub kind: String,
    pub run_order: u32,
}

impl ActionNode {
    /// `stage/action` path, the engine's report key
    pub fn path(&self) -> String {
        format!("{}/{}", self.stage, self.action)
    }
}

/// Directed graph of artifact hand-offs between actions
#[derive(Debug)]
pub struct ArtifactFlow {
    graph: DiGraph<ActionNode, String>,
    path_to_index: HashMap<String, NodeIndex>,
    // Artifact name → producing node; covers artifacts nobody consumes
    artifact_producers: HashMap<String, NodeIndex>,
}

impl ArtifactFlow {
    /// Build the flow graph from a definition and its artifact registry
    ///
    /// Expects inputs already resolved by the builder; an unresolvable input
    /// here is an internal error, reported as `MissingInput`.
    pub fn build(
        definition: &Pipeline,
        artifacts: &ArtifactStore,
    ) -> Result<Self, ShipflowError> {
        let mut graph = DiGraph::new();
        let mut path_to_index = HashMap::new();

        for stage in &definition.stages {
            for action in &stage.actions {
                let node = ActionNode {
                    stage: stage.name.clone(),
                    action: action.name.clone(),
                    kind: action.kind.key().to_string(),
                    run_order: action.run_order,
                };
                let idx = graph.add_node(node);
                path_to_index.insert(format!("{}/{}", stage.name, action.name), idx);
            }
        }

        let mut artifact_producers = HashMap::new();
        for name in artifacts.names() {
            let coords = artifacts.reference(name)?;
            let idx = path_to_index[&format!("{}/{}", coords.stage_name, coords.action_name)];
            artifact_producers.insert(name.to_string(), idx);
        }

        for stage in &definition.stages {
            for action in &stage.actions {
                let consumer = path_to_index[&format!("{}/{}", stage.name, action.name)];
                for input in &action.inputs {
                    let producer = *artifact_producers.get(input).ok_or_else(|| {
                        ShipflowError::MissingInput {
                            artifact: input.clone(),
                            stage: stage.name.clone(),
                            action: action.name.clone(),
                        }
                    })?;
                    graph.add_edge(producer, consumer, input.clone());
                }
            }
        }

        let flow = Self {
            graph,
            path_to_index,
            artifact_producers,
        };
        flow.assert_acyclic()?;
        Ok(flow)
    }

    fn assert_acyclic(&self) -> Result<(), ShipflowError> {
        toposort(&self.graph, None).map(|_| ()).map_err(|cycle| {
            let node = &self.graph[cycle.node_id()];
            ShipflowError::ForwardOrSameStageReference {
                artifact: "<cycle>".to_string(),
                producer_stage: node.stage.clone(),
                consumer_stage: node.stage.clone(),
            }
        })
    }

    /// The action that produces an artifact
    pub fn producer(&self, artifact: &str) -> Result<&ActionNode, ShipflowError> {
        self.artifact_producers
            .get(artifact)
            .map(|idx| &self.graph[*idx])
            .ok_or_else(|| ShipflowError::UnknownArtifact {
                name: artifact.to_string(),
            })
    }

    /// Every action that consumes an artifact
    pub fn consumers(&self, artifact: &str) -> Vec<&ActionNode> {
        self.graph
            .edge_indices()
            .filter(|e| self.graph[*e] == artifact)
            .filter_map(|e| self.graph.edge_endpoints(e))
            .map(|(_, to)| &self.graph[to])
            .collect()
    }

    /// Whether `consumer` depends (directly or transitively) on `producer`
    ///
    /// Paths are `stage/action` strings.
    pub fn depends_on(&self, consumer: &str, producer: &str) -> bool {
        let (Some(consumer_idx), Some(producer_idx)) = (
            self.path_to_index.get(consumer),
            self.path_to_index.get(producer),
        ) else {
            return false;
        };

        has_path_connecting(&self.graph, *producer_idx, *consumer_idx, None)
    }

    /// Number of actions in the graph
    pub fn action_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Generate a text execution plan, stage by stage, run order ascending
    pub fn to_text(&self, definition: &Pipeline) -> String {
        let mut out = String::new();

        for (i, stage) in definition.stages.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, stage.name));
            for (run_order, actions) in stage.run_order_groups() {
                for action in actions {
                    let mut line =
                        format!("   {}: {} ({})", run_order, action.name, action.kind.key());
                    if !action.inputs.is_empty() {
                        line.push_str(&format!(" [in: {}]", action.inputs.join(", ")));
                    }
                    if !action.outputs.is_empty() {
                        line.push_str(&format!(" [out: {}]", action.outputs.join(", ")));
                    }
                    out.push_str(&line);
                    out.push('\n');
                }
            }
        }

        out
    }

    /// Generate a DOT diagram of the artifact flow
    pub fn to_dot(&self, definition: &Pipeline) -> String {
        let mut out = String::from("digraph pipeline {\n");
        out.push_str("    rankdir=TB;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for stage in &definition.stages {
            for action in &stage.actions {
                out.push_str(&format!("    \"{}/{}\";\n", stage.name, action.name));
            }
        }
        out.push('\n');

        // Edges in definition order keeps the output stable.
        for stage in &definition.stages {
            for action in &stage.actions {
                for input in &action.inputs {
                    if let Ok(producer) = self.producer(input) {
                        out.push_str(&format!(
                            "    \"{}\" -> \"{}/{}\" [label=\"{}\"];\n",
                            producer.path(),
                            stage.name,
                            action.name,
                            input
                        ));
                    }
                }
            }
        }

        out.push_str("}\n");
        out
    }

    /// Generate a Mermaid diagram of the artifact flow
    pub fn to_mermaid(&self, definition: &Pipeline) -> String {
        let mut out = String::from("graph TD\n");

        for stage in &definition.stages {
            for action in &stage.actions {
                out.push_str(&format!(
                    "    {}_{}[{}]\n",
                    sanitize(&stage.name),
                    sanitize(&action.name),
                    action.name
                ));
            }
        }

        for stage in &definition.stages {
            for action in &stage.actions {
                for input in &action.inputs {
                    if let Ok(producer) = self.producer(input) {
                        out.push_str(&format!(
                            "    {}_{} -->|{}| {}_{}\n",
                            sanitize(&producer.stage),
                            sanitize(&producer.action),
                            input,
                            sanitize(&stage.name),
                            sanitize(&action.name)
                        ));
                    }
                }
            }
        }

        out
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::builder::PipelineBuilder;
    use crate::pipeline::definition::{Action, ActionKind, BuildEnvironment, Stage};

    fn demo_graph() -> crate::pipeline::builder::PipelineGraph {
        let checkout = Action {
            name: "checkout".into(),
            kind: ActionKind::Checkout {
                repository: "demo-repo".into(),
                branch: None,
            },
            inputs: vec![],
            outputs: vec!["src".into()],
            run_order: 1,
            identity: None,
            grants: vec![],
        };
        let build = Action {
            name: "build".into(),
            kind: ActionKind::Build {
                environment: BuildEnvironment::default(),
                buildspec: None,
            },
            inputs: vec!["src".into()],
            outputs: vec!["bin".into()],
            run_order: 1,
            identity: None,
            grants: vec![],
        };
        let deploy = Action {
            name: "deploy".into(),
            kind: ActionKind::Deploy {
                environment: BuildEnvironment::default(),
                buildspec: None,
            },
            inputs: vec!["bin".into()],
            outputs: vec![],
            run_order: 1,
            identity: None,
            grants: vec![],
        };

        let mut builder = PipelineBuilder::new("demo");
        builder
            .add_stage(Stage {
                name: "Source".into(),
                description: None,
                actions: vec![checkout],
            })
            .unwrap();
        builder
            .add_stage(Stage {
                name: "Build".into(),
                description: None,
                actions: vec![build],
            })
            .unwrap();
        builder
            .add_stage(Stage {
                name: "Deploy".into(),
                description: None,
                actions: vec![deploy],
            })
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn test_producer_and_consumers() {
        let graph = demo_graph();
        let flow = graph.flow();

        let producer = flow.producer("src").unwrap();
        assert_eq!(producer.path(), "Source/checkout");

        let consumers = flow.consumers("src");
        assert_eq!(consumers.len(), 1);
        assert_eq!(consumers[0].path(), "Build/build");
    }

    #[test]
    fn test_unknown_artifact_in_producer_query() {
        let graph = demo_graph();
        let err = graph.flow().producer("ghost").unwrap_err();
        assert!(matches!(err, ShipflowError::UnknownArtifact { .. }));
    }

    #[test]
    fn test_transitive_dependency() {
        let graph = demo_graph();
        let flow = graph.flow();

        assert!(flow.depends_on("Deploy/deploy", "Source/checkout")); // transitive
        assert!(flow.depends_on("Build/build", "Source/checkout")); // direct
        assert!(!flow.depends_on("Source/checkout", "Deploy/deploy")); // reverse
    }

    #[test]
    fn test_text_plan_lists_stages_in_order() {
        let graph = demo_graph();
        let text = graph.flow().to_text(graph.definition());

        let source_pos = text.find("1. Source").unwrap();
        let build_pos = text.find("2. Build").unwrap();
        let deploy_pos = text.find("3. Deploy").unwrap();
        assert!(source_pos < build_pos && build_pos < deploy_pos);
        assert!(text.contains("[in: src]"));
        assert!(text.contains("[out: bin]"));
    }

    #[test]
    fn test_dot_output() {
        let graph = demo_graph();
        let dot = graph.flow().to_dot(graph.definition());

        assert!(dot.contains("digraph pipeline"));
        assert!(dot.contains("\"Source/checkout\" -> \"Build/build\" [label=\"src\"];"));
        assert!(dot.contains("\"Build/build\" -> \"Deploy/deploy\" [label=\"bin\"];"));
    }

    #[test]
    fn test_mermaid_output() {
        let graph = demo_graph();
        let mermaid = graph.flow().to_mermaid(graph.definition());

        insta::assert_snapshot!(mermaid, @r"
        graph TD
            Source_checkout[checkout]
            Build_build[build]
            Deploy_deploy[deploy]
            Source_checkout -->|src| Build_build
            Build_build -->|bin| Deploy_deploy
        ");
    }
}
