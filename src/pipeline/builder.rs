// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Pipeline builder
//!
//! Assembles stages into a validated, immutable execution graph. Validation
//! is fail-fast and ordered: structure first, then artifact wiring, then the
//! source-action requirement. A failed build returns no partial graph; any
//! change to the definition requires a full rebuild.

use tracing::debug;

use crate::errors::ShipflowError;
use crate::pipeline::artifact::{ArtifactProducer, ArtifactStore};
use crate::pipeline::dag::ArtifactFlow;
use crate::pipeline::definition::{Pipeline, PipelineConfig, Stage};
use crate::pipeline::policy::{Identity, PolicySet};

/// Incremental constructor for a pipeline definition
///
/// `add_stage` rejects name collisions immediately; everything else waits
/// for `build()`.
#[derive(Debug)]
pub struct PipelineBuilder {
    definition: Pipeline,
}

impl PipelineBuilder {
    /// Start a builder for a named pipeline
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            definition: Pipeline {
                version: "1".to_string(),
                name: name.into(),
                description: None,
                config: PipelineConfig::default(),
                stages: Vec::new(),
                grants: Vec::new(),
            },
        }
    }

    /// Start from a parsed definition, re-checking stage-name uniqueness
    pub fn from_definition(definition: Pipeline) -> Result<Self, ShipflowError> {
        let mut builder = Self::new(definition.name.clone());
        builder.definition.version = definition.version;
        builder.definition.description = definition.description;
        builder.definition.config = definition.config;
        builder.definition.grants = definition.grants;
        for stage in definition.stages {
            builder.add_stage(stage)?;
        }
        Ok(builder)
    }

    /// Replace the naming/source-control configuration
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.definition.config = config;
        self
    }

    /// Attach a grant to the pipeline's own execution role
    pub fn grant_pipeline_role(mut self, grant: crate::pipeline::policy::PolicyGrant) -> Self {
        self.definition.grants.push(grant);
        self
    }

    /// Append a stage to the ordered sequence
    pub fn add_stage(&mut self, stage: Stage) -> Result<&mut Self, ShipflowError> {
        if self.definition.stages.iter().any(|s| s.name == stage.name) {
            return Err(ShipflowError::DuplicateStageName { stage: stage.name });
        }
        self.definition.stages.push(stage);
        Ok(self)
    }

    /// Validate the whole graph and freeze it
    ///
    /// Check order, failing fast on the first violation:
    /// 1. the pipeline has at least one stage;
    /// 2. each stage's own checks (emptiness, duplicate action names,
    ///    run orders);
    /// 3. artifact wiring: outputs are registered walking stages in order,
    ///    then every input must resolve to an output of a strictly earlier
    ///    stage;
    /// 4. the first stage contains at least one action with no inputs.
    pub fn build(self) -> Result<PipelineGraph, ShipflowError> {
        let definition = self.definition;

        if definition.stages.is_empty() {
            return Err(ShipflowError::EmptyPipeline);
        }

        for stage in &definition.stages {
            stage.validate()?;
        }

        let artifacts = Self::wire_artifacts(&definition)?;
        Self::check_inputs(&definition, &artifacts)?;

        let first = &definition.stages[0];
        if !first.actions.iter().any(|a| a.is_source()) {
            return Err(ShipflowError::NoSourceAction);
        }

        let flow = ArtifactFlow::build(&definition, &artifacts)?;
        let policies = Self::collect_policies(&definition);
        let fingerprint = Self::fingerprint_of(&definition)?;

        debug!(
            pipeline = %definition.name,
            stages = definition.stages.len(),
            artifacts = artifacts.len(),
            "pipeline graph built"
        );

        Ok(PipelineGraph {
            definition,
            artifacts,
            policies,
            flow,
            fingerprint,
        })
    }

    /// Register every declared output, stage by stage
    fn wire_artifacts(definition: &Pipeline) -> Result<ArtifactStore, ShipflowError> {
        let mut store = ArtifactStore::new();

        for (stage_index, stage) in definition.stages.iter().enumerate() {
            for (action_index, action) in stage.actions.iter().enumerate() {
                for output in &action.outputs {
                    store.declare_output(
                        output,
                        ArtifactProducer {
                            stage_index,
                            action_index,
                            stage_name: stage.name.clone(),
                            action_name: action.name.clone(),
                        },
                    )?;
                }
            }
        }

        Ok(store)
    }

    /// Every input must come from a strictly earlier stage
    fn check_inputs(definition: &Pipeline, store: &ArtifactStore) -> Result<(), ShipflowError> {
        for (stage_index, stage) in definition.stages.iter().enumerate() {
            for action in &stage.actions {
                for input in &action.inputs {
                    let Ok(producer) = store.reference(input) else {
                        return Err(ShipflowError::MissingInput {
                            artifact: input.clone(),
                            stage: stage.name.clone(),
                            action: action.name.clone(),
                        });
                    };

                    if producer.stage_index >= stage_index {
                        return Err(ShipflowError::ForwardOrSameStageReference {
                            artifact: input.clone(),
                            producer_stage: producer.stage_name.clone(),
                            consumer_stage: stage.name.clone(),
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// Attach action grants to each action's identity, pipeline grants to
    /// the pipeline role
    fn collect_policies(definition: &Pipeline) -> PolicySet {
        let mut policies = PolicySet::new();
        let project = definition.project();

        for stage in &definition.stages {
            for action in &stage.actions {
                if action.grants.is_empty() {
                    continue;
                }
                let identity = Identity::new(action.identity_for(project));
                for grant in &action.grants {
                    policies.grant(identity.clone(), grant.clone());
                }
            }
        }

        if !definition.grants.is_empty() {
            let role = Identity::new(definition.pipeline_role());
            for grant in &definition.grants {
                policies.grant(role.clone(), grant.clone());
            }
        }

        policies
    }

    fn fingerprint_of(definition: &Pipeline) -> Result<String, ShipflowError> {
        // serde_json writes struct fields in declaration order, so equal
        // definitions hash equal.
        let canonical = serde_json::to_string(definition)?;
        Ok(blake3::hash(canonical.as_bytes()).to_hex().to_string())
    }
}

/// A validated, immutable pipeline graph
///
/// Handed to an execution engine; nothing here is mutated after `build()`.
#[derive(Debug)]
pub struct PipelineGraph {
    definition: Pipeline,
    artifacts: ArtifactStore,
    policies: PolicySet,
    flow: ArtifactFlow,
    fingerprint: String,
}

impl PipelineGraph {
    /// Validate a parsed definition end to end
    pub fn compile(definition: Pipeline) -> Result<Self, ShipflowError> {
        PipelineBuilder::from_definition(definition)?.build()
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &Pipeline {
        &self.definition
    }

    pub fn stages(&self) -> &[Stage] {
        &self.definition.stages
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    pub fn policies(&self) -> &PolicySet {
        &self.policies
    }

    pub fn flow(&self) -> &ArtifactFlow {
        &self.flow
    }

    /// Content hash of the definition; equal graphs hash equal
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::definition::{Action, ActionKind, BuildEnvironment};
    use crate::pipeline::policy::{Effect, PolicyGrant};

    fn checkout(name: &str, outputs: &[&str]) -> Action {
        Action {
            name: name.into(),
            kind: ActionKind::Checkout {
                repository: "demo-repo".into(),
                branch: None,
            },
            inputs: vec![],
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
            run_order: 1,
            identity: None,
            grants: vec![],
        }
    }

    fn build(name: &str, inputs: &[&str], outputs: &[&str], run_order: u32) -> Action {
        Action {
            name: name.into(),
            kind: ActionKind::Build {
                environment: BuildEnvironment::default(),
                buildspec: None,
            },
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
            run_order,
            identity: None,
            grants: vec![],
        }
    }

    fn approval(name: &str) -> Action {
        Action {
            name: name.into(),
            kind: ActionKind::ManualApproval,
            inputs: vec![],
            outputs: vec![],
            run_order: 1,
            identity: None,
            grants: vec![],
        }
    }

    fn stage(name: &str, actions: Vec<Action>) -> Stage {
        Stage {
            name: name.into(),
            description: None,
            actions,
        }
    }

    /// Source → Build → Deploy with an approval gating the deploy
    fn demo_pipeline() -> PipelineBuilder {
        let mut builder = PipelineBuilder::new("serverless-demo");
        builder
            .add_stage(stage("Source", vec![checkout("checkout", &["src"])]))
            .unwrap();
        builder
            .add_stage(stage("Build", vec![build("build", &["src"], &["bin"], 1)]))
            .unwrap();
        builder
            .add_stage(stage(
                "Deploy",
                vec![approval("approve"), build("deploy", &["bin"], &[], 2)],
            ))
            .unwrap();
        builder
    }

    #[test]
    fn test_valid_pipeline_builds() {
        let graph = demo_pipeline().build().unwrap();

        assert_eq!(graph.name(), "serverless-demo");
        assert_eq!(graph.stages().len(), 3);
        assert_eq!(graph.artifacts().len(), 2);

        // Every input resolves to an output of a strictly earlier stage.
        let producer = graph.artifacts().reference("bin").unwrap();
        assert_eq!(producer.stage_index, 1);
    }

    #[test]
    fn test_empty_pipeline_fails() {
        let err = PipelineBuilder::new("empty").build().unwrap_err();
        assert!(matches!(err, ShipflowError::EmptyPipeline));
    }

    #[test]
    fn test_empty_stage_fails() {
        let mut builder = PipelineBuilder::new("p");
        builder.add_stage(stage("Source", vec![])).unwrap();
        let err = builder.build().unwrap_err();
        assert!(matches!(err, ShipflowError::EmptyStage { .. }));
    }

    #[test]
    fn test_duplicate_stage_name_fails() {
        let mut builder = PipelineBuilder::new("p");
        builder
            .add_stage(stage("Source", vec![checkout("checkout", &["src"])]))
            .unwrap();
        let err = builder
            .add_stage(stage("Source", vec![checkout("checkout2", &["src2"])]))
            .unwrap_err();
        assert!(matches!(err, ShipflowError::DuplicateStageName { .. }));
    }

    #[test]
    fn test_missing_input_fails_with_artifact_name() {
        // Scenario: deploy consumes "bin2" which nothing produces.
        let mut builder = PipelineBuilder::new("p");
        builder
            .add_stage(stage("Source", vec![checkout("checkout", &["src"])]))
            .unwrap();
        builder
            .add_stage(stage("Build", vec![build("build", &["src"], &["bin"], 1)]))
            .unwrap();
        builder
            .add_stage(stage(
                "Deploy",
                vec![approval("approve"), build("deploy", &["bin2"], &[], 2)],
            ))
            .unwrap();

        let err = builder.build().unwrap_err();
        assert!(matches!(err, ShipflowError::MissingInput { artifact, .. } if artifact == "bin2"));
    }

    #[test]
    fn test_same_stage_reference_fails() {
        // Scenario: an action consumes "src" produced in its own stage.
        let mut builder = PipelineBuilder::new("p");
        builder
            .add_stage(stage(
                "Build",
                vec![
                    checkout("checkout", &["src"]),
                    build("build", &["src"], &["bin"], 2),
                ],
            ))
            .unwrap();

        let err = builder.build().unwrap_err();
        assert!(matches!(
            err,
            ShipflowError::ForwardOrSameStageReference { artifact, .. } if artifact == "src"
        ));
    }

    #[test]
    fn test_forward_reference_fails() {
        let mut builder = PipelineBuilder::new("p");
        builder
            .add_stage(stage("Source", vec![checkout("checkout", &["src"])]))
            .unwrap();
        builder
            .add_stage(stage(
                "Build",
                vec![build("build", &["src", "bin"], &[], 1)],
            ))
            .unwrap();
        builder
            .add_stage(stage("Package", vec![build("package", &["src"], &["bin"], 1)]))
            .unwrap();

        let err = builder.build().unwrap_err();
        assert!(matches!(
            err,
            ShipflowError::ForwardOrSameStageReference { artifact, .. } if artifact == "bin"
        ));
    }

    #[test]
    fn test_duplicate_artifact_fails() {
        let mut builder = PipelineBuilder::new("p");
        builder
            .add_stage(stage("Source", vec![checkout("checkout", &["src"])]))
            .unwrap();
        builder
            .add_stage(stage("Build", vec![build("build", &["src"], &["src"], 1)]))
            .unwrap();

        let err = builder.build().unwrap_err();
        assert!(matches!(err, ShipflowError::DuplicateArtifact { name } if name == "src"));
    }

    #[test]
    fn test_no_source_action_fails() {
        let mut builder = PipelineBuilder::new("p");
        builder
            .add_stage(stage("Gate", vec![approval("approve")]))
            .unwrap();

        let err = builder.build().unwrap_err();
        assert!(matches!(err, ShipflowError::NoSourceAction));
    }

    #[test]
    fn test_invalid_run_order_surfaces_through_build() {
        let mut builder = PipelineBuilder::new("p");
        builder
            .add_stage(stage("Source", vec![build("step", &[], &["src"], 0)]))
            .unwrap();

        let err = builder.build().unwrap_err();
        assert!(matches!(err, ShipflowError::InvalidRunOrder { run_order: 0, .. }));
    }

    #[test]
    fn test_build_is_idempotent() {
        let first = demo_pipeline().build().unwrap();
        let second = demo_pipeline().build().unwrap();

        assert_eq!(first.fingerprint(), second.fingerprint());
        assert_eq!(first.stages().len(), second.stages().len());
        assert_eq!(
            first.artifacts().names().collect::<Vec<_>>(),
            second.artifacts().names().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_round_trip_reproduces_graph() {
        let graph = demo_pipeline().build().unwrap();

        let yaml = graph.definition().to_yaml().unwrap();
        let reparsed = Pipeline::from_yaml(&yaml).unwrap();
        let rebuilt = PipelineGraph::compile(reparsed).unwrap();

        assert_eq!(graph.fingerprint(), rebuilt.fingerprint());
    }

    #[test]
    fn test_policies_attach_to_identities() {
        let s3_full = PolicyGrant {
            resources: vec!["*".into()],
            actions: vec!["s3:*".into()],
            effect: Effect::Allow,
        };

        let mut build_action = build("build_test", &["src"], &["bin"], 1);
        build_action.grants.push(s3_full.clone());

        let mut builder = PipelineBuilder::new("serverless-cicd-demo");
        builder
            .add_stage(stage("Source", vec![checkout("checkout", &["src"])]))
            .unwrap();
        builder
            .add_stage(stage("Build-Test", vec![build_action]))
            .unwrap();
        let graph = builder.grant_pipeline_role(s3_full).build().unwrap();

        let build_role = Identity::from("serverless-cicd-demo-build_test-role");
        assert_eq!(graph.policies().effective_policy(&build_role).len(), 1);

        let pipeline_role = Identity::from("serverless-cicd-demo-pipeline-role");
        assert_eq!(graph.policies().effective_policy(&pipeline_role).len(), 1);
    }
}
