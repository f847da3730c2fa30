// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Pipeline definition structures
//!
//! Defines the schema for .shipflow.yaml (and .toml) files: a pipeline is an
//! ordered sequence of stages, each an ordered sequence of actions that
//! consume and produce named artifacts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::errors::ShipflowError;
use crate::pipeline::policy::PolicyGrant;

/// Pipeline definition from .shipflow.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    /// Definition version (for future compatibility)
    #[serde(default = "default_version")]
    pub version: String,

    /// Pipeline name
    pub name: String,

    /// Pipeline description
    #[serde(default)]
    pub description: Option<String>,

    /// Naming and source-control configuration
    #[serde(default)]
    pub config: PipelineConfig,

    /// Stages in execution order
    pub stages: Vec<Stage>,

    /// Policy grants attached to the pipeline's own execution role
    #[serde(default)]
    pub grants: Vec<PolicyGrant>,
}

fn default_version() -> String {
    "1".to_string()
}

impl Pipeline {
    /// Load pipeline from a YAML or TOML file, by extension
    pub fn from_file(path: &Path) -> Result<Self, ShipflowError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ShipflowError::FileReadError {
                path: path.to_path_buf(),
                error: e.to_string(),
            }
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            Some("toml") => Self::from_toml(&content),
            _ => Err(ShipflowError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Parse pipeline from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ShipflowError> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    /// Parse pipeline from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ShipflowError> {
        toml::from_str(toml_str).map_err(Into::into)
    }

    /// Serialize pipeline to YAML
    pub fn to_yaml(&self) -> Result<String, ShipflowError> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    /// Get a stage by name
    pub fn get_stage(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Get all stage names
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }

    /// Project name used for derived role identities
    pub fn project(&self) -> &str {
        self.config.project.as_deref().unwrap_or(&self.name)
    }

    /// Identity name for the pipeline's own execution role
    pub fn pipeline_role(&self) -> String {
        format!("{}-pipeline-role", self.project())
    }
}

/// Naming conventions and source-control defaults
///
/// Explicit configuration rather than embedded constants: the project name
/// seeds derived role identities, the default branch applies to checkout
/// actions that don't pin one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Project name (defaults to the pipeline name)
    #[serde(default)]
    pub project: Option<String>,

    /// Branch used by checkout actions without an explicit branch
    #[serde(default = "default_branch")]
    pub default_branch: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            project: None,
            default_branch: default_branch(),
        }
    }
}

fn default_branch() -> String {
    "master".to_string()
}

/// A single pipeline stage: an ordered group of actions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    /// Stage name (must be unique within pipeline)
    pub name: String,

    /// Stage description
    #[serde(default)]
    pub description: Option<String>,

    /// Actions in declaration order
    pub actions: Vec<Action>,
}

impl Stage {
    /// Partition actions into run-order groups, ascending
    ///
    /// Actions sharing a run order execute concurrently; a group starts only
    /// once every action in the previous group is terminal. This is the
    /// scheduling unit consumed by the execution engine.
    pub fn run_order_groups(&self) -> Vec<(u32, Vec<&Action>)> {
        let mut groups: BTreeMap<u32, Vec<&Action>> = BTreeMap::new();
        for action in &self.actions {
            groups.entry(action.run_order).or_default().push(action);
        }
        groups.into_iter().collect()
    }

    /// Structural checks local to this stage
    ///
    /// Cross-stage artifact resolution happens in the builder; this covers
    /// emptiness, duplicate action names, and per-action checks.
    pub fn validate(&self) -> Result<(), ShipflowError> {
        if self.name.is_empty() {
            return Err(ShipflowError::InvalidName {
                context: "stage name (empty)".to_string(),
            });
        }

        if self.actions.is_empty() {
            return Err(ShipflowError::EmptyStage {
                stage: self.name.clone(),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for action in &self.actions {
            if !seen.insert(action.name.as_str()) {
                return Err(ShipflowError::DuplicateActionName {
                    stage: self.name.clone(),
                    action: action.name.clone(),
                });
            }
            action.validate(&self.name)?;
        }

        Ok(())
    }
}

/// A single executable step within a stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Action name (must be unique within its stage)
    pub name: String,

    /// What the action does
    pub kind: ActionKind,

    /// Artifacts consumed, produced by earlier stages
    #[serde(default)]
    pub inputs: Vec<String>,

    /// Artifacts produced, visible to later stages
    #[serde(default)]
    pub outputs: Vec<String>,

    /// Position within the stage; equal run orders execute concurrently
    #[serde(default = "default_run_order")]
    pub run_order: u32,

    /// Execution identity override (defaults to `<project>-<action>-role`)
    #[serde(default)]
    pub identity: Option<String>,

    /// Policy grants attached to this action's execution identity
    #[serde(default)]
    pub grants: Vec<PolicyGrant>,
}

fn default_run_order() -> u32 {
    1
}

impl Action {
    /// Local structural checks
    pub fn validate(&self, stage: &str) -> Result<(), ShipflowError> {
        if self.name.is_empty() {
            return Err(ShipflowError::InvalidName {
                context: format!("action name in stage '{}' (empty)", stage),
            });
        }

        if self.run_order < 1 {
            return Err(ShipflowError::InvalidRunOrder {
                stage: stage.to_string(),
                action: self.name.clone(),
                run_order: self.run_order,
            });
        }

        // Manual approvals are pure gates: nothing flows in or out.
        if matches!(self.kind, ActionKind::ManualApproval)
            && (!self.inputs.is_empty() || !self.outputs.is_empty())
        {
            return Err(ShipflowError::InvalidName {
                context: format!(
                    "artifact list on manual approval '{}' (approvals have no inputs or outputs)",
                    self.name
                ),
            });
        }

        Ok(())
    }

    /// Whether this action can seed the pipeline (no inputs required)
    pub fn is_source(&self) -> bool {
        self.inputs.is_empty() && !matches!(self.kind, ActionKind::ManualApproval)
    }

    /// Identity executing this action, derived when not overridden
    pub fn identity_for(&self, project: &str) -> String {
        self.identity
            .clone()
            .unwrap_or_else(|| format!("{}-{}-role", project, self.name))
    }
}

/// Action kind specification
///
/// A plain tagged variant, deliberately free of any provider framework:
/// the execution engine dispatches runners on the kind key alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ActionKind {
    /// Fetch sources from an external repository
    Checkout {
        /// Repository name, treated as an opaque reference
        repository: String,

        /// Branch to check out (defaults to `config.default_branch`)
        #[serde(default)]
        branch: Option<String>,
    },

    /// Run a build/test project
    Build {
        /// Build environment
        #[serde(default)]
        environment: BuildEnvironment,

        /// Buildspec file resolved inside the input artifact
        #[serde(default)]
        buildspec: Option<PathBuf>,
    },

    /// Gate: blocks higher run orders in the stage until approved
    ManualApproval,

    /// Run a deployment project
    Deploy {
        /// Build environment
        #[serde(default)]
        environment: BuildEnvironment,

        /// Buildspec file resolved inside the input artifact
        #[serde(default)]
        buildspec: Option<PathBuf>,
    },
}

impl ActionKind {
    /// Runner registry key for this kind
    pub fn key(&self) -> &'static str {
        match self {
            Self::Checkout { .. } => "checkout",
            Self::Build { .. } => "build",
            Self::ManualApproval => "manual-approval",
            Self::Deploy { .. } => "deploy",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Compute environment for build and deploy actions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildEnvironment {
    /// Build image
    #[serde(default = "default_image")]
    pub image: String,

    /// Compute size
    #[serde(default)]
    pub compute: ComputeType,
}

impl Default for BuildEnvironment {
    fn default() -> Self {
        Self {
            image: default_image(),
            compute: ComputeType::default(),
        }
    }
}

fn default_image() -> String {
    "amazon-linux-2".to_string()
}

/// Compute size classes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ComputeType {
    #[default]
    Small,
    Medium,
    Large,
}

impl std::fmt::Display for ComputeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Small => write!(f, "small"),
            Self::Medium => write!(f, "medium"),
            Self::Large => write!(f, "large"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_pipeline() {
        let yaml = r#"
version: "1"
name: "test-pipeline"
stages:
  - name: "Source"
    actions:
      - name: "checkout"
        kind:
          type: checkout
          repository: circle-area-calculator
        outputs: [src]
"#;

        let pipeline = Pipeline::from_yaml(yaml).unwrap();
        assert_eq!(pipeline.name, "test-pipeline");
        assert_eq!(pipeline.stages.len(), 1);
        assert_eq!(pipeline.stages[0].actions[0].name, "checkout");
        assert_eq!(pipeline.stages[0].actions[0].run_order, 1);
        assert_eq!(pipeline.stages[0].actions[0].outputs, vec!["src"]);
    }

    #[test]
    fn test_parse_action_kinds() {
        let yaml = r#"
version: "1"
name: "kinds"
stages:
  - name: "Deploy"
    actions:
      - name: "approve"
        kind:
          type: manual-approval
      - name: "deploy"
        kind:
          type: deploy
          buildspec: buildspec_deploy.yml
        inputs: [bin]
        run_order: 2
"#;

        let pipeline = Pipeline::from_yaml(yaml).unwrap();
        let stage = &pipeline.stages[0];
        assert!(matches!(stage.actions[0].kind, ActionKind::ManualApproval));
        match &stage.actions[1].kind {
            ActionKind::Deploy { buildspec, environment } => {
                assert_eq!(buildspec.as_ref().unwrap(), &PathBuf::from("buildspec_deploy.yml"));
                assert_eq!(environment.image, "amazon-linux-2");
                assert_eq!(environment.compute, ComputeType::Small);
            }
            _ => panic!("Expected Deploy kind"),
        }
        assert_eq!(stage.actions[1].run_order, 2);
    }

    #[test]
    fn test_run_order_groups_sorted_ascending() {
        let yaml = r#"
name: "groups"
stages:
  - name: "Deploy"
    actions:
      - name: "notify"
        kind: { type: build }
        run_order: 5
      - name: "approve"
        kind: { type: manual-approval }
      - name: "deploy-a"
        kind: { type: deploy }
        run_order: 2
      - name: "deploy-b"
        kind: { type: deploy }
        run_order: 2
"#;

        let pipeline = Pipeline::from_yaml(yaml).unwrap();
        let groups = pipeline.stages[0].run_order_groups();

        let orders: Vec<u32> = groups.iter().map(|(n, _)| *n).collect();
        assert_eq!(orders, vec![1, 2, 5]);

        let group_two: Vec<&str> = groups[1].1.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(group_two, vec!["deploy-a", "deploy-b"]);
    }

    #[test]
    fn test_invalid_run_order_rejected() {
        let yaml = r#"
name: "bad"
stages:
  - name: "Build"
    actions:
      - name: "build"
        kind: { type: build }
        run_order: 0
"#;

        let pipeline = Pipeline::from_yaml(yaml).unwrap();
        let err = pipeline.stages[0].validate().unwrap_err();
        assert!(matches!(err, ShipflowError::InvalidRunOrder { run_order: 0, .. }));
    }

    #[test]
    fn test_duplicate_action_name_rejected() {
        let yaml = r#"
name: "dup"
stages:
  - name: "Build"
    actions:
      - name: "build"
        kind: { type: build }
      - name: "build"
        kind: { type: build }
"#;

        let pipeline = Pipeline::from_yaml(yaml).unwrap();
        let err = pipeline.stages[0].validate().unwrap_err();
        assert!(matches!(err, ShipflowError::DuplicateActionName { .. }));
    }

    #[test]
    fn test_approval_with_artifacts_rejected() {
        let stage = Stage {
            name: "Deploy".into(),
            description: None,
            actions: vec![Action {
                name: "approve".into(),
                kind: ActionKind::ManualApproval,
                inputs: vec!["bin".into()],
                outputs: vec![],
                run_order: 1,
                identity: None,
                grants: vec![],
            }],
        };

        assert!(stage.validate().is_err());
    }

    #[test]
    fn test_identity_derivation() {
        let action = Action {
            name: "build_test".into(),
            kind: ActionKind::Build {
                environment: BuildEnvironment::default(),
                buildspec: None,
            },
            inputs: vec![],
            outputs: vec![],
            run_order: 1,
            identity: None,
            grants: vec![],
        };

        assert_eq!(action.identity_for("demo"), "demo-build_test-role");

        let pinned = Action {
            identity: Some("shared-build-role".into()),
            ..action
        };
        assert_eq!(pinned.identity_for("demo"), "shared-build-role");
    }

    #[test]
    fn test_round_trip_yaml() {
        let pipeline = Pipeline {
            version: "1".into(),
            name: "round-trip".into(),
            description: Some("A test pipeline".into()),
            config: PipelineConfig::default(),
            stages: vec![Stage {
                name: "Source".into(),
                description: None,
                actions: vec![Action {
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
                }],
            }],
            grants: vec![],
        };

        let yaml = pipeline.to_yaml().unwrap();
        let parsed = Pipeline::from_yaml(&yaml).unwrap();

        assert_eq!(parsed.name, pipeline.name);
        assert_eq!(parsed.stages.len(), pipeline.stages.len());
        assert_eq!(parsed.stages[0].actions[0].outputs, vec!["src"]);
    }

    #[test]
    fn test_parse_toml_pipeline() {
        let toml_str = r#"
name = "toml-pipeline"

[[stages]]
name = "Source"

[[stages.actions]]
name = "checkout"
outputs = ["src"]

[stages.actions.kind]
type = "checkout"
repository = "demo-repo"
"#;

        let pipeline = Pipeline::from_toml(toml_str).unwrap();
        assert_eq!(pipeline.name, "toml-pipeline");
        assert!(matches!(
            pipeline.stages[0].actions[0].kind,
            ActionKind::Checkout { .. }
        ));
    }

    #[test]
    fn test_project_defaults_to_pipeline_name() {
        let yaml = r#"
name: "demo"
stages:
  - name: "Source"
    actions:
      - name: "checkout"
        kind: { type: checkout, repository: r }
        outputs: [src]
"#;
        let pipeline = Pipeline::from_yaml(yaml).unwrap();
        assert_eq!(pipeline.project(), "demo");
        assert_eq!(pipeline.pipeline_role(), "demo-pipeline-role");
        assert_eq!(pipeline.config.default_branch, "master");
    }
}
