// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Artifact registry
//!
//! Artifacts are named, opaque bundles produced by exactly one action and
//! consumed by actions in later stages. The registry maps each name to the
//! coordinates of its producing action and enforces pipeline-wide name
//! uniqueness.

use std::collections::HashMap;

use crate::errors::ShipflowError;

/// Coordinates of the action that produces an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactProducer {
    /// Index of the producing stage within the pipeline
    pub stage_index: usize,
    /// Index of the producing action within its stage
    pub action_index: usize,
    pub stage_name: String,
    pub action_name: String,
}

/// Name → producer mapping for every artifact declared in a pipeline
///
/// Artifacts are read-only once produced; the registry itself is only
/// written during graph construction.
#[derive(Debug, Clone, Default)]
pub struct ArtifactStore {
    producers: HashMap<String, ArtifactProducer>,
    // Declaration order, for deterministic iteration and rendering
    names: Vec<String>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an artifact as the output of `producer`
    ///
    /// Fails if any action already declared the same name.
    pub fn declare_output(
        &mut self,
        name: &str,
        producer: ArtifactProducer,
    ) -> Result<(), ShipflowError> {
        if name.is_empty() {
            return Err(ShipflowError::InvalidName {
                context: format!("artifact name in action '{}' (empty)", producer.action_name),
            });
        }

        if self.producers.contains_key(name) {
            return Err(ShipflowError::DuplicateArtifact {
                name: name.to_string(),
            });
        }

        self.names.push(name.to_string());
        self.producers.insert(name.to_string(), producer);
        Ok(())
    }

    /// Resolve an artifact name to its producer
    pub fn reference(&self, name: &str) -> Result<&ArtifactProducer, ShipflowError> {
        self.producers
            .get(name)
            .ok_or_else(|| ShipflowError::UnknownArtifact {
                name: name.to_string(),
            })
    }

    /// Whether any action declared this name as an output
    pub fn contains(&self, name: &str) -> bool {
        self.producers.contains_key(name)
    }

    /// Artifact names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
