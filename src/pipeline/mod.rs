// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Pipeline definitions and types
//!
//! This module defines the core data structures for shipflow pipelines:
//! stages, actions, artifacts, policy grants, the validating builder, and
//! the reference execution engine.

mod artifact;
mod builder;
mod dag;
mod definition;
mod executor;
mod policy;

pub use artifact::{ArtifactProducer, ArtifactStore};
pub use builder::{PipelineBuilder, PipelineGraph};
pub use dag::{ActionNode, ArtifactFlow};
pub use definition::*;
pub use executor::{
    ActionStatus, CancelHandle, EngineOptions, PipelineEngine, RunReport, StageState,
};
pub use policy::{Effect, Identity, PolicyGrant, PolicySet};
