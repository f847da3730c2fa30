// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Execution policy model
//!
//! A `PolicyGrant` is a permission statement (resource patterns, operation
//! patterns, effect) attached to an execution identity. Attachment is
//! additive only: there is no interface to revoke or narrow a statement, and
//! all statements apply simultaneously. Resolving Allow against Deny is the
//! identity provider's job, not ours.

use glob::Pattern;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

/// Effect of a policy statement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
    Deny,
}

impl std::fmt::Display for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Allow => write!(f, "allow"),
            Self::Deny => write!(f, "deny"),
        }
    }
}

/// A single permission statement, immutable once created
///
/// `resources: ["*"], actions: ["*"]` is legal: the degenerate full-access
/// statement used by broad build and deploy roles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyGrant {
    /// Resource patterns the statement applies to
    pub resources: Vec<String>,

    /// Operation patterns the statement covers (e.g. `s3:*`)
    pub actions: Vec<String>,

    /// Allow or Deny
    pub effect: Effect,
}

impl PolicyGrant {
    /// Allow `operations` on `resources`
    pub fn allow(resources: Vec<String>, actions: Vec<String>) -> Self {
        Self {
            resources,
            actions,
            effect: Effect::Allow,
        }
    }

    /// Whether this statement covers an operation on a resource
    ///
    /// Patterns are glob-style: `s3:*` covers `s3:GetObject`. Invalid
    /// patterns cover nothing.
    pub fn covers(&self, operation: &str, resource: &str) -> bool {
        let matches = |patterns: &[String], value: &str| {
            patterns.iter().any(|p| {
                Pattern::new(p)
                    .map(|pat| pat.matches(value))
                    .unwrap_or(false)
            })
        };

        matches(&self.actions, operation) && matches(&self.resources, resource)
    }
}

/// An execution identity (a role name, from the engine's point of view)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub String);

impl Identity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Every statement ever granted to every identity, in attachment order
///
/// Write-only during graph construction; the engine and the identity
/// provider only read it.
#[derive(Debug, Clone, Default)]
pub struct PolicySet {
    grants: HashMap<Identity, Vec<PolicyGrant>>,
    // First-attachment order, for deterministic listing
    order: Vec<Identity>,
}

impl PolicySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a statement to an identity's effective policy
    ///
    /// Additive only; nothing is replaced or narrowed.
    pub fn grant(&mut self, identity: Identity, statement: PolicyGrant) {
        if !self.grants.contains_key(&identity) {
            self.order.push(identity.clone());
        }
        self.grants.entry(identity).or_default().push(statement);
    }

    /// All statements granted to an identity, in attachment order
    ///
    /// Every statement applies simultaneously: there is no last-writer-wins.
    pub fn effective_policy(&self, identity: &Identity) -> &[PolicyGrant] {
        self.grants.get(identity).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Identities in first-attachment order
    pub fn identities(&self) -> impl Iterator<Item = &Identity> {
        self.order.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Render an identity's effective policy as a JSON document
    ///
    /// The shape consumed by the identity-provider collaborator.
    pub fn document(&self, identity: &Identity) -> serde_json::Value {
        json!({
            "identity": identity.as_str(),
            "statements": self.effective_policy(identity),
        })
    }
}
