// ABOUTME: Subagent profile types - capability-set configuration for spawning tasks.
// ABOUTME: ProfileRegistry holds the subagent types that can be spawned.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::tool::{Registry, ScopedRegistry};

/// Definition of a subagent type that can be spawned as a background task.
#[derive(Debug, Clone)]
pub struct SubagentProfile {
    /// Unique identifier for this subagent type.
    pub name: String,

    /// Instruction template prepended to every task given to this profile.
    pub instruction_template: String,

    /// Capabilities this profile is allowed to use (allowlist).
    /// If None, the full base registry is available.
    pub allowed_capabilities: Option<Vec<String>>,

    /// Capabilities this profile is denied from using (denylist).
    /// Takes precedence over allowed_capabilities.
    pub denied_capabilities: Vec<String>,

    /// Maximum execution steps before the task is failed for budget
    /// exhaustion.
    pub max_steps: usize,

    /// Optional wall-clock limit for a single execution step.
    pub step_timeout: Option<Duration>,
}

impl SubagentProfile {
    /// Create a new profile with required fields.
    pub fn new(name: impl Into<String>, instruction_template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instruction_template: instruction_template.into(),
            allowed_capabilities: None,
            denied_capabilities: Vec::new(),
            max_steps: 25,
            step_timeout: None,
        }
    }

    /// Set the capability allowlist.
    pub fn allowed_capabilities(mut self, names: Vec<String>) -> Self {
        self.allowed_capabilities = Some(names);
        self
    }

    /// Set the capability denylist.
    pub fn denied_capabilities(mut self, names: Vec<String>) -> Self {
        self.denied_capabilities = names;
        self
    }

    /// Set the maximum step budget.
    pub fn max_steps(mut self, max: usize) -> Self {
        self.max_steps = max;
        self
    }

    /// Set the per-step wall-clock limit.
    pub fn step_timeout(mut self, limit: Duration) -> Self {
        self.step_timeout = Some(limit);
        self
    }

    /// Build the scoped capability view this profile grants over a base
    /// registry.
    pub fn scope(&self, base: &Registry) -> ScopedRegistry {
        ScopedRegistry::new(base.clone())
            .allowed(self.allowed_capabilities.clone())
            .denied(self.denied_capabilities.clone())
    }
}

/// Registry of available subagent profiles, owned by one session.
#[derive(Default)]
pub struct ProfileRegistry {
    profiles: Arc<RwLock<HashMap<String, SubagentProfile>>>,
}

impl ProfileRegistry {
    /// Create a new empty profile registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subagent profile.
    pub async fn register(&self, profile: SubagentProfile) {
        let mut profiles = self.profiles.write().await;
        profiles.insert(profile.name.clone(), profile);
    }

    /// Get a profile by subagent type name.
    pub async fn get(&self, name: &str) -> Option<SubagentProfile> {
        let profiles = self.profiles.read().await;
        profiles.get(name).cloned()
    }

    /// List all registered subagent types, sorted.
    pub async fn list(&self) -> Vec<String> {
        let profiles = self.profiles.read().await;
        let mut names: Vec<_> = profiles.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Clone for ProfileRegistry {
    fn clone(&self) -> Self {
        Self {
            profiles: Arc::clone(&self.profiles),
        }
    }
}

/// Pre-configured profiles for common delegation patterns.
pub mod presets {
    use super::SubagentProfile;

    /// Read-only research profile: search and reflection, no mutation.
    pub fn research() -> SubagentProfile {
        SubagentProfile::new(
            "research",
            "You are a research subagent. Gather information and report \
             a concise final answer.",
        )
        .allowed_capabilities(vec!["search".into(), "fetch".into(), "read_file".into()])
        .max_steps(15)
    }

    /// General-purpose profile: the full base capability set.
    pub fn general_purpose() -> SubagentProfile {
        SubagentProfile::new(
            "general-purpose",
            "You are a general-purpose subagent. Complete the task and \
             report a final result.",
        )
        .max_steps(40)
    }
}
