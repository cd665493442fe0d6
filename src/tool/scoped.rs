// ABOUTME: ScopedRegistry - a decorator that restricts capability access.
// ABOUTME: Implements allowlist/denylist filtering on top of a base Registry.

use std::sync::Arc;

use super::{CapabilityInfo, Registry, Tool};

/// A filtered view of a Registry bounding a subagent's capability set.
///
/// Uses the decorator pattern to wrap a Registry and filter capability
/// access based on allowlist/denylist rules. Denylist takes precedence.
pub struct ScopedRegistry {
    source: Registry,
    allowed: Option<Vec<String>>,
    denied: Vec<String>,
}

impl ScopedRegistry {
    /// Create a new scoped registry from a source registry.
    pub fn new(source: Registry) -> Self {
        Self {
            source,
            allowed: None,
            denied: Vec::new(),
        }
    }

    /// Set the allowlist of capabilities. If None, all are allowed.
    pub fn allowed(mut self, names: Option<Vec<String>>) -> Self {
        self.allowed = names;
        self
    }

    /// Set the denylist of capabilities. Takes precedence over allowlist.
    pub fn denied(mut self, names: Vec<String>) -> Self {
        self.denied = names;
        self
    }

    /// Check if a capability name passes the filter.
    pub fn is_allowed(&self, name: &str) -> bool {
        // Denylist always wins
        if self.denied.iter().any(|d| d == name) {
            return false;
        }

        match &self.allowed {
            None => true,
            Some(allowed) => allowed.iter().any(|a| a == name),
        }
    }

    /// Get a capability by name if it passes the filter.
    pub async fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        if !self.is_allowed(name) {
            return None;
        }
        self.source.get(name).await
    }

    /// List all capability names that pass the filter.
    pub async fn list(&self) -> Vec<String> {
        self.source
            .list()
            .await
            .into_iter()
            .filter(|name| self.is_allowed(name))
            .collect()
    }

    /// Describe all capabilities that pass the filter.
    pub async fn describe(&self) -> Vec<CapabilityInfo> {
        let mut caps = self.source.describe().await;
        caps.retain(|c| self.is_allowed(&c.name));
        caps
    }

    /// Get the number of capabilities that pass the filter.
    pub async fn count(&self) -> usize {
        self.list().await.len()
    }
}

impl Clone for ScopedRegistry {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            allowed: self.allowed.clone(),
            denied: self.denied.clone(),
        }
    }
}
