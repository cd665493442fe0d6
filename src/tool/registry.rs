// ABOUTME: Implements the Registry - a thread-safe container for discovering
// ABOUTME: and managing available capabilities at runtime.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::Tool;

/// Declarative description of a capability, suitable for handing to an
/// execution backend when it builds a subagent's working context.
#[derive(Debug, Clone)]
pub struct CapabilityInfo {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// A thread-safe registry of tools.
#[derive(Default)]
pub struct Registry {
    tools: Arc<RwLock<HashMap<String, Arc<dyn Tool>>>>,
}

impl Registry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool.
    pub async fn register<T: Tool + 'static>(&self, tool: T) {
        self.register_arc(Arc::new(tool)).await;
    }

    /// Register a tool from an Arc.
    pub async fn register_arc(&self, tool: Arc<dyn Tool>) {
        let mut tools = self.tools.write().await;
        tools.insert(tool.name().to_string(), tool);
    }

    /// Unregister a tool by name.
    pub async fn unregister(&self, name: &str) {
        let mut tools = self.tools.write().await;
        tools.remove(name);
    }

    /// Get a tool by name.
    pub async fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        let tools = self.tools.read().await;
        tools.get(name).cloned()
    }

    /// List all tool names, sorted alphabetically.
    pub async fn list(&self) -> Vec<String> {
        let tools = self.tools.read().await;
        let mut names: Vec<_> = tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Get all registered tools.
    pub async fn all(&self) -> Vec<Arc<dyn Tool>> {
        let tools = self.tools.read().await;
        tools.values().cloned().collect()
    }

    /// Get the number of registered tools.
    pub async fn count(&self) -> usize {
        let tools = self.tools.read().await;
        tools.len()
    }

    /// Describe all tools as capability declarations.
    pub async fn describe(&self) -> Vec<CapabilityInfo> {
        let tools = self.tools.read().await;
        tools
            .values()
            .map(|t| CapabilityInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.schema(),
            })
            .collect()
    }
}

impl Clone for Registry {
    fn clone(&self) -> Self {
        Self {
            tools: Arc::clone(&self.tools),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::ToolResult;
    use super::*;
    use async_trait::async_trait;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echo the input back"
        }
        fn schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }
        async fn execute(&self, params: serde_json::Value) -> Result<ToolResult, anyhow::Error> {
            Ok(ToolResult::text(params.to_string()))
        }
    }

    #[tokio::test]
    async fn test_register_and_get() {
        let registry = Registry::new();
        registry.register(EchoTool).await;

        assert!(registry.get("echo").await.is_some());
        assert!(registry.get("missing").await.is_none());
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn test_unregister() {
        let registry = Registry::new();
        registry.register(EchoTool).await;
        registry.unregister("echo").await;
        assert!(registry.get("echo").await.is_none());
    }

    #[tokio::test]
    async fn test_describe() {
        let registry = Registry::new();
        registry.register(EchoTool).await;

        let caps = registry.describe().await;
        assert_eq!(caps.len(), 1);
        assert_eq!(caps[0].name, "echo");
    }

    #[tokio::test]
    async fn test_clone_shares_state() {
        let registry = Registry::new();
        let cloned = registry.clone();
        registry.register(EchoTool).await;
        assert!(cloned.get("echo").await.is_some());
    }
}
