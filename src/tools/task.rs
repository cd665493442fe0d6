// ABOUTME: TaskTool - spawns a background subagent and returns its id immediately.
// ABOUTME: The fire-and-collect entry point of the tool surface.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::OrchestratorError;
use crate::orchestrator::TaskOrchestrator;
use crate::tool::{Tool, ToolResult};

/// A tool that spawns subagents to handle delegated tasks in the
/// background.
///
/// Returns the new task's id without waiting for it to run. Results are
/// collected later with `wait` and `task_output`, so delegated work never
/// floods the caller's context.
pub struct TaskTool {
    orchestrator: Arc<TaskOrchestrator>,
}

impl TaskTool {
    /// Create a new TaskTool over an orchestrator.
    pub fn new(orchestrator: Arc<TaskOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl Tool for TaskTool {
    fn name(&self) -> &str {
        "task"
    }

    fn description(&self) -> &str {
        "Spawn a subagent to handle a task in the background. Returns a task id \
         immediately; use wait and task_output to collect the result later."
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "subagent_type": {
                    "type": "string",
                    "description": "The subagent profile to run under (must be registered)"
                },
                "instructions": {
                    "type": "string",
                    "description": "The task description to give to the subagent"
                }
            },
            "required": ["subagent_type", "instructions"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolResult, anyhow::Error> {
        let subagent_type = params
            .get("subagent_type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("Missing required parameter: subagent_type"))?;

        let instructions = params
            .get("instructions")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("Missing required parameter: instructions"))?;

        match self.orchestrator.spawn(subagent_type, instructions).await {
            Ok(task_id) => {
                let output = serde_json::json!({
                    "task_id": task_id.to_string(),
                    "status": "pending",
                });
                Ok(ToolResult::text(serde_json::to_string_pretty(&output)?))
            }
            Err(e @ OrchestratorError::InvalidSubagentType { .. }) => {
                Ok(ToolResult::error(e.to_string()))
            }
            Err(e) => Ok(ToolResult::error(format!("Spawn failed: {e}"))),
        }
    }
}
