// ABOUTME: WaitTool - suspends the calling turn until tasks settle.
// ABOUTME: A deadline yields a partial status report, never an error.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::OrchestratorError;
use crate::orchestrator::{TaskId, TaskOrchestrator};
use crate::tool::{Tool, ToolResult};

/// A tool that waits for one task - or the whole active set - to reach a
/// terminal state.
pub struct WaitTool {
    orchestrator: Arc<TaskOrchestrator>,
}

impl WaitTool {
    /// Create a new WaitTool over an orchestrator.
    pub fn new(orchestrator: Arc<TaskOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl Tool for WaitTool {
    fn name(&self) -> &str {
        "wait"
    }

    fn description(&self) -> &str {
        "Wait for a background task to finish, or with no task_id wait until \
         all background tasks have finished. An optional timeout returns a \
         partial status report instead of blocking indefinitely."
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "task_id": {
                    "type": "string",
                    "description": "Optional: the task to wait for (e.g. \"Task-3\"). \
                                    Omit to wait for all active tasks."
                },
                "timeout_seconds": {
                    "type": "number",
                    "description": "Optional: give up after this many seconds and \
                                    return current statuses"
                }
            },
            "required": []
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolResult, anyhow::Error> {
        let target = match params.get("task_id").and_then(|v| v.as_str()) {
            Some(label) => match label.parse::<TaskId>() {
                Ok(id) => Some(id),
                Err(e) => return Ok(ToolResult::error(e.to_string())),
            },
            None => None,
        };

        let deadline = params
            .get("timeout_seconds")
            .and_then(|v| v.as_f64())
            .map(|secs| Duration::from_secs_f64(secs.max(0.0)));

        match self.orchestrator.wait(target, deadline).await {
            Ok(report) => {
                let statuses: serde_json::Map<String, serde_json::Value> = report
                    .statuses
                    .iter()
                    .map(|(id, status)| (id.to_string(), status.to_string().into()))
                    .collect();
                let output = serde_json::json!({
                    "timed_out": report.timed_out,
                    "statuses": statuses,
                });
                Ok(ToolResult::text(serde_json::to_string_pretty(&output)?))
            }
            Err(e @ OrchestratorError::UnknownTask(_)) => Ok(ToolResult::error(e.to_string())),
            Err(e) => Ok(ToolResult::error(format!("Wait failed: {e}"))),
        }
    }
}
