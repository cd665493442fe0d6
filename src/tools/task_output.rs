// ABOUTME: TaskOutputTool - retrieves a task's cached result, error summary,
// ABOUTME: or a progress snapshot if the task is still active.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::OrchestratorError;
use crate::orchestrator::{TaskId, TaskOrchestrator, TaskStatus};
use crate::sink::{SinkEvent, TranscriptSink};
use crate::tool::{Tool, ToolResult};

/// A tool that pulls one task's output into the primary loop's context.
///
/// This is the only path by which a delegated task's payload becomes
/// visible: the turn-boundary summary names ids and statuses but carries
/// no content.
pub struct TaskOutputTool {
    orchestrator: Arc<TaskOrchestrator>,
    sink: Option<Arc<dyn TranscriptSink>>,
}

impl TaskOutputTool {
    /// Create a new TaskOutputTool over an orchestrator.
    pub fn new(orchestrator: Arc<TaskOrchestrator>) -> Self {
        Self {
            orchestrator,
            sink: None,
        }
    }

    /// Also mirror retrieved outputs into a transcript sink.
    pub fn with_sink(mut self, sink: Arc<dyn TranscriptSink>) -> Self {
        self.sink = Some(sink);
        self
    }
}

#[async_trait]
impl Tool for TaskOutputTool {
    fn name(&self) -> &str {
        "task_output"
    }

    fn description(&self) -> &str {
        "Retrieve the result of a background task. Returns the cached result or \
         error for finished tasks, or a progress snapshot for tasks still running."
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "task_id": {
                    "type": "string",
                    "description": "The task to retrieve (e.g. \"Task-3\")"
                }
            },
            "required": ["task_id"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolResult, anyhow::Error> {
        let label = params
            .get("task_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("Missing required parameter: task_id"))?;

        let id = match label.parse::<TaskId>() {
            Ok(id) => id,
            Err(e) => return Ok(ToolResult::error(e.to_string())),
        };

        let report = match self.orchestrator.task_output(id).await {
            Ok(report) => report,
            Err(e @ OrchestratorError::UnknownTask(_)) => {
                return Ok(ToolResult::error(e.to_string()));
            }
            Err(e) => return Ok(ToolResult::error(format!("Retrieval failed: {e}"))),
        };

        let mut output = serde_json::json!({
            "task_id": report.task_id.to_string(),
            "status": report.status.to_string(),
            "elapsed_seconds": report.elapsed.as_secs_f64(),
            "steps": report.steps,
        });
        match report.status {
            TaskStatus::Completed => {
                output["result"] = report.result.unwrap_or_default().into();
            }
            TaskStatus::Failed => {
                output["error"] = serde_json::to_value(&report.error)?;
            }
            _ => {}
        }

        let text = serde_json::to_string_pretty(&output)?;
        if let Some(sink) = &self.sink {
            sink.append(SinkEvent::TaskOutput {
                task_id: id,
                text: text.clone(),
            })
            .await?;
        }
        Ok(ToolResult::text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ExecutionBackend, StepContext, StepOutcome};
    use crate::error::BackendError;
    use crate::orchestrator::OrchestratorConfig;
    use crate::profile::{ProfileRegistry, SubagentProfile};
    use crate::sink::MemorySink;
    use crate::tool::Registry;

    struct InstantBackend;

    #[async_trait]
    impl ExecutionBackend for InstantBackend {
        async fn execute_step(&self, ctx: StepContext<'_>) -> Result<StepOutcome, BackendError> {
            if ctx.instructions.contains("fail") {
                Err(BackendError::Step("broken".into()))
            } else {
                Ok(StepOutcome::Done("the answer".into()))
            }
        }
    }

    async fn setup() -> (Arc<TaskOrchestrator>, Arc<MemorySink>, TaskOutputTool) {
        let profiles = ProfileRegistry::new();
        profiles.register(SubagentProfile::new("worker", "")).await;
        let orch = Arc::new(TaskOrchestrator::new(
            profiles,
            Registry::new(),
            Arc::new(InstantBackend),
            OrchestratorConfig::new(),
        ));
        let sink = MemorySink::shared();
        let tool = TaskOutputTool::new(orch.clone()).with_sink(sink.clone());
        (orch, sink, tool)
    }

    #[tokio::test]
    async fn test_completed_task_returns_result() {
        let (orch, sink, tool) = setup().await;
        let id = orch.spawn("worker", "job").await.unwrap();
        orch.wait(Some(id), None).await.unwrap();

        let result = tool
            .execute(serde_json::json!({"task_id": id.to_string()}))
            .await
            .unwrap();

        assert!(!result.is_error);
        assert!(result.content.contains("the answer"));
        assert!(result.content.contains("completed"));
        assert_eq!(sink.events().await.len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_retrieval_is_identical() {
        let (orch, _sink, tool) = setup().await;
        let id = orch.spawn("worker", "job").await.unwrap();
        orch.wait(Some(id), None).await.unwrap();

        let params = serde_json::json!({"task_id": id.to_string()});
        let first = tool.execute(params.clone()).await.unwrap();
        let second = tool.execute(params).await.unwrap();
        assert_eq!(first.content, second.content);
    }

    #[tokio::test]
    async fn test_failed_task_returns_error_summary() {
        let (orch, _sink, tool) = setup().await;
        let id = orch.spawn("worker", "fail please").await.unwrap();
        orch.wait(Some(id), None).await.unwrap();

        let result = tool
            .execute(serde_json::json!({"task_id": id.to_string()}))
            .await
            .unwrap();

        assert!(!result.is_error);
        assert!(result.content.contains("\"status\": \"failed\""));
        assert!(result.content.contains("broken"));
    }

    #[tokio::test]
    async fn test_unknown_task_is_error_result() {
        let (_orch, _sink, tool) = setup().await;
        let result = tool
            .execute(serde_json::json!({"task_id": "Task-7"}))
            .await
            .unwrap();
        assert!(result.is_error);
    }
}
