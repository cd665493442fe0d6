// ABOUTME: Defines all error types for the offload library using thiserror.
// ABOUTME: Each submodule has its own error enum, unified under OffloadError.

use crate::orchestrator::{TaskId, TaskStatus};

/// Top-level error type for the offload library.
#[derive(Debug, thiserror::Error)]
pub enum OffloadError {
    #[error("Orchestrator error: {0}")]
    Orchestrator(#[from] OrchestratorError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),
}

/// Errors surfaced synchronously by orchestrator operations.
///
/// Execution-time failures are never raised through these variants; they
/// are absorbed into a task's `Failed` state and retrieved via
/// `task_output`. Capacity is likewise never an error: tasks spawned
/// past the concurrency limit stay Pending and are admitted FIFO as
/// slots free.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// The requested subagent type is not registered. No task id is
    /// allocated on this path.
    #[error("unknown subagent type '{name}' (available: {})", .available.join(", "))]
    InvalidSubagentType { name: String, available: Vec<String> },

    /// The task id was never issued in this session.
    #[error("unknown task id: {0}")]
    UnknownTask(String),

    /// The operation is not valid for the task's current status,
    /// e.g. cancelling a task that already reached a terminal state.
    #[error("task {task_id} is already {status}")]
    InvalidState { task_id: TaskId, status: TaskStatus },
}

/// Errors from execution backend operations.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("execution step failed: {0}")]
    Step(String),

    #[error("backend session unavailable: {0}")]
    Session(String),
}

/// Errors from tool operations.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Execution failed: {0}")]
    Execution(#[source] anyhow::Error),
}
