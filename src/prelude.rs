// ABOUTME: Prelude module - convenient imports for common use cases.
// ABOUTME: Use `use offload::prelude::*;` to get started quickly.

pub use crate::backend::{
    ExecutionBackend, SerializedBackend, StepContext, StepOutcome, StepRecord,
};
pub use crate::error::{BackendError, OffloadError, OrchestratorError, ToolError};
pub use crate::orchestrator::{
    FailureKind, FailureSummary, NotificationInjector, OrchestratorConfig, ResultCache,
    SubagentRunner, TaskCounts, TaskHandle, TaskId, TaskOrchestrator, TaskOutcome,
    TaskOutputReport, TaskStatus, TaskStatusSnapshot, WaitReport, WaitingRoom,
};
pub use crate::profile::{ProfileRegistry, SubagentProfile, presets};
pub use crate::sink::{MemorySink, SinkEvent, TranscriptSink};
pub use crate::tool::{CapabilityInfo, Registry, ScopedRegistry, Tool, ToolResult};
pub use crate::tools::{TaskOutputTool, TaskTool, WaitTool};
