// ABOUTME: Task orchestration module - spawn, track, and collect background tasks.
// ABOUTME: Provides TaskOrchestrator, SubagentRunner, ResultCache, and the waiting room.

mod cache;
mod handle;
mod orchestrator;
mod runner;
mod waiting_room;

pub use cache::ResultCache;
pub use handle::{ParseTaskIdError, TaskHandle, TaskId, TaskStatus};
pub use orchestrator::{
    OrchestratorConfig, TaskCounts, TaskOrchestrator, TaskOutputReport, TaskStatusSnapshot,
    WaitReport,
};
pub use runner::{FailureKind, FailureSummary, SubagentRunner, TaskOutcome};
pub use waiting_room::{NotificationInjector, WaitingRoom};
