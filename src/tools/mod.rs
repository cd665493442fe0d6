// ABOUTME: Primary-loop tool surface - task, wait, and task_output.
// ABOUTME: The only entry points the primary loop uses to reach the orchestrator.

mod task;
mod task_output;
mod wait;

pub use task::TaskTool;
pub use task_output::TaskOutputTool;
pub use wait::WaitTool;
