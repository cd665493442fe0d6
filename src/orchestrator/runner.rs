// ABOUTME: SubagentRunner - executes one delegated task's step loop end-to-end.
// ABOUTME: Absorbs every internal failure into a TaskOutcome; never raises.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use super::handle::{TaskHandle, TaskId};
use crate::backend::{ExecutionBackend, StepContext, StepOutcome, StepRecord};
use crate::profile::SubagentProfile;
use crate::tool::ScopedRegistry;

/// Why a task failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The execution backend returned an error.
    Backend,
    /// The profile's step budget ran out before a final result.
    BudgetExhausted,
    /// A single step exceeded the profile's wall-clock limit.
    StepTimeout,
}

/// Structured summary of a task failure, cached in place of a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureSummary {
    pub kind: FailureKind,
    pub message: String,
    /// The step at which the failure was observed.
    pub step: usize,
}

impl std::fmt::Display for FailureSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "step {}: {}", self.step, self.message)
    }
}

/// Final outcome of one delegated task.
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    /// The subagent produced a final result.
    Completed { result: String },
    /// An internal failure was captured.
    Failed { error: FailureSummary },
    /// Cancellation was observed at a checkpoint.
    Cancelled,
}

impl TaskOutcome {
    /// The terminal status this outcome maps to.
    pub fn status(&self) -> super::handle::TaskStatus {
        match self {
            TaskOutcome::Completed { .. } => super::handle::TaskStatus::Completed,
            TaskOutcome::Failed { .. } => super::handle::TaskStatus::Failed,
            TaskOutcome::Cancelled => super::handle::TaskStatus::Cancelled,
        }
    }
}

/// Executes one task's bounded step loop against the execution backend.
///
/// The runner's transcript is private: only the final result or failure
/// summary crosses the orchestrator boundary. Cancellation is checked
/// between steps - a step in flight is never interrupted, because the
/// backend cannot safely be stopped mid-operation.
pub struct SubagentRunner {
    /// Private execution-context id, distinct from the task id.
    context_id: String,
    task_id: TaskId,
    profile: SubagentProfile,
    backend: Arc<dyn ExecutionBackend>,
    capabilities: ScopedRegistry,
    handle: Arc<TaskHandle>,
    transcript: Vec<StepRecord>,
}

impl SubagentRunner {
    /// Create a runner for one spawned task.
    pub fn new(
        task_id: TaskId,
        profile: SubagentProfile,
        backend: Arc<dyn ExecutionBackend>,
        capabilities: ScopedRegistry,
        handle: Arc<TaskHandle>,
    ) -> Self {
        Self {
            context_id: Uuid::new_v4().to_string(),
            task_id,
            profile,
            backend,
            capabilities,
            handle,
            transcript: Vec::new(),
        }
    }

    /// The private execution-context id.
    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    /// Run the step loop to a terminal outcome. Infallible by contract:
    /// backend errors, timeouts, and budget exhaustion all come back as
    /// `TaskOutcome::Failed`.
    pub async fn run(mut self, instructions: &str) -> TaskOutcome {
        let prompt = if self.profile.instruction_template.is_empty() {
            instructions.to_string()
        } else {
            format!("{}\n\n{}", self.profile.instruction_template, instructions)
        };

        tracing::debug!(task = %self.task_id, context = %self.context_id, "subagent run started");

        for step in 1..=self.profile.max_steps {
            // Cancellation checkpoint between steps.
            if self.handle.is_cancel_requested() {
                tracing::debug!(task = %self.task_id, step, "cancellation observed at checkpoint");
                return TaskOutcome::Cancelled;
            }

            let ctx = StepContext {
                task_id: self.task_id,
                step,
                instructions: &prompt,
                transcript: &self.transcript,
                capabilities: &self.capabilities,
            };

            let outcome = match self.profile.step_timeout {
                Some(limit) => {
                    match tokio::time::timeout(limit, self.backend.execute_step(ctx)).await {
                        Ok(outcome) => outcome,
                        Err(_) => {
                            return TaskOutcome::Failed {
                                error: FailureSummary {
                                    kind: FailureKind::StepTimeout,
                                    message: format!("step exceeded the {limit:?} limit"),
                                    step,
                                },
                            };
                        }
                    }
                }
                None => self.backend.execute_step(ctx).await,
            };

            self.handle.note_step();

            match outcome {
                Ok(StepOutcome::Continue(record)) => {
                    self.transcript.push(record);
                }
                Ok(StepOutcome::Done(result)) => {
                    tracing::debug!(task = %self.task_id, steps = step, "subagent produced final result");
                    return TaskOutcome::Completed { result };
                }
                Err(e) => {
                    tracing::debug!(task = %self.task_id, step, error = %e, "backend step failed");
                    return TaskOutcome::Failed {
                        error: FailureSummary {
                            kind: FailureKind::Backend,
                            message: e.to_string(),
                            step,
                        },
                    };
                }
            }
        }

        TaskOutcome::Failed {
            error: FailureSummary {
                kind: FailureKind::BudgetExhausted,
                message: format!(
                    "no final result after {} steps",
                    self.profile.max_steps
                ),
                step: self.profile.max_steps,
            },
        }
    }
}
