// ABOUTME: Execution backend seam - one step of delegated work at a time.
// ABOUTME: Includes SerializedBackend for sharing a single stateful session.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::BackendError;
use crate::orchestrator::TaskId;
use crate::tool::ScopedRegistry;

/// One entry in a subagent's private transcript.
#[derive(Debug, Clone)]
pub struct StepRecord {
    /// 1-based step index within the run.
    pub step: usize,

    /// What the step did, in the backend's own terms.
    pub summary: String,
}

/// Context handed to the backend for a single execution step.
pub struct StepContext<'a> {
    /// The task this step belongs to.
    pub task_id: TaskId,

    /// 1-based step index within the run.
    pub step: usize,

    /// The instructions the task was spawned with, prefixed by the
    /// profile's instruction template.
    pub instructions: &'a str,

    /// Transcript of the steps executed so far. Private to the runner;
    /// never leaves the orchestrator boundary.
    pub transcript: &'a [StepRecord],

    /// The capability set the task's profile grants.
    pub capabilities: &'a ScopedRegistry,
}

/// Outcome of a single execution step.
#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// The step made progress; the runner continues the loop.
    Continue(StepRecord),

    /// The subagent produced its final result.
    Done(String),
}

/// The stateful service that performs execution steps on behalf of a
/// subagent (e.g. running code, calling a capability).
///
/// Implementations decide what a "step" means. The orchestrator only
/// requires that each call either makes progress, finishes with a final
/// result, or fails - and that failure is returned, never panicked.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Execute one step and return its outcome.
    async fn execute_step(&self, ctx: StepContext<'_>) -> Result<StepOutcome, BackendError>;
}

/// Decorator that serializes step execution across tasks.
///
/// Wrap a backend in this when all subagents share one stateful session
/// (a single sandbox, a single REPL). Steps from concurrently running
/// tasks are then mutually excluded, preserving session-state
/// consistency. Leave the backend unwrapped when each task gets an
/// isolated session.
pub struct SerializedBackend {
    inner: Arc<dyn ExecutionBackend>,
    slot: Mutex<()>,
}

impl SerializedBackend {
    /// Wrap a backend so its steps execute one at a time.
    pub fn new(inner: Arc<dyn ExecutionBackend>) -> Self {
        Self {
            inner,
            slot: Mutex::new(()),
        }
    }
}

#[async_trait]
impl ExecutionBackend for SerializedBackend {
    async fn execute_step(&self, ctx: StepContext<'_>) -> Result<StepOutcome, BackendError> {
        let _slot = self.slot.lock().await;
        self.inner.execute_step(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::Registry;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Backend that tracks how many steps are in flight at once.
    struct OverlapProbe {
        in_flight: AtomicUsize,
        max_seen: AtomicUsize,
    }

    #[async_trait]
    impl ExecutionBackend for OverlapProbe {
        async fn execute_step(&self, _ctx: StepContext<'_>) -> Result<StepOutcome, BackendError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(StepOutcome::Done("ok".into()))
        }
    }

    async fn run_step(backend: Arc<dyn ExecutionBackend>, scoped: ScopedRegistry) {
        let ctx = StepContext {
            task_id: TaskId::new(1),
            step: 1,
            instructions: "",
            transcript: &[],
            capabilities: &scoped,
        };
        backend.execute_step(ctx).await.unwrap();
    }

    #[tokio::test]
    async fn test_serialized_backend_excludes_concurrent_steps() {
        let probe = Arc::new(OverlapProbe {
            in_flight: AtomicUsize::new(0),
            max_seen: AtomicUsize::new(0),
        });
        let backend: Arc<dyn ExecutionBackend> =
            Arc::new(SerializedBackend::new(probe.clone()));

        let scoped = ScopedRegistry::new(Registry::new());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let backend = backend.clone();
            let scoped = scoped.clone();
            handles.push(tokio::spawn(run_step(backend, scoped)));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(probe.max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unwrapped_backend_allows_overlap() {
        let probe = Arc::new(OverlapProbe {
            in_flight: AtomicUsize::new(0),
            max_seen: AtomicUsize::new(0),
        });
        let backend: Arc<dyn ExecutionBackend> = probe.clone();

        let scoped = ScopedRegistry::new(Registry::new());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let backend = backend.clone();
            let scoped = scoped.clone();
            handles.push(tokio::spawn(run_step(backend, scoped)));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(probe.max_seen.load(Ordering::SeqCst) > 1);
    }
}
