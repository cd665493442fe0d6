// ABOUTME: TaskOrchestrator - identity, scheduling, lifecycle, and result delivery
// ABOUTME: for background subagent tasks, scoped to one session.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use tokio::sync::{Notify, RwLock, Semaphore, mpsc};

use super::cache::ResultCache;
use super::handle::{TaskHandle, TaskId, TaskStatus};
use super::runner::{FailureSummary, SubagentRunner, TaskOutcome};
use super::waiting_room::WaitingRoom;
use crate::backend::ExecutionBackend;
use crate::error::OrchestratorError;
use crate::profile::{ProfileRegistry, SubagentProfile};
use crate::tool::{Registry, ScopedRegistry};

/// Configuration for one orchestrator instance.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum number of simultaneously running tasks. Tasks spawned
    /// beyond this stay Pending and are admitted FIFO as slots free.
    pub max_concurrent: usize,
}

impl OrchestratorConfig {
    /// Create a config with default limits.
    pub fn new() -> Self {
        Self { max_concurrent: 4 }
    }

    /// Set the maximum number of simultaneously running tasks.
    pub fn max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of one task's state.
#[derive(Debug, Clone)]
pub struct TaskStatusSnapshot {
    pub task_id: TaskId,
    pub subagent_type: String,
    pub status: TaskStatus,
    pub spawn_time: SystemTime,
    /// Set once the task is terminal.
    pub completion_time: Option<SystemTime>,
    /// Time since spawn, frozen at the terminal transition.
    pub elapsed: Duration,
    /// Execution steps completed so far.
    pub steps: usize,
}

/// Result of a `wait` call: statuses of every task observed in the
/// session, plus whether the deadline expired first.
#[derive(Debug, Clone)]
pub struct WaitReport {
    pub statuses: BTreeMap<TaskId, TaskStatus>,
    pub timed_out: bool,
}

/// What `task_output` returns: the cached result or failure summary for
/// terminal tasks, or a best-effort progress snapshot otherwise.
#[derive(Debug, Clone)]
pub struct TaskOutputReport {
    pub task_id: TaskId,
    pub status: TaskStatus,
    /// Present iff the task Completed.
    pub result: Option<String>,
    /// Present iff the task Failed.
    pub error: Option<FailureSummary>,
    pub elapsed: Duration,
    pub steps: usize,
}

/// Counters for status-line rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskCounts {
    /// Tasks currently Pending or Running.
    pub active: usize,
    /// Terminal tasks whose waiting-room entry is unconsumed.
    pub unseen: usize,
    /// Total ids issued this session.
    pub issued: u64,
}

struct TaskEntry {
    subagent_type: String,
    handle: Arc<TaskHandle>,
}

/// A task queued for admission to the worker pool.
struct QueuedTask {
    id: TaskId,
    instructions: String,
    profile: SubagentProfile,
    capabilities: ScopedRegistry,
    handle: Arc<TaskHandle>,
}

/// State shared between the orchestrator, the dispatcher, and per-task
/// drivers.
struct Shared {
    tasks: RwLock<BTreeMap<TaskId, Arc<TaskEntry>>>,
    cache: ResultCache,
    room: WaitingRoom,
    permits: Arc<Semaphore>,
    idle: Notify,
    active: AtomicUsize,
    backend: Arc<dyn ExecutionBackend>,
}

impl Shared {
    /// Finalize one task: cache the outcome, make the status terminal,
    /// post to the waiting room, and wake idle waiters if the active set
    /// emptied.
    ///
    /// The cache write happens before the terminal transition so that a
    /// caller woken by `wait` always finds the outcome in place.
    async fn finish(&self, id: TaskId, handle: &TaskHandle, outcome: TaskOutcome) {
        self.cache.insert(id, outcome.clone()).await;
        handle.try_finish(outcome.status());
        let status = handle.status();
        self.room.record(id, status);
        tracing::debug!(task = %id, %status, "task reached terminal state");

        if self.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Coordinates delegated background work for one session.
///
/// Owns task identity assignment, the bounded worker pool, lifecycle
/// state, the result cache, and the waiting room. Create one per session;
/// independent sessions never share state.
pub struct TaskOrchestrator {
    shared: Arc<Shared>,
    profiles: ProfileRegistry,
    capabilities: Registry,
    next_id: AtomicU64,
    queue: mpsc::UnboundedSender<QueuedTask>,
}

impl TaskOrchestrator {
    /// Create an orchestrator over a profile registry, a base capability
    /// registry, and an execution backend.
    pub fn new(
        profiles: ProfileRegistry,
        capabilities: Registry,
        backend: Arc<dyn ExecutionBackend>,
        config: OrchestratorConfig,
    ) -> Self {
        let shared = Arc::new(Shared {
            tasks: RwLock::new(BTreeMap::new()),
            cache: ResultCache::new(),
            room: WaitingRoom::new(),
            permits: Arc::new(Semaphore::new(config.max_concurrent)),
            idle: Notify::new(),
            active: AtomicUsize::new(0),
            backend,
        });

        // Single consumer keeps admission order equal to spawn order.
        let (queue, rx) = mpsc::unbounded_channel();
        tokio::spawn(dispatch(shared.clone(), rx));

        Self {
            shared,
            profiles,
            capabilities,
            next_id: AtomicU64::new(1),
            queue,
        }
    }

    /// Spawn a background task and return its id without blocking.
    ///
    /// The subagent type is validated first: an unknown type fails with
    /// `InvalidSubagentType` and allocates no id, so the next successful
    /// spawn gets the id this call would have received.
    pub async fn spawn(
        &self,
        subagent_type: &str,
        instructions: impl Into<String>,
    ) -> Result<TaskId, OrchestratorError> {
        let Some(profile) = self.profiles.get(subagent_type).await else {
            return Err(OrchestratorError::InvalidSubagentType {
                name: subagent_type.to_string(),
                available: self.profiles.list().await,
            });
        };

        let id = TaskId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let handle = Arc::new(TaskHandle::new());

        let entry = Arc::new(TaskEntry {
            subagent_type: subagent_type.to_string(),
            handle: handle.clone(),
        });
        self.shared.tasks.write().await.insert(id, entry);
        self.shared.active.fetch_add(1, Ordering::SeqCst);

        let queued = QueuedTask {
            id,
            instructions: instructions.into(),
            capabilities: profile.scope(&self.capabilities),
            profile,
            handle,
        };
        tracing::debug!(task = %id, subagent_type, "spawned background task");

        if self.queue.send(queued).is_err() {
            // Dispatcher gone (runtime shutting down); finalize in place.
            let entry = self.shared.tasks.read().await.get(&id).cloned();
            if let Some(entry) = entry {
                entry.handle.cancel();
                self.shared.finish(id, &entry.handle, TaskOutcome::Cancelled).await;
            }
        }

        Ok(id)
    }

    /// Snapshot one task's current state.
    pub async fn status(&self, id: TaskId) -> Result<TaskStatusSnapshot, OrchestratorError> {
        let entry = self.entry(id).await?;
        Ok(TaskStatusSnapshot {
            task_id: id,
            subagent_type: entry.subagent_type.clone(),
            status: entry.handle.status(),
            spawn_time: entry.handle.spawned_at(),
            completion_time: entry.handle.completed_at(),
            elapsed: entry.handle.elapsed(),
            steps: entry.handle.steps(),
        })
    }

    /// Cancel a Pending or Running task.
    ///
    /// The status becomes Cancelled immediately; the runner stops at its
    /// next checkpoint. Cancelling an already-terminal task fails with
    /// `InvalidState`.
    pub async fn cancel(&self, id: TaskId) -> Result<(), OrchestratorError> {
        let entry = self.entry(id).await?;
        if entry.handle.cancel() {
            // Post the terminal-state notification now; the runner winds
            // down at its next checkpoint.
            self.shared.room.record(id, TaskStatus::Cancelled);
            tracing::debug!(task = %id, "cancellation requested");
            Ok(())
        } else {
            Err(OrchestratorError::InvalidState {
                task_id: id,
                status: entry.handle.status(),
            })
        }
    }

    /// Ids of all non-terminal tasks, ascending.
    pub async fn list_active(&self) -> Vec<TaskId> {
        let tasks = self.shared.tasks.read().await;
        tasks
            .iter()
            .filter(|(_, e)| !e.handle.is_terminal())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Suspend until a task (or the whole active set) settles.
    ///
    /// With a target id, returns once that task is terminal - immediately
    /// if it already is; an id never issued fails with `UnknownTask`.
    /// Without a target, returns once no task is Pending or Running.
    ///
    /// A deadline expiring is not an error: the report carries current
    /// statuses and `timed_out: true`, leaving the decision to keep
    /// waiting with the caller.
    pub async fn wait(
        &self,
        target: Option<TaskId>,
        deadline: Option<Duration>,
    ) -> Result<WaitReport, OrchestratorError> {
        let handle = match target {
            Some(id) => Some(self.entry(id).await?.handle.clone()),
            None => None,
        };

        let settled = async {
            match handle {
                Some(handle) => handle.wait().await,
                None => self.wait_idle().await,
            }
        };

        let timed_out = match deadline {
            Some(limit) => tokio::time::timeout(limit, settled).await.is_err(),
            None => {
                settled.await;
                false
            }
        };

        Ok(WaitReport {
            statuses: self.snapshot_statuses().await,
            timed_out,
        })
    }

    /// Retrieve a task's output, or a progress snapshot if it is still
    /// active.
    ///
    /// For Completed tasks the cached result comes back unchanged on
    /// every call; the first call consumes the task's waiting-room entry.
    /// For Failed tasks the structured failure summary is returned the
    /// same way. For Pending/Running tasks nothing is consumed.
    pub async fn task_output(&self, id: TaskId) -> Result<TaskOutputReport, OrchestratorError> {
        let entry = self.entry(id).await?;
        let status = entry.handle.status();

        let mut report = TaskOutputReport {
            task_id: id,
            status,
            result: None,
            error: None,
            elapsed: entry.handle.elapsed(),
            steps: entry.handle.steps(),
        };

        if status.is_terminal() {
            match self.shared.cache.get(id).await {
                Some(TaskOutcome::Completed { result }) if status == TaskStatus::Completed => {
                    report.result = Some(result);
                }
                Some(TaskOutcome::Failed { error }) if status == TaskStatus::Failed => {
                    report.error = Some(error);
                }
                // Cancelled, or a cancel that outran the runner's own
                // outcome: the status alone is the answer.
                _ => {}
            }
            self.shared.room.consume(id);
        }

        Ok(report)
    }

    /// Consume all unobserved terminal-state notifications, ascending by
    /// task id. Used by the NotificationInjector at turn boundaries.
    pub fn drain_notifications(&self) -> Vec<(TaskId, TaskStatus)> {
        self.shared.room.drain()
    }

    pub(crate) fn room(&self) -> &WaitingRoom {
        &self.shared.room
    }

    /// Counters for status-line rendering.
    pub async fn counts(&self) -> TaskCounts {
        TaskCounts {
            active: self.shared.active.load(Ordering::SeqCst),
            unseen: self.shared.room.unconsumed(),
            issued: self.next_id.load(Ordering::SeqCst) - 1,
        }
    }

    async fn entry(&self, id: TaskId) -> Result<Arc<TaskEntry>, OrchestratorError> {
        self.shared
            .tasks
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| OrchestratorError::UnknownTask(id.to_string()))
    }

    async fn snapshot_statuses(&self) -> BTreeMap<TaskId, TaskStatus> {
        let tasks = self.shared.tasks.read().await;
        tasks
            .iter()
            .map(|(id, e)| (*id, e.handle.status()))
            .collect()
    }

    async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            if self.shared.active.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Single-consumer admission loop.
///
/// Receives queued tasks in spawn order and admits each one as a permit
/// frees, so admission order equals spawn order. A task cancelled while
/// queued is finalized without consuming a permit.
async fn dispatch(shared: Arc<Shared>, mut rx: mpsc::UnboundedReceiver<QueuedTask>) {
    while let Some(task) = rx.recv().await {
        let permit = tokio::select! {
            biased;
            () = task.handle.cancelled() => None,
            permit = shared.permits.clone().acquire_owned() => permit.ok(),
        };

        let shared = shared.clone();
        tokio::spawn(async move {
            let outcome = match permit {
                None => TaskOutcome::Cancelled,
                Some(_permit) => {
                    if task.handle.mark_running() {
                        tracing::debug!(task = %task.id, "task admitted to worker pool");
                        let runner = SubagentRunner::new(
                            task.id,
                            task.profile,
                            shared.backend.clone(),
                            task.capabilities,
                            task.handle.clone(),
                        );
                        runner.run(&task.instructions).await
                    } else {
                        // Cancel landed between admission and start.
                        TaskOutcome::Cancelled
                    }
                }
            };
            shared.finish(task.id, &task.handle, outcome).await;
        });
    }
}
