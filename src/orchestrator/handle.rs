// ABOUTME: Task identity and lifecycle state - TaskId, TaskStatus, TaskHandle.
// ABOUTME: Terminal transitions use compare-exchange so they are irreversible.

use std::str::FromStr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::time::{Duration, Instant, SystemTime};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Session-scoped task identifier, assigned sequentially starting at 1.
///
/// Renders as a human-readable label ("Task-3"). Never reused within a
/// session.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TaskId(u64);

impl TaskId {
    /// Create a task id from its raw sequence number.
    pub fn new(seq: u64) -> Self {
        Self(seq)
    }

    /// The raw sequence number.
    pub fn seq(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Task-{}", self.0)
    }
}

/// Error returned when a task id label cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTaskIdError(pub String);

impl std::fmt::Display for ParseTaskIdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid task id: '{}'", self.0)
    }
}

impl std::error::Error for ParseTaskIdError {}

impl FromStr for TaskId {
    type Err = ParseTaskIdError;

    /// Accepts "Task-3", "task-3", or a bare "3".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("Task-")
            .or_else(|| s.strip_prefix("task-"))
            .unwrap_or(s);
        digits
            .parse::<u64>()
            .map(TaskId)
            .map_err(|_| ParseTaskIdError(s.to_string()))
    }
}

/// Lifecycle state of a background task.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TaskStatus {
    /// Accepted but not yet admitted to the worker pool.
    Pending = 0,
    /// The subagent runner is executing.
    Running = 1,
    /// The runner produced a final result.
    Completed = 2,
    /// The runner absorbed an internal failure.
    Failed = 3,
    /// The task was cancelled before reaching completion.
    Cancelled = 4,
}

impl TaskStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => TaskStatus::Pending,
            1 => TaskStatus::Running,
            2 => TaskStatus::Completed,
            4 => TaskStatus::Cancelled,
            _ => TaskStatus::Failed,
        }
    }

    /// Returns true for Completed, Failed, and Cancelled.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

struct EndInfo {
    at: Instant,
    wall: SystemTime,
}

/// Shared lifecycle handle for one task.
///
/// Holds the atomic status, the cancellation token the runner observes at
/// its checkpoints, and the notification waiters block on. All terminal
/// transitions go through a compare-exchange, so once a task is terminal
/// its status never changes again.
pub struct TaskHandle {
    status: AtomicU8,
    done: Notify,
    cancel: CancellationToken,
    spawned: Instant,
    spawned_wall: SystemTime,
    steps: AtomicUsize,
    end: Mutex<Option<EndInfo>>,
}

impl TaskHandle {
    /// Create a new handle in Pending state.
    pub fn new() -> Self {
        Self {
            status: AtomicU8::new(TaskStatus::Pending as u8),
            done: Notify::new(),
            cancel: CancellationToken::new(),
            spawned: Instant::now(),
            spawned_wall: SystemTime::now(),
            steps: AtomicUsize::new(0),
            end: Mutex::new(None),
        }
    }

    /// Get the current status.
    pub fn status(&self) -> TaskStatus {
        TaskStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    /// Returns true if the task has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// When the task was spawned (wall clock).
    pub fn spawned_at(&self) -> SystemTime {
        self.spawned_wall
    }

    /// When the task reached a terminal state, if it has.
    pub fn completed_at(&self) -> Option<SystemTime> {
        self.end.lock().unwrap().as_ref().map(|e| e.wall)
    }

    /// How long the task has been running, frozen once terminal.
    pub fn elapsed(&self) -> Duration {
        match self.end.lock().unwrap().as_ref() {
            Some(end) => end.at.duration_since(self.spawned),
            None => self.spawned.elapsed(),
        }
    }

    /// Number of execution steps completed so far.
    pub fn steps(&self) -> usize {
        self.steps.load(Ordering::SeqCst)
    }

    /// Record one completed execution step.
    pub(crate) fn note_step(&self) {
        self.steps.fetch_add(1, Ordering::SeqCst);
    }

    /// True once cancellation has been requested.
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves when cancellation is requested.
    pub(crate) async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    /// Transition Pending -> Running. Returns false if the task is no
    /// longer Pending (a cancel won the race).
    pub(crate) fn mark_running(&self) -> bool {
        self.status
            .compare_exchange(
                TaskStatus::Pending as u8,
                TaskStatus::Running as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Attempt the transition into the given terminal state.
    ///
    /// Returns false without changing anything if the task is already
    /// terminal. On success the end time is recorded and waiters are
    /// woken.
    pub(crate) fn try_finish(&self, terminal: TaskStatus) -> bool {
        debug_assert!(terminal.is_terminal());

        loop {
            let current = self.status.load(Ordering::SeqCst);
            if TaskStatus::from_u8(current).is_terminal() {
                return false;
            }
            if self
                .status
                .compare_exchange(current, terminal as u8, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                let mut end = self.end.lock().unwrap();
                *end = Some(EndInfo {
                    at: Instant::now(),
                    wall: SystemTime::now(),
                });
                drop(end);
                self.done.notify_waiters();
                return true;
            }
        }
    }

    /// Request cancellation.
    ///
    /// Transitions to Cancelled immediately and signals the runner's
    /// cancellation token so it stops at its next checkpoint. Returns
    /// false if the task was already terminal.
    pub fn cancel(&self) -> bool {
        let won = self.try_finish(TaskStatus::Cancelled);
        if won {
            self.cancel.cancel();
        }
        won
    }

    /// Wait until the task reaches a terminal state, returning
    /// immediately if it already has.
    pub async fn wait(&self) {
        loop {
            let notified = self.done.notified();
            if self.is_terminal() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for TaskHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_display_and_parse() {
        let id = TaskId::new(3);
        assert_eq!(id.to_string(), "Task-3");
        assert_eq!("Task-3".parse::<TaskId>().unwrap(), id);
        assert_eq!("task-3".parse::<TaskId>().unwrap(), id);
        assert_eq!("3".parse::<TaskId>().unwrap(), id);
        assert!("Task-x".parse::<TaskId>().is_err());
        assert!("".parse::<TaskId>().is_err());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(TaskStatus::Pending.to_string(), "pending");
        assert_eq!(TaskStatus::Running.to_string(), "running");
        assert_eq!(TaskStatus::Completed.to_string(), "completed");
        assert_eq!(TaskStatus::Failed.to_string(), "failed");
        assert_eq!(TaskStatus::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn test_new_handle_is_pending() {
        let handle = TaskHandle::new();
        assert_eq!(handle.status(), TaskStatus::Pending);
        assert!(!handle.is_terminal());
        assert!(handle.completed_at().is_none());
    }

    #[test]
    fn test_mark_running() {
        let handle = TaskHandle::new();
        assert!(handle.mark_running());
        assert_eq!(handle.status(), TaskStatus::Running);
        // Second attempt fails: no longer Pending.
        assert!(!handle.mark_running());
    }

    #[test]
    fn test_try_finish_completed() {
        let handle = TaskHandle::new();
        handle.mark_running();
        assert!(handle.try_finish(TaskStatus::Completed));
        assert_eq!(handle.status(), TaskStatus::Completed);
        assert!(handle.completed_at().is_some());
    }

    #[test]
    fn test_terminal_state_is_immutable() {
        let handle = TaskHandle::new();
        handle.mark_running();
        assert!(handle.try_finish(TaskStatus::Completed));

        assert!(!handle.try_finish(TaskStatus::Failed));
        assert!(!handle.try_finish(TaskStatus::Cancelled));
        assert!(!handle.cancel());
        assert_eq!(handle.status(), TaskStatus::Completed);
    }

    #[test]
    fn test_cancel_pending() {
        let handle = TaskHandle::new();
        assert!(handle.cancel());
        assert_eq!(handle.status(), TaskStatus::Cancelled);
        assert!(handle.is_cancel_requested());
    }

    #[test]
    fn test_cancel_running() {
        let handle = TaskHandle::new();
        handle.mark_running();
        assert!(handle.cancel());
        assert_eq!(handle.status(), TaskStatus::Cancelled);
    }

    #[test]
    fn test_completed_task_has_no_cancel_signal() {
        let handle = TaskHandle::new();
        handle.mark_running();
        handle.try_finish(TaskStatus::Completed);
        assert!(!handle.cancel());
        assert!(!handle.is_cancel_requested());
    }

    #[test]
    fn test_elapsed_freezes_on_finish() {
        let handle = TaskHandle::new();
        std::thread::sleep(Duration::from_millis(10));
        handle.try_finish(TaskStatus::Completed);
        let d1 = handle.elapsed();
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(d1, handle.elapsed());
    }

    #[tokio::test]
    async fn test_wait_immediate_when_terminal() {
        let handle = TaskHandle::new();
        handle.try_finish(TaskStatus::Completed);
        handle.wait().await;
    }

    #[tokio::test]
    async fn test_wait_wakes_on_finish() {
        let handle = std::sync::Arc::new(TaskHandle::new());
        let waiter = handle.clone();
        let join = tokio::spawn(async move {
            waiter.wait().await;
            waiter.status()
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.try_finish(TaskStatus::Failed);

        assert_eq!(join.await.unwrap(), TaskStatus::Failed);
    }

    #[tokio::test]
    async fn test_wait_wakes_on_cancel() {
        let handle = std::sync::Arc::new(TaskHandle::new());
        let waiter = handle.clone();
        let join = tokio::spawn(async move {
            waiter.wait().await;
            waiter.status()
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel();

        assert_eq!(join.await.unwrap(), TaskStatus::Cancelled);
    }

    #[test]
    fn test_step_counter() {
        let handle = TaskHandle::new();
        assert_eq!(handle.steps(), 0);
        handle.note_step();
        handle.note_step();
        assert_eq!(handle.steps(), 2);
    }
}
