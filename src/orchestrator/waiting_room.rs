// ABOUTME: WaitingRoom buffers terminal-state events until the primary loop
// ABOUTME: observes them; NotificationInjector drains it once per turn boundary.

use std::fmt::Write as _;
use std::sync::{Arc, Mutex};

use super::handle::{TaskId, TaskStatus};
use super::orchestrator::TaskOrchestrator;
use crate::sink::{SinkEvent, TranscriptSink};

struct Entry {
    task_id: TaskId,
    status: TaskStatus,
    consumed: bool,
}

/// Buffer of terminal-state notifications not yet seen by the primary loop.
///
/// Entries are appended in completion order as tasks reach a terminal
/// state. Each entry is consumed at most once, either by the
/// turn-boundary drain or by an explicit `task_output` call.
#[derive(Default)]
pub struct WaitingRoom {
    entries: Mutex<Vec<Entry>>,
}

impl WaitingRoom {
    /// Create a new empty waiting room.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry for a task that just reached a terminal state.
    ///
    /// A task terminates once, so a second record for the same id is
    /// ignored (a cancelled task is recorded at the cancel and again
    /// when its runner winds down).
    pub fn record(&self, task_id: TaskId, status: TaskStatus) {
        let mut entries = self.entries.lock().unwrap();
        if entries.iter().any(|e| e.task_id == task_id) {
            return;
        }
        entries.push(Entry {
            task_id,
            status,
            consumed: false,
        });
    }

    /// Snapshot the unconsumed entries without consuming them, ordered by
    /// ascending task id.
    pub fn peek(&self) -> Vec<(TaskId, TaskStatus)> {
        let entries = self.entries.lock().unwrap();
        let mut pending: Vec<_> = entries
            .iter()
            .filter(|e| !e.consumed)
            .map(|e| (e.task_id, e.status))
            .collect();
        pending.sort_by_key(|(id, _)| *id);
        pending
    }

    /// Consume all unconsumed entries.
    ///
    /// Returns them ordered by ascending task id for reproducibility.
    /// Draining an empty waiting room yields an empty vec.
    pub fn drain(&self) -> Vec<(TaskId, TaskStatus)> {
        let mut entries = self.entries.lock().unwrap();
        let mut drained: Vec<_> = entries
            .iter_mut()
            .filter(|e| !e.consumed)
            .map(|e| {
                e.consumed = true;
                (e.task_id, e.status)
            })
            .collect();
        drained.sort_by_key(|(id, _)| *id);
        drained
    }

    /// Consume the entry for one task, if it exists and is unconsumed.
    ///
    /// Returns true if an entry was consumed by this call.
    pub fn consume(&self, task_id: TaskId) -> bool {
        let mut entries = self.entries.lock().unwrap();
        for entry in entries.iter_mut() {
            if entry.task_id == task_id && !entry.consumed {
                entry.consumed = true;
                return true;
            }
        }
        false
    }

    /// Number of entries not yet consumed.
    pub fn unconsumed(&self) -> usize {
        let entries = self.entries.lock().unwrap();
        entries.iter().filter(|e| !e.consumed).count()
    }
}

/// Drains the waiting room into a single summary event at each
/// turn boundary.
///
/// The summary lists terminated task ids and final statuses only - never
/// payloads - so the primary loop must call `task_output` to pull a
/// result into its context.
pub struct NotificationInjector {
    orchestrator: Arc<TaskOrchestrator>,
    sink: Arc<dyn TranscriptSink>,
}

impl NotificationInjector {
    /// Create an injector over an orchestrator and a conversation sink.
    pub fn new(orchestrator: Arc<TaskOrchestrator>, sink: Arc<dyn TranscriptSink>) -> Self {
        Self { orchestrator, sink }
    }

    /// Drain unobserved terminal-state events and inject one summary.
    ///
    /// Call immediately before the primary loop's next turn. Returns the
    /// injected summary text, or None if nothing had terminated since the
    /// last drain (in which case nothing is appended to the sink).
    ///
    /// Entries are consumed only after the sink append succeeds, so a
    /// failing sink leaves them pending for the next injection.
    pub async fn inject_pending(&self) -> Result<Option<String>, anyhow::Error> {
        let room = self.orchestrator.room();
        let pending = room.peek();
        if pending.is_empty() {
            return Ok(None);
        }

        let mut text = String::from("Background tasks finished:\n");
        for (task_id, status) in &pending {
            let _ = writeln!(text, "- {task_id}: {status}");
        }
        text.push_str("Call task_output with a task id to retrieve its result.");

        tracing::debug!(count = pending.len(), "injecting completion summary");
        self.sink
            .append(SinkEvent::Notification { text: text.clone() })
            .await?;
        for (task_id, _) in &pending {
            room.consume(*task_id);
        }
        Ok(Some(text))
    }
}
