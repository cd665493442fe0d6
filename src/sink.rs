// ABOUTME: Transcript sink - the channel into the primary loop's visible history.
// ABOUTME: Receives injected notifications; MemorySink keeps them for inspection.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::orchestrator::TaskId;

/// An event appended to the primary loop's conversation history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    /// The turn-boundary summary of tasks that reached a terminal state.
    Notification { text: String },

    /// A task's retrieved output, delivered on explicit request.
    TaskOutput { task_id: TaskId, text: String },
}

/// Trait for appending events to the primary loop's visible history.
///
/// Implement this to bridge the orchestrator into whatever conversation
/// or rendering layer hosts the primary loop.
#[async_trait]
pub trait TranscriptSink: Send + Sync {
    /// Append one event.
    async fn append(&self, event: SinkEvent) -> Result<(), anyhow::Error>;
}

/// In-memory sink.
///
/// Keeps appended events in memory. Useful for testing and for embedders
/// that render the history themselves.
pub struct MemorySink {
    events: RwLock<Vec<SinkEvent>>,
}

impl MemorySink {
    /// Create a new empty sink.
    pub fn new() -> Self {
        Self {
            events: RwLock::new(Vec::new()),
        }
    }

    /// Create a new sink wrapped in Arc for sharing.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Snapshot of all appended events, in append order.
    pub async fn events(&self) -> Vec<SinkEvent> {
        self.events.read().await.clone()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscriptSink for MemorySink {
    async fn append(&self, event: SinkEvent) -> Result<(), anyhow::Error> {
        self.events.write().await.push(event);
        Ok(())
    }
}
