// ABOUTME: ResultCache - session-lived mapping from task id to final outcome.
// ABOUTME: Write-once per task; repeated reads return identical clones.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::handle::TaskId;
use super::runner::TaskOutcome;

/// Session-lived store of final task outcomes.
///
/// Each task's driver writes its outcome exactly once; the first write
/// wins and later writes are ignored, so a cached result or error never
/// changes after it becomes visible.
#[derive(Default)]
pub struct ResultCache {
    outcomes: RwLock<HashMap<TaskId, TaskOutcome>>,
}

impl ResultCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a task's final outcome. No-op if one is already present.
    pub async fn insert(&self, task_id: TaskId, outcome: TaskOutcome) {
        let mut outcomes = self.outcomes.write().await;
        outcomes.entry(task_id).or_insert(outcome);
    }

    /// Fetch a task's final outcome, if it has one.
    pub async fn get(&self, task_id: TaskId) -> Option<TaskOutcome> {
        let outcomes = self.outcomes.read().await;
        outcomes.get(&task_id).cloned()
    }

    /// Number of cached outcomes.
    pub async fn len(&self) -> usize {
        self.outcomes.read().await.len()
    }

    /// True if no outcomes have been recorded.
    pub async fn is_empty(&self) -> bool {
        self.outcomes.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::super::runner::{FailureKind, FailureSummary};
    use super::*;

    #[tokio::test]
    async fn test_insert_and_get() {
        let cache = ResultCache::new();
        let id = TaskId::new(1);

        cache
            .insert(id, TaskOutcome::Completed { result: "42".into() })
            .await;

        match cache.get(id).await {
            Some(TaskOutcome::Completed { result }) => assert_eq!(result, "42"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_missing() {
        let cache = ResultCache::new();
        assert!(cache.get(TaskId::new(9)).await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_first_write_wins() {
        let cache = ResultCache::new();
        let id = TaskId::new(1);

        cache
            .insert(id, TaskOutcome::Completed { result: "first".into() })
            .await;
        cache
            .insert(
                id,
                TaskOutcome::Failed {
                    error: FailureSummary {
                        kind: FailureKind::Backend,
                        message: "late".into(),
                        step: 1,
                    },
                },
            )
            .await;

        match cache.get(id).await {
            Some(TaskOutcome::Completed { result }) => assert_eq!(result, "first"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_repeated_reads_identical() {
        let cache = ResultCache::new();
        let id = TaskId::new(2);
        cache
            .insert(id, TaskOutcome::Completed { result: "stable".into() })
            .await;

        let first = cache.get(id).await.unwrap();
        let second = cache.get(id).await.unwrap();
        match (first, second) {
            (
                TaskOutcome::Completed { result: a },
                TaskOutcome::Completed { result: b },
            ) => assert_eq!(a, b),
            other => panic!("unexpected outcomes: {other:?}"),
        }
    }
}
