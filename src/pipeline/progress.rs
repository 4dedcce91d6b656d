//! Concurrent progress registry polled by API handlers while pipeline
//! tasks advance through their stages.

use super::stage::{PipelineStage, TaskStatus};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgressError {
    #[error("task {0} is already registered")]
    DuplicateTask(String),
    #[error("unknown task {0}")]
    UnknownTask(String),
}

/// Snapshot of a single task's progress. `get` hands out clones, so a
/// reader never observes a half-applied update.
#[derive(Debug, Clone)]
pub struct TaskProgress {
    pub stage: PipelineStage,
    pub status: TaskStatus,
    pub error_detail: Option<String>,
    updated_at: Instant,
}

impl TaskProgress {
    fn new() -> Self {
        Self {
            stage: PipelineStage::Received,
            status: TaskStatus::Pending,
            error_detail: None,
            updated_at: Instant::now(),
        }
    }
}

/// Cheap-to-clone handle over the shared task map. The map's sharded locks
/// serialize writes per entry; guards are dropped before any await point in
/// the callers.
#[derive(Clone, Default)]
pub struct ProgressTracker {
    tasks: Arc<DashMap<String, TaskProgress>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new task at stage 0 / pending. Must happen before the id
    /// is handed to the caller so pollers never see an unregistered id.
    pub fn create(&self, task_id: &str) -> Result<(), ProgressError> {
        use dashmap::mapref::entry::Entry;

        match self.tasks.entry(task_id.to_string()) {
            Entry::Occupied(_) => Err(ProgressError::DuplicateTask(task_id.to_string())),
            Entry::Vacant(entry) => {
                entry.insert(TaskProgress::new());
                Ok(())
            }
        }
    }

    /// Overwrite the stored state for a task. The pipeline is the only
    /// writer for a given id, so last-write-wins is a total order here.
    pub fn update(
        &self,
        task_id: &str,
        stage: PipelineStage,
        status: TaskStatus,
        error_detail: Option<String>,
    ) -> Result<(), ProgressError> {
        let mut entry = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| ProgressError::UnknownTask(task_id.to_string()))?;
        entry.stage = stage;
        entry.status = status;
        entry.error_detail = error_detail;
        entry.updated_at = Instant::now();
        Ok(())
    }

    pub fn get(&self, task_id: &str) -> Result<TaskProgress, ProgressError> {
        self.tasks
            .get(task_id)
            .map(|entry| entry.clone())
            .ok_or_else(|| ProgressError::UnknownTask(task_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Drop terminal entries that have not changed for `older_than`.
    /// In-flight tasks are never touched. Returns how many were removed.
    pub fn prune_terminal(&self, older_than: Duration) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|_, progress| {
            !(progress.status.is_terminal() && progress.updated_at.elapsed() >= older_than)
        });
        before - self.tasks.len()
    }
}
