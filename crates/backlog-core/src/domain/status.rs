//! Views handed back to callers of the facade.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{QueueTask, RunResults, TaskId, TaskMetadata, TaskType};

/// Snapshot of one queue instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub queue_id: String,
    pub num_tasks_in_queue: usize,
}

/// Result of `BackgroundQueue::add_task`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddTaskResult {
    pub success: bool,
    pub status: QueueStatus,
    /// Inventory entry of the new task; `None` when nothing was queued.
    pub created_task: Option<TaskMetadata>,
}

/// Full view of a stored task, for debug screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDetail {
    pub storage_id: TaskId,
    pub task_type: TaskType,
    pub data: Vec<u8>,
    pub run_results: RunResults,
    pub created_at: DateTime<Utc>,
}

impl TaskDetail {
    pub fn new(metadata: &TaskMetadata, task: QueueTask) -> Self {
        Self {
            storage_id: task.storage_id,
            task_type: task.task_type,
            data: task.data,
            run_results: task.run_results,
            created_at: metadata.created_at,
        }
    }
}
