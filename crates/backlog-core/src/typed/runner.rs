//! QueueRunner - the run loop's view of task execution.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use super::registry::TypedRegistry;
use crate::domain::{QueueTask, TaskRunError};

/// Executes one stored task.
///
/// `Ok` means the task is done and can be deleted; the error's
/// [`disposition`](TaskRunError::disposition) tells the run loop what to do
/// otherwise.
#[async_trait]
pub trait QueueRunner: Send + Sync {
    async fn run_task(&self, task: &QueueTask) -> Result<(), TaskRunError>;
}

/// Dispatches by `task_type` to the handlers of a [`TypedRegistry`].
pub struct RegistryRunner {
    registry: Arc<TypedRegistry>,
}

impl RegistryRunner {
    pub fn new(registry: Arc<TypedRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &TypedRegistry {
        &self.registry
    }
}

#[async_trait]
impl QueueRunner for RegistryRunner {
    async fn run_task(&self, task: &QueueTask) -> Result<(), TaskRunError> {
        let Some(handler) = self.registry.get(task.task_type.as_str()) else {
            error!(
                task_id = %task.storage_id,
                task_type = %task.task_type,
                "no handler for task type"
            );
            return Err(TaskRunError::HandlerNotFound(task.task_type.clone()));
        };

        debug!(task_id = %task.storage_id, task_type = %task.task_type, "running task");
        let result = handler.handle_dyn(&task.data).await;
        if let Err(TaskRunError::Decode { source, .. }) = &result {
            // Payloads are written by this crate; a decode failure is a bug.
            error!(
                task_id = %task.storage_id,
                task_type = %task.task_type,
                error = %source,
                "stored task payload could not be decoded"
            );
        }
        result
    }
}
