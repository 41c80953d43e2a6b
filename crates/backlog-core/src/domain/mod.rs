//! Domain model: ids, task records, inventory entries, errors.

pub mod errors;
pub mod ids;
pub mod metadata;
pub mod status;
pub mod task;

pub use self::errors::{FailureDisposition, HttpRequestError, StoreError, TaskRunError};
pub use self::ids::TaskId;
pub use self::metadata::{GroupTag, TaskMetadata};
pub use self::status::{AddTaskResult, QueueStatus, TaskDetail};
pub use self::task::{QueueTask, RunResults, TaskType};
