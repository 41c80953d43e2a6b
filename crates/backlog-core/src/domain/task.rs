//! Full task records as kept in the task store.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::TaskId;

/// Name of a task kind; selects the handler that executes it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskType(String);

impl TaskType {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TaskType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Execution history of a task.
///
/// Value type: updates build a new value instead of mutating in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResults {
    #[serde(default)]
    pub total_runs: u32,
}

impl RunResults {
    pub fn new(total_runs: u32) -> Self {
        Self { total_runs }
    }

    /// Same history with one more failed run counted.
    pub fn with_another_run(self) -> Self {
        Self {
            total_runs: self.total_runs.saturating_add(1),
        }
    }
}

/// A task's full record: what to execute and how often it was tried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueTask {
    pub storage_id: TaskId,

    #[serde(rename = "type")]
    pub task_type: TaskType,

    /// Opaque payload, decoded by the handler for `task_type`.
    #[serde(with = "base64_bytes", default)]
    pub data: Vec<u8>,

    #[serde(default)]
    pub run_results: RunResults,
}

impl QueueTask {
    pub fn new(storage_id: TaskId, task_type: TaskType, data: Vec<u8>) -> Self {
        Self {
            storage_id,
            task_type,
            data,
            run_results: RunResults::default(),
        }
    }

    pub fn with_run_results(self, run_results: RunResults) -> Self {
        Self {
            run_results,
            ..self
        }
    }
}

mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    #[test]
    fn run_results_update_returns_new_value() {
        let first = RunResults::default();
        let second = first.with_another_run();

        assert_eq!(first.total_runs, 0);
        assert_eq!(second.total_runs, 1);
        assert_eq!(second.with_another_run().total_runs, 2);
    }

    #[test]
    fn queue_task_stores_payload_as_base64() {
        let task = QueueTask::new(
            TaskId::from_ulid(Ulid::new()),
            TaskType::new("identify_profile"),
            b"{\"identifier\":\"ann\"}".to_vec(),
        );

        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["type"], "identify_profile");
        assert_eq!(value["data"], "eyJpZGVudGlmaWVyIjoiYW5uIn0=");
        assert_eq!(value["run_results"]["total_runs"], 0);

        let back: QueueTask = serde_json::from_value(value).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn queue_task_tolerates_unknown_and_missing_fields() {
        let id = TaskId::from_ulid(Ulid::new());
        let json = format!(
            r#"{{"storage_id":"{id}","type":"track_event","data":"","added_in_v9":true}}"#
        );

        let task: QueueTask = serde_json::from_str(&json).unwrap();
        assert_eq!(task.storage_id, id);
        assert!(task.data.is_empty());
        assert_eq!(task.run_results, RunResults::default());
    }
}
