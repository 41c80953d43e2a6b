//! Task inventory and per-task records on top of a [`RecordStore`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info};

use crate::domain::{GroupTag, QueueTask, RunResults, TaskId, TaskMetadata, TaskType};
use crate::ports::{Clock, IdGenerator, RecordKind, RecordStore};

/// Result of [`QueueStorage::create_task`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedTask {
    pub success: bool,
    /// Inventory after the call. Unchanged when `success` is false.
    pub inventory: Vec<TaskMetadata>,
    pub created: Option<TaskMetadata>,
}

/// Result of [`QueueStorage::read_task`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskRead {
    Found(QueueTask),
    /// No record, or one that can no longer be decoded.
    Missing,
    /// The store failed; the record may well be intact.
    Unreadable,
}

/// Owns the inventory cache for one queue instance.
///
/// Storage failures never surface as errors: they are logged and reported as
/// `false` / `None`. The cache only ever holds what was successfully written.
pub struct QueueStorage {
    site_id: String,
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    id_generator: Arc<dyn IdGenerator>,
    task_expiry: chrono::Duration,
    /// `None` until the inventory was loaded from or written to the store.
    inventory: Mutex<Option<Vec<TaskMetadata>>>,
}

impl QueueStorage {
    pub fn new(
        site_id: impl Into<String>,
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
        id_generator: Arc<dyn IdGenerator>,
        task_expiry: chrono::Duration,
    ) -> Self {
        Self {
            site_id: site_id.into(),
            store,
            clock,
            id_generator,
            task_expiry,
            inventory: Mutex::new(None),
        }
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn get_inventory(&self) -> Vec<TaskMetadata> {
        let mut cache = self.lock_inventory();
        self.load_inventory(&mut cache)
    }

    pub fn save_inventory(&self, inventory: Vec<TaskMetadata>) -> bool {
        let mut cache = self.lock_inventory();
        self.write_inventory(&mut cache, inventory)
    }

    /// Persist a new task record, then append it to the inventory.
    ///
    /// If the inventory write fails the task record stays on disk unreferenced
    /// and is never executed.
    pub fn create_task(
        &self,
        task_type: TaskType,
        data: Vec<u8>,
        group_start: Option<GroupTag>,
        blocking_groups: Vec<GroupTag>,
    ) -> CreatedTask {
        let mut cache = self.lock_inventory();
        let mut inventory = self.load_inventory(&mut cache);

        let id = self.id_generator.generate_task_id();
        let task = QueueTask::new(id, task_type.clone(), data);
        if !self.save_task(&task) {
            return CreatedTask {
                success: false,
                inventory,
                created: None,
            };
        }

        let metadata = TaskMetadata::new(id, task_type, self.clock.now())
            .starting_group(group_start)
            .member_of(blocking_groups);
        inventory.push(metadata.clone());

        if !self.write_inventory(&mut cache, inventory.clone()) {
            inventory.pop();
            return CreatedTask {
                success: false,
                inventory,
                created: None,
            };
        }

        debug!(task_id = %id, task_type = %metadata.task_type, "task created");
        CreatedTask {
            success: true,
            inventory,
            created: Some(metadata),
        }
    }

    /// Replace the run results of a stored task. The inventory is untouched.
    pub fn update(&self, id: &TaskId, run_results: RunResults) -> bool {
        let Some(task) = self.get(id) else {
            return false;
        };
        self.save_task(&task.with_run_results(run_results))
    }

    pub fn get(&self, id: &TaskId) -> Option<QueueTask> {
        match self.read_task(id) {
            TaskRead::Found(task) => Some(task),
            TaskRead::Missing | TaskRead::Unreadable => None,
        }
    }

    /// Like [`get`](Self::get), but tells a lost record apart from a store
    /// that could not be read right now.
    pub fn read_task(&self, id: &TaskId) -> TaskRead {
        let bytes = match self.store.get(RecordKind::Task, &id.to_string()) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return TaskRead::Missing,
            Err(err) => {
                error!(task_id = %id, error = %err, "failed to read task record");
                return TaskRead::Unreadable;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(task) => TaskRead::Found(task),
            Err(err) => {
                error!(task_id = %id, error = %err, "task record is corrupted");
                TaskRead::Missing
            }
        }
    }

    /// Drop the task from the inventory, then delete its record.
    ///
    /// A record that is already gone counts as deleted.
    pub fn delete(&self, id: &TaskId) -> bool {
        {
            let mut cache = self.lock_inventory();
            let mut inventory = self.load_inventory(&mut cache);
            let before = inventory.len();
            inventory.retain(|metadata| metadata.task_persisted_id != *id);
            if inventory.len() != before && !self.write_inventory(&mut cache, inventory) {
                return false;
            }
        }

        match self.store.delete(RecordKind::Task, &id.to_string()) {
            Ok(existed) => {
                debug!(task_id = %id, existed, "task deleted");
                true
            }
            Err(err) => {
                error!(task_id = %id, error = %err, "failed to delete task record");
                false
            }
        }
    }

    /// Delete every task older than the expiry age, except group starters.
    ///
    /// Returns the inventory entries that were removed.
    pub fn delete_expired(&self) -> Vec<TaskMetadata> {
        // an expiry reaching past the calendar means nothing ever expires
        let Some(cutoff) = self.clock.now().checked_sub_signed(self.task_expiry) else {
            return Vec::new();
        };
        let expired: Vec<TaskMetadata> = self
            .get_inventory()
            .into_iter()
            .filter(|metadata| metadata.group_start.is_none() && metadata.created_at < cutoff)
            .collect();

        let deleted: Vec<TaskMetadata> = expired
            .into_iter()
            .filter(|metadata| self.delete(&metadata.task_persisted_id))
            .collect();
        if !deleted.is_empty() {
            info!(count = deleted.len(), "deleted expired tasks");
        }
        deleted
    }

    fn lock_inventory(&self) -> MutexGuard<'_, Option<Vec<TaskMetadata>>> {
        self.inventory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn load_inventory(&self, cache: &mut Option<Vec<TaskMetadata>>) -> Vec<TaskMetadata> {
        if let Some(inventory) = cache.as_ref() {
            return inventory.clone();
        }

        let bytes = match self.store.get(RecordKind::Inventory, &self.site_id) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                *cache = Some(Vec::new());
                return Vec::new();
            }
            Err(err) => {
                error!(site_id = %self.site_id, error = %err, "failed to read inventory");
                return Vec::new();
            }
        };

        match serde_json::from_slice::<Vec<TaskMetadata>>(&bytes) {
            Ok(inventory) => {
                *cache = Some(inventory.clone());
                inventory
            }
            Err(err) => {
                error!(
                    site_id = %self.site_id,
                    error = %err,
                    "inventory is corrupted, queued tasks are lost"
                );
                Vec::new()
            }
        }
    }

    fn write_inventory(
        &self,
        cache: &mut Option<Vec<TaskMetadata>>,
        inventory: Vec<TaskMetadata>,
    ) -> bool {
        let bytes = match serde_json::to_vec(&inventory) {
            Ok(bytes) => bytes,
            Err(err) => {
                error!(site_id = %self.site_id, error = %err, "failed to encode inventory");
                return false;
            }
        };
        match self.store.save(RecordKind::Inventory, &self.site_id, &bytes) {
            Ok(()) => {
                *cache = Some(inventory);
                true
            }
            Err(err) => {
                error!(site_id = %self.site_id, error = %err, "failed to save inventory");
                false
            }
        }
    }

    fn save_task(&self, task: &QueueTask) -> bool {
        let bytes = match serde_json::to_vec(task) {
            Ok(bytes) => bytes,
            Err(err) => {
                error!(task_id = %task.storage_id, error = %err, "failed to encode task");
                return false;
            }
        };
        match self
            .store
            .save(RecordKind::Task, &task.storage_id.to_string(), &bytes)
        {
            Ok(()) => true,
            Err(err) => {
                error!(task_id = %task.storage_id, error = %err, "failed to save task record");
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::impls::InMemoryRecordStore;
    use crate::ports::{FixedClock, UlidGenerator};
    use chrono::{TimeZone, Utc};

    pub(crate) struct StorageFixture {
        pub store: Arc<InMemoryRecordStore>,
        pub clock: Arc<FixedClock>,
        pub storage: Arc<QueueStorage>,
    }

    pub(crate) fn storage_fixture() -> StorageFixture {
        let store = Arc::new(InMemoryRecordStore::new());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        ));
        let storage = Arc::new(QueueStorage::new(
            "test-site",
            store.clone(),
            clock.clone(),
            Arc::new(UlidGenerator::new(clock.clone())),
            chrono::Duration::days(3),
        ));
        StorageFixture {
            store,
            clock,
            storage,
        }
    }
}
