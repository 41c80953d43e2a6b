//! BackgroundQueue - the queue's public surface.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, error};

use super::{QueueRunRequest, QueueStorage, RunCallback, RunRequestManager, SingleScheduleTimer};
use crate::config::QueueConfig;
use crate::domain::{AddTaskResult, GroupTag, QueueStatus, TaskDetail, TaskMetadata, TaskType};
use crate::typed::Task;

/// Starts a pass on the captured runtime unless one is already running.
#[derive(Clone)]
struct RunTrigger {
    request_manager: Arc<RunRequestManager>,
    run_request: Arc<QueueRunRequest>,
    runtime: Handle,
}

impl RunTrigger {
    fn run(&self, on_complete: RunCallback) {
        if self.request_manager.start_request(on_complete) {
            debug!("queue run already in progress, joined it");
            return;
        }
        let run_request = self.run_request.clone();
        let pass = self.runtime.spawn({
            let run_request = run_request.clone();
            async move { run_request.start().await }
        });
        self.runtime.spawn(async move {
            if let Err(err) = pass.await {
                error!(error = %err, "queue run died before finishing");
                run_request.abandon();
            }
        });
    }
}

/// Persistent background queue.
///
/// Never returns errors: storage problems are logged and reported through
/// `success` flags, task failures are handled by the run loop.
pub struct BackgroundQueue {
    config: QueueConfig,
    storage: Arc<QueueStorage>,
    trigger: RunTrigger,
    timer: SingleScheduleTimer,
}

impl BackgroundQueue {
    pub(crate) fn new(
        config: QueueConfig,
        storage: Arc<QueueStorage>,
        run_request: Arc<QueueRunRequest>,
        request_manager: Arc<RunRequestManager>,
        runtime: Handle,
    ) -> Self {
        Self {
            config,
            storage,
            trigger: RunTrigger {
                request_manager,
                run_request,
                runtime: runtime.clone(),
            },
            timer: SingleScheduleTimer::new(runtime),
        }
    }

    /// Persist a task and start or schedule a run.
    pub fn add_task(
        &self,
        task_type: impl Into<TaskType>,
        data: Vec<u8>,
        group_start: Option<GroupTag>,
        blocking_groups: Vec<GroupTag>,
    ) -> AddTaskResult {
        let created = self
            .storage
            .create_task(task_type.into(), data, group_start, blocking_groups);
        let status = self.status_for(created.inventory.len());

        if created.success {
            self.process_queue_status(&status);
        }
        AddTaskResult {
            success: created.success,
            status,
            created_task: created.created,
        }
    }

    /// Encode `payload` as JSON and queue it under `T::TYPE`.
    pub fn add_typed<T: Task>(
        &self,
        payload: &T,
        group_start: Option<GroupTag>,
        blocking_groups: Vec<GroupTag>,
    ) -> AddTaskResult {
        match serde_json::to_vec(payload) {
            Ok(data) => self.add_task(T::TYPE, data, group_start, blocking_groups),
            Err(err) => {
                error!(task_type = T::TYPE, error = %err, "failed to encode task payload");
                AddTaskResult {
                    success: false,
                    status: self.status(),
                    created_task: None,
                }
            }
        }
    }

    /// Drain the queue in the background. `on_complete` fires when the pass
    /// it joined has ended.
    pub fn run(&self, on_complete: impl FnOnce() + Send + 'static) {
        self.trigger.run(Box::new(on_complete));
    }

    pub async fn run_until_complete(&self) {
        let (tx, rx) = oneshot::channel();
        self.run(move || {
            let _ = tx.send(());
        });
        let _ = rx.await;
    }

    pub fn get_all_stored_tasks(&self) -> Vec<TaskMetadata> {
        self.storage.get_inventory()
    }

    pub fn get_task_detail(&self, metadata: &TaskMetadata) -> Option<TaskDetail> {
        self.storage
            .get(&metadata.task_persisted_id)
            .map(|task| TaskDetail::new(metadata, task))
    }

    pub fn delete_processed_task(&self, metadata: &TaskMetadata) -> bool {
        self.storage.delete(&metadata.task_persisted_id)
    }

    pub fn delete_expired_tasks(&self) -> Vec<TaskMetadata> {
        self.storage.delete_expired()
    }

    pub fn status(&self) -> QueueStatus {
        self.status_for(self.storage.get_inventory().len())
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    fn status_for(&self, num_tasks_in_queue: usize) -> QueueStatus {
        QueueStatus {
            queue_id: self.storage.site_id().to_string(),
            num_tasks_in_queue,
        }
    }

    fn process_queue_status(&self, status: &QueueStatus) {
        if status.num_tasks_in_queue >= self.config.min_tasks_before_run {
            debug!(
                num_tasks = status.num_tasks_in_queue,
                "queue threshold reached, running now"
            );
            self.timer.cancel();
            self.trigger.run(Box::new(|| {}));
            return;
        }

        let trigger = self.trigger.clone();
        let scheduled = self
            .timer
            .schedule_if_not_already(self.config.run_delay, move || {
                trigger.run(Box::new(|| {}));
            });
        if scheduled {
            debug!(delay = ?self.config.run_delay, "queue run scheduled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HttpRequestError;
    use crate::ports::RecordKind;
    use crate::queue::run_request::test_support::ScriptedRunner;
    use crate::queue::storage::test_support::{StorageFixture, storage_fixture};
    use std::time::Duration;

    struct Fixture {
        fx: StorageFixture,
        runner: Arc<ScriptedRunner>,
        queue: BackgroundQueue,
    }

    fn fixture(min_tasks_before_run: usize) -> Fixture {
        let fx = storage_fixture();
        let runner = Arc::new(ScriptedRunner::default());
        let manager = Arc::new(RunRequestManager::new());
        let run_request = Arc::new(QueueRunRequest::new(
            runner.clone(),
            fx.storage.clone(),
            manager.clone(),
        ));
        let config = QueueConfig {
            site_id: "test-site".to_string(),
            min_tasks_before_run,
            run_delay: Duration::from_secs(30),
            ..QueueConfig::default()
        };
        let queue = BackgroundQueue::new(
            config,
            fx.storage.clone(),
            run_request,
            manager,
            Handle::current(),
        );
        Fixture { fx, runner, queue }
    }

    #[derive(serde::Serialize, serde::Deserialize)]
    struct Ping {
        n: u32,
    }

    impl Task for Ping {
        const TYPE: &'static str = "ping.v1";
    }

    #[tokio::test]
    async fn add_task_reports_status() {
        let f = fixture(10);

        let result = f.queue.add_task("a", vec![1], None, vec![]);

        assert!(result.success);
        assert_eq!(
            result.status,
            QueueStatus {
                queue_id: "test-site".to_string(),
                num_tasks_in_queue: 1
            }
        );
        assert_eq!(
            f.queue.get_all_stored_tasks(),
            vec![result.created_task.unwrap()]
        );
    }

    #[tokio::test]
    async fn add_task_failure_is_reported() {
        let f = fixture(10);
        f.fx.store.fail_writes(RecordKind::Task, true);

        let result = f.queue.add_task("a", vec![], None, vec![]);

        assert!(!result.success);
        assert!(result.created_task.is_none());
        assert_eq!(result.status.num_tasks_in_queue, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn below_threshold_runs_after_delay() {
        let f = fixture(10);
        f.queue.add_task("a", vec![], None, vec![]);
        f.queue.add_task("b", vec![], None, vec![]);

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(f.runner.runs().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(f.runner.runs(), vec!["a", "b"]);
        assert_eq!(f.queue.status().num_tasks_in_queue, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reaching_threshold_runs_immediately() {
        let f = fixture(2);
        f.queue.add_task("a", vec![], None, vec![]);
        f.queue.add_task("b", vec![], None, vec![]);

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(f.runner.runs(), vec!["a", "b"]);

        // the debounce timer was cancelled
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(f.runner.runs(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn run_until_complete_drains_queue() {
        let f = fixture(10);
        f.queue.add_task("a", vec![], None, vec![]);
        f.queue.add_task("b", vec![], None, vec![]);
        f.runner.fail("b", HttpRequestError::ServerDown);

        f.queue.run_until_complete().await;

        assert_eq!(f.runner.runs(), vec!["a", "b"]);
        let remaining = f.queue.get_all_stored_tasks();
        assert_eq!(remaining.len(), 1);
        let detail = f.queue.get_task_detail(&remaining[0]).unwrap();
        assert_eq!(detail.run_results.total_runs, 1);
        assert_eq!(detail.task_type.as_str(), "b");
    }

    #[tokio::test]
    async fn add_typed_encodes_payload() {
        let f = fixture(10);

        let result = f.queue.add_typed(&Ping { n: 7 }, None, vec![]);

        let metadata = result.created_task.unwrap();
        assert_eq!(metadata.task_type.as_str(), Ping::TYPE);
        let detail = f.queue.get_task_detail(&metadata).unwrap();
        assert_eq!(detail.data, br#"{"n":7}"#.to_vec());
    }

    #[tokio::test]
    async fn delete_processed_task_removes_it() {
        let f = fixture(10);
        let metadata = f
            .queue
            .add_task("a", vec![], None, vec![])
            .created_task
            .unwrap();

        assert!(f.queue.delete_processed_task(&metadata));

        assert!(f.queue.get_all_stored_tasks().is_empty());
        assert!(f.queue.get_task_detail(&metadata).is_none());
    }

    #[tokio::test]
    async fn expired_tasks_are_swept() {
        let f = fixture(10);
        let old = f
            .queue
            .add_task("a", vec![], None, vec![])
            .created_task
            .unwrap();
        f.fx.clock.advance(chrono::Duration::days(4));

        assert_eq!(f.queue.delete_expired_tasks(), vec![old]);
        assert_eq!(f.queue.status().num_tasks_in_queue, 0);
    }

    #[tokio::test]
    async fn panicking_handler_still_ends_the_run() {
        let f = fixture(10);
        f.queue.add_task("a", vec![], None, vec![]);
        f.runner.panic_on("a");

        f.queue.run_until_complete().await;

        assert_eq!(f.runner.runs(), vec!["a"]);
        assert_eq!(f.queue.status().num_tasks_in_queue, 1);

        f.runner.succeed("a");
        f.queue.run_until_complete().await;
        assert_eq!(f.runner.runs(), vec!["a", "a"]);
        assert_eq!(f.queue.status().num_tasks_in_queue, 0);
    }
}
