//! The run loop: drain the inventory one task at a time.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{error, info, warn};

use super::{QueryRunner, QueueStorage, RunRequestManager, TaskRead};
use crate::domain::{FailureDisposition, TaskMetadata};
use crate::typed::QueueRunner;

/// Executes one pass over the queue.
///
/// Only one pass runs at a time; [`RunRequestManager`] decides who starts it.
/// Each task's result is applied to storage before the next one is selected.
pub struct QueueRunRequest {
    runner: Arc<dyn QueueRunner>,
    storage: Arc<QueueStorage>,
    request_manager: Arc<RunRequestManager>,
    query_runner: Mutex<QueryRunner>,
}

impl QueueRunRequest {
    pub fn new(
        runner: Arc<dyn QueueRunner>,
        storage: Arc<QueueStorage>,
        request_manager: Arc<RunRequestManager>,
    ) -> Self {
        Self {
            runner,
            storage,
            request_manager,
            query_runner: Mutex::new(QueryRunner::new()),
        }
    }

    pub async fn start(&self) {
        info!(site_id = %self.storage.site_id(), "queue run started");
        let mut executed = 0usize;
        let mut last_ran: Option<TaskMetadata> = None;
        let mut last_failed: Option<TaskMetadata> = None;

        loop {
            let inventory = self.storage.get_inventory();
            let next = self.lock_query_runner().get_next_task(
                &inventory,
                last_ran.as_ref(),
                last_failed.as_ref(),
            );
            let Some(next) = next else {
                break;
            };
            let task_id = next.task_persisted_id;

            let task = match self.storage.read_task(&task_id) {
                TaskRead::Found(task) => task,
                TaskRead::Missing => {
                    error!(
                        task_id = %task_id,
                        task_type = %next.task_type,
                        "task record missing, dropping it from the inventory and stopping the run"
                    );
                    self.storage.delete(&task_id);
                    break;
                }
                TaskRead::Unreadable => {
                    warn!(
                        task_id = %task_id,
                        task_type = %next.task_type,
                        "task record unreadable, leaving it queued and stopping the run"
                    );
                    break;
                }
            };

            executed += 1;
            match self.runner.run_task(&task).await {
                Ok(()) => {
                    info!(task_id = %task_id, task_type = %task.task_type, "task succeeded");
                    self.storage.delete(&task_id);
                    last_failed = None;
                }
                Err(err) => match err.disposition() {
                    FailureDisposition::Paused => {
                        info!(
                            task_id = %task_id,
                            "requests are paused, stopping the run"
                        );
                        break;
                    }
                    FailureDisposition::Terminal => {
                        error!(
                            task_id = %task_id,
                            task_type = %task.task_type,
                            error = %err,
                            "task can never succeed, deleting it"
                        );
                        self.storage.delete(&task_id);
                        last_failed = Some(next.clone());
                    }
                    FailureDisposition::Retryable => {
                        let run_results = task.run_results.with_another_run();
                        warn!(
                            task_id = %task_id,
                            task_type = %task.task_type,
                            total_runs = run_results.total_runs,
                            error = %err,
                            "task failed, will retry"
                        );
                        self.storage.update(&task_id, run_results);
                        last_failed = Some(next.clone());
                    }
                },
            }
            last_ran = Some(next);
        }

        self.done_running(executed);
    }

    /// Release everyone waiting on a pass that never reached its end.
    pub(crate) fn abandon(&self) {
        self.lock_query_runner().reset();
        self.request_manager.request_complete();
    }

    fn done_running(&self, executed: usize) {
        self.lock_query_runner().reset();
        info!(site_id = %self.storage.site_id(), executed, "queue run finished");
        self.request_manager.request_complete();
    }

    fn lock_query_runner(&self) -> MutexGuard<'_, QueryRunner> {
        self.query_runner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
