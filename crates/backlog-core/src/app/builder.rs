//! QueueBuilder - キューの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 明示的な依存注入（グローバル状態なし）
//! - 起動時検証（Fail-fast 設計）

use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::info;

use crate::config::{ConfigError, QueueConfig};
use crate::http::HttpClient;
use crate::impls::InMemoryRecordStore;
use crate::ports::{Clock, IdGenerator, RecordStore, SystemClock, UlidGenerator};
use crate::queue::{BackgroundQueue, QueueRunRequest, QueueStorage, RunRequestManager};
use crate::tasks;
use crate::typed::{Handler, QueueRunner, RegistryError, RegistryRunner, Task, TypedRegistry};

/// QueueBuilder は BackgroundQueue を構築
///
/// # 使用例
/// ```ignore
/// let queue = QueueBuilder::new(QueueConfig::from_env()?)
///     .record_store(Arc::new(FileRecordStore::new(dir)))
///     .register_sdk_tasks(client)?
///     .expect_tasks(&tasks::SDK_TASK_TYPES)
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - expect_tasks() で期待される task_type を登録
/// - build() 時に「期待集合 ⊆ 登録済み集合」をチェック
/// - tokio ランタイムの外で build() するとエラー
pub struct QueueBuilder {
    config: QueueConfig,
    record_store: Option<Arc<dyn RecordStore>>,
    clock: Option<Arc<dyn Clock>>,
    id_generator: Option<Arc<dyn IdGenerator>>,
    runner: Option<Arc<dyn QueueRunner>>,
    registry: TypedRegistry,
    expected_tasks: Option<Vec<String>>,
}

/// BuildError はキュー構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing task types: {0:?}. These tasks were expected but not registered.")]
    MissingTaskTypes(Vec<String>),

    #[error("QueueBuilder::build must be called inside a tokio runtime")]
    NoRuntime,

    #[error("invalid queue config: {0}")]
    InvalidConfig(#[from] ConfigError),
}

impl QueueBuilder {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            record_store: None,
            clock: None,
            id_generator: None,
            runner: None,
            registry: TypedRegistry::new(),
            expected_tasks: None,
        }
    }

    /// 永続化先（省略時は InMemoryRecordStore）
    pub fn record_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.record_store = Some(store);
        self
    }

    /// 省略時は SystemClock
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// 省略時は clock から ULID を生成
    pub fn id_generator(mut self, id_generator: Arc<dyn IdGenerator>) -> Self {
        self.id_generator = Some(id_generator);
        self
    }

    /// 独自の QueueRunner を使う（登録済み Handler より優先）
    pub fn runner(mut self, runner: Arc<dyn QueueRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Handler を登録
    pub fn register<T: Task, H: Handler<T> + 'static>(
        mut self,
        handler: H,
    ) -> Result<Self, RegistryError> {
        self.registry.register::<T, H>(handler)?;
        Ok(self)
    }

    /// SDK のタスク一式を登録
    pub fn register_sdk_tasks(mut self, client: Arc<HttpClient>) -> Result<Self, RegistryError> {
        tasks::register_sdk_tasks(&mut self.registry, client)?;
        Ok(self)
    }

    /// 期待される task_type のリストを設定
    pub fn expect_tasks(mut self, task_types: &[&str]) -> Self {
        self.expected_tasks = Some(task_types.iter().map(|t| t.to_string()).collect());
        self
    }

    /// 検証してから BackgroundQueue を生成
    ///
    /// # 検証
    /// - QueueConfig::validate()
    /// - expect_tasks() の task_type が全て登録されているか（runner() 指定時は対象外）
    /// - tokio ランタイムの中で呼ばれているか
    ///
    /// 生成直後に期限切れタスクを掃除する。
    pub fn build(self) -> Result<BackgroundQueue, BuildError> {
        self.config.validate()?;

        if self.runner.is_none()
            && let Some(expected_tasks) = &self.expected_tasks
        {
            let registered_types = self.registry.registered_types();
            let missing_tasks: Vec<String> = expected_tasks
                .iter()
                .filter(|x| !registered_types.contains(x))
                .cloned()
                .collect();
            if !missing_tasks.is_empty() {
                return Err(BuildError::MissingTaskTypes(missing_tasks));
            }
        }

        let runtime = Handle::try_current().map_err(|_| BuildError::NoRuntime)?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let id_generator = self
            .id_generator
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(clock.clone())));
        let record_store = self
            .record_store
            .unwrap_or_else(|| Arc::new(InMemoryRecordStore::new()));
        let runner = self
            .runner
            .unwrap_or_else(|| Arc::new(RegistryRunner::new(Arc::new(self.registry))));

        let storage = Arc::new(QueueStorage::new(
            self.config.site_id.clone(),
            record_store,
            clock,
            id_generator,
            self.config.task_expiry_chrono(),
        ));
        let request_manager = Arc::new(RunRequestManager::new());
        let run_request = Arc::new(QueueRunRequest::new(
            runner,
            storage.clone(),
            request_manager.clone(),
        ));

        let queue = BackgroundQueue::new(self.config, storage, run_request, request_manager, runtime);
        let expired = queue.delete_expired_tasks();
        info!(
            site_id = %queue.status().queue_id,
            expired = expired.len(),
            queued = queue.status().num_tasks_in_queue,
            "queue ready"
        );
        Ok(queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, RecordKind};
    use crate::typed::handler::test_support::*;
    use chrono::{TimeZone, Utc};

    fn config() -> QueueConfig {
        QueueConfig::default()
    }

    #[tokio::test]
    async fn test_build_success() {
        let queue = QueueBuilder::new(config())
            .register::<TestTask, _>(TestTaskHandler)
            .unwrap()
            .expect_tasks(&[TestTask::TYPE])
            .build();
        assert!(queue.is_ok());
    }

    #[tokio::test]
    async fn test_build_missing_task_types() {
        let queue = QueueBuilder::new(config())
            .register::<TestTask, _>(TestTaskHandler)
            .unwrap()
            .expect_tasks(&[TestTask::TYPE, AnotherTestTask::TYPE])
            .build();
        assert!(matches!(
            queue,
            Err(BuildError::MissingTaskTypes(missing)) if missing == vec![AnotherTestTask::TYPE.to_string()]
        ));
    }

    #[tokio::test]
    async fn test_build_rejects_invalid_config() {
        let queue = QueueBuilder::new(QueueConfig {
            min_tasks_before_run: 0,
            ..config()
        })
        .build();
        assert!(matches!(
            queue,
            Err(BuildError::InvalidConfig(ConfigError::ZeroMinTasks))
        ));
    }

    #[test]
    fn test_build_outside_runtime() {
        let queue = QueueBuilder::new(config()).build();
        assert!(matches!(queue, Err(BuildError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_build_sweeps_expired_tasks() {
        let store = Arc::new(InMemoryRecordStore::new());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        let first = QueueBuilder::new(config())
            .record_store(store.clone())
            .clock(clock.clone())
            .build()
            .unwrap();
        first.add_task("old", vec![], None, vec![]);
        assert_eq!(store.count(RecordKind::Task), 1);
        drop(first);

        clock.advance(chrono::Duration::days(4));
        let second = QueueBuilder::new(config())
            .record_store(store.clone())
            .clock(clock)
            .build()
            .unwrap();

        assert_eq!(second.status().num_tasks_in_queue, 0);
        assert_eq!(store.count(RecordKind::Task), 0);
    }

    #[tokio::test]
    async fn test_build_with_never_expiring_tasks() {
        let config = QueueConfig {
            task_expiry: std::time::Duration::from_secs(10_000_000_000_000),
            ..config()
        };
        let queue = QueueBuilder::new(config).build().unwrap();

        assert!(queue.add_task("kept", vec![], None, vec![]).success);
        assert!(queue.delete_expired_tasks().is_empty());
        assert_eq!(queue.status().num_tasks_in_queue, 1);
    }

    #[tokio::test]
    async fn test_build_rejects_site_id_unusable_as_key() {
        let queue = QueueBuilder::new(QueueConfig {
            site_id: "io.example.app".to_string(),
            ..config()
        })
        .build();
        assert!(matches!(
            queue,
            Err(BuildError::InvalidConfig(ConfigError::InvalidSiteId(_)))
        ));
    }
}
