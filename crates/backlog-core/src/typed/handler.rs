//! Handler trait - Task を実行する Handler の定義
//!
//! # 学習ポイント
//! - ジェネリック trait (Handler<T>)
//! - Object-safe trait (DynHandler)
//! - Type erasure パターン (TypedHandler<T, H> → DynHandler)

use super::task::Task;
use crate::domain::{TaskRunError, TaskType};
use async_trait::async_trait;
use std::marker::PhantomData;

/// Handler は Task を実行する
///
/// 1 回の実行でちょうど 1 回の HTTP 呼び出しを行うこと。
/// クラッシュ後に同じタスクが再実行されることがあるので、
/// リモート側の操作は繰り返しても安全なもの（upsert など）にすること。
///
/// # ジェネリクスによる型安全性
/// - `Handler<TrackEvent>` は `TrackEvent` しか受け取れない
/// - コンパイル時に Task と Handler の対応が保証される
#[async_trait]
pub trait Handler<T: Task>: Send + Sync {
    async fn handle(&self, task: T) -> Result<(), TaskRunError>;
}

/// DynHandler は object-safe な Handler の抽象化
///
/// TypedHandler<T, H> を DynHandler に変換することで、
/// HashMap<String, Arc<dyn DynHandler>> に格納可能にします。
#[async_trait]
pub trait DynHandler: Send + Sync {
    /// 保存されたバイト列をデコードして実行
    ///
    /// デコード失敗は `TaskRunError::Decode`（再試行しても直らない）。
    async fn handle_dyn(&self, data: &[u8]) -> Result<(), TaskRunError>;
    fn task_type(&self) -> &str;
}

pub struct TypedHandler<T: Task, H: Handler<T>> {
    handler: H,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Task, H: Handler<T>> TypedHandler<T, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Task, H: Handler<T>> DynHandler for TypedHandler<T, H> {
    async fn handle_dyn(&self, data: &[u8]) -> Result<(), TaskRunError> {
        let task: T = serde_json::from_slice(data).map_err(|source| TaskRunError::Decode {
            task_type: TaskType::new(T::TYPE),
            source,
        })?;
        self.handler.handle(task).await
    }

    fn task_type(&self) -> &str {
        T::TYPE
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct TestTask {
        pub value: i32,
    }

    impl Task for TestTask {
        const TYPE: &'static str = "test.task.create.v1";
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct AnotherTestTask {
        pub name: String,
    }

    impl Task for AnotherTestTask {
        const TYPE: &'static str = "test.task.another.v1";
    }

    /// Succeeds for non-negative values, fails retryably otherwise.
    pub struct TestTaskHandler;

    #[async_trait]
    impl Handler<TestTask> for TestTaskHandler {
        async fn handle(&self, task: TestTask) -> Result<(), TaskRunError> {
            if task.value < 0 {
                return Err(crate::domain::HttpRequestError::NoResponse("negative".into()).into());
            }
            Ok(())
        }
    }

    pub struct AnotherTestTaskHandler;

    #[async_trait]
    impl Handler<AnotherTestTask> for AnotherTestTaskHandler {
        async fn handle(&self, _task: AnotherTestTask) -> Result<(), TaskRunError> {
            Ok(())
        }
    }
}
