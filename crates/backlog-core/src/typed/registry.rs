//! TypedRegistry - Handler の登録と管理
//!
//! # 学習ポイント
//! - HashMap での型消去された trait object の管理
//! - Generic methods での登録と型安全性
//! - Arc による共有所有権

use crate::typed::handler::TypedHandler;

use super::handler::{DynHandler, Handler};
use super::task::Task;
use std::collections::HashMap;
use std::sync::Arc;

/// TypedRegistry は型付き Handler を登録・管理
///
/// # 使用例
/// ```ignore
/// let mut registry = TypedRegistry::new();
/// registry.register::<TrackEvent, _>(TrackEventHandler::new(client))?;
///
/// // task_type で DynHandler を取得
/// let handler = registry.get("track_event.v1");
/// ```
#[derive(Default)]
pub struct TypedRegistry {
    handlers: HashMap<String, Arc<dyn DynHandler>>,
}

/// RegistryError は TypedRegistry の操作エラー
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Handler for task type '{0}' is already registered")]
    AlreadyRegistered(String),
}

impl TypedRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register<T: Task, H: Handler<T> + 'static>(
        &mut self,
        handler: H,
    ) -> Result<(), RegistryError> {
        let task_type = T::TYPE.to_string();
        if self.handlers.contains_key(&task_type) {
            return Err(RegistryError::AlreadyRegistered(task_type));
        }
        let typed_handler = TypedHandler::new(handler);
        self.handlers.insert(task_type, Arc::new(typed_handler));
        Ok(())
    }

    pub fn get(&self, task_type: &str) -> Option<Arc<dyn DynHandler>> {
        self.handlers.get(task_type).cloned()
    }

    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typed::handler::test_support::*;

    #[test]
    fn test_register_and_get() {
        let mut registry = TypedRegistry::new();
        registry.register::<TestTask, _>(TestTaskHandler).unwrap();

        let retrieved = registry.get(TestTask::TYPE);
        assert!(retrieved.is_some());
        assert_eq!(retrieved.unwrap().task_type(), TestTask::TYPE);
        assert!(registry.get("unknown").is_none());
    }

    #[test]
    fn test_double_registration() {
        let mut registry = TypedRegistry::new();
        registry.register::<TestTask, _>(TestTaskHandler).unwrap();
        let result = registry.register::<TestTask, _>(TestTaskHandler);
        assert!(matches!(result, Err(RegistryError::AlreadyRegistered(_))));
    }

    #[test]
    fn test_registered_types() {
        let mut registry = TypedRegistry::new();
        registry.register::<TestTask, _>(TestTaskHandler).unwrap();
        registry
            .register::<AnotherTestTask, _>(AnotherTestTaskHandler)
            .unwrap();

        assert_eq!(
            registry.registered_types(),
            vec![AnotherTestTask::TYPE.to_string(), TestTask::TYPE.to_string()]
        );
        assert_eq!(registry.len(), 2);
    }
}
