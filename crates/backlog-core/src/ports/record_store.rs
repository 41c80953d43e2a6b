//! RecordStore port - キー指定で読み書きする永続バイトストア
//!
//! キューの永続化はすべてこの trait を経由します：
//! - inventory（キューごとに 1 レコード）
//! - task（タスクごとに 1 レコード、storage id がキー）
//!
//! # 実装
//! - `FileRecordStore`: ディレクトリ配下に 1 レコード 1 ファイル（本番用）
//! - `InMemoryRecordStore`: テスト・開発用

use crate::domain::StoreError;

/// Namespace of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Ordered manifest of a queue, keyed by queue id.
    Inventory,
    /// Full task record, keyed by storage id.
    Task,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Inventory => "inventory",
            RecordKind::Task => "tasks",
        }
    }
}

/// Durable, key-addressable byte storage.
///
/// Purely mechanical: no retries, no caching, no knowledge of what the bytes
/// mean. An `Err` means the operation did not happen.
pub trait RecordStore: Send + Sync {
    fn save(&self, kind: RecordKind, id: &str, bytes: &[u8]) -> Result<(), StoreError>;

    /// `Ok(None)` when no record exists under `id`.
    fn get(&self, kind: RecordKind, id: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// `Ok(false)` when there was nothing to delete.
    fn delete(&self, kind: RecordKind, id: &str) -> Result<bool, StoreError>;
}
