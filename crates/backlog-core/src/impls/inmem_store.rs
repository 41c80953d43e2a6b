//! InMemoryRecordStore - テスト・開発用のレコードストア
//!
//! # 学習ポイント
//! - 書き込み失敗を注入できるので、キャッシュとストレージの整合性をテストできる

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use crate::domain::StoreError;
use crate::ports::{RecordKind, RecordStore};

#[derive(Default)]
pub struct InMemoryRecordStore {
    records: Mutex<HashMap<(RecordKind, String), Vec<u8>>>,
    /// Kinds whose writes (save and delete) currently fail.
    failing: Mutex<HashSet<RecordKind>>,
    failing_reads: Mutex<HashSet<RecordKind>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every save/delete of `kind` fail until called again with `false`.
    pub fn fail_writes(&self, kind: RecordKind, fail: bool) {
        let mut failing = self.failing.lock().unwrap_or_else(PoisonError::into_inner);
        if fail {
            failing.insert(kind);
        } else {
            failing.remove(&kind);
        }
    }

    /// Make every get of `kind` fail until called again with `false`.
    pub fn fail_reads(&self, kind: RecordKind, fail: bool) {
        let mut failing = self
            .failing_reads
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if fail {
            failing.insert(kind);
        } else {
            failing.remove(&kind);
        }
    }

    /// Number of records of `kind`.
    pub fn count(&self, kind: RecordKind) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    fn check_writable(&self, kind: RecordKind) -> Result<(), StoreError> {
        let failing = self.failing.lock().unwrap_or_else(PoisonError::into_inner);
        if failing.contains(&kind) {
            return Err(StoreError::Unavailable(format!(
                "writes to {} are failing",
                kind.as_str()
            )));
        }
        Ok(())
    }
}

impl RecordStore for InMemoryRecordStore {
    fn save(&self, kind: RecordKind, id: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.check_writable(kind)?;
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((kind, id.to_string()), bytes.to_vec());
        Ok(())
    }

    fn get(&self, kind: RecordKind, id: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let failing = self
            .failing_reads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&kind);
        if failing {
            return Err(StoreError::Unavailable(format!(
                "reads of {} are failing",
                kind.as_str()
            )));
        }
        Ok(self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(kind, id.to_string()))
            .cloned())
    }

    fn delete(&self, kind: RecordKind, id: &str) -> Result<bool, StoreError> {
        self.check_writable(kind)?;
        Ok(self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(kind, id.to_string()))
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_and_delete() {
        let store = InMemoryRecordStore::new();
        store.save(RecordKind::Task, "a", b"1").unwrap();

        assert_eq!(store.get(RecordKind::Task, "a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.count(RecordKind::Task), 1);
        assert!(store.delete(RecordKind::Task, "a").unwrap());
        assert!(!store.delete(RecordKind::Task, "a").unwrap());
        assert_eq!(store.count(RecordKind::Task), 0);
    }

    #[test]
    fn injected_failures_only_hit_the_chosen_kind() {
        let store = InMemoryRecordStore::new();
        store.fail_writes(RecordKind::Inventory, true);

        assert!(store.save(RecordKind::Inventory, "site", b"[]").is_err());
        assert!(store.save(RecordKind::Task, "a", b"1").is_ok());

        store.fail_writes(RecordKind::Inventory, false);
        assert!(store.save(RecordKind::Inventory, "site", b"[]").is_ok());
    }

    #[test]
    fn injected_read_failures_keep_the_record() {
        let store = InMemoryRecordStore::new();
        store.save(RecordKind::Task, "a", b"1").unwrap();
        store.fail_reads(RecordKind::Task, true);

        assert!(store.get(RecordKind::Task, "a").is_err());
        assert_eq!(store.count(RecordKind::Task), 1);

        store.fail_reads(RecordKind::Task, false);
        assert_eq!(store.get(RecordKind::Task, "a").unwrap(), Some(b"1".to_vec()));
    }
}
