//! FileRecordStore - ディレクトリに 1 レコード 1 ファイルで保存
//!
//! レイアウト: `<root>/<kind>/<id>.json`
//!
//! 書き込みは一時ファイルに書いてから rename するので、
//! 途中でプロセスが落ちても中途半端なレコードは残りません。

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::domain::StoreError;
use crate::ports::{RecordKind, RecordStore};

pub struct FileRecordStore {
    root: PathBuf,
}

impl FileRecordStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dir(&self, kind: RecordKind) -> PathBuf {
        self.root.join(kind.as_str())
    }

    fn path(&self, kind: RecordKind, id: &str) -> Result<PathBuf, StoreError> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidKey(id.to_string()));
        }
        Ok(self.dir(kind).join(format!("{id}.json")))
    }
}

impl RecordStore for FileRecordStore {
    fn save(&self, kind: RecordKind, id: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.path(kind, id)?;
        fs::create_dir_all(self.dir(kind))?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn get(&self, kind: RecordKind, id: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path(kind, id)?;
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, kind: RecordKind, id: &str) -> Result<bool, StoreError> {
        let path = self.path(kind, id)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
