//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **FileRecordStore**: ディレクトリ配下に 1 レコード 1 ファイルで保存
//! - **InMemoryRecordStore**: テスト・開発用（書き込み失敗を注入可能）

pub mod file_store;
pub mod inmem_store;

pub use self::file_store::FileRecordStore;
pub use self::inmem_store::InMemoryRecordStore;
