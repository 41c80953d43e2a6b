//! backlog-core
//!
//! Persistent background task queue: work destined for a remote API is
//! recorded durably, then drained in order by a single-flight run loop.
//!
//! # モジュール構成
//! - **domain**: 値型とエラー分類（TaskId, TaskMetadata, QueueTask, HttpRequestError, ...）
//! - **ports**: 外部依存の抽象化（RecordStore, Clock, IdGenerator, HttpTransport）
//! - **impls**: ports の実装（FileRecordStore, InMemoryRecordStore）
//! - **queue**: インベントリ、選択、単一実行、run loop、BackgroundQueue
//! - **typed**: 型付き Task API（Task, Handler, TypedRegistry, QueueRunner）
//! - **http**: HttpClient（一時停止ウィンドウと 5xx バックオフ）
//! - **tasks**: SDK のタスク一覧
//! - **app**: QueueBuilder
//! - **config**: QueueConfig

pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod impls;
pub mod ports;
pub mod queue;
pub mod tasks;
pub mod typed;

pub use app::{BuildError, QueueBuilder};
pub use config::{ConfigError, QueueConfig};
pub use queue::BackgroundQueue;
