//! App - アプリケーション層
//!
//! ports の実装・キュー・Handler を組み合わせて BackgroundQueue を組み立てます。
//!
//! # 主要コンポーネント
//! - **QueueBuilder**: 依存の注入と起動時検証

pub mod builder;

pub use self::builder::{BuildError, QueueBuilder};
