//! Task trait - 型付き Task の定義
//!
//! # 学習ポイント
//! - Associated Constants (`const TYPE`)
//! - Trait bounds の組み合わせ (Serialize + DeserializeOwned + Send + Sync + 'static)

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Task は task_type とペイロード型を対応付ける
///
/// # 使用例
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct TrackEvent {
///     identifier: String,
///     name: String,
/// }
///
/// impl Task for TrackEvent {
///     const TYPE: &'static str = "track_event.v1";
/// }
/// ```
///
/// # Trait Bounds
/// - `Serialize`: キューに積むときにバイト列へ変換するため
/// - `DeserializeOwned`: 実行時にバイト列から復元するため
/// - `Send + Sync + 'static`: Arc に格納して別スレッドで実行するため
pub trait Task: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// 永続化される task_type
    ///
    /// 一度リリースしたら変更しないこと（ディスク上の既存タスクが実行できなくなる）。
    const TYPE: &'static str;
}
