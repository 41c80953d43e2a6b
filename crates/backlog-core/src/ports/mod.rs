//! Ports - 抽象化レイヤー
//!
//! 外部の協調者（ファイルシステム、時計、HTTP）へのインターフェースです。
//! 各コンポーネントはこれらをコンストラクタ引数として受け取り、
//! グローバルな状態には依存しません。

pub mod clock;
pub mod http_transport;
pub mod id_generator;
pub mod record_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::http_transport::HttpTransport;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::record_store::{RecordKind, RecordStore};
