//! HttpTransport port - 実際の HTTP 通信
//!
//! キューは通信そのものを持ちません。ホストアプリ（または CLI のデモ）が
//! この trait を実装して渡します。ステータスコードの解釈・一時停止・
//! 5xx のバックオフは `HttpClient` 側の責務です。

use async_trait::async_trait;

use crate::http::{HttpRequest, HttpResponse, TransportError};

/// Performs exactly one request; no retries, no interpretation.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}
