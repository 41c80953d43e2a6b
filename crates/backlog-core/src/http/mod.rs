//! HTTP layer used by task handlers.

mod client;
mod request;
mod retry;

pub use client::HttpClient;
pub use request::{HttpMethod, HttpRequest, HttpResponse, TransportError};
pub use retry::HttpRetryPolicy;
