//! HttpClient - maps raw HTTP outcomes onto [`HttpRequestError`].
//!
//! On top of an [`HttpTransport`] it adds:
//! - a global pause window, opened by a 401 or by a server that stays down;
//!   while open, requests fail with `RequestsPaused` without touching the network
//! - exponential backoff for 5xx responses (see [`HttpRetryPolicy`])

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::{HttpRequest, HttpResponse, HttpRetryPolicy, TransportError};
use crate::domain::HttpRequestError;
use crate::ports::{Clock, HttpTransport};

pub struct HttpClient {
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
    retry_policy: HttpRetryPolicy,
    pause_duration: Duration,
    paused_until: Mutex<Option<DateTime<Utc>>>,
}

impl HttpClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
        retry_policy: HttpRetryPolicy,
        pause_duration: Duration,
    ) -> Self {
        Self {
            transport,
            clock,
            retry_policy,
            pause_duration,
            paused_until: Mutex::new(None),
        }
    }

    pub async fn request(&self, request: &HttpRequest) -> Result<HttpResponse, HttpRequestError> {
        let mut retry = 0;
        loop {
            if self.is_paused() {
                debug!(path = %request.path, "request skipped, requests are paused");
                return Err(HttpRequestError::RequestsPaused);
            }

            let response = match self.transport.send(request).await {
                Ok(response) => response,
                Err(e) => return Err(map_transport_error(e)),
            };

            match response.status {
                200..=299 => return Ok(response),
                400 => return Err(HttpRequestError::BadRequest400(response.body_text())),
                401 => {
                    self.pause_requests();
                    return Err(HttpRequestError::Unauthorized);
                }
                500..=599 => {
                    retry += 1;
                    match self.retry_policy.next_delay(retry) {
                        Some(delay) => {
                            debug!(
                                status = response.status,
                                retry,
                                delay_ms = delay.as_millis() as u64,
                                "server error, retrying"
                            );
                            tokio::time::sleep(delay).await;
                        }
                        None => {
                            self.pause_requests();
                            return Err(HttpRequestError::ServerDown);
                        }
                    }
                }
                status => {
                    return Err(HttpRequestError::UnsuccessfulStatusCode {
                        status,
                        body: response.body_text(),
                    });
                }
            }
        }
    }

    /// Open (or extend) the pause window starting now.
    pub fn pause_requests(&self) {
        let until = self.clock.now()
            + chrono::Duration::from_std(self.pause_duration).unwrap_or(chrono::Duration::zero());
        warn!(%until, "pausing all HTTP requests");
        *self
            .paused_until
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(until);
    }

    pub fn is_paused(&self) -> bool {
        let mut paused_until = self
            .paused_until
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match *paused_until {
            Some(until) if self.clock.now() < until => true,
            Some(_) => {
                *paused_until = None;
                false
            }
            None => false,
        }
    }
}

fn map_transport_error(error: TransportError) -> HttpRequestError {
    match error {
        TransportError::NoNetwork(msg) => HttpRequestError::NoOrBadNetwork(msg),
        TransportError::Timeout => HttpRequestError::NoResponse("timed out".to_string()),
        TransportError::Cancelled => HttpRequestError::Cancelled,
        TransportError::Other(msg) => HttpRequestError::NoResponse(msg),
    }
}
