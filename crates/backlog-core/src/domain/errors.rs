//! Error types and their classification.
//!
//! Nothing here ever reaches the SDK's public surface: the queue resolves every
//! failure locally, either by logging or by deciding what to do with the task.

use thiserror::Error;

use super::TaskType;

/// Failure of the durable record store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("invalid record key: {0:?}")]
    InvalidKey(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Outcome categories of an HTTP request, as seen by task handlers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpRequestError {
    #[error("unauthorized (401); requests are paused")]
    Unauthorized,

    #[error("malformed request (400): {0}")]
    BadRequest400(String),

    #[error("server unavailable after retries; requests are paused")]
    ServerDown,

    #[error("unsuccessful status code {status}: {body}")]
    UnsuccessfulStatusCode { status: u16, body: String },

    #[error("no or bad network: {0}")]
    NoOrBadNetwork(String),

    #[error("no response: {0}")]
    NoResponse(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("requests are currently paused")]
    RequestsPaused,
}

/// Why running a task did not succeed.
#[derive(Debug, Error)]
pub enum TaskRunError {
    #[error(transparent)]
    Http(#[from] HttpRequestError),

    #[error("payload of {task_type} could not be decoded")]
    Decode {
        task_type: TaskType,
        #[source]
        source: serde_json::Error,
    },

    #[error("request body could not be encoded")]
    Encode(#[source] serde_json::Error),

    #[error("no handler registered for task_type={0}")]
    HandlerNotFound(TaskType),
}

/// What the run loop does with a task whose run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    /// No request can succeed right now. End the pass; leave the task as is.
    Paused,
    /// Retrying can never help. Delete the task.
    Terminal,
    /// Count the run and keep the task queued.
    Retryable,
}

impl TaskRunError {
    pub fn disposition(&self) -> FailureDisposition {
        match self {
            TaskRunError::Http(HttpRequestError::RequestsPaused) => FailureDisposition::Paused,
            TaskRunError::Http(HttpRequestError::BadRequest400(_)) => FailureDisposition::Terminal,
            TaskRunError::Http(_) => FailureDisposition::Retryable,
            TaskRunError::Decode { .. } | TaskRunError::Encode(_) => FailureDisposition::Terminal,
            TaskRunError::HandlerNotFound(_) => FailureDisposition::Terminal,
        }
    }
}
