//! The SDK's task catalogue.
//!
//! Each payload is a [`Task`] with a versioned `TYPE`. One [`ApiHandler`]
//! serves all of them: every task turns into exactly one API request.

mod metrics;
mod profile;
mod push;

pub use metrics::{MetricEvent, TrackDeliveryMetric, TrackPushMetric};
pub use profile::{IdentifyProfile, TrackEvent};
pub use push::{DeletePushToken, RegisterPushToken};

use std::sync::Arc;

use crate::domain::{AddTaskResult, GroupTag, TaskRunError};
use crate::http::{HttpClient, HttpRequest};
use crate::queue::BackgroundQueue;
use crate::typed::{RegistryError, Task, TypedRegistry};

/// Every task type registered by [`register_sdk_tasks`].
pub const SDK_TASK_TYPES: [&str; 6] = [
    IdentifyProfile::TYPE,
    TrackEvent::TYPE,
    RegisterPushToken::TYPE,
    DeletePushToken::TYPE,
    TrackPushMetric::TYPE,
    TrackDeliveryMetric::TYPE,
];

/// An SDK payload plus the groups it starts and waits on.
pub trait SdkTask: Task {
    fn group_start(&self) -> Option<GroupTag> {
        None
    }

    fn blocking_groups(&self) -> Vec<GroupTag> {
        Vec::new()
    }

    fn to_request(&self) -> Result<HttpRequest, TaskRunError>;
}

/// Sends the request of any [`SdkTask`] through the shared client.
#[derive(Clone)]
pub struct ApiHandler {
    client: Arc<HttpClient>,
}

impl ApiHandler {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }

    async fn send<T: SdkTask>(&self, task: &T) -> Result<(), TaskRunError> {
        let request = task.to_request()?;
        self.client.request(&request).await?;
        Ok(())
    }
}

macro_rules! api_handler_for {
    ($($task:ty),* $(,)?) => {
        $(
            #[async_trait::async_trait]
            impl crate::typed::Handler<$task> for ApiHandler {
                async fn handle(&self, task: $task) -> Result<(), TaskRunError> {
                    self.send(&task).await
                }
            }
        )*
    };
}

api_handler_for!(
    IdentifyProfile,
    TrackEvent,
    RegisterPushToken,
    DeletePushToken,
    TrackPushMetric,
    TrackDeliveryMetric,
);

pub fn register_sdk_tasks(
    registry: &mut TypedRegistry,
    client: Arc<HttpClient>,
) -> Result<(), RegistryError> {
    let handler = ApiHandler::new(client);
    registry.register::<IdentifyProfile, _>(handler.clone())?;
    registry.register::<TrackEvent, _>(handler.clone())?;
    registry.register::<RegisterPushToken, _>(handler.clone())?;
    registry.register::<DeletePushToken, _>(handler.clone())?;
    registry.register::<TrackPushMetric, _>(handler.clone())?;
    registry.register::<TrackDeliveryMetric, _>(handler)?;
    Ok(())
}

/// Queue `task` with its own group tags.
pub fn enqueue<T: SdkTask>(queue: &BackgroundQueue, task: &T) -> AddTaskResult {
    queue.add_typed(task, task.group_start(), task.blocking_groups())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::http::{HttpRequest, HttpResponse, TransportError};
    use crate::ports::HttpTransport;

    /// Records every request and answers with a fixed status.
    pub(crate) struct RecordingTransport {
        status: Mutex<u16>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl RecordingTransport {
        pub fn new(status: u16) -> Self {
            Self {
                status: Mutex::new(status),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn respond_with(&self, status: u16) {
            *self.status.lock().unwrap() = status;
        }

        pub fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpTransport for RecordingTransport {
        async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(HttpResponse::new(*self.status.lock().unwrap(), "{}"))
        }
    }
}
