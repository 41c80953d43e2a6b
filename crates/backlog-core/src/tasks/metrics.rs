use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::SdkTask;
use crate::domain::TaskRunError;
use crate::http::{HttpMethod, HttpRequest};
use crate::typed::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricEvent {
    Delivered,
    Opened,
    Converted,
    Clicked,
}

/// Push notification metric. Not tied to a profile, so no groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPushMetric {
    pub delivery_id: String,
    pub event: MetricEvent,
    pub device_token: String,
    pub timestamp: DateTime<Utc>,
}

impl Task for TrackPushMetric {
    const TYPE: &'static str = "track_push_metric.v1";
}

impl SdkTask for TrackPushMetric {
    fn to_request(&self) -> Result<HttpRequest, TaskRunError> {
        HttpRequest::new(HttpMethod::Post, "/push/events").json(&json!({
            "delivery_id": self.delivery_id,
            "event": self.event,
            "device_id": self.device_token,
            "timestamp": self.timestamp.timestamp(),
        }))
    }
}

/// In-app and other delivery metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackDeliveryMetric {
    pub delivery_id: String,
    pub event: MetricEvent,
    pub timestamp: DateTime<Utc>,
}

impl Task for TrackDeliveryMetric {
    const TYPE: &'static str = "track_delivery_metric.v1";
}

impl SdkTask for TrackDeliveryMetric {
    fn to_request(&self) -> Result<HttpRequest, TaskRunError> {
        HttpRequest::new(HttpMethod::Post, "/api/v1/cio_deliveries/events").json(&json!({
            "delivery_id": self.delivery_id,
            "event": self.event,
            "timestamp": self.timestamp.timestamp(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::Value;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn body(request: &HttpRequest) -> Value {
        serde_json::from_slice(request.body.as_ref().unwrap()).unwrap()
    }

    #[test]
    fn push_metric_posts_to_push_events() {
        let task = TrackPushMetric {
            delivery_id: "d1".to_string(),
            event: MetricEvent::Opened,
            device_token: "tok".to_string(),
            timestamp: at(),
        };

        let request = task.to_request().unwrap();

        assert_eq!(request.path, "/push/events");
        assert_eq!(
            body(&request),
            json!({"delivery_id": "d1", "event": "opened", "device_id": "tok", "timestamp": 1704067200})
        );
        assert!(task.group_start().is_none());
        assert!(task.blocking_groups().is_empty());
    }

    #[test]
    fn delivery_metric_posts_to_deliveries() {
        let task = TrackDeliveryMetric {
            delivery_id: "d2".to_string(),
            event: MetricEvent::Clicked,
            timestamp: at(),
        };

        let request = task.to_request().unwrap();

        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.path, "/api/v1/cio_deliveries/events");
        assert_eq!(body(&request)["event"], json!("clicked"));
    }
}
