use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::SdkTask;
use crate::domain::{GroupTag, TaskRunError};
use crate::http::{HttpMethod, HttpRequest};
use crate::typed::Task;

fn customer_path(identifier: &str) -> String {
    format!("/api/v1/customers/{}", urlencoding::encode(identifier))
}

/// Create or update a profile. Starts the profile's group: everything sent for
/// the profile waits on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifyProfile {
    pub identifier: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl Task for IdentifyProfile {
    const TYPE: &'static str = "identify_profile.v1";
}

impl SdkTask for IdentifyProfile {
    fn group_start(&self) -> Option<GroupTag> {
        Some(GroupTag::identified_profile(&self.identifier))
    }

    fn to_request(&self) -> Result<HttpRequest, TaskRunError> {
        HttpRequest::new(HttpMethod::Put, customer_path(&self.identifier)).json(&self.attributes)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackEvent {
    pub identifier: String,
    pub name: String,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Task for TrackEvent {
    const TYPE: &'static str = "track_event.v1";
}

impl SdkTask for TrackEvent {
    fn blocking_groups(&self) -> Vec<GroupTag> {
        vec![GroupTag::identified_profile(&self.identifier)]
    }

    fn to_request(&self) -> Result<HttpRequest, TaskRunError> {
        let mut body = json!({
            "name": self.name,
            "data": self.data,
        });
        if let Some(timestamp) = self.timestamp {
            body["timestamp"] = json!(timestamp.timestamp());
        }
        HttpRequest::new(
            HttpMethod::Post,
            format!("{}/events", customer_path(&self.identifier)),
        )
        .json(&body)
    }
}
