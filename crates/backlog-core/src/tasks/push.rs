use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::SdkTask;
use crate::domain::{GroupTag, TaskRunError};
use crate::http::{HttpMethod, HttpRequest};
use crate::typed::Task;

fn devices_path(identifier: &str) -> String {
    format!(
        "/api/v1/customers/{}/devices",
        urlencoding::encode(identifier)
    )
}

/// Attach a device token to a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterPushToken {
    pub identifier: String,
    pub token: String,
    pub platform: String,
    pub last_used: DateTime<Utc>,
}

impl Task for RegisterPushToken {
    const TYPE: &'static str = "register_push_token.v1";
}

impl SdkTask for RegisterPushToken {
    fn group_start(&self) -> Option<GroupTag> {
        Some(GroupTag::registered_push_token(&self.token))
    }

    fn blocking_groups(&self) -> Vec<GroupTag> {
        vec![GroupTag::identified_profile(&self.identifier)]
    }

    fn to_request(&self) -> Result<HttpRequest, TaskRunError> {
        HttpRequest::new(HttpMethod::Put, devices_path(&self.identifier)).json(&json!({
            "device": {
                "id": self.token,
                "platform": self.platform,
                "last_used": self.last_used.timestamp(),
            }
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletePushToken {
    pub identifier: String,
    pub token: String,
}

impl Task for DeletePushToken {
    const TYPE: &'static str = "delete_push_token.v1";
}

impl SdkTask for DeletePushToken {
    fn blocking_groups(&self) -> Vec<GroupTag> {
        vec![
            GroupTag::identified_profile(&self.identifier),
            GroupTag::registered_push_token(&self.token),
        ]
    }

    fn to_request(&self) -> Result<HttpRequest, TaskRunError> {
        Ok(HttpRequest::new(
            HttpMethod::Delete,
            format!(
                "{}/{}",
                devices_path(&self.identifier),
                urlencoding::encode(&self.token)
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::Value;

    #[test]
    fn register_token_puts_device() {
        let task = RegisterPushToken {
            identifier: "ann".to_string(),
            token: "tok/1".to_string(),
            platform: "ios".to_string(),
            last_used: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        };

        let request = task.to_request().unwrap();
        let body: Value = serde_json::from_slice(request.body.as_ref().unwrap()).unwrap();

        assert_eq!(request.method, HttpMethod::Put);
        assert_eq!(request.path, "/api/v1/customers/ann/devices");
        assert_eq!(
            body,
            json!({"device": {"id": "tok/1", "platform": "ios", "last_used": 1704067200}})
        );
        assert_eq!(
            task.group_start(),
            Some(GroupTag::registered_push_token("tok/1"))
        );
    }

    #[test]
    fn delete_token_waits_on_profile_and_token() {
        let task = DeletePushToken {
            identifier: "ann".to_string(),
            token: "tok/1".to_string(),
        };

        let request = task.to_request().unwrap();

        assert_eq!(request.path, "/api/v1/customers/ann/devices/tok%2F1");
        assert!(request.body.is_none());
        assert_eq!(task.blocking_groups().len(), 2);
    }
}
