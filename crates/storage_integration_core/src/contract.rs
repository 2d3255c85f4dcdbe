use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProvisionError;

pub const SUCCESS_RESULT: &str = "SUCCESS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

/// Where and on whose behalf a callback is sent. Every field falls back to
/// an empty value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallbackTarget {
    #[serde(rename = "ResponseURL", default)]
    pub response_url: String,
    #[serde(default)]
    pub stack_id: String,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub logical_resource_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,
}

impl CallbackTarget {
    /// Recovers the signalling fields of an event that failed to parse, so
    /// the rejection can still be reported. `None` when there is no
    /// `ResponseURL` to report to.
    pub fn salvage(event: &Value) -> Option<Self> {
        if !event.is_object() {
            return None;
        }
        Self::deserialize(event)
            .ok()
            .filter(|target| !target.response_url.is_empty())
    }
}

/// CloudFormation custom-resource request. Only `RequestType` is mandatory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleEvent {
    pub request_type: RequestType,
    #[serde(flatten)]
    pub target: CallbackTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub resource_properties: Value,
}

impl LifecycleEvent {
    pub fn parse(event: &Value) -> Result<Self, ProvisionError> {
        if !event.is_object() {
            return Err(ProvisionError::InvalidEvent(
                "event payload must be a JSON object".to_string(),
            ));
        }
        Self::deserialize(event).map_err(|error| ProvisionError::InvalidEvent(error.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CallbackStatus {
    Success,
    Failed,
}

/// Body PUT to the pre-signed `ResponseURL`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallbackPayload {
    pub status: CallbackStatus,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub no_echo: bool,
    pub data: Value,
}

impl CallbackPayload {
    pub fn new(
        target: &CallbackTarget,
        status: CallbackStatus,
        reason: Option<String>,
        log_stream_name: &str,
        data: Value,
    ) -> Self {
        Self {
            status,
            reason: reason.unwrap_or_else(|| {
                format!("See the details in CloudWatch Log Stream: {log_stream_name}")
            }),
            physical_resource_id: target
                .physical_resource_id
                .clone()
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| log_stream_name.to_string()),
            stack_id: target.stack_id.clone(),
            request_id: target.request_id.clone(),
            logical_resource_id: target.logical_resource_id.clone(),
            no_echo: false,
            data,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Everything created for one integration; reported as callback `Data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProvisioningOutcome {
    pub integration_name: String,
    pub stage_name: String,
    pub storage_location: String,
    pub policy_arn: String,
    pub role_name: String,
    pub role_arn: String,
    pub table_name: String,
}

pub fn empty_data() -> Value {
    Value::Object(Map::new())
}
