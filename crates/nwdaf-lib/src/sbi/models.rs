//! SBI request and response bodies

use crate::context::AnalyticsSubscription;
use crate::error::{Result, SteeringError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRequest {
    pub event_type: String,
    pub consumer_nf_id: String,
    pub notification_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics_filter: Option<Map<String, Value>>,
    #[serde(default)]
    pub reporting_period: i64,
}

impl SubscriptionRequest {
    /// Required fields must be present and non-empty
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("eventType", &self.event_type),
            ("consumerNfId", &self.consumer_nf_id),
            ("notificationUri", &self.notification_uri),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(SteeringError::Validation(format!("{} is required", name)));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub subscription_id: String,
    pub event_type: String,
    pub notification_uri: String,
}

impl From<&AnalyticsSubscription> for SubscriptionResponse {
    fn from(sub: &AnalyticsSubscription) -> Self {
        Self {
            subscription_id: sub.subscription_id.clone(),
            event_type: sub.event_type.clone(),
            notification_uri: sub.notification_uri.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsRequest {
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics_filter: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    pub event_type: String,
    pub data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
