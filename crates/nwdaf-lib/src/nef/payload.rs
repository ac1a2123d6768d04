//! Traffic-influence wire shapes

use crate::models::Anchor;
use serde::{Deserialize, Serialize};

pub const AF_SERVICE_ID: &str = "steering";
pub const AF_APP_ID: &str = "traffic-steering-agent";
pub const FLOW_DESCRIPTION: &str = "permit out ip from any to any";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snssai {
    pub sst: u8,
    pub sd: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficFilter {
    pub flow_id: u32,
    pub flow_descriptions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteToLocation {
    #[serde(default)]
    pub dnai: Option<String>,
}

/// Body POSTed to create a steering subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficInfluenceRequest {
    pub af_service_id: String,
    pub af_app_id: String,
    pub dnn: String,
    pub snssai: Snssai,
    pub any_ue_ind: bool,
    pub traffic_filters: Vec<TrafficFilter>,
    pub traffic_routes: Vec<RouteToLocation>,
}

impl TrafficInfluenceRequest {
    /// Route every flow of every UE in the slice through `anchor`
    pub fn steer_all(anchor: Anchor, dnn: &str, sst: u8, sd: &str) -> Self {
        Self {
            af_service_id: AF_SERVICE_ID.to_string(),
            af_app_id: AF_APP_ID.to_string(),
            dnn: dnn.to_string(),
            snssai: Snssai {
                sst,
                sd: sd.to_string(),
            },
            any_ue_ind: true,
            traffic_filters: vec![TrafficFilter {
                flow_id: 1,
                flow_descriptions: vec![FLOW_DESCRIPTION.to_string()],
            }],
            traffic_routes: vec![RouteToLocation {
                dnai: Some(anchor.dnai().to_string()),
            }],
        }
    }
}

/// Subscription as listed or returned by the NEF.
///
/// Only `self` and the route DNAIs matter; everything else is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficInfluenceSub {
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_routes: Option<Vec<RouteToLocation>>,
}

impl TrafficInfluenceSub {
    /// Last path segment of the `self` link
    pub fn subscription_id(&self) -> Option<&str> {
        self.self_link
            .as_deref()
            .and_then(|link| link.rsplit('/').next())
            .filter(|id| !id.is_empty())
    }

    /// Anchor named by the first route's DNAI; later routes are ignored
    pub fn anchor(&self) -> Option<Anchor> {
        let dnai = self.traffic_routes.as_ref()?.first()?.dnai.as_deref()?;
        match dnai.to_lowercase().as_str() {
            "edge1" => Some(Anchor::Edge1),
            "edge2" => Some(Anchor::Edge2),
            _ => None,
        }
    }
}
