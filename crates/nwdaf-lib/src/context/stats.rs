//! Statistics reported by other network functions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NfStatistics {
    pub nf_instance_id: String,
    pub nf_type: String,
    /// Normalised load, 0.0 to 1.0
    pub load: f64,
    pub timestamp: i64,
    #[serde(default)]
    pub metrics: HashMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UeStatistics {
    pub supi: String,
    pub location: String,
    pub throughput: f64,
    pub latency: f64,
    pub packet_loss: f64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceStatistics {
    pub snssai: String,
    pub active_ues: u32,
    pub throughput: f64,
    pub resource_usage: f64,
    pub timestamp: i64,
}
