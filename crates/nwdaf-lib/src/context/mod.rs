//! Shared NWDAF state
//!
//! Holds the NF identity, analytics subscriptions and the statistics
//! collections. Each collection sits behind its own lock.

mod stats;

pub use stats::{NfStatistics, SliceStatistics, UeStatistics};

use crate::config::NwdafConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A consumer's subscription to periodic analytics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSubscription {
    pub subscription_id: String,
    pub event_type: String,
    pub consumer_nf_id: String,
    pub notification_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics_filter: Option<Map<String, Value>>,
    #[serde(default)]
    pub reporting_period: i64,
}

/// Identity and SBI addressing of this NF instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NfIdentity {
    pub nf_id: String,
    pub name: String,
    pub uri_scheme: String,
    pub binding_ipv4: String,
    pub register_ipv4: String,
    pub sbi_port: u16,
    pub nrf_uri: String,
}

impl NfIdentity {
    pub fn from_config(config: &NwdafConfig) -> Self {
        let c = &config.configuration;
        Self {
            nf_id: Uuid::new_v4().to_string(),
            name: c.nwdaf_name.clone(),
            uri_scheme: c.sbi.scheme.clone(),
            binding_ipv4: c.sbi.binding_ipv4.clone(),
            register_ipv4: c.sbi.register_ipv4.clone(),
            sbi_port: c.sbi.port,
            nrf_uri: c.nrf_uri.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub struct NwdafContext {
    identity: NfIdentity,
    subscriptions: RwLock<HashMap<String, AnalyticsSubscription>>,
    nf_stats: RwLock<HashMap<String, NfStatistics>>,
    ue_stats: RwLock<HashMap<String, UeStatistics>>,
    slice_stats: RwLock<HashMap<String, SliceStatistics>>,
}

impl NwdafContext {
    pub fn new(identity: NfIdentity) -> Self {
        Self {
            identity,
            ..Default::default()
        }
    }

    pub fn identity(&self) -> &NfIdentity {
        &self.identity
    }

    pub async fn add_subscription(&self, sub: AnalyticsSubscription) {
        self.subscriptions
            .write()
            .await
            .insert(sub.subscription_id.clone(), sub);
    }

    /// Returns the removed subscription, if it existed
    pub async fn remove_subscription(&self, id: &str) -> Option<AnalyticsSubscription> {
        self.subscriptions.write().await.remove(id)
    }

    pub async fn get_subscription(&self, id: &str) -> Option<AnalyticsSubscription> {
        self.subscriptions.read().await.get(id).cloned()
    }

    /// Apply `update` to a stored subscription under the write lock
    pub async fn update_subscription<F>(&self, id: &str, update: F) -> Option<AnalyticsSubscription>
    where
        F: FnOnce(&mut AnalyticsSubscription),
    {
        let mut subs = self.subscriptions.write().await;
        let sub = subs.get_mut(id)?;
        update(sub);
        Some(sub.clone())
    }

    pub async fn subscriptions(&self) -> Vec<AnalyticsSubscription> {
        self.subscriptions.read().await.values().cloned().collect()
    }

    pub async fn update_nf_statistics(&self, nf_id: &str, stats: NfStatistics) {
        self.nf_stats.write().await.insert(nf_id.to_string(), stats);
    }

    pub async fn get_nf_statistics(&self, nf_id: &str) -> Option<NfStatistics> {
        self.nf_stats.read().await.get(nf_id).cloned()
    }

    pub async fn all_nf_statistics(&self) -> HashMap<String, NfStatistics> {
        self.nf_stats.read().await.clone()
    }

    pub async fn update_ue_statistics(&self, supi: &str, stats: UeStatistics) {
        self.ue_stats.write().await.insert(supi.to_string(), stats);
    }

    pub async fn get_ue_statistics(&self, supi: &str) -> Option<UeStatistics> {
        self.ue_stats.read().await.get(supi).cloned()
    }

    pub async fn update_slice_statistics(&self, snssai: &str, stats: SliceStatistics) {
        self.slice_stats
            .write()
            .await
            .insert(snssai.to_string(), stats);
    }

    pub async fn all_slice_statistics(&self) -> HashMap<String, SliceStatistics> {
        self.slice_stats.read().await.clone()
    }
}
