//! Policy store backed by the NEF traffic-influence API
//!
//! The active steering policy is whatever anchor the first of this AF's
//! subscriptions routes to. Changing it is a delete-all followed by a create,
//! which briefly leaves no policy in place.

mod client;
mod payload;

pub use client::{NefClient, DEFAULT_SETTLE, NEF_TIMEOUT};
pub use payload::{
    RouteToLocation, Snssai, TrafficFilter, TrafficInfluenceRequest, TrafficInfluenceSub,
    AF_APP_ID, AF_SERVICE_ID, FLOW_DESCRIPTION,
};

use crate::error::Result;
use crate::models::Anchor;
use async_trait::async_trait;

/// Store of traffic-influence policies for this AF
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Current subscriptions in server order; empty on any failure
    async fn list_active(&self) -> Vec<TrafficInfluenceSub>;

    /// Anchor of the first subscription routing to a known edge
    async fn active_policy(&self) -> Option<Anchor> {
        self.list_active()
            .await
            .iter()
            .find_map(TrafficInfluenceSub::anchor)
    }

    /// Remove every listed subscription, then wait for the NEF to settle
    async fn delete_all(&self);

    /// Create a subscription steering all traffic to `anchor`; returns its id
    async fn install(&self, anchor: Anchor) -> Result<String>;

    /// Base URL reported in connectivity failures
    fn endpoint(&self) -> &str;
}
