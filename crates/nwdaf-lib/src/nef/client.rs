//! HTTP client for the NEF traffic-influence API

use super::payload::{TrafficInfluenceRequest, TrafficInfluenceSub};
use super::PolicyStore;
use crate::config::ControllerConfig;
use crate::error::{Result, SteeringError};
use crate::models::Anchor;
use crate::observability::NwdafMetrics;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Per-request deadline for NEF calls
pub const NEF_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause between clearing old subscriptions and installing a new one
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(1);

/// Client for this AF's traffic-influence subscription collection
#[derive(Clone)]
pub struct NefClient {
    http: reqwest::Client,
    nef_url: String,
    collection_url: String,
    dnn: String,
    sst: u8,
    sd: String,
    settle: Duration,
    metrics: NwdafMetrics,
}

impl NefClient {
    pub fn new(config: &ControllerConfig, metrics: NwdafMetrics) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(NEF_TIMEOUT).build()?;
        Ok(Self {
            http,
            nef_url: config.nef_url.clone(),
            collection_url: config.nef_collection_url(),
            dnn: config.dnn.clone(),
            sst: config.sst,
            sd: config.sd.clone(),
            settle: DEFAULT_SETTLE,
            metrics,
        })
    }

    /// Override the settle pause
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn collection_url(&self) -> &str {
        &self.collection_url
    }

    fn record(&self, operation: &str, status: &str, start: Instant) {
        self.metrics
            .observe_nef_request(operation, status, start.elapsed().as_secs_f64());
    }

    async fn fetch_subscriptions(&self) -> Result<Vec<TrafficInfluenceSub>> {
        let start = Instant::now();
        let response = match self.http.get(&self.collection_url).send().await {
            Ok(response) => response,
            Err(e) => {
                let err = SteeringError::from(e);
                self.record("list", err.kind(), start);
                return Err(err);
            }
        };

        let status = response.status();
        self.record("list", status.as_str(), start);

        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(SteeringError::backend(status, body));
        }

        response
            .json::<Vec<TrafficInfluenceSub>>()
            .await
            .map_err(|e| SteeringError::Parse(format!("invalid subscription list: {}", e)))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let url = format!("{}/{}", self.collection_url, id);
        let start = Instant::now();

        match self.http.delete(&url).send().await {
            Ok(response) => {
                let status = response.status();
                self.record("delete", status.as_str(), start);
                if status.is_success() {
                    Ok(())
                } else {
                    let body = response.text().await.unwrap_or_default();
                    Err(SteeringError::backend(status, body))
                }
            }
            Err(e) => {
                let err = SteeringError::from(e);
                self.record("delete", err.kind(), start);
                Err(err)
            }
        }
    }
}

#[async_trait]
impl PolicyStore for NefClient {
    async fn list_active(&self) -> Vec<TrafficInfluenceSub> {
        match self.fetch_subscriptions().await {
            Ok(subs) => subs,
            Err(e) => {
                warn!(error = %e, url = %self.collection_url, "Failed to list NEF subscriptions");
                Vec::new()
            }
        }
    }

    async fn delete_all(&self) {
        let subs = match self.fetch_subscriptions().await {
            Ok(subs) => subs,
            Err(e) => {
                warn!(error = %e, "Skipping subscription cleanup, listing failed");
                return;
            }
        };

        for sub in &subs {
            let Some(id) = sub.subscription_id() else {
                continue;
            };
            match self.delete(id).await {
                Ok(()) => debug!(subscription_id = %id, "Deleted NEF subscription"),
                Err(e) => warn!(subscription_id = %id, error = %e, "Failed to delete NEF subscription"),
            }
        }

        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }
    }

    async fn install(&self, anchor: Anchor) -> Result<String> {
        let payload = TrafficInfluenceRequest::steer_all(anchor, &self.dnn, self.sst, &self.sd);
        let start = Instant::now();

        let response = match self
            .http
            .post(&self.collection_url)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let err = SteeringError::from(e);
                self.record("create", err.kind(), start);
                return Err(err);
            }
        };

        let status = response.status();
        self.record("create", status.as_str(), start);

        if status != StatusCode::OK && status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(SteeringError::backend(status, body));
        }

        let created: TrafficInfluenceSub = response
            .json()
            .await
            .map_err(|e| SteeringError::Parse(format!("invalid subscription body: {}", e)))?;
        let id = created
            .subscription_id()
            .ok_or_else(|| SteeringError::Parse("created subscription has no self link".to_string()))?
            .to_string();

        info!(target_dnai = %anchor, subscription_id = %id, "Traffic steering created");
        Ok(id)
    }

    fn endpoint(&self) -> &str {
        &self.nef_url
    }
}
