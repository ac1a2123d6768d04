//! UPF traffic metrics from the Prometheus backend
//!
//! Provides per-anchor receive rates for the steering loop and a usage
//! report for operators. Pod series are bucketed by name (see [`classify_pod`]).

mod classify;
mod report;

pub use classify::{classify_pod, parse_sample_value};
pub use report::{format_bytes, format_rate, InterfaceUsage, UsageColumn, UsageTable, EMPTY_REPORT};

use crate::error::{Result, SteeringError};
use crate::models::RateSample;
use crate::observability::NwdafMetrics;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Per-request deadline for Prometheus queries
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of UPF traffic measurements
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Current receive rate per bucket
    async fn query_rates(&self) -> Result<RateSample>;

    /// Rendered per-interface usage table
    async fn usage_report(&self) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(default)]
    result: Vec<VectorSample>,
}

#[derive(Debug, Deserialize)]
struct VectorSample {
    #[serde(default)]
    metric: HashMap<String, String>,
    #[serde(default)]
    value: Vec<Value>,
}

impl VectorSample {
    fn label(&self, name: &str) -> Option<&str> {
        self.metric
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    fn sample_value(&self) -> Option<f64> {
        self.value.get(1).and_then(parse_sample_value)
    }
}

/// Prometheus HTTP API client scoped to the UPF pods of one namespace
#[derive(Clone)]
pub struct UpfMetricsClient {
    http: reqwest::Client,
    base_url: String,
    namespace: String,
    metrics: NwdafMetrics,
}

impl UpfMetricsClient {
    pub fn new(
        base_url: impl Into<String>,
        namespace: impl Into<String>,
        metrics: NwdafMetrics,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(QUERY_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            namespace: namespace.into(),
            metrics,
        })
    }

    fn selector(&self, metric: &str) -> String {
        format!(
            r#"{}{{namespace="{}",pod=~".*upf.*"}}"#,
            metric, self.namespace
        )
    }

    fn rate_of(&self, metric: &str) -> String {
        format!("rate({}[1m])", self.selector(metric))
    }

    /// Query used by the steering loop
    pub fn rate_query(&self) -> String {
        self.rate_of("container_network_receive_bytes_total")
    }

    async fn instant_query(&self, query: &str) -> Result<Vec<VectorSample>> {
        let start = Instant::now();
        let result = self.send_query(query).await;
        let status = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        self.metrics
            .observe_prometheus_query(status, start.elapsed().as_secs_f64());
        result
    }

    async fn send_query(&self, query: &str) -> Result<Vec<VectorSample>> {
        let url = format!("{}/api/v1/query", self.base_url);
        debug!(query = %query, "Querying Prometheus");

        let response = self
            .http
            .get(&url)
            .query(&[("query", query)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SteeringError::backend(status, body));
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| SteeringError::Parse(format!("invalid Prometheus response: {}", e)))?;

        if body.status != "success" {
            return Err(SteeringError::Parse(format!(
                "Prometheus query failed: status={} {}",
                body.status,
                body.error.unwrap_or_default()
            )));
        }

        let data = body
            .data
            .ok_or_else(|| SteeringError::Parse("missing data field in response".to_string()))?;
        Ok(data.result)
    }

    pub async fn query_rates(&self) -> Result<RateSample> {
        let samples = self.instant_query(&self.rate_query()).await?;

        let mut rates = RateSample::zeroed();
        for sample in &samples {
            let Some(pod) = sample.label("pod") else {
                continue;
            };
            let Some(bucket) = classify_pod(pod) else {
                continue;
            };
            match sample.sample_value() {
                Some(value) => rates.accumulate(bucket, value),
                None => warn!(pod = %pod, "Discarding series with unusable value"),
            }
        }

        Ok(rates)
    }

    /// Join receive/transmit totals and rates per (pod, interface)
    pub async fn query_all(&self) -> Result<String> {
        let queries = [
            (
                self.selector("container_network_receive_bytes_total"),
                UsageColumn::RxBytes,
            ),
            (
                self.selector("container_network_transmit_bytes_total"),
                UsageColumn::TxBytes,
            ),
            (
                self.rate_of("container_network_receive_bytes_total"),
                UsageColumn::RxRate,
            ),
            (
                self.rate_of("container_network_transmit_bytes_total"),
                UsageColumn::TxRate,
            ),
        ];

        let mut table = UsageTable::new();
        for (query, column) in &queries {
            let samples = self.instant_query(query).await?;
            for sample in &samples {
                let (Some(pod), Some(iface)) = (sample.label("pod"), sample.label("interface"))
                else {
                    continue;
                };
                table.record(pod, iface, *column, sample.sample_value());
            }
        }

        Ok(table.render())
    }
}

#[async_trait]
impl RateSource for UpfMetricsClient {
    async fn query_rates(&self) -> Result<RateSample> {
        UpfMetricsClient::query_rates(self).await
    }

    async fn usage_report(&self) -> Result<String> {
        self.query_all().await
    }
}
