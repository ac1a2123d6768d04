//! Observability infrastructure for the NWDAF
//!
//! Provides:
//! - Prometheus metrics (SBI requests, NEF and Prometheus calls, steering operations, traffic rates)
//! - Structured JSON logging with tracing

use crate::models::{policy_gauge_code, policy_label, Anchor, RateSample, SteeringDecision};
use prometheus::core::Collector;
use prometheus::proto;
use prometheus::{
    Encoder, Gauge, GaugeVec, Histogram, HistogramOpts, HistogramVec, IntCounterVec, IntGauge,
    IntGaugeVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Buckets for SBI request latency (in seconds)
const REQUEST_LATENCY_BUCKETS: &[f64] = &[0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

/// Buckets for upstream call latency (in seconds)
const UPSTREAM_LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

/// Buckets for LLM generation latency (in seconds)
const LLM_LATENCY_BUCKETS: &[f64] = &[0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0];

struct MetricsInner {
    registry: Registry,
    request_latency_seconds: HistogramVec,
    requests_total: IntCounterVec,
    active_requests: IntGaugeVec,
    nef_requests_total: IntCounterVec,
    nef_latency_seconds: HistogramVec,
    prometheus_queries_total: IntCounterVec,
    prometheus_latency_seconds: Histogram,
    llm_latency_seconds: Histogram,
    steering_operations_total: IntCounterVec,
    current_target: IntGauge,
    auto_steer_triggers_total: IntCounterVec,
    upf_traffic_rate_bps: GaugeVec,
    auto_steer_threshold_bps: Gauge,
    monitor_errors_total: IntCounterVec,
}

impl MetricsInner {
    fn new(registry: Registry) -> prometheus::Result<Self> {
        let inner = Self {
            request_latency_seconds: HistogramVec::new(
                HistogramOpts::new(
                    "traffic_steering_request_latency_seconds",
                    "Request latency in seconds",
                )
                .buckets(REQUEST_LATENCY_BUCKETS.to_vec()),
                &["endpoint", "method"],
            )?,
            requests_total: IntCounterVec::new(
                Opts::new("traffic_steering_requests_total", "Total number of requests"),
                &["endpoint", "method", "status"],
            )?,
            active_requests: IntGaugeVec::new(
                Opts::new(
                    "traffic_steering_active_requests",
                    "Number of currently active requests",
                ),
                &["endpoint"],
            )?,
            nef_requests_total: IntCounterVec::new(
                Opts::new("traffic_steering_nef_requests_total", "Total NEF API requests"),
                &["operation", "status"],
            )?,
            nef_latency_seconds: HistogramVec::new(
                HistogramOpts::new(
                    "traffic_steering_nef_latency_seconds",
                    "NEF API latency in seconds",
                )
                .buckets(UPSTREAM_LATENCY_BUCKETS.to_vec()),
                &["operation"],
            )?,
            prometheus_queries_total: IntCounterVec::new(
                Opts::new(
                    "traffic_steering_prometheus_queries_total",
                    "Total Prometheus queries",
                ),
                &["status"],
            )?,
            prometheus_latency_seconds: Histogram::with_opts(
                HistogramOpts::new(
                    "traffic_steering_prometheus_latency_seconds",
                    "Prometheus query latency in seconds",
                )
                .buckets(UPSTREAM_LATENCY_BUCKETS.to_vec()),
            )?,
            llm_latency_seconds: Histogram::with_opts(
                HistogramOpts::new(
                    "traffic_steering_llm_latency_seconds",
                    "LLM generation latency in seconds",
                )
                .buckets(LLM_LATENCY_BUCKETS.to_vec()),
            )?,
            steering_operations_total: IntCounterVec::new(
                Opts::new(
                    "traffic_steering_operations_total",
                    "Total steering operations",
                ),
                &["target", "status"],
            )?,
            current_target: IntGauge::new(
                "traffic_steering_current_target",
                "Current steering target (1=edge1, 2=edge2, 0=none)",
            )?,
            auto_steer_triggers_total: IntCounterVec::new(
                Opts::new(
                    "traffic_steering_auto_steer_triggers_total",
                    "Auto-steering triggers",
                ),
                &["from_target", "to_target", "reason"],
            )?,
            upf_traffic_rate_bps: GaugeVec::new(
                Opts::new(
                    "traffic_steering_upf_traffic_rate_bps",
                    "Current traffic rate for each UPF in bytes/sec",
                ),
                &["upf"],
            )?,
            auto_steer_threshold_bps: Gauge::new(
                "traffic_steering_auto_steer_threshold_bps",
                "Auto-steering threshold in bytes/sec",
            )?,
            monitor_errors_total: IntCounterVec::new(
                Opts::new(
                    "traffic_steering_monitor_errors_total",
                    "Auto-steering monitor errors by stage",
                ),
                &["stage"],
            )?,
            registry,
        };

        inner.registry.register(Box::new(inner.request_latency_seconds.clone()))?;
        inner.registry.register(Box::new(inner.requests_total.clone()))?;
        inner.registry.register(Box::new(inner.active_requests.clone()))?;
        inner.registry.register(Box::new(inner.nef_requests_total.clone()))?;
        inner.registry.register(Box::new(inner.nef_latency_seconds.clone()))?;
        inner.registry.register(Box::new(inner.prometheus_queries_total.clone()))?;
        inner.registry.register(Box::new(inner.prometheus_latency_seconds.clone()))?;
        inner.registry.register(Box::new(inner.llm_latency_seconds.clone()))?;
        inner.registry.register(Box::new(inner.steering_operations_total.clone()))?;
        inner.registry.register(Box::new(inner.current_target.clone()))?;
        inner.registry.register(Box::new(inner.auto_steer_triggers_total.clone()))?;
        inner.registry.register(Box::new(inner.upf_traffic_rate_bps.clone()))?;
        inner.registry.register(Box::new(inner.auto_steer_threshold_bps.clone()))?;
        inner.registry.register(Box::new(inner.monitor_errors_total.clone()))?;

        Ok(inner)
    }
}

/// NWDAF metrics for Prometheus exposition
///
/// Each handle owns its registry; clones share the same underlying metrics,
/// so independent instances can run side by side in tests.
#[derive(Clone)]
pub struct NwdafMetrics {
    inner: Arc<MetricsInner>,
}

impl Default for NwdafMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl NwdafMetrics {
    /// Create a metrics handle backed by a fresh registry
    pub fn new() -> Self {
        let inner = MetricsInner::new(Registry::new())
            .expect("Failed to register traffic steering metrics");
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Render all metrics in the Prometheus text format
    pub fn encode_text(&self) -> prometheus::Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.inner.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }

    /// Record the start of an SBI request
    pub fn request_started(&self, endpoint: &str) {
        self.inner
            .active_requests
            .with_label_values(&[endpoint])
            .inc();
    }

    /// Record the completion of an SBI request
    pub fn request_finished(&self, endpoint: &str, method: &str, status: u16, secs: f64) {
        self.inner
            .active_requests
            .with_label_values(&[endpoint])
            .dec();
        self.inner
            .request_latency_seconds
            .with_label_values(&[endpoint, method])
            .observe(secs);
        self.inner
            .requests_total
            .with_label_values(&[endpoint, method, &status.to_string()])
            .inc();
    }

    pub fn observe_nef_request(&self, operation: &str, status: &str, secs: f64) {
        self.inner
            .nef_requests_total
            .with_label_values(&[operation, status])
            .inc();
        self.inner
            .nef_latency_seconds
            .with_label_values(&[operation])
            .observe(secs);
    }

    pub fn observe_prometheus_query(&self, status: &str, secs: f64) {
        self.inner
            .prometheus_queries_total
            .with_label_values(&[status])
            .inc();
        self.inner.prometheus_latency_seconds.observe(secs);
    }

    pub fn observe_llm_latency(&self, secs: f64) {
        self.inner.llm_latency_seconds.observe(secs);
    }

    pub fn inc_steering_operation(&self, target: &str, status: &str) {
        self.inner
            .steering_operations_total
            .with_label_values(&[target, status])
            .inc();
    }

    pub fn set_current_target(&self, policy: Option<Anchor>) {
        self.inner.current_target.set(policy_gauge_code(policy));
    }

    pub fn inc_auto_steer_trigger(&self, from: &str, to: Anchor, reason: &str) {
        self.inner
            .auto_steer_triggers_total
            .with_label_values(&[from, to.dnai(), reason])
            .inc();
    }

    pub fn set_traffic_rates(&self, rates: &RateSample) {
        for (upf, bytes_per_sec) in rates.buckets() {
            self.inner
                .upf_traffic_rate_bps
                .with_label_values(&[upf])
                .set(bytes_per_sec);
        }
    }

    pub fn set_threshold(&self, bytes_per_sec: f64) {
        self.inner.auto_steer_threshold_bps.set(bytes_per_sec);
    }

    pub fn inc_monitor_error(&self, stage: &str) {
        self.inner
            .monitor_errors_total
            .with_label_values(&[stage])
            .inc();
    }

    pub fn current_target(&self) -> i64 {
        self.inner.current_target.get()
    }

    // Read-back getters look series up in the collected families so that
    // reading an unrecorded label set does not create it.

    pub fn auto_steer_triggers(&self, from: &str, to: Anchor, reason: &str) -> u64 {
        counter_value(
            &self.inner.auto_steer_triggers_total,
            &[("from_target", from), ("to_target", to.dnai()), ("reason", reason)],
        )
    }

    /// Sum of trigger counts across every label combination
    pub fn auto_steer_triggers_total(&self) -> u64 {
        self.inner
            .auto_steer_triggers_total
            .collect()
            .iter()
            .flat_map(|family| family.get_metric())
            .map(|metric| metric.get_counter().get_value() as u64)
            .sum()
    }

    pub fn steering_operations(&self, target: &str, status: &str) -> u64 {
        counter_value(
            &self.inner.steering_operations_total,
            &[("target", target), ("status", status)],
        )
    }

    pub fn traffic_rate(&self, upf: &str) -> f64 {
        find_series(&self.inner.upf_traffic_rate_bps, &[("upf", upf)])
            .map(|metric| metric.get_gauge().get_value())
            .unwrap_or(0.0)
    }

    pub fn threshold(&self) -> f64 {
        self.inner.auto_steer_threshold_bps.get()
    }

    pub fn nef_requests(&self, operation: &str, status: &str) -> u64 {
        counter_value(
            &self.inner.nef_requests_total,
            &[("operation", operation), ("status", status)],
        )
    }

    pub fn prometheus_queries(&self, status: &str) -> u64 {
        counter_value(&self.inner.prometheus_queries_total, &[("status", status)])
    }

    pub fn monitor_errors(&self, stage: &str) -> u64 {
        counter_value(&self.inner.monitor_errors_total, &[("stage", stage)])
    }

    pub fn requests(&self, endpoint: &str, method: &str, status: u16) -> u64 {
        let status = status.to_string();
        counter_value(
            &self.inner.requests_total,
            &[("endpoint", endpoint), ("method", method), ("status", &status)],
        )
    }
}

/// Collected series whose labels match every `(name, value)` pair
fn find_series(collector: &dyn Collector, labels: &[(&str, &str)]) -> Option<proto::Metric> {
    collector
        .collect()
        .into_iter()
        .flat_map(|family| family.get_metric().to_vec())
        .find(|metric| {
            labels.iter().all(|(name, value)| {
                metric
                    .get_label()
                    .iter()
                    .any(|pair| pair.get_name() == *name && pair.get_value() == *value)
            })
        })
}

fn counter_value(counter: &IntCounterVec, labels: &[(&str, &str)]) -> u64 {
    find_series(counter, labels)
        .map(|metric| metric.get_counter().get_value() as u64)
        .unwrap_or(0)
}

/// Structured logger for NWDAF events
///
/// Provides consistent JSON-formatted logging for the steering loop and
/// the service lifecycle.
#[derive(Clone)]
pub struct StructuredLogger {
    nf_name: String,
}

impl StructuredLogger {
    pub fn new(nf_name: impl Into<String>) -> Self {
        Self {
            nf_name: nf_name.into(),
        }
    }

    pub fn log_startup(&self, version: &str, sbi_addr: &str) {
        info!(
            event = "nwdaf_started",
            nf = %self.nf_name,
            version = %version,
            sbi_addr = %sbi_addr,
            "NWDAF started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "nwdaf_shutdown",
            nf = %self.nf_name,
            reason = %reason,
            "NWDAF shutting down"
        );
    }

    /// One-line traffic status per controller tick
    pub fn log_traffic_status(&self, rates: &RateSample, policy: Option<Anchor>) {
        info!(
            event = "traffic_status",
            nf = %self.nf_name,
            edge1_kbps = rates.edge1 / 1000.0,
            edge2_kbps = rates.edge2 / 1000.0,
            upfb_kbps = rates.upfb / 1000.0,
            policy = policy_label(policy),
            "Traffic rates - edge1: {:.1} KB/s, edge2: {:.1} KB/s, upfb: {:.1} KB/s (policy: {})",
            rates.edge1 / 1000.0,
            rates.edge2 / 1000.0,
            rates.upfb / 1000.0,
            policy_label(policy)
        );
    }

    pub fn log_decision(&self, decision: &SteeringDecision) {
        match decision {
            SteeringDecision::Steer { target, reason } => {
                info!(
                    event = "steering_decision",
                    nf = %self.nf_name,
                    steer = true,
                    target = %target,
                    reasoning = %reason,
                    "LLM requested steering"
                );
            }
            SteeringDecision::Hold { reason } => {
                info!(
                    event = "steering_decision",
                    nf = %self.nf_name,
                    steer = false,
                    reasoning = %reason,
                    "No steering needed"
                );
            }
        }
    }

    pub fn log_steering_result(&self, target: Anchor, success: bool, detail: &str) {
        if success {
            info!(
                event = "auto_steer_applied",
                nf = %self.nf_name,
                target = %target,
                upf = target.upf_name(),
                "Auto-steer successful, now routing through {}",
                target
            );
        } else {
            warn!(
                event = "auto_steer_failed",
                nf = %self.nf_name,
                target = %target,
                detail = %detail,
                "Auto-steer failed"
            );
        }
    }
}
