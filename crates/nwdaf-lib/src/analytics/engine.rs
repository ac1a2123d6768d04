//! Analytics engine
//!
//! Runs a fixed cycle over the context statistics and produces per-subscription
//! notification payloads. Network and slice values are static placeholders.

use crate::context::{AnalyticsSubscription, NwdafContext};
use serde_json::{json, Map, Value};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// NF load above which an overload warning is logged
pub const NF_OVERLOAD_THRESHOLD: f64 = 0.8;

/// Analytics event types with a known payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    NfLoad,
    NetworkPerformance,
    SliceLoad,
}

impl FromStr for EventType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NF_LOAD" => Ok(EventType::NfLoad),
            "NETWORK_PERFORMANCE" => Ok(EventType::NetworkPerformance),
            "SLICE_LOAD" => Ok(EventType::SliceLoad),
            _ => Err(()),
        }
    }
}

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

pub struct AnalyticsEngine {
    context: Arc<NwdafContext>,
    period: Duration,
}

impl AnalyticsEngine {
    pub fn new(context: Arc<NwdafContext>, period: Duration) -> Self {
        Self { context, period }
    }

    pub fn context(&self) -> &Arc<NwdafContext> {
        &self.context
    }

    /// Run analytics cycles until shutdown
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        info!(period_secs = self.period.as_secs(), "Analytics engine started");

        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
                _ = shutdown.recv() => {
                    info!("Analytics engine stopped");
                    break;
                }
            }
        }
    }

    /// One analytics pass; returns the number of notifications produced
    pub async fn run_cycle(&self) -> usize {
        debug!("Running analytics cycle");

        self.analyze_nf_load().await;
        debug!("Analyzing network performance");
        debug!("Analyzing network slice performance");

        let mut delivered = 0;
        for sub in self.context.subscriptions().await {
            if let Some(payload) = self.generate_notification(&sub) {
                // Delivery is logged only; no HTTP callback is made
                debug!(
                    subscription_id = %sub.subscription_id,
                    notification_uri = %sub.notification_uri,
                    payload = %payload,
                    "Sending notification"
                );
                delivered += 1;
            }
        }
        delivered
    }

    async fn analyze_nf_load(&self) {
        for (nf_id, stats) in self.context.all_nf_statistics().await {
            debug!(nf_id = %nf_id, load = stats.load, "NF load");
            if stats.load > NF_OVERLOAD_THRESHOLD {
                warn!(nf_id = %nf_id, load = stats.load, "NF is experiencing high load");
            }
        }
    }

    /// Notification payload for one subscription; `None` for unknown event types
    pub fn generate_notification(&self, sub: &AnalyticsSubscription) -> Option<Value> {
        let Ok(event) = sub.event_type.parse::<EventType>() else {
            warn!(event_type = %sub.event_type, "Unknown event type");
            return None;
        };

        let payload = match event {
            EventType::NfLoad => json!({
                "eventType": sub.event_type,
                "timestamp": now_unix(),
                "nfLoadLevel": "NORMAL",
                "predictions": "STABLE",
            }),
            EventType::NetworkPerformance => json!({
                "eventType": sub.event_type,
                "timestamp": now_unix(),
                "latency": 10.5,
                "throughput": 1000.0,
                "packetLoss": 0.01,
            }),
            EventType::SliceLoad => json!({
                "eventType": sub.event_type,
                "timestamp": now_unix(),
                "sliceLoadLevel": "NORMAL",
                "resourceUsage": 0.45,
            }),
        };
        Some(payload)
    }

    /// On-demand analytics; `None` for unknown event types. The filter is
    /// accepted but not applied.
    pub async fn get_analytics(
        &self,
        event_type: &str,
        _filter: Option<&Map<String, Value>>,
    ) -> Option<Value> {
        info!(event_type = %event_type, "Getting analytics");

        match event_type.parse::<EventType>().ok()? {
            EventType::NfLoad => Some(json!({
                "nfStatistics": self.context.all_nf_statistics().await,
                "timestamp": now_unix(),
            })),
            EventType::NetworkPerformance => Some(json!({
                "averageLatency": 10.5,
                "averageThroughput": 1000.0,
                "packetLoss": 0.01,
                "timestamp": now_unix(),
            })),
            EventType::SliceLoad => Some(json!({
                "sliceLoad": "NORMAL",
                "resourceUsage": 0.45,
                "timestamp": now_unix(),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NfStatistics;
    use std::collections::HashMap;

    fn engine() -> AnalyticsEngine {
        AnalyticsEngine::new(Arc::new(NwdafContext::default()), Duration::from_secs(10))
    }

    fn subscription(id: &str, event_type: &str) -> AnalyticsSubscription {
        AnalyticsSubscription {
            subscription_id: id.to_string(),
            event_type: event_type.to_string(),
            consumer_nf_id: "pcf-1".to_string(),
            notification_uri: "http://pcf/notify".to_string(),
            analytics_filter: None,
            reporting_period: 0,
        }
    }

    #[tokio::test]
    async fn test_get_analytics_known_and_unknown() {
        let engine = engine();

        for event_type in ["NF_LOAD", "NETWORK_PERFORMANCE", "SLICE_LOAD"] {
            let data = engine.get_analytics(event_type, None).await;
            assert!(data.is_some(), "{} should produce data", event_type);
            assert!(data.unwrap()["timestamp"].is_i64());
        }
        assert!(engine.get_analytics("UNKNOWN", None).await.is_none());
    }

    #[tokio::test]
    async fn test_nf_load_includes_statistics() {
        let engine = engine();
        engine
            .context()
            .update_nf_statistics(
                "amf-1",
                NfStatistics {
                    nf_instance_id: "amf-1".to_string(),
                    nf_type: "AMF".to_string(),
                    load: 0.9,
                    timestamp: 1,
                    metrics: HashMap::new(),
                },
            )
            .await;

        let data = engine.get_analytics("NF_LOAD", None).await.unwrap();
        assert_eq!(data["nfStatistics"]["amf-1"]["load"], 0.9);
        assert_eq!(data["nfStatistics"]["amf-1"]["nfType"], "AMF");
    }

    #[tokio::test]
    async fn test_placeholder_values() {
        let engine = engine();
        let perf = engine
            .get_analytics("NETWORK_PERFORMANCE", None)
            .await
            .unwrap();
        assert_eq!(perf["averageLatency"], 10.5);
        assert_eq!(perf["averageThroughput"], 1000.0);
        assert_eq!(perf["packetLoss"], 0.01);

        let slice = engine.get_analytics("SLICE_LOAD", None).await.unwrap();
        assert_eq!(slice["sliceLoad"], "NORMAL");
        assert_eq!(slice["resourceUsage"], 0.45);
    }

    #[test]
    fn test_notification_payloads() {
        let engine = engine();

        let nf = engine
            .generate_notification(&subscription("a", "NF_LOAD"))
            .unwrap();
        assert_eq!(nf["nfLoadLevel"], "NORMAL");
        assert_eq!(nf["predictions"], "STABLE");

        let perf = engine
            .generate_notification(&subscription("b", "NETWORK_PERFORMANCE"))
            .unwrap();
        assert_eq!(perf["latency"], 10.5);

        let slice = engine
            .generate_notification(&subscription("c", "SLICE_LOAD"))
            .unwrap();
        assert_eq!(slice["sliceLoadLevel"], "NORMAL");

        assert!(engine
            .generate_notification(&subscription("d", "UE_MOBILITY"))
            .is_none());
    }

    #[tokio::test]
    async fn test_cycle_counts_known_subscriptions() {
        let engine = engine();
        let ctx = engine.context();
        ctx.add_subscription(subscription("a", "NF_LOAD")).await;
        ctx.add_subscription(subscription("b", "SLICE_LOAD")).await;
        ctx.add_subscription(subscription("c", "BOGUS")).await;

        assert_eq!(engine.run_cycle().await, 2);
    }

    #[tokio::test]
    async fn test_engine_stops_on_shutdown() {
        let engine = Arc::new(AnalyticsEngine::new(
            Arc::new(NwdafContext::default()),
            Duration::from_millis(10),
        ));
        let (tx, rx) = broadcast::channel(1);

        let handle = tokio::spawn(engine.run(rx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(3), handle)
            .await
            .expect("engine did not stop in time")
            .unwrap();
    }
}
