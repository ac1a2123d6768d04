//! Auto-steering control loop

use super::operation::{apply_steering, normalize_target, SteerOutcome};
use super::ControllerStatus;
use crate::config::ControllerConfig;
use crate::decision::{DecisionEngine, SteerClock};
use crate::error::{Result, SteeringError};
use crate::health::{Component, HealthRegistry};
use crate::llm::{LanguageModel, OllamaClient};
use crate::models::{policy_label, Anchor, RateSample, SteeringDecision};
use crate::nef::{NefClient, PolicyStore};
use crate::observability::{NwdafMetrics, StructuredLogger};
use crate::upf_metrics::{RateSource, UpfMetricsClient};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

/// Label used for the previous target on trigger counters
const FROM_UNTRACKED: &str = "none";

/// Periodically samples UPF traffic, asks the decision engine, and
/// reconciles the NEF policy.
pub struct SteeringController {
    config: ControllerConfig,
    rates: Arc<dyn RateSource>,
    policies: Arc<dyn PolicyStore>,
    engine: DecisionEngine,
    clock: Arc<SteerClock>,
    running: AtomicBool,
    metrics: NwdafMetrics,
    health: HealthRegistry,
    logger: StructuredLogger,
}

impl SteeringController {
    pub fn builder() -> SteeringControllerBuilder {
        SteeringControllerBuilder::new()
    }

    /// Wire the controller to the Prometheus, NEF and Ollama endpoints in `config`
    pub fn from_config(
        config: ControllerConfig,
        metrics: NwdafMetrics,
        health: HealthRegistry,
    ) -> Result<Self> {
        let rates = UpfMetricsClient::new(
            config.prometheus_url.clone(),
            config.upf_namespace.clone(),
            metrics.clone(),
        )?;
        let policies = NefClient::new(&config, metrics.clone())?;
        let model = OllamaClient::new(
            config.ollama_base.clone(),
            config.model_name.clone(),
            metrics.clone(),
        )?;

        SteeringControllerBuilder::new()
            .config(config)
            .rate_source(Arc::new(rates))
            .policy_store(Arc::new(policies))
            .model(Arc::new(model))
            .metrics(metrics)
            .health(health)
            .build()
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<SteerClock> {
        &self.clock
    }

    pub fn rate_source(&self) -> &Arc<dyn RateSource> {
        &self.rates
    }

    pub fn policy_store(&self) -> &Arc<dyn PolicyStore> {
        &self.policies
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawn the monitor task. Returns `None` when auto-steering is disabled.
    pub fn start(self: &Arc<Self>, shutdown: broadcast::Receiver<()>) -> Option<JoinHandle<()>> {
        if !self.config.enabled {
            info!("Auto-steering is disabled");
            return None;
        }

        self.running.store(true, Ordering::SeqCst);
        let controller = Arc::clone(self);
        Some(tokio::spawn(controller.run(shutdown)))
    }

    async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            threshold_bps = self.config.threshold_bps,
            cooldown_secs = self.config.cooldown.as_secs(),
            "LLM-driven auto-steering monitor started"
        );
        self.health.set_healthy(Component::SteeringController).await;

        let period = self.config.interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down auto-steering monitor");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        self.health
            .set_degraded(Component::SteeringController, "monitor stopped")
            .await;
    }

    /// One monitoring pass. Returns the decision, or `None` when the rates
    /// could not be read.
    pub async fn tick(&self) -> Option<SteeringDecision> {
        let rates = match self.rates.query_rates().await {
            Ok(rates) => {
                self.health.set_healthy(Component::MetricsBackend).await;
                rates
            }
            Err(e) => {
                error!(error = %e, "Monitor error querying traffic");
                self.metrics.inc_monitor_error("metrics");
                self.metrics.set_traffic_rates(&RateSample::zeroed());
                self.health
                    .set_degraded(Component::MetricsBackend, e.to_string())
                    .await;
                return None;
            }
        };
        self.metrics.set_traffic_rates(&rates);

        let policy = self.policies.active_policy().await;
        self.metrics.set_current_target(policy);
        self.logger.log_traffic_status(&rates, policy);

        let decision = self.engine.decide(&rates, policy).await;
        self.logger.log_decision(&decision);

        if let SteeringDecision::Steer { target, reason } = &decision {
            info!(
                from = policy_label(policy),
                target_dnai = %target,
                "LLM-driven auto-steering"
            );
            let outcome = self.execute(*target).await;
            if outcome.is_success() {
                self.clock.mark();
                self.metrics
                    .inc_auto_steer_trigger(FROM_UNTRACKED, *target, reason);
            }
            self.logger
                .log_steering_result(*target, outcome.is_success(), &outcome.to_string());
        }

        Some(decision)
    }

    /// Operator-requested steering; skips the decision engine and the cooldown
    pub async fn steer_manual(&self, input: &str) -> SteerOutcome {
        match normalize_target(input) {
            Ok(target) => self.execute(target).await,
            Err(raw) => {
                warn!(input = %input, "Rejected manual steering target");
                SteerOutcome::InvalidTarget(raw)
            }
        }
    }

    async fn execute(&self, target: Anchor) -> SteerOutcome {
        let outcome = apply_steering(self.policies.as_ref(), target).await;

        if outcome.is_success() {
            self.metrics.inc_steering_operation(target.dnai(), "success");
            self.metrics.set_current_target(Some(target));
            self.health.set_healthy(Component::Nef).await;
        } else {
            self.metrics.inc_steering_operation(target.dnai(), "failure");
            self.metrics.inc_monitor_error("nef");
            self.health
                .set_degraded(Component::Nef, outcome.to_string())
                .await;
        }

        outcome
    }

    pub fn status(&self) -> ControllerStatus {
        ControllerStatus {
            enabled: self.config.enabled,
            monitor_running: self.is_running(),
            interval_secs: self.config.interval.as_secs(),
            threshold_bps: self.config.threshold_bps,
            cooldown_secs: self.config.cooldown.as_secs(),
            seconds_since_last_steer: self.clock.since_last().map(|d| d.as_secs()),
            cooldown_remaining_secs: self.clock.remaining().as_secs(),
            model: self.config.model_name.clone(),
            nef_url: self.config.nef_url.clone(),
            prometheus_url: self.config.prometheus_url.clone(),
        }
    }
}

/// Builder for the steering controller
pub struct SteeringControllerBuilder {
    config: ControllerConfig,
    rates: Option<Arc<dyn RateSource>>,
    policies: Option<Arc<dyn PolicyStore>>,
    model: Option<Arc<dyn LanguageModel>>,
    metrics: Option<NwdafMetrics>,
    health: Option<HealthRegistry>,
}

impl SteeringControllerBuilder {
    pub fn new() -> Self {
        Self {
            config: ControllerConfig::default(),
            rates: None,
            policies: None,
            model: None,
            metrics: None,
            health: None,
        }
    }

    pub fn config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn rate_source(mut self, rates: Arc<dyn RateSource>) -> Self {
        self.rates = Some(rates);
        self
    }

    pub fn policy_store(mut self, policies: Arc<dyn PolicyStore>) -> Self {
        self.policies = Some(policies);
        self
    }

    pub fn model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn metrics(mut self, metrics: NwdafMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn build(self) -> Result<SteeringController> {
        let rates = self
            .rates
            .ok_or_else(|| SteeringError::Config("rate source is required".to_string()))?;
        let policies = self
            .policies
            .ok_or_else(|| SteeringError::Config("policy store is required".to_string()))?;
        let model = self
            .model
            .ok_or_else(|| SteeringError::Config("language model is required".to_string()))?;
        let metrics = self.metrics.unwrap_or_default();
        let health = self.health.unwrap_or_default();

        let clock = Arc::new(SteerClock::new(self.config.cooldown));
        let engine = DecisionEngine::new(
            model,
            Arc::clone(&clock),
            self.config.threshold_bps,
            metrics.clone(),
            health.clone(),
        );
        metrics.set_threshold(self.config.threshold_bps);

        Ok(SteeringController {
            config: self.config,
            rates,
            policies,
            engine,
            clock,
            running: AtomicBool::new(false),
            metrics,
            health,
            logger: StructuredLogger::new("NWDAF"),
        })
    }
}

impl Default for SteeringControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{MockPolicyStore, MockRates};
    use super::*;
    use crate::decision::testing::ScriptedModel;
    use crate::decision::{REASON_COOLDOWN, REASON_INVALID_JSON};
    use crate::health::ComponentStatus;
    use std::sync::atomic::Ordering;

    struct Harness {
        controller: Arc<SteeringController>,
        store: Arc<MockPolicyStore>,
        model: Arc<ScriptedModel>,
        metrics: NwdafMetrics,
        health: HealthRegistry,
    }

    fn harness(rates: MockRates, store: MockPolicyStore, model: ScriptedModel) -> Harness {
        let store = Arc::new(store);
        let model = Arc::new(model);
        let metrics = NwdafMetrics::new();
        let health = HealthRegistry::new();

        let controller = SteeringController::builder()
            .rate_source(Arc::new(rates))
            .policy_store(store.clone())
            .model(model.clone())
            .metrics(metrics.clone())
            .health(health.clone())
            .build()
            .unwrap();

        Harness {
            controller: Arc::new(controller),
            store,
            model,
            metrics,
            health,
        }
    }

    #[test]
    fn test_builder_requires_collaborators() {
        let result = SteeringController::builder().build();
        assert!(matches!(result, Err(SteeringError::Config(_))));
    }

    #[test]
    fn test_build_publishes_threshold() {
        let h = harness(
            MockRates::new(0.0, 0.0, 0.0),
            MockPolicyStore::new(),
            ScriptedModel::new(),
        );
        assert_eq!(h.metrics.threshold(), 100_000.0);
    }

    #[tokio::test]
    async fn test_quiet_network_takes_no_action() {
        let h = harness(
            MockRates::new(1_000.0, 1_000.0, 5_000.0),
            MockPolicyStore::new(),
            ScriptedModel::new().reply(r#"{"reasoning":"below threshold","decision":"none"}"#),
        );

        let decision = h.controller.tick().await.unwrap();

        assert!(!decision.should_steer());
        assert_eq!(h.store.mutations(), 0);
        assert_eq!(h.metrics.current_target(), 0);
        assert_eq!(h.metrics.traffic_rate("upfb"), 5_000.0);
        assert_eq!(h.controller.clock().last_steer(), None);
    }

    #[tokio::test]
    async fn test_hot_branch_steers_to_quieter_edge() {
        let h = harness(
            MockRates::new(20_000.0, 5_000.0, 150_000.0),
            MockPolicyStore::new(),
            ScriptedModel::new().reply(
                r#"UPFB is hot. {"reasoning":"upfb above threshold, edge2 lower","decision":"edge2"}"#,
            ),
        );

        let decision = h.controller.tick().await.unwrap();

        assert_eq!(decision.target(), Some(Anchor::Edge2));
        assert_eq!(h.store.anchors(), vec![Some(Anchor::Edge2)]);
        assert_eq!(h.metrics.current_target(), 2);
        assert_eq!(
            h.metrics.auto_steer_triggers(
                "none",
                Anchor::Edge2,
                "upfb above threshold, edge2 lower"
            ),
            1
        );
        assert_eq!(h.metrics.steering_operations("edge2", "success"), 1);
        assert!(h.controller.clock().last_steer().is_some());
    }

    #[tokio::test]
    async fn test_hot_anchor_rebalances() {
        let h = harness(
            MockRates::new(180_000.0, 60_000.0, 0.0),
            MockPolicyStore::new().with_policy(Anchor::Edge1),
            ScriptedModel::new().reply(r#"{"reasoning":"edge1 overloaded","decision":"edge2"}"#),
        );

        h.controller.tick().await.unwrap();

        assert!(h.model.prompts.lock().unwrap()[0].contains("- Active policy: edge1\n"));
        assert_eq!(h.store.anchors(), vec![Some(Anchor::Edge2)]);
        assert_eq!(h.store.deletes.load(Ordering::SeqCst), 1);
        assert_eq!(h.metrics.current_target(), 2);
    }

    #[tokio::test]
    async fn test_cooldown_blocks_model_and_nef() {
        let h = harness(
            MockRates::new(0.0, 0.0, 500_000.0),
            MockPolicyStore::new(),
            ScriptedModel::new().reply(r#"{"reasoning":"hot","decision":"edge1"}"#),
        );
        let marked = std::time::Instant::now() - Duration::from_secs(30);
        h.controller.clock().mark_at(marked);

        let decision = h.controller.tick().await.unwrap();

        assert_eq!(decision.reason(), REASON_COOLDOWN);
        assert_eq!(h.model.calls(), 0);
        assert_eq!(h.store.mutations(), 0);
        assert_eq!(h.controller.clock().last_steer(), Some(marked));
    }

    #[tokio::test]
    async fn test_garbage_reply_holds() {
        let h = harness(
            MockRates::new(0.0, 0.0, 500_000.0),
            MockPolicyStore::new(),
            ScriptedModel::new().reply("I'm not sure."),
        );

        let decision = h.controller.tick().await.unwrap();

        assert_eq!(decision.reason(), REASON_INVALID_JSON);
        assert_eq!(h.store.mutations(), 0);
        assert_eq!(h.metrics.auto_steer_triggers_total(), 0);
        assert_eq!(h.metrics.monitor_errors("decision"), 1);
    }

    #[tokio::test]
    async fn test_failed_install_keeps_cooldown_clear() {
        let h = harness(
            MockRates::new(0.0, 0.0, 500_000.0),
            MockPolicyStore::rejecting(),
            ScriptedModel::new().reply(r#"{"reasoning":"hot","decision":"edge1"}"#),
        );

        h.controller.tick().await.unwrap();

        assert_eq!(h.controller.clock().last_steer(), None);
        assert_eq!(h.metrics.steering_operations("edge1", "failure"), 1);
        assert_eq!(h.metrics.auto_steer_triggers_total(), 0);
        assert_eq!(
            h.health.status_of(Component::Nef).await,
            Some(ComponentStatus::Degraded)
        );
    }

    #[tokio::test]
    async fn test_metrics_failure_publishes_zero_rates() {
        let h = harness(
            MockRates::failing(),
            MockPolicyStore::new(),
            ScriptedModel::new(),
        );
        h.metrics.set_traffic_rates(&RateSample {
            edge1: 1.0,
            edge2: 2.0,
            upfb: 3.0,
            captured_at: std::time::Instant::now(),
        });

        assert!(h.controller.tick().await.is_none());

        assert_eq!(h.metrics.traffic_rate("edge1"), 0.0);
        assert_eq!(h.metrics.traffic_rate("upfb"), 0.0);
        assert_eq!(h.metrics.monitor_errors("metrics"), 1);
        assert_eq!(h.model.calls(), 0);
        assert_eq!(
            h.health.status_of(Component::MetricsBackend).await,
            Some(ComponentStatus::Degraded)
        );
    }

    #[tokio::test]
    async fn test_manual_steer_uppercase_target() {
        let h = harness(
            MockRates::new(0.0, 0.0, 0.0),
            MockPolicyStore::new().with_policy(Anchor::Edge2),
            ScriptedModel::new(),
        );
        h.controller
            .clock()
            .mark_at(std::time::Instant::now() - Duration::from_secs(1));

        let outcome = h.controller.steer_manual("EDGE1").await;
        let text = outcome.to_string();

        assert!(text.starts_with("✅"));
        assert!(text.contains("Target DNAI: edge1"));
        assert!(text.contains("AnchorUPF1"));
        assert!(text.contains("10.1.0.0/17"));
        assert_eq!(h.store.anchors(), vec![Some(Anchor::Edge1)]);
        assert_eq!(h.metrics.current_target(), 1);
        assert_eq!(h.model.calls(), 0);
    }

    #[tokio::test]
    async fn test_manual_steer_invalid_target() {
        let h = harness(
            MockRates::new(0.0, 0.0, 0.0),
            MockPolicyStore::new(),
            ScriptedModel::new(),
        );

        let outcome = h.controller.steer_manual("edge9").await;

        assert_eq!(outcome, SteerOutcome::InvalidTarget("edge9".to_string()));
        assert_eq!(h.store.mutations(), 0);
    }

    #[tokio::test]
    async fn test_manual_steer_rejected_by_nef() {
        let h = harness(
            MockRates::new(0.0, 0.0, 0.0),
            MockPolicyStore::rejecting(),
            ScriptedModel::new(),
        );

        let text = h.controller.steer_manual("edge2").await.to_string();
        assert_eq!(
            text,
            "❌ Failed to create subscription: HTTP 500 - internal error"
        );
    }

    #[tokio::test]
    async fn test_disabled_controller_does_not_start() {
        let store = Arc::new(MockPolicyStore::new());
        let controller = SteeringController::builder()
            .config(ControllerConfig {
                enabled: false,
                ..Default::default()
            })
            .rate_source(Arc::new(MockRates::new(0.0, 0.0, 0.0)))
            .policy_store(store)
            .model(Arc::new(ScriptedModel::new()))
            .build()
            .unwrap();
        let controller = Arc::new(controller);
        let (_tx, rx) = broadcast::channel(1);

        assert!(controller.start(rx).is_none());
        assert!(!controller.is_running());
        assert!(!controller.status().enabled);
    }

    #[tokio::test]
    async fn test_monitor_ticks_until_shutdown() {
        let store = Arc::new(MockPolicyStore::new());
        let model = Arc::new(ScriptedModel::new());
        let controller = SteeringController::builder()
            .rate_source(Arc::new(MockRates::new(0.0, 0.0, 0.0)))
            .policy_store(store)
            .model(model.clone())
            .interval(Duration::from_millis(10))
            .build()
            .unwrap();
        let controller = Arc::new(controller);
        let (tx, rx) = broadcast::channel(1);

        let handle = controller.start(rx).unwrap();
        assert!(controller.is_running());

        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        assert!(!controller.is_running());
        assert!(model.calls() >= 1);
    }

    /// Model whose first answer takes `first_delay`; it records when each call began
    struct SlowFirstModel {
        first_delay: Duration,
        started: std::sync::Mutex<Vec<Instant>>,
    }

    #[async_trait::async_trait]
    impl LanguageModel for SlowFirstModel {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            let first = {
                let mut started = self.started.lock().unwrap();
                started.push(Instant::now());
                started.len() == 1
            };
            if first {
                tokio::time::sleep(self.first_delay).await;
            }
            Ok(r#"{"reasoning":"idle","decision":"none"}"#.to_string())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrunning_tick_skips_missed_ticks() {
        let model = Arc::new(SlowFirstModel {
            first_delay: Duration::from_secs(25),
            started: std::sync::Mutex::new(Vec::new()),
        });
        let controller = SteeringController::builder()
            .rate_source(Arc::new(MockRates::new(0.0, 0.0, 0.0)))
            .policy_store(Arc::new(MockPolicyStore::new()))
            .model(model.clone())
            .interval(Duration::from_secs(10))
            .build()
            .unwrap();
        let controller = Arc::new(controller);
        let (tx, rx) = broadcast::channel(1);

        let origin = Instant::now();
        let handle = controller.start(rx).unwrap();

        tokio::time::sleep(Duration::from_secs(55)).await;
        tx.send(()).unwrap();
        handle.await.unwrap();

        let offsets: Vec<u64> = model
            .started
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.duration_since(origin).as_secs())
            .collect();
        // the 10s tick overran the 20s and 30s deadlines: one late pass at 35s,
        // then back on the 10s grid
        assert_eq!(offsets, vec![10, 35, 40, 50]);
    }

    #[tokio::test]
    async fn test_status_reports_cooldown() {
        let h = harness(
            MockRates::new(0.0, 0.0, 0.0),
            MockPolicyStore::new(),
            ScriptedModel::new(),
        );
        let status = h.controller.status();
        assert!(status.enabled);
        assert_eq!(status.seconds_since_last_steer, None);
        assert_eq!(status.cooldown_remaining_secs, 0);

        h.controller
            .clock()
            .mark_at(std::time::Instant::now() - Duration::from_secs(10));
        let status = h.controller.status();
        assert_eq!(status.seconds_since_last_steer, Some(10));
        assert!(status.cooldown_remaining_secs <= 50);
        assert!(status.cooldown_remaining_secs >= 49);
    }
}
