//! LLM-backed steering decisions
//!
//! The steering rules live in the prompt; nothing here re-checks them. The
//! engine only gates on the cooldown and turns the model's reply into a
//! [`SteeringDecision`].

use crate::health::{Component, HealthRegistry};
use crate::llm::LanguageModel;
use crate::models::{Anchor, RateSample, SteeringDecision};
use crate::observability::NwdafMetrics;
use serde::Deserialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{error, info};

pub const REASON_COOLDOWN: &str = "cooldown";
pub const REASON_ERROR: &str = "error";
pub const REASON_INVALID_JSON: &str = "invalid_json";
pub const REASON_JSON_PARSE_ERROR: &str = "json_parse_error";

/// Time of the last confirmed install, and the cooldown measured from it
#[derive(Debug)]
pub struct SteerClock {
    last: Mutex<Option<Instant>>,
    cooldown: Duration,
}

impl SteerClock {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            last: Mutex::new(None),
            cooldown,
        }
    }

    fn guard(&self) -> MutexGuard<'_, Option<Instant>> {
        self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Record a confirmed install now
    pub fn mark(&self) {
        self.mark_at(Instant::now());
    }

    pub fn mark_at(&self, at: Instant) {
        *self.guard() = Some(at);
    }

    pub fn last_steer(&self) -> Option<Instant> {
        *self.guard()
    }

    pub fn since_last(&self) -> Option<Duration> {
        self.last_steer().map(|at| at.elapsed())
    }

    /// Time left before the next decision may prompt the model
    pub fn remaining(&self) -> Duration {
        match self.since_last() {
            Some(elapsed) => self.cooldown.saturating_sub(elapsed),
            None => Duration::ZERO,
        }
    }

    pub fn in_cooldown(&self) -> bool {
        !self.remaining().is_zero()
    }
}

/// Render the decision prompt. Rates and threshold are shown in KB/s.
pub fn build_prompt(rates: &RateSample, policy: Option<Anchor>, threshold_bps: f64) -> String {
    let policy = policy.map(|a| a.dnai()).unwrap_or("");
    format!(
        r#"You are a 5G traffic steering expert. Based on these metrics, decide if traffic steering is needed.

METRICS:
- Edge1 traffic: {:.2} KB/s
- Edge2 traffic: {:.2} KB/s
- UPFB traffic: {:.2} KB/s
- Active policy: {}
- Threshold: {:.2} KB/s

RULES:
1. If no policy exists and UPFB > threshold: steer to the edge with LOWER traffic (if equal, choose edge1)
2. If policy exists and that edge > threshold: rebalance to the other edge (if it has 20% less traffic)
3. Otherwise: no action needed

Respond with a JSON object:
{{
  "reasoning": "Explain your logic here step-by-step...",
  "decision": "edge1" | "edge2" | "none"
}}

IMPORTANT: If UPFB traffic exceeds threshold and no policy exists, you MUST choose edge1 or edge2, NOT none!

Your JSON response:"#,
        rates.edge1 / 1000.0,
        rates.edge2 / 1000.0,
        rates.upfb / 1000.0,
        policy,
        threshold_bps / 1000.0
    )
}

#[derive(Deserialize)]
struct ModelReply {
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    decision: Option<String>,
}

/// Interpret a model reply.
///
/// The JSON object is taken from the first `{` to the last `}`, so prose
/// around a single object is ignored.
pub fn extract_decision(reply: &str) -> SteeringDecision {
    let (Some(start), Some(end)) = (reply.find('{'), reply.rfind('}')) else {
        return SteeringDecision::hold(REASON_INVALID_JSON);
    };
    if end < start {
        return SteeringDecision::hold(REASON_INVALID_JSON);
    }

    let parsed: ModelReply = match serde_json::from_str(&reply[start..=end]) {
        Ok(parsed) => parsed,
        Err(_) => return SteeringDecision::hold(REASON_JSON_PARSE_ERROR),
    };

    let reasoning = parsed.reasoning.unwrap_or_default();
    let choice = parsed.decision.unwrap_or_default().trim().to_lowercase();
    match choice.as_str() {
        "edge1" => SteeringDecision::steer(Anchor::Edge1, reasoning),
        "edge2" => SteeringDecision::steer(Anchor::Edge2, reasoning),
        _ => SteeringDecision::hold(reasoning),
    }
}

/// Cooldown-gated decision maker backed by a language model
pub struct DecisionEngine {
    model: Arc<dyn LanguageModel>,
    clock: Arc<SteerClock>,
    threshold_bps: f64,
    metrics: NwdafMetrics,
    health: HealthRegistry,
}

impl DecisionEngine {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        clock: Arc<SteerClock>,
        threshold_bps: f64,
        metrics: NwdafMetrics,
        health: HealthRegistry,
    ) -> Self {
        Self {
            model,
            clock,
            threshold_bps,
            metrics,
            health,
        }
    }

    pub fn clock(&self) -> &Arc<SteerClock> {
        &self.clock
    }

    pub async fn decide(&self, rates: &RateSample, policy: Option<Anchor>) -> SteeringDecision {
        if self.clock.in_cooldown() {
            return SteeringDecision::hold(REASON_COOLDOWN);
        }

        let prompt = build_prompt(rates, policy, self.threshold_bps);
        info!("Asking LLM for steering decision");

        let reply = match self.model.generate(&prompt).await {
            Ok(reply) => {
                self.health.set_healthy(Component::Llm).await;
                reply
            }
            Err(e) => {
                error!(error = %e, "LLM decision error");
                self.metrics.inc_monitor_error("llm");
                self.health
                    .set_degraded(Component::Llm, e.to_string())
                    .await;
                return SteeringDecision::hold(REASON_ERROR);
            }
        };

        let decision = extract_decision(&reply);
        if matches!(decision.reason(), REASON_INVALID_JSON | REASON_JSON_PARSE_ERROR)
            && !decision.should_steer()
        {
            error!(reason = decision.reason(), reply = %reply, "LLM reply was not usable");
            self.metrics.inc_monitor_error("decision");
        }
        decision
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedModel;
    use super::*;
    use crate::health::ComponentStatus;

    fn rates(edge1: f64, edge2: f64, upfb: f64) -> RateSample {
        RateSample {
            edge1,
            edge2,
            upfb,
            captured_at: Instant::now(),
        }
    }

    fn engine(model: Arc<ScriptedModel>, clock: Arc<SteerClock>) -> (DecisionEngine, HealthRegistry) {
        let health = HealthRegistry::new();
        let engine = DecisionEngine::new(
            model,
            clock,
            100_000.0,
            NwdafMetrics::new(),
            health.clone(),
        );
        (engine, health)
    }

    #[test]
    fn test_prompt_renders_kbps_and_empty_policy() {
        let prompt = build_prompt(&rates(20_000.0, 5_000.0, 150_000.0), None, 100_000.0);
        assert!(prompt.contains("- Edge1 traffic: 20.00 KB/s"));
        assert!(prompt.contains("- Edge2 traffic: 5.00 KB/s"));
        assert!(prompt.contains("- UPFB traffic: 150.00 KB/s"));
        assert!(prompt.contains("- Active policy: \n"));
        assert!(prompt.contains("- Threshold: 100.00 KB/s"));
        assert!(prompt.contains("(if it has 20% less traffic)"));
        assert!(prompt.ends_with("Your JSON response:"));
    }

    #[test]
    fn test_prompt_names_active_policy() {
        let prompt = build_prompt(&rates(0.0, 0.0, 0.0), Some(Anchor::Edge1), 100_000.0);
        assert!(prompt.contains("- Active policy: edge1\n"));
    }

    #[test]
    fn test_extract_decision_from_surrounding_prose() {
        let bare = r#"{"reasoning":"edge2 is quieter","decision":"edge2"}"#;
        let wrapped = format!("Sure! Here it is:\n```json\n{}\n```\nThanks.", bare);

        assert_eq!(extract_decision(bare), extract_decision(&wrapped));
        assert_eq!(
            extract_decision(bare),
            SteeringDecision::steer(Anchor::Edge2, "edge2 is quieter")
        );
    }

    #[test]
    fn test_extract_decision_normalizes_case() {
        let decision = extract_decision(r#"{"reasoning":"r","decision":"  EDGE1 "}"#);
        assert_eq!(decision.target(), Some(Anchor::Edge1));
    }

    #[test]
    fn test_extract_decision_reason_codes() {
        assert_eq!(extract_decision("I'm not sure.").reason(), REASON_INVALID_JSON);
        assert_eq!(extract_decision("} then {").reason(), REASON_INVALID_JSON);
        assert_eq!(
            extract_decision("{decision: edge1}").reason(),
            REASON_JSON_PARSE_ERROR
        );

        let none = extract_decision(r#"{"reasoning":"all quiet","decision":"none"}"#);
        assert!(!none.should_steer());
        assert_eq!(none.reason(), "all quiet");

        let unknown = extract_decision(r#"{"reasoning":"x","decision":"edge3"}"#);
        assert!(!unknown.should_steer());
    }

    #[test]
    fn test_clock_cooldown_window() {
        let clock = SteerClock::new(Duration::from_secs(60));
        assert!(!clock.in_cooldown());
        assert_eq!(clock.since_last(), None);

        clock.mark_at(Instant::now() - Duration::from_secs(30));
        assert!(clock.in_cooldown());
        assert!(clock.remaining() <= Duration::from_secs(30));

        clock.mark_at(Instant::now() - Duration::from_secs(61));
        assert!(!clock.in_cooldown());
    }

    #[test]
    fn test_zero_cooldown_never_blocks() {
        let clock = SteerClock::new(Duration::ZERO);
        clock.mark();
        assert!(!clock.in_cooldown());
    }

    #[tokio::test]
    async fn test_cooldown_skips_model() {
        let model = Arc::new(ScriptedModel::new());
        let clock = Arc::new(SteerClock::new(Duration::from_secs(60)));
        clock.mark_at(Instant::now() - Duration::from_secs(30));
        let (engine, _) = engine(model.clone(), clock);

        let decision = engine.decide(&rates(0.0, 0.0, 500_000.0), None).await;
        assert_eq!(decision, SteeringDecision::hold(REASON_COOLDOWN));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_model_error_degrades_llm() {
        let model = Arc::new(ScriptedModel::new().fail("timeout"));
        let clock = Arc::new(SteerClock::new(Duration::from_secs(60)));
        let (engine, health) = engine(model.clone(), clock);

        let decision = engine.decide(&rates(0.0, 0.0, 0.0), None).await;
        assert_eq!(decision, SteeringDecision::hold(REASON_ERROR));
        assert_eq!(
            health.status_of(Component::Llm).await,
            Some(ComponentStatus::Degraded)
        );
    }

    #[tokio::test]
    async fn test_decide_steers_on_model_choice() {
        let model = Arc::new(
            ScriptedModel::new().reply(r#"{"reasoning":"upfb hot","decision":"edge2"}"#),
        );
        let clock = Arc::new(SteerClock::new(Duration::from_secs(60)));
        let (engine, _) = engine(model.clone(), clock);

        let decision = engine
            .decide(&rates(20_000.0, 5_000.0, 150_000.0), None)
            .await;
        assert_eq!(decision, SteeringDecision::steer(Anchor::Edge2, "upfb hot"));
        assert_eq!(model.calls(), 1);
        assert!(model.prompts.lock().unwrap()[0].contains("UPFB traffic: 150.00 KB/s"));
    }
}
