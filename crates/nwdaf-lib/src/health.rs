//! Component health behind `/healthz` and `/readyz`
//!
//! Upstream dependencies (Prometheus, NEF, LLM) can only degrade the NWDAF:
//! the steering loop keeps running through their outages. Only the SBI
//! server and the steering controller can make it unhealthy or unready.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    /// Healthy or degraded
    pub fn is_operational(&self) -> bool {
        !matches!(self, ComponentStatus::Unhealthy)
    }
}

/// Parts of the NWDAF whose health is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    /// Prometheus serving UPF traffic counters
    MetricsBackend,
    Nef,
    Llm,
    SteeringController,
    Sbi,
}

impl Component {
    pub const ALL: [Component; 5] = [
        Component::MetricsBackend,
        Component::Nef,
        Component::Llm,
        Component::SteeringController,
        Component::Sbi,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Component::MetricsBackend => "metrics_backend",
            Component::Nef => "nef",
            Component::Llm => "llm",
            Component::SteeringController => "steering_controller",
            Component::Sbi => "sbi",
        }
    }

    /// External service the NWDAF calls out to
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Component::MetricsBackend | Component::Nef | Component::Llm
        )
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reported state of one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Reports in a row that were not healthy
    #[serde(default)]
    pub consecutive_failures: u32,
    /// Unix time the status last changed
    pub since: i64,
}

impl ComponentHealth {
    fn healthy() -> Self {
        Self {
            status: ComponentStatus::Healthy,
            message: None,
            consecutive_failures: 0,
            since: chrono::Utc::now().timestamp(),
        }
    }

    /// Apply a new report, keeping `since` while the status is unchanged
    fn transition(&mut self, status: ComponentStatus, message: Option<String>) {
        if status != self.status {
            self.since = chrono::Utc::now().timestamp();
        }
        self.consecutive_failures = match status {
            ComponentStatus::Healthy => 0,
            _ => self.consecutive_failures.saturating_add(1),
        };
        self.status = status;
        self.message = message;
    }
}

/// Body of `/healthz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<String, ComponentHealth>,
}

/// Body of `/readyz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Default)]
struct HealthState {
    components: BTreeMap<Component, ComponentHealth>,
    started: bool,
}

impl HealthState {
    /// Upstream failures cap at degraded; internal failures pass through
    fn overall(&self) -> ComponentStatus {
        self.components
            .iter()
            .map(|(component, health)| match health.status {
                ComponentStatus::Unhealthy if component.is_upstream() => {
                    ComponentStatus::Degraded
                }
                status => status,
            })
            .fold(ComponentStatus::Healthy, |worst, status| {
                match (worst, status) {
                    (ComponentStatus::Unhealthy, _) | (_, ComponentStatus::Unhealthy) => {
                        ComponentStatus::Unhealthy
                    }
                    (ComponentStatus::Degraded, _) | (_, ComponentStatus::Degraded) => {
                        ComponentStatus::Degraded
                    }
                    _ => ComponentStatus::Healthy,
                }
            })
    }

    fn failed_internal(&self) -> Option<Component> {
        self.components
            .iter()
            .find(|(component, health)| {
                !component.is_upstream() && health.status == ComponentStatus::Unhealthy
            })
            .map(|(component, _)| *component)
    }
}

/// Shared, cloneable health registry
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    state: Arc<RwLock<HealthState>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report every component as healthy
    pub async fn register_all(&self) {
        let mut state = self.state.write().await;
        for component in Component::ALL {
            state
                .components
                .entry(component)
                .or_insert_with(ComponentHealth::healthy);
        }
    }

    async fn report(&self, component: Component, status: ComponentStatus, message: Option<String>) {
        let mut state = self.state.write().await;
        state
            .components
            .entry(component)
            .or_insert_with(ComponentHealth::healthy)
            .transition(status, message);
    }

    pub async fn set_healthy(&self, component: Component) {
        self.report(component, ComponentStatus::Healthy, None).await;
    }

    pub async fn set_degraded(&self, component: Component, message: impl Into<String>) {
        self.report(component, ComponentStatus::Degraded, Some(message.into()))
            .await;
    }

    pub async fn set_unhealthy(&self, component: Component, message: impl Into<String>) {
        self.report(component, ComponentStatus::Unhealthy, Some(message.into()))
            .await;
    }

    /// Mark startup as complete (or shutdown as begun)
    pub async fn set_ready(&self, ready: bool) {
        self.state.write().await.started = ready;
    }

    pub async fn status_of(&self, component: Component) -> Option<ComponentStatus> {
        self.state
            .read()
            .await
            .components
            .get(&component)
            .map(|h| h.status)
    }

    pub async fn component(&self, component: Component) -> Option<ComponentHealth> {
        self.state.read().await.components.get(&component).cloned()
    }

    pub async fn health(&self) -> HealthResponse {
        let state = self.state.read().await;
        HealthResponse {
            status: state.overall(),
            components: state
                .components
                .iter()
                .map(|(component, health)| (component.name().to_string(), health.clone()))
                .collect(),
        }
    }

    /// Ready once started, as long as the SBI and controller are not unhealthy
    pub async fn readiness(&self) -> ReadinessResponse {
        let state = self.state.read().await;

        let reason = if !state.started {
            Some("NWDAF not yet initialized".to_string())
        } else {
            state
                .failed_internal()
                .map(|component| format!("{} is unhealthy", component))
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason,
        }
    }
}
