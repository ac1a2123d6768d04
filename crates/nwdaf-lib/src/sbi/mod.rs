//! Service-based interface
//!
//! Axum router exposing the analytics subscription and analytics info
//! services, manual steering, UPF usage, and the health and metrics endpoints.

mod handlers;
mod models;

pub use models::{
    AnalyticsRequest, AnalyticsResponse, ErrorBody, SubscriptionRequest, SubscriptionResponse,
};

use crate::analytics::AnalyticsEngine;
use crate::context::NwdafContext;
use crate::health::HealthRegistry;
use crate::observability::NwdafMetrics;
use crate::steering::SteeringController;
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;

pub const SUBSCRIPTIONS_PATH: &str = "/nnwdaf-eventssubscription/v1/subscriptions";
pub const SUBSCRIPTION_PATH: &str = "/nnwdaf-eventssubscription/v1/subscriptions/:subscription_id";
pub const ANALYTICS_PATH: &str = "/nnwdaf-analyticsinfo/v1/analytics";

/// Shared application state
pub struct AppState {
    pub context: Arc<NwdafContext>,
    pub analytics: Arc<AnalyticsEngine>,
    pub controller: Arc<SteeringController>,
    pub health: HealthRegistry,
    pub metrics: NwdafMetrics,
}

/// Records latency, count and in-flight gauge per matched route
async fn track_requests(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let method = req.method().to_string();

    state.metrics.request_started(&endpoint);
    let start = Instant::now();
    let response = next.run(req).await;
    state.metrics.request_finished(
        &endpoint,
        &method,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}

/// Create the SBI router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(SUBSCRIPTIONS_PATH, post(handlers::create_subscription))
        .route(
            SUBSCRIPTION_PATH,
            get(handlers::get_subscription)
                .put(handlers::update_subscription)
                .delete(handlers::delete_subscription),
        )
        .route(ANALYTICS_PATH, post(handlers::get_analytics))
        .route("/health", get(handlers::health))
        .route("/steer", post(handlers::steer))
        .route("/steering/status", get(handlers::steering_status))
        .route("/upf-metrics", get(handlers::upf_metrics))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/metrics", get(handlers::metrics))
        .route_layer(middleware::from_fn_with_state(state.clone(), track_requests))
        .with_state(state)
}
