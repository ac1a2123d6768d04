//! SBI request handlers

use super::models::{
    AnalyticsRequest, AnalyticsResponse, ErrorBody, SubscriptionRequest, SubscriptionResponse,
};
use super::AppState;
use crate::context::AnalyticsSubscription;
use crate::health::ComponentStatus;
use crate::steering::SteerOutcome;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

const INVALID_BODY: &str = "Invalid request body";
const NOT_FOUND: &str = "Subscription not found";

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorBody::new(message))).into_response()
}

fn parse_subscription(
    body: Result<Json<SubscriptionRequest>, JsonRejection>,
) -> Result<SubscriptionRequest, Response> {
    let Json(req) = body.map_err(|e| {
        error!(error = %e, "Invalid request body");
        error_response(StatusCode::BAD_REQUEST, INVALID_BODY)
    })?;
    req.validate().map_err(|e| {
        error!(error = %e, "Invalid request body");
        error_response(StatusCode::BAD_REQUEST, INVALID_BODY)
    })?;
    Ok(req)
}

pub async fn create_subscription(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SubscriptionRequest>, JsonRejection>,
) -> Response {
    let req = match parse_subscription(body) {
        Ok(req) => req,
        Err(response) => return response,
    };

    let subscription = AnalyticsSubscription {
        subscription_id: Uuid::new_v4().to_string(),
        event_type: req.event_type,
        consumer_nf_id: req.consumer_nf_id,
        notification_uri: req.notification_uri,
        analytics_filter: req.analytics_filter,
        reporting_period: req.reporting_period,
    };
    let response = SubscriptionResponse::from(&subscription);
    state.context.add_subscription(subscription).await;

    info!(subscription_id = %response.subscription_id, "Created subscription");
    (StatusCode::CREATED, Json(response)).into_response()
}

pub async fn get_subscription(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.context.get_subscription(&id).await {
        Some(sub) => Json(SubscriptionResponse::from(&sub)).into_response(),
        None => error_response(StatusCode::NOT_FOUND, NOT_FOUND),
    }
}

pub async fn update_subscription(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<SubscriptionRequest>, JsonRejection>,
) -> Response {
    let req = match parse_subscription(body) {
        Ok(req) => req,
        Err(response) => return response,
    };

    // consumerNfId is fixed at creation
    let updated = state
        .context
        .update_subscription(&id, |sub| {
            sub.event_type = req.event_type;
            sub.notification_uri = req.notification_uri;
            sub.analytics_filter = req.analytics_filter;
            sub.reporting_period = req.reporting_period;
        })
        .await;

    match updated {
        Some(sub) => {
            info!(subscription_id = %id, "Updated subscription");
            Json(SubscriptionResponse::from(&sub)).into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, NOT_FOUND),
    }
}

pub async fn delete_subscription(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.context.remove_subscription(&id).await {
        Some(_) => {
            info!(subscription_id = %id, "Deleted subscription");
            StatusCode::NO_CONTENT.into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, NOT_FOUND),
    }
}

pub async fn get_analytics(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AnalyticsRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) if !req.event_type.trim().is_empty() => req,
        Ok(_) => return error_response(StatusCode::BAD_REQUEST, INVALID_BODY),
        Err(e) => {
            error!(error = %e, "Invalid request body");
            return error_response(StatusCode::BAD_REQUEST, INVALID_BODY);
        }
    };

    let data = state
        .analytics
        .get_analytics(&req.event_type, req.analytics_filter.as_ref())
        .await;

    Json(AnalyticsResponse {
        event_type: req.event_type,
        data,
    })
    .into_response()
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

/// Manual steering; the body is a bare target name or `{"target": "..."}`
pub async fn steer(State(state): State<Arc<AppState>>, body: String) -> Response {
    let outcome = state.controller.steer_manual(&body).await;
    let status = match outcome {
        SteerOutcome::InvalidTarget(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::OK,
    };
    (status, outcome.to_string()).into_response()
}

pub async fn steering_status(State(state): State<Arc<AppState>>) -> Response {
    Json(state.controller.status()).into_response()
}

pub async fn upf_metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.controller.rate_source().usage_report().await {
        Ok(report) => (StatusCode::OK, report).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to build UPF usage report");
            error_response(StatusCode::BAD_GATEWAY, &e.to_string())
        }
    }
}

/// Returns 200 while operational (healthy or degraded), 503 when unhealthy
pub async fn healthz(State(state): State<Arc<AppState>>) -> Response {
    let health = state.health.health().await;
    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(health)).into_response()
}

pub async fn readyz(State(state): State<Arc<AppState>>) -> Response {
    let readiness = state.health.readiness().await;
    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(readiness)).into_response()
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.encode_text() {
        Ok(buffer) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            buffer,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
