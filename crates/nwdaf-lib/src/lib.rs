//! NWDAF library with LLM-guided traffic steering
//!
//! This crate provides the core functionality for:
//! - UPF traffic measurement through Prometheus
//! - Traffic-influence policy management on the NEF
//! - LLM-backed steering decisions and the auto-steering loop
//! - Analytics subscriptions and the analytics engine
//! - The SBI router, health checks and observability

pub mod analytics;
pub mod config;
pub mod context;
pub mod decision;
pub mod error;
pub mod health;
pub mod llm;
pub mod models;
pub mod nef;
pub mod observability;
pub mod sbi;
pub mod steering;
pub mod upf_metrics;

pub use error::{Result, SteeringError};
pub use health::{
    Component, ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{NwdafMetrics, StructuredLogger};
