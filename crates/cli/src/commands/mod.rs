//! CLI command implementations

pub mod analytics;
pub mod steering;
pub mod subscriptions;
