//! Periodic analytics over the NWDAF context

mod engine;

pub use engine::{AnalyticsEngine, EventType, NF_OVERLOAD_THRESHOLD};
