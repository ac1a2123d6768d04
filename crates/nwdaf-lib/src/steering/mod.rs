//! Traffic steering between the edge anchors
//!
//! The controller drives the periodic loop; `operation` holds the
//! delete-then-install sequence shared by the loop and manual requests.

mod controller;
mod operation;

pub use controller::{SteeringController, SteeringControllerBuilder};
pub use operation::{apply_steering, normalize_target, SteerOutcome};

#[cfg(test)]
pub(crate) use controller::testing;

use serde::{Deserialize, Serialize};

/// Snapshot of the controller served on `/steering/status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerStatus {
    pub enabled: bool,
    pub monitor_running: bool,
    pub interval_secs: u64,
    pub threshold_bps: f64,
    pub cooldown_secs: u64,
    pub seconds_since_last_steer: Option<u64>,
    pub cooldown_remaining_secs: u64,
    pub model: String,
    pub nef_url: String,
    pub prometheus_url: String,
}
