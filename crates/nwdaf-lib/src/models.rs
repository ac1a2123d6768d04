//! Core data models for traffic steering

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

/// Edge anchor UPF that traffic can be steered to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    Edge1,
    Edge2,
}

impl Anchor {
    pub const ALL: [Anchor; 2] = [Anchor::Edge1, Anchor::Edge2];

    /// Data network access identifier sent to the NEF
    pub fn dnai(&self) -> &'static str {
        match self {
            Anchor::Edge1 => "edge1",
            Anchor::Edge2 => "edge2",
        }
    }

    /// Human-readable UPF name
    pub fn upf_name(&self) -> &'static str {
        match self {
            Anchor::Edge1 => "AnchorUPF1",
            Anchor::Edge2 => "AnchorUPF2",
        }
    }

    /// UE IP pool served by the anchor
    pub fn ue_pool(&self) -> &'static str {
        match self {
            Anchor::Edge1 => "10.1.0.0/17",
            Anchor::Edge2 => "10.1.128.0/17",
        }
    }

    /// Value published on the current-target gauge
    pub fn gauge_code(&self) -> i64 {
        match self {
            Anchor::Edge1 => 1,
            Anchor::Edge2 => 2,
        }
    }

    /// The opposite edge
    pub fn other(&self) -> Anchor {
        match self {
            Anchor::Edge1 => Anchor::Edge2,
            Anchor::Edge2 => Anchor::Edge1,
        }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dnai())
    }
}

impl FromStr for Anchor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "edge1" => Ok(Anchor::Edge1),
            "edge2" => Ok(Anchor::Edge2),
            other => Err(format!("unknown anchor '{}'", other)),
        }
    }
}

/// Gauge value for an optional active policy (0 = none)
pub fn policy_gauge_code(policy: Option<Anchor>) -> i64 {
    policy.map(|a| a.gauge_code()).unwrap_or(0)
}

/// Label used for an optional policy in logs and counters
pub fn policy_label(policy: Option<Anchor>) -> &'static str {
    policy.map(|a| a.dnai()).unwrap_or("none")
}

/// Traffic bucket a UPF pod's series is aggregated into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PodBucket {
    Anchor(Anchor),
    /// Intermediate branching UPF
    Branch,
}

impl PodBucket {
    pub fn label(&self) -> &'static str {
        match self {
            PodBucket::Anchor(anchor) => anchor.dnai(),
            PodBucket::Branch => "upfb",
        }
    }
}

/// Per-bucket receive byte rates captured in one metrics query
#[derive(Debug, Clone, PartialEq)]
pub struct RateSample {
    pub edge1: f64,
    pub edge2: f64,
    pub upfb: f64,
    pub captured_at: Instant,
}

impl RateSample {
    /// Sample with every bucket at zero, published when the backend fails
    pub fn zeroed() -> Self {
        Self {
            edge1: 0.0,
            edge2: 0.0,
            upfb: 0.0,
            captured_at: Instant::now(),
        }
    }

    pub fn anchor(&self, anchor: Anchor) -> f64 {
        match anchor {
            Anchor::Edge1 => self.edge1,
            Anchor::Edge2 => self.edge2,
        }
    }

    pub fn bucket(&self, bucket: PodBucket) -> f64 {
        match bucket {
            PodBucket::Anchor(anchor) => self.anchor(anchor),
            PodBucket::Branch => self.upfb,
        }
    }

    /// Add a series value to its bucket
    pub fn accumulate(&mut self, bucket: PodBucket, bytes_per_sec: f64) {
        match bucket {
            PodBucket::Anchor(Anchor::Edge1) => self.edge1 += bytes_per_sec,
            PodBucket::Anchor(Anchor::Edge2) => self.edge2 += bytes_per_sec,
            PodBucket::Branch => self.upfb += bytes_per_sec,
        }
    }

    /// (label, bytes/s) pairs in fixed publication order
    pub fn buckets(&self) -> [(&'static str, f64); 3] {
        [
            ("edge1", self.edge1),
            ("edge2", self.edge2),
            ("upfb", self.upfb),
        ]
    }
}

/// Outcome of one decision round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SteeringDecision {
    Hold { reason: String },
    Steer { target: Anchor, reason: String },
}

impl SteeringDecision {
    pub fn hold(reason: impl Into<String>) -> Self {
        SteeringDecision::Hold {
            reason: reason.into(),
        }
    }

    pub fn steer(target: Anchor, reason: impl Into<String>) -> Self {
        SteeringDecision::Steer {
            target,
            reason: reason.into(),
        }
    }

    pub fn should_steer(&self) -> bool {
        matches!(self, SteeringDecision::Steer { .. })
    }

    pub fn target(&self) -> Option<Anchor> {
        match self {
            SteeringDecision::Steer { target, .. } => Some(*target),
            SteeringDecision::Hold { .. } => None,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            SteeringDecision::Hold { reason } | SteeringDecision::Steer { reason, .. } => reason,
        }
    }
}
