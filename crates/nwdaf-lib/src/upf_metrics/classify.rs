//! Pod classification and sample value parsing

use crate::models::{Anchor, PodBucket};
use serde_json::Value;

/// Map a UPF pod name onto its traffic bucket.
///
/// Rules are evaluated in order on the lowercased name; the first match wins,
/// so a pod only ever feeds one bucket.
pub fn classify_pod(pod: &str) -> Option<PodBucket> {
    let pod = pod.to_lowercase();
    let anchor = pod.contains("anchor");

    if pod.contains("upf1") || (anchor && pod.contains('1')) {
        Some(PodBucket::Anchor(Anchor::Edge1))
    } else if pod.contains("upf2") || (anchor && pod.contains('2')) {
        Some(PodBucket::Anchor(Anchor::Edge2))
    } else if pod.contains("upfb") {
        Some(PodBucket::Branch)
    } else {
        None
    }
}

/// Parse the string half of a `[timestamp, "value"]` pair.
///
/// Empty, non-numeric, non-finite and negative values yield `None`.
pub fn parse_sample_value(value: &Value) -> Option<f64> {
    let raw = value.as_str()?.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Some(v),
        _ => None,
    }
}
