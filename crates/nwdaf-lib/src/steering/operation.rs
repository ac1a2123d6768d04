//! The delete-then-install steering operation and its text outcome

use crate::error::SteeringError;
use crate::models::Anchor;
use crate::nef::PolicyStore;
use serde::Deserialize;
use std::fmt;
use tracing::{info, warn};

/// Result of one steering attempt, rendered for operators
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SteerOutcome {
    Applied {
        target: Anchor,
        subscription_id: String,
    },
    InvalidTarget(String),
    Unreachable {
        nef_url: String,
    },
    Rejected {
        status: u16,
        body: String,
    },
    Failed(String),
}

impl SteerOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SteerOutcome::Applied { .. })
    }

    fn from_install_error(err: SteeringError, nef_url: &str) -> Self {
        match err {
            SteeringError::Transport(_) => SteerOutcome::Unreachable {
                nef_url: nef_url.to_string(),
            },
            SteeringError::Backend { status, body } => SteerOutcome::Rejected { status, body },
            other => SteerOutcome::Failed(other.to_string()),
        }
    }
}

impl fmt::Display for SteerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SteerOutcome::Applied {
                target,
                subscription_id,
            } => write!(
                f,
                "✅ Traffic steering subscription created!\n\n\
                 Target DNAI: {}\n\
                 Target UPF: {}\n\
                 Expected IP Pool: {}\n\
                 Subscription ID: {}\n\n\
                 Traffic will be routed through {}.",
                target.dnai(),
                target.upf_name(),
                target.ue_pool(),
                subscription_id,
                target.upf_name()
            ),
            SteerOutcome::InvalidTarget(raw) => write!(
                f,
                "❌ Invalid target: '{}'. Must be 'edge1' or 'edge2'",
                raw
            ),
            SteerOutcome::Unreachable { nef_url } => {
                write!(f, "❌ Cannot connect to NEF at {}", nef_url)
            }
            SteerOutcome::Rejected { status, body } => write!(
                f,
                "❌ Failed to create subscription: HTTP {} - {}",
                status, body
            ),
            SteerOutcome::Failed(reason) => {
                write!(f, "❌ Failed to create subscription: {}", reason)
            }
        }
    }
}

#[derive(Deserialize)]
struct TargetArg {
    target: String,
}

/// Resolve free-form operator input to an anchor.
///
/// Accepts bare names in any case, quoted names and `{"target": "..."}`.
/// On failure returns the cleaned text for the error message.
pub fn normalize_target(input: &str) -> Result<Anchor, String> {
    let trimmed = input.trim();
    let unwrapped = match serde_json::from_str::<TargetArg>(trimmed) {
        Ok(arg) => arg.target,
        Err(_) => trimmed.to_string(),
    };

    let cleaned = unwrapped
        .trim_matches(|c: char| c == '"' || c == '\'' || c == ' ')
        .to_lowercase();

    match cleaned.as_str() {
        "edge1" => Ok(Anchor::Edge1),
        "edge2" => Ok(Anchor::Edge2),
        _ => Err(cleaned),
    }
}

/// Clear this AF's subscriptions and install one routing to `target`.
///
/// There is no rollback: a failed install leaves no policy in place.
pub async fn apply_steering(store: &dyn PolicyStore, target: Anchor) -> SteerOutcome {
    info!(target_dnai = %target, "Steering traffic");
    store.delete_all().await;

    match store.install(target).await {
        Ok(subscription_id) => SteerOutcome::Applied {
            target,
            subscription_id,
        },
        Err(e) => {
            warn!(target_dnai = %target, error = %e, "Steering install failed");
            SteerOutcome::from_install_error(e, store.endpoint())
        }
    }
}
