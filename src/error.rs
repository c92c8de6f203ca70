//! Failure kinds of the backend calls.
//!
//! Every variant is caught where it originates and turned into local state;
//! nothing here is meant to reach the process boundary.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Profile lookup failed; the session is treated as anonymous.
    #[error("profile lookup failed{}", status_suffix(.status))]
    Auth { status: Option<u16> },
    /// History fetch failed; the cached list is kept.
    #[error("history fetch failed{}", status_suffix(.status))]
    Fetch { status: Option<u16> },
    #[error("post generation failed{}", status_suffix(.status))]
    Generation { status: Option<u16> },
    #[error("share failed{}", detail_suffix(.detail))]
    Share { detail: Option<String> },
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {code})"),
        None => " (unreachable)".to_string(),
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(": {d}"))
        .unwrap_or_default()
}

impl GatewayError {
    /// Text shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Auth { .. } => "Not logged in".into(),
            GatewayError::Fetch { .. } => "Could not load post history".into(),
            GatewayError::Generation { .. } => crate::model::GENERATION_FAILED_MESSAGE.into(),
            GatewayError::Share { detail: Some(d) } if !d.trim().is_empty() => {
                format!("Failed to share post: {}", d.trim())
            }
            GatewayError::Share { .. } => "Failed to share post.".into(),
        }
    }
}
