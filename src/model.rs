use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

/// Tone sent with every generation request.
pub const DEFAULT_TONE: &str = "professional";

pub const LOGIN_REQUIRED_MESSAGE: &str = "Please log in with LinkedIn first.";
pub const GENERATION_FAILED_MESSAGE: &str =
    "Failed to generate post. Please check the backend server.";

/// Server-assigned identifier of a generated post.
pub type ItemId = i64;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub entry_url: String,
    pub share_reset_delay: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".into(),
            entry_url: "http://localhost/".into(),
            share_reset_delay: Duration::from_secs(3),
            user_agent: format!("influence-cli/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Opaque bearer token obtained from the login handoff.
///
/// `Debug` is redacted so the token never ends up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Response of `GET /users/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProfile {
    pub name: String,
    pub picture: String,
}

/// One entry of `GET /posts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedItem {
    pub id: ItemId,
    pub post_text: String,
    pub created_at: String,
}

impl GeneratedItem {
    /// Parse `created_at` as RFC 3339, or as a naive timestamp taken to be UTC.
    pub fn created_at_utc(&self) -> Option<OffsetDateTime> {
        parse_timestamp(&self.created_at)
    }
}

fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(ts);
    }
    let naive = format_description!(
        version = 2,
        "[year]-[month]-[day][first [T] [ ]][hour]:[minute]:[second][optional [.[subsecond]]]"
    );
    PrimitiveDateTime::parse(raw, naive)
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub role: String,
    pub topic: String,
    pub tone: String,
}

impl GenerationRequest {
    pub fn new(role: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            topic: topic.into(),
            tone: DEFAULT_TONE.to_string(),
        }
    }
}

/// Response of `POST /generate-post`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedPost {
    pub post_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareRequest {
    pub post_text: String,
}

/// Error body the backend sends when sharing fails.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShareErrorBody {
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

impl ShareErrorBody {
    /// Server detail as display text; non-string JSON is rendered compactly.
    pub fn detail_text(&self) -> Option<String> {
        match self.details.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) if s.trim().is_empty() => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(created_at: &str) -> GeneratedItem {
        GeneratedItem {
            id: 1,
            post_text: String::new(),
            created_at: created_at.into(),
        }
    }

    #[test]
    fn parses_rfc3339_and_naive_timestamps() {
        let with_offset = item("2024-05-01T10:00:00+02:00").created_at_utc().unwrap();
        let naive = item("2024-05-01T08:00:00").created_at_utc().unwrap();
        assert_eq!(with_offset, naive);

        let fractional = item("2024-05-01 08:00:00.123456").created_at_utc().unwrap();
        assert!(fractional > naive);
    }

    #[test]
    fn unparseable_timestamp_is_none() {
        assert!(item("yesterday").created_at_utc().is_none());
    }

    #[test]
    fn credential_debug_is_redacted() {
        let cred = Credential::new("abc123");
        assert!(!format!("{cred:?}").contains("abc123"));
        assert_eq!(cred.as_str(), "abc123");
    }

    #[test]
    fn share_error_detail_accepts_strings_and_objects() {
        let body: ShareErrorBody = serde_json::from_str(r#"{"details":"rate limited"}"#).unwrap();
        assert_eq!(body.detail_text().as_deref(), Some("rate limited"));

        let body: ShareErrorBody =
            serde_json::from_str(r#"{"details":{"code":429}}"#).unwrap();
        assert_eq!(body.detail_text().as_deref(), Some(r#"{"code":429}"#));

        let body: ShareErrorBody = serde_json::from_str("{}").unwrap();
        assert!(body.detail_text().is_none());
    }

    #[test]
    fn generation_request_uses_fixed_tone() {
        let req = GenerationRequest::new("Engineer", "AI");
        assert_eq!(req.tone, "professional");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["role"], "Engineer");
        assert_eq!(json["topic"], "AI");
    }
}
