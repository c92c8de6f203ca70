//! Text rendering for CLI output.
//!
//! Shared by the text commands and the TUI so both show items the same way.

use crate::model::{GeneratedItem, IdentityProfile};
use crate::publish::PublishState;
use time::macros::format_description;
use time::UtcOffset;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

pub(crate) fn welcome_line(profile: Option<&IdentityProfile>, login_url: &str) -> String {
    match profile {
        Some(p) => format!("Welcome, {}!", p.name),
        None => format!("Login with LinkedIn to get started: {login_url}"),
    }
}

/// `created_at` in local time, or the raw server string when it does not parse.
pub(crate) fn display_timestamp(item: &GeneratedItem) -> String {
    let Some(ts) = item.created_at_utc() else {
        return item.created_at.clone();
    };
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    ts.to_offset(offset)
        .format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ))
        .unwrap_or_else(|_| item.created_at.clone())
}

/// Per-item share status shown next to the item that holds the guard.
pub(crate) fn share_badge(item: &GeneratedItem, publish: &PublishState) -> Option<String> {
    (publish.in_flight_item() == Some(item.id) && !publish.status_message.is_empty())
        .then(|| publish.status_message.clone())
}

/// History lines, newest first as cached.
pub(crate) fn build_history_summary(
    items: &[GeneratedItem],
    publish: &PublishState,
    limit: Option<usize>,
) -> TextSummary {
    let mut lines = Vec::new();
    if items.is_empty() {
        lines.push("No posts yet.".to_string());
        return TextSummary { lines };
    }
    let shown = limit.unwrap_or(items.len()).min(items.len());
    for item in &items[..shown] {
        let mut header = format!("#{}  {}", item.id, display_timestamp(item));
        if let Some(badge) = share_badge(item, publish) {
            header.push_str(&format!("  [{badge}]"));
        }
        lines.push(header);
        for body_line in item.post_text.lines() {
            lines.push(format!("    {body_line}"));
        }
        lines.push(String::new());
    }
    if shown < items.len() {
        lines.push(format!("... {} older post(s) not shown", items.len() - shown));
    }
    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::fake::item;
    use crate::publish::PublishStatus;

    #[test]
    fn welcome_line_prefers_profile() {
        let profile = IdentityProfile {
            name: "Ada".into(),
            picture: String::new(),
        };
        assert_eq!(welcome_line(Some(&profile), "x"), "Welcome, Ada!");
        assert!(welcome_line(None, "http://b/auth/linkedin").ends_with("http://b/auth/linkedin"));
    }

    #[test]
    fn history_marks_only_the_item_holding_the_guard() {
        let items = vec![
            item(2, "second", "2024-01-02T00:00:00Z"),
            item(1, "first\nline two", "2024-01-01T00:00:00Z"),
        ];
        let publish = PublishState {
            status: PublishStatus::InFlight(1),
            status_message: "Sharing...".into(),
        };

        let summary = build_history_summary(&items, &publish, None);

        assert!(summary.lines[0].starts_with("#2"));
        assert!(!summary.lines[0].contains("Sharing"));
        let first = summary.lines.iter().find(|l| l.starts_with("#1")).unwrap();
        assert!(first.ends_with("[Sharing...]"));
        assert!(summary.lines.contains(&"    line two".to_string()));
    }

    #[test]
    fn history_limit_reports_hidden_posts() {
        let items = vec![
            item(3, "c", "2024-01-03T00:00:00Z"),
            item(2, "b", "2024-01-02T00:00:00Z"),
            item(1, "a", "2024-01-01T00:00:00Z"),
        ];
        let summary = build_history_summary(&items, &PublishState::default(), Some(1));
        assert_eq!(
            summary.lines.last().unwrap(),
            "... 2 older post(s) not shown"
        );
    }

    #[test]
    fn empty_history_has_placeholder() {
        let summary = build_history_summary(&[], &PublishState::default(), None);
        assert_eq!(summary.lines, vec!["No posts yet."]);
    }

    #[test]
    fn unparseable_timestamp_is_shown_raw() {
        assert_eq!(display_timestamp(&item(1, "a", "sometime")), "sometime");
    }
}
