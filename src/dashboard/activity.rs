//! Recent activity feed

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::Role;

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityKind {
    Assignment,
    Submission,
    Grade,
    Announcement,
    Enrollment,
    Message,
}

/// An event as reported by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    pub id: String,
    pub kind: ActivityKind,
    pub title: String,
    /// Unix timestamp (seconds)
    pub occurred_at: i64,
    /// Roles allowed to see the event; empty means everyone
    #[serde(default)]
    pub audience: BTreeSet<Role>,
}

impl ActivityEvent {
    /// Whether a viewer with this role may see the event
    pub fn visible_to(&self, role: Role) -> bool {
        role == Role::Admin || self.audience.is_empty() || self.audience.contains(&role)
    }
}

/// An event ready for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: String,
    pub kind: ActivityKind,
    pub title: String,
    pub occurred_at: i64,
    /// e.g. "5 minutes ago"
    pub elapsed: String,
}

/// Human label for the time between `at` and `now`
///
/// Minute resolution under an hour, hour resolution under a day, days after
/// that. Future timestamps read as "just now".
pub fn elapsed_label(now: i64, at: i64) -> String {
    let elapsed = now.saturating_sub(at);
    if elapsed < MINUTE {
        return "just now".to_string();
    }
    let (count, unit) = if elapsed < HOUR {
        (elapsed / MINUTE, "minute")
    } else if elapsed < DAY {
        (elapsed / HOUR, "hour")
    } else {
        (elapsed / DAY, "day")
    };
    if count == 1 { format!("1 {unit} ago") } else { format!("{count} {unit}s ago") }
}

/// Visible events, newest first, labelled and truncated
pub fn recent_activity(
    events: &[ActivityEvent],
    role: Role,
    now: i64,
    limit: usize,
) -> Vec<ActivityEntry> {
    let mut visible: Vec<&ActivityEvent> = events.iter().filter(|e| e.visible_to(role)).collect();
    visible.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at).then_with(|| a.id.cmp(&b.id)));

    visible
        .into_iter()
        .take(limit)
        .map(|e| ActivityEntry {
            id: e.id.clone(),
            kind: e.kind,
            title: e.title.clone(),
            occurred_at: e.occurred_at,
            elapsed: elapsed_label(now, e.occurred_at),
        })
        .collect()
}
