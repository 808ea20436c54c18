//! Dashboard view models
//!
//! Combines course reports, unread counters and remote summary statistics
//! into one read-only view per role. Each remote source degrades on its own:
//! a failed fetch falls back to the last value that arrived, or to a default,
//! and is listed in [`DashboardView::degraded`].

pub mod activity;

use std::fmt::Display;

use serde::{Deserialize, Serialize};

pub use activity::{ActivityEntry, ActivityEvent, ActivityKind, elapsed_label, recent_activity};

use crate::counters::{CounterKind, CounterState};
use crate::progress::CourseReport;

/// Who is looking at the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
    Parent,
    Admin,
}

/// Summary statistics reported by the platform; any field may be missing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SummaryStats {
    pub course_count: Option<u32>,
    pub pending_assignments: Option<u32>,
    pub average_grade: Option<f64>,
    pub student_count: Option<u32>,
}

/// A remote input to the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Source {
    Summary,
    Activity,
}

/// Everything a dashboard screen shows
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub role: Role,
    pub course_count: u32,
    pub completed_courses: u32,
    /// Mean course progress (0-100), if any course is known
    pub average_progress_percent: Option<u8>,
    pub pending_assignments: u32,
    pub average_grade: Option<f64>,
    /// Teacher and admin views only
    pub student_count: Option<u32>,
    pub unread_messages: u32,
    pub unread_notifications: u32,
    pub recent_activity: Vec<ActivityEntry>,
    /// Sources showing last known or default data
    pub degraded: Vec<Source>,
}

/// Builds dashboard views for one role, remembering the last good inputs
#[derive(Debug, Clone)]
pub struct DashboardAggregator {
    role: Role,
    activity_limit: usize,
    last_summary: Option<SummaryStats>,
    last_activity: Option<Vec<ActivityEvent>>,
}

impl DashboardAggregator {
    pub fn new(role: Role, activity_limit: usize) -> Self {
        Self { role, activity_limit, last_summary: None, last_activity: None }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Compose the view of a single person (student, teacher or admin)
    pub fn compose<E: Display>(
        &mut self,
        summary: Result<SummaryStats, E>,
        activity: Result<Vec<ActivityEvent>, E>,
        reports: &[CourseReport],
        counters: &CounterState,
        now: i64,
    ) -> DashboardView {
        let mut degraded = Vec::new();
        let summary = self.accept_summary(summary, &mut degraded);
        let recent_activity = self.accept_activity(activity, now, &mut degraded);

        let completed_courses = reports.iter().filter(|r| r.completed).count() as u32;
        let average_progress_percent =
            mean(reports.iter().map(|r| f64::from(r.progress_percent))).map(round_percent);
        let show_students = matches!(self.role, Role::Teacher | Role::Admin);

        DashboardView {
            role: self.role,
            course_count: summary.course_count.unwrap_or(reports.len() as u32),
            completed_courses,
            average_progress_percent,
            pending_assignments: summary.pending_assignments.unwrap_or(0),
            average_grade: summary.average_grade,
            student_count: if show_students { summary.student_count } else { None },
            unread_messages: counters.effective(CounterKind::Messages),
            unread_notifications: counters.effective(CounterKind::Notifications),
            recent_activity,
            degraded,
        }
    }

    /// Compose a parent's view from each child's own view
    ///
    /// Grades and progress are the unweighted mean over children that have
    /// one; counts are summed. Unread counters are the parent's own.
    pub fn compose_parent<E: Display>(
        &mut self,
        children: &[DashboardView],
        activity: Result<Vec<ActivityEvent>, E>,
        counters: &CounterState,
        now: i64,
    ) -> DashboardView {
        let mut degraded = Vec::new();
        let recent_activity = self.accept_activity(activity, now, &mut degraded);
        let child_progress = children.iter().filter_map(|c| c.average_progress_percent);
        for child in children {
            for source in &child.degraded {
                if !degraded.contains(source) {
                    degraded.push(*source);
                }
            }
        }

        DashboardView {
            role: self.role,
            course_count: children.iter().map(|c| c.course_count).sum(),
            completed_courses: children.iter().map(|c| c.completed_courses).sum(),
            average_progress_percent: mean(child_progress.map(f64::from)).map(round_percent),
            pending_assignments: children.iter().map(|c| c.pending_assignments).sum(),
            average_grade: mean(children.iter().filter_map(|c| c.average_grade)),
            student_count: None,
            unread_messages: counters.effective(CounterKind::Messages),
            unread_notifications: counters.effective(CounterKind::Notifications),
            recent_activity,
            degraded,
        }
    }

    fn accept_summary<E: Display>(
        &mut self,
        summary: Result<SummaryStats, E>,
        degraded: &mut Vec<Source>,
    ) -> SummaryStats {
        match summary {
            Ok(summary) => {
                self.last_summary = Some(summary.clone());
                summary
            }
            Err(e) => {
                tracing::warn!(
                    role = ?self.role,
                    "Dashboard summary unavailable; using last known: {}",
                    e
                );
                degraded.push(Source::Summary);
                self.last_summary.clone().unwrap_or_default()
            }
        }
    }

    fn accept_activity<E: Display>(
        &mut self,
        activity: Result<Vec<ActivityEvent>, E>,
        now: i64,
        degraded: &mut Vec<Source>,
    ) -> Vec<ActivityEntry> {
        match activity {
            Ok(events) => {
                let entries = recent_activity(&events, self.role, now, self.activity_limit);
                self.last_activity = Some(events);
                entries
            }
            Err(e) => {
                tracing::warn!(
                    role = ?self.role,
                    "Recent activity unavailable; using last known: {}",
                    e
                );
                degraded.push(Source::Activity);
                let events = self.last_activity.as_deref().unwrap_or_default();
                recent_activity(events, self.role, now, self.activity_limit)
            }
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

fn round_percent(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}
