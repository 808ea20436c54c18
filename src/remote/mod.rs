//! Platform API boundary
//!
//! The engine only knows the operations of [`RemoteApi`]. Transport details
//! (paths, auth headers, timeouts) live in the implementation; the HTTP one
//! is [`HttpRemote`].

pub mod client;
pub mod error;

use std::future::Future;

pub use client::HttpRemote;
pub use error::RemoteError;

use crate::counters::CounterKind;
use crate::progress::{AttemptAck, ChapterSnapshot, CourseContent, UnreadCounts, VideoKind};

/// Operations the engine needs from the platform
///
/// Writes are best-effort: the engine has already applied them locally and
/// only logs a failure.
pub trait RemoteApi: Send + Sync + 'static {
    /// Fetch a learner's progress in one chapter
    fn fetch_chapter_progress(
        &self,
        learner_id: &str,
        chapter_id: &str,
    ) -> impl Future<Output = Result<ChapterSnapshot, RemoteError>> + Send;

    /// Record a watched video
    fn submit_video_watched(
        &self,
        learner_id: &str,
        chapter_id: &str,
        video_id: &str,
        kind: VideoKind,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Record that the slide material was opened
    fn submit_slides_viewed(
        &self,
        learner_id: &str,
        chapter_id: &str,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Submit a scored quiz attempt
    fn submit_quiz_attempt(
        &self,
        learner_id: &str,
        chapter_id: &str,
        score_percent: f64,
    ) -> impl Future<Output = Result<AttemptAck, RemoteError>> + Send;

    /// Fetch authoritative unread totals
    fn fetch_unread_counts(
        &self,
        learner_id: &str,
    ) -> impl Future<Output = Result<UnreadCounts, RemoteError>> + Send;

    /// Mark a message or notification as read
    fn submit_mark_read(
        &self,
        learner_id: &str,
        kind: CounterKind,
        item_id: &str,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Fetch a course outline and its chapter specs
    fn fetch_course_content(
        &self,
        course_id: &str,
    ) -> impl Future<Output = Result<CourseContent, RemoteError>> + Send;
}
