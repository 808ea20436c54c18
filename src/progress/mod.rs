//! Learning progress tracking and quiz gating
//!
//! The ledger and attempt record are the two stateful stores; the evaluator
//! derives chapter status and course progress from them. Remote payloads
//! enter through `snapshot`.

pub mod attempts;
pub mod evaluator;
pub mod ledger;
pub mod model;
pub mod snapshot;

// Re-exports
pub use attempts::{AttemptAck, AttemptRecord, QuizAttemptState};
pub use evaluator::{ChapterEvaluation, CourseReport, evaluate_chapter, evaluate_course};
pub use ledger::WatchLedger;
pub use model::{
    ChapterContentSpec, ChapterId, ChapterStatus, ContentCatalog, Course, LearnerChapterProgress,
    LearnerId, QuizSpec, VideoId, VideoKind,
};
pub use snapshot::{ChapterSnapshot, CourseContent, SnapshotError, UnreadCounts};
