//! Error types for the progress engine
//!
//! Only [`EngineError`] is ever returned to a caller. Integrity problems are
//! reported as [`IntegrityWarning`] values next to a degraded result, and
//! remote failures are logged and absorbed by the session.

use thiserror::Error;

use crate::progress::model::ChapterId;

/// Errors surfaced synchronously to the caller
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A quiz attempt was submitted for a chapter whose quiz cannot be taken
    #[error("Invalid quiz attempt for chapter {chapter_id}: {reason}")]
    InvalidAttempt {
        /// Chapter the attempt was submitted for
        chapter_id: ChapterId,
        /// Why the attempt was rejected
        reason: AttemptRejection,
    },
}

impl EngineError {
    pub(crate) fn invalid_attempt(chapter_id: &str, reason: AttemptRejection) -> Self {
        Self::InvalidAttempt { chapter_id: chapter_id.to_string(), reason }
    }
}

/// Reason a quiz attempt was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AttemptRejection {
    /// No quiz has been generated for the chapter
    #[error("quiz has not been generated")]
    QuizNotGenerated,

    /// Lectures or slides still need to be consumed
    #[error("quiz is still locked")]
    ChapterLocked,

    /// The chapter has no content spec
    #[error("chapter is unknown")]
    UnknownChapter,

    /// Score is not a number within 0-100
    #[error("score must be between 0 and 100")]
    ScoreOutOfRange,
}

/// Non-fatal data problems found while evaluating progress
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityWarning {
    /// Progress references a chapter whose content spec is missing
    #[error("No content spec for chapter {chapter_id}; treating it as locked")]
    MissingChapterSpec {
        /// The chapter without a spec
        chapter_id: ChapterId,
    },

    /// A course was queried that has not been loaded
    #[error("Course {course_id} is not loaded")]
    UnknownCourse {
        /// The requested course
        course_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_attempt_message_names_chapter_and_reason() {
        let err = EngineError::invalid_attempt("ch-3", AttemptRejection::ChapterLocked);
        assert_eq!(err.to_string(), "Invalid quiz attempt for chapter ch-3: quiz is still locked");
    }

    #[test]
    fn missing_spec_warning_message() {
        let warning = IntegrityWarning::MissingChapterSpec { chapter_id: "ch-9".into() };
        assert!(warning.to_string().contains("ch-9"));
    }
}
