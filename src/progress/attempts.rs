//! Quiz attempt record
//!
//! Attempt count, best score and pass state per chapter. Within a session
//! the count never decreases and a pass is never revoked, including when
//! remote data is merged in.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::evaluator;
use super::model::{ChapterContentSpec, ChapterId, LearnerChapterProgress};
use crate::error::{AttemptRejection, EngineError};

/// Quiz history of one chapter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttemptState {
    /// Attempts submitted so far
    pub attempts_used: u32,
    /// Best score (0-100), if any attempt was made
    pub best_score_percent: Option<f64>,
    /// Whether any attempt reached the passing score
    pub passed: bool,
}

static NO_ATTEMPTS: QuizAttemptState =
    QuizAttemptState { attempts_used: 0, best_score_percent: None, passed: false };

impl QuizAttemptState {
    /// Fold one scored attempt into the state
    fn apply(&mut self, score_percent: f64, passing_score_percent: f64) {
        self.attempts_used = self.attempts_used.saturating_add(1);
        let best = self.best_score_percent.map_or(score_percent, |b| b.max(score_percent));
        self.best_score_percent = Some(best);
        self.passed = self.passed || score_percent >= passing_score_percent;
    }

    /// Merge server-reported state without moving backwards
    pub fn merge(&mut self, other: &QuizAttemptState) {
        self.attempts_used = self.attempts_used.max(other.attempts_used);
        self.best_score_percent = match (self.best_score_percent, other.best_score_percent) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        self.passed = self.passed || other.passed;
    }
}

/// Server acknowledgement of a submitted attempt
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptAck {
    pub passed: bool,
    pub best_score_percent: Option<f64>,
}

/// Quiz attempt states per chapter
#[derive(Debug, Clone, Default)]
pub struct AttemptRecord {
    chapters: HashMap<ChapterId, QuizAttemptState>,
}

impl AttemptRecord {
    /// Record a scored attempt
    ///
    /// Rejected without touching state if the chapter is unknown, the quiz is
    /// not generated, the quiz is still locked, or the score is not in 0-100.
    pub fn record_attempt(
        &mut self,
        chapter_id: &str,
        spec: Option<&ChapterContentSpec>,
        progress: &LearnerChapterProgress,
        score_percent: f64,
    ) -> Result<&QuizAttemptState, EngineError> {
        let reject = |reason| EngineError::invalid_attempt(chapter_id, reason);
        let spec = spec.ok_or_else(|| reject(AttemptRejection::UnknownChapter))?;
        let quiz = spec.quiz.as_ref().filter(|q| q.is_generated);
        let Some(passing) = quiz.map(|q| q.passing_score_percent) else {
            return Err(reject(AttemptRejection::QuizNotGenerated));
        };
        if !evaluator::quiz_unlocked(progress, spec) {
            return Err(reject(AttemptRejection::ChapterLocked));
        }
        if !(0.0..=100.0).contains(&score_percent) {
            return Err(reject(AttemptRejection::ScoreOutOfRange));
        }

        let state = self.chapters.entry(chapter_id.to_string()).or_default();
        state.apply(score_percent, passing);
        tracing::debug!(
            chapter_id,
            score_percent,
            attempts = state.attempts_used,
            passed = state.passed,
            "quiz attempt recorded"
        );
        Ok(state)
    }

    /// Merge a server acknowledgement into a chapter's state
    pub fn apply_ack(&mut self, chapter_id: &str, ack: AttemptAck) {
        let state = self.chapters.entry(chapter_id.to_string()).or_default();
        state.merge(&QuizAttemptState {
            attempts_used: 0,
            best_score_percent: ack.best_score_percent,
            passed: ack.passed,
        });
    }

    /// Merge a full remote snapshot into a chapter's state
    pub fn merge_remote(&mut self, chapter_id: &str, remote: &QuizAttemptState) {
        self.chapters.entry(chapter_id.to_string()).or_default().merge(remote);
    }

    /// State of a chapter, empty if no attempt is known
    pub fn state(&self, chapter_id: &str) -> &QuizAttemptState {
        self.chapters.get(chapter_id).unwrap_or(&NO_ATTEMPTS)
    }

    /// Iterate over all known states
    pub fn iter(&self) -> impl Iterator<Item = (&ChapterId, &QuizAttemptState)> {
        self.chapters.iter()
    }

    /// Replace every state, e.g. when restoring a cache
    pub fn replace_all(&mut self, states: HashMap<ChapterId, QuizAttemptState>) {
        self.chapters = states;
    }

    /// Drop every attempt state (logout)
    pub fn clear(&mut self) {
        self.chapters.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::model::QuizSpec;
    use proptest::prelude::*;

    fn open_spec(passing: f64) -> ChapterContentSpec {
        ChapterContentSpec::new("ch", 0, false).with_quiz(QuizSpec {
            is_generated: true,
            number_of_questions: 5,
            passing_score_percent: passing,
            max_attempts: 2,
        })
    }

    #[test]
    fn records_best_score_and_pass() {
        let spec = open_spec(70.0);
        let progress = LearnerChapterProgress::default();
        let mut record = AttemptRecord::default();

        record.record_attempt("ch", Some(&spec), &progress, 60.0).unwrap();
        record.record_attempt("ch", Some(&spec), &progress, 80.0).unwrap();
        let state = record.record_attempt("ch", Some(&spec), &progress, 20.0).unwrap().clone();

        assert_eq!(state.attempts_used, 3);
        assert_eq!(state.best_score_percent, Some(80.0));
        assert!(state.passed);
    }

    #[test]
    fn passing_score_is_inclusive() {
        let spec = open_spec(70.0);
        let mut record = AttemptRecord::default();
        let progress = LearnerChapterProgress::default();
        let state = record.record_attempt("ch", Some(&spec), &progress, 70.0).unwrap();
        assert!(state.passed);
    }

    #[test]
    fn attempts_beyond_max_are_still_recorded() {
        let spec = open_spec(90.0);
        let progress = LearnerChapterProgress::default();
        let mut record = AttemptRecord::default();
        for _ in 0..4 {
            record.record_attempt("ch", Some(&spec), &progress, 10.0).unwrap();
        }
        assert_eq!(record.state("ch").attempts_used, 4);
    }

    #[test]
    fn rejects_ungenerated_quiz() {
        let spec = ChapterContentSpec::new("ch", 0, false)
            .with_quiz(QuizSpec { is_generated: false, ..QuizSpec::default() });
        let mut record = AttemptRecord::default();
        let progress = LearnerChapterProgress::default();
        let err = record.record_attempt("ch", Some(&spec), &progress, 90.0).unwrap_err();
        assert_eq!(err, EngineError::invalid_attempt("ch", AttemptRejection::QuizNotGenerated));
        assert_eq!(record.state("ch"), &QuizAttemptState::default());
    }

    #[test]
    fn rejects_locked_chapter() {
        let spec = ChapterContentSpec::new("ch", 2, false).with_quiz(open_spec(70.0).quiz.unwrap());
        let mut record = AttemptRecord::default();
        let progress = LearnerChapterProgress::default();
        let err = record.record_attempt("ch", Some(&spec), &progress, 90.0).unwrap_err();
        assert_eq!(err, EngineError::invalid_attempt("ch", AttemptRejection::ChapterLocked));
        assert_eq!(record.state("ch").attempts_used, 0);
    }

    #[test]
    fn rejects_unknown_chapter_and_bad_scores() {
        let mut record = AttemptRecord::default();
        let progress = LearnerChapterProgress::default();
        assert!(matches!(
            record.record_attempt("ch", None, &progress, 50.0),
            Err(EngineError::InvalidAttempt { reason: AttemptRejection::UnknownChapter, .. })
        ));

        let spec = open_spec(70.0);
        for score in [-1.0, 100.5, f64::NAN] {
            assert!(matches!(
                record.record_attempt("ch", Some(&spec), &progress, score),
                Err(EngineError::InvalidAttempt { reason: AttemptRejection::ScoreOutOfRange, .. })
            ));
        }
    }

    #[test]
    fn ack_cannot_revoke_pass() {
        let spec = open_spec(50.0);
        let mut record = AttemptRecord::default();
        let progress = LearnerChapterProgress::default();
        record.record_attempt("ch", Some(&spec), &progress, 60.0).unwrap();

        record.apply_ack("ch", AttemptAck { passed: false, best_score_percent: Some(30.0) });
        let state = record.state("ch");
        assert!(state.passed);
        assert_eq!(state.best_score_percent, Some(60.0));
        assert_eq!(state.attempts_used, 1);
    }

    #[test]
    fn remote_merge_takes_maximums() {
        let mut record = AttemptRecord::default();
        let earlier =
            QuizAttemptState { attempts_used: 2, best_score_percent: Some(40.0), passed: false };
        let stale = QuizAttemptState { attempts_used: 1, best_score_percent: None, passed: false };
        record.merge_remote("ch", &earlier);
        record.merge_remote("ch", &stale);
        assert_eq!(
            record.state("ch"),
            &QuizAttemptState { attempts_used: 2, best_score_percent: Some(40.0), passed: false }
        );
    }

    proptest! {
        #[test]
        fn attempts_and_pass_are_monotone(scores in prop::collection::vec(0.0f64..=100.0, 1..30)) {
            let spec = open_spec(70.0);
            let progress = LearnerChapterProgress::default();
            let mut record = AttemptRecord::default();
            let mut last = QuizAttemptState::default();

            for score in scores {
                let next =
                    record.record_attempt("ch", Some(&spec), &progress, score).unwrap().clone();
                prop_assert!(next.attempts_used > last.attempts_used);
                prop_assert!(!last.passed || next.passed);
                prop_assert!(next.best_score_percent >= last.best_score_percent);
                last = next;
            }
        }
    }
}
