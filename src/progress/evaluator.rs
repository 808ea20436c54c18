//! Completion and unlock evaluation
//!
//! Pure functions deriving chapter status and course progress from the
//! ledger, the attempt record and course content. Nothing here mutates state
//! or logs; integrity problems come back as warnings.

use serde::Serialize;

use super::attempts::{AttemptRecord, QuizAttemptState};
use super::ledger::WatchLedger;
use super::model::{
    ChapterContentSpec, ChapterId, ChapterStatus, ContentCatalog, Course, LearnerChapterProgress,
};
use crate::error::IntegrityWarning;

/// Whether enough videos have been watched
///
/// Compares the number of distinct watched entries against the lecture
/// count; it does not check which lectures the videos belong to.
pub fn lectures_complete(progress: &LearnerChapterProgress, spec: &ChapterContentSpec) -> bool {
    spec.total_lecture_count == 0 || progress.watched_count() >= spec.total_lecture_count as usize
}

/// Whether the slide requirement is met
pub fn slides_satisfied(progress: &LearnerChapterProgress, spec: &ChapterContentSpec) -> bool {
    !spec.has_slide_material || progress.slides_viewed
}

/// Whether the quiz may be attempted
pub fn quiz_unlocked(progress: &LearnerChapterProgress, spec: &ChapterContentSpec) -> bool {
    spec.quiz_generated() && lectures_complete(progress, spec) && slides_satisfied(progress, spec)
}

/// Quiz status of a chapter
///
/// Exhausting every attempt without passing still reads as in progress.
pub fn quiz_status(
    progress: &LearnerChapterProgress,
    spec: &ChapterContentSpec,
    attempt: &QuizAttemptState,
) -> ChapterStatus {
    if !quiz_unlocked(progress, spec) {
        ChapterStatus::Locked
    } else if attempt.passed {
        ChapterStatus::Completed
    } else if attempt.attempts_used > 0 {
        ChapterStatus::InProgress
    } else {
        ChapterStatus::Available
    }
}

/// Derived state of one chapter
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterEvaluation {
    pub chapter_id: ChapterId,
    pub status: ChapterStatus,
    pub lectures_complete: bool,
    pub slides_satisfied: bool,
    /// Contribution to course progress (0-100)
    pub completion_percent: f64,
}

/// Evaluate a chapter
///
/// A missing spec degrades to a locked chapter worth 0% plus a warning. A
/// locked chapter the learner has not touched is worth 0% as well, even when
/// it has no lectures or no slides.
pub fn evaluate_chapter(
    chapter_id: &str,
    progress: &LearnerChapterProgress,
    spec: Option<&ChapterContentSpec>,
    attempt: &QuizAttemptState,
) -> (ChapterEvaluation, Option<IntegrityWarning>) {
    let Some(spec) = spec else {
        let evaluation = ChapterEvaluation {
            chapter_id: chapter_id.to_string(),
            status: ChapterStatus::Locked,
            lectures_complete: false,
            slides_satisfied: false,
            completion_percent: 0.0,
        };
        let warning = IntegrityWarning::MissingChapterSpec { chapter_id: chapter_id.to_string() };
        return (evaluation, Some(warning));
    };

    let lectures = lectures_complete(progress, spec);
    let slides = slides_satisfied(progress, spec);
    let status = quiz_status(progress, spec, attempt);

    let completion_percent = if status == ChapterStatus::Completed {
        100.0
    } else if status == ChapterStatus::Locked && progress.is_untouched() {
        // Vacuous requirements earn nothing until the learner starts
        0.0
    } else {
        let mut partial = 0.0;
        if lectures {
            partial += 50.0;
        }
        if slides {
            partial += 50.0;
        }
        partial
    };

    let evaluation = ChapterEvaluation {
        chapter_id: chapter_id.to_string(),
        status,
        lectures_complete: lectures,
        slides_satisfied: slides,
        completion_percent,
    };
    (evaluation, None)
}

/// Derived state of a whole course
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseReport {
    pub course_id: String,
    /// Per-chapter results in course order
    pub chapters: Vec<ChapterEvaluation>,
    /// Mean chapter completion, rounded (0-100)
    pub progress_percent: u8,
    /// Every chapter's quiz is completed
    pub completed: bool,
    #[serde(skip)]
    pub warnings: Vec<IntegrityWarning>,
}

impl CourseReport {
    /// Status of a chapter within this report
    pub fn status_of(&self, chapter_id: &str) -> Option<ChapterStatus> {
        self.chapters.iter().find(|c| c.chapter_id == chapter_id).map(|c| c.status)
    }
}

/// Mean of chapter percentages, rounded to the nearest integer
pub fn course_progress_percent(chapters: &[ChapterEvaluation]) -> u8 {
    if chapters.is_empty() {
        return 0;
    }
    let total: f64 = chapters.iter().map(|c| c.completion_percent).sum();
    let mean = total / chapters.len() as f64;
    mean.round().clamp(0.0, 100.0) as u8
}

/// Evaluate every chapter of a course and roll the results up
pub fn evaluate_course(
    course: &Course,
    catalog: &ContentCatalog,
    ledger: &WatchLedger,
    attempts: &AttemptRecord,
) -> CourseReport {
    let mut chapters = Vec::with_capacity(course.chapter_ids.len());
    let mut warnings = Vec::new();

    for chapter_id in &course.chapter_ids {
        let (evaluation, warning) = evaluate_chapter(
            chapter_id,
            ledger.progress(chapter_id),
            catalog.get(chapter_id),
            attempts.state(chapter_id),
        );
        chapters.push(evaluation);
        warnings.extend(warning);
    }

    let progress_percent = course_progress_percent(&chapters);
    let completed =
        !chapters.is_empty() && chapters.iter().all(|c| c.status == ChapterStatus::Completed);

    CourseReport { course_id: course.id.clone(), chapters, progress_percent, completed, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::model::{QuizSpec, VideoKind};
    use pretty_assertions::assert_eq;

    fn quiz(passing: f64) -> QuizSpec {
        QuizSpec {
            is_generated: true,
            number_of_questions: 10,
            passing_score_percent: passing,
            max_attempts: 3,
        }
    }

    fn course(id: &str, chapter_ids: &[&str]) -> Course {
        Course {
            id: id.into(),
            title: id.to_uppercase(),
            chapter_ids: chapter_ids.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn fresh_status(spec: &ChapterContentSpec) -> ChapterStatus {
        quiz_status(&LearnerChapterProgress::default(), spec, &QuizAttemptState::default())
    }

    fn spec(id: &str, lectures: u32, slides: bool) -> ChapterContentSpec {
        ChapterContentSpec::new(id, lectures, slides).with_quiz(quiz(70.0))
    }

    fn watch(ledger: &mut WatchLedger, chapter: &str, count: usize) {
        for i in 0..count {
            ledger.mark_video_watched(chapter, &format!("video-{i}"), VideoKind::Uploaded);
        }
    }

    #[test]
    fn zero_lectures_counts_as_complete() {
        let spec = spec("ch", 0, false);
        assert!(lectures_complete(&LearnerChapterProgress::default(), &spec));
        assert!(slides_satisfied(&LearnerChapterProgress::default(), &spec));
    }

    #[test]
    fn ungenerated_quiz_stays_locked() {
        let spec = ChapterContentSpec::new("ch", 0, false)
            .with_quiz(QuizSpec { is_generated: false, ..quiz(70.0) });
        assert_eq!(fresh_status(&spec), ChapterStatus::Locked);
    }

    #[test]
    fn chapter_without_quiz_stays_locked() {
        let spec = ChapterContentSpec::new("ch", 0, false);
        assert_eq!(fresh_status(&spec), ChapterStatus::Locked);
    }

    #[test]
    fn unlock_gating_sequence() {
        let spec = spec("ch", 3, true);
        let mut ledger = WatchLedger::default();
        let mut attempts = AttemptRecord::default();

        watch(&mut ledger, "ch", 2);
        ledger.mark_slides_viewed("ch");
        let status = quiz_status(ledger.progress("ch"), &spec, attempts.state("ch"));
        assert_eq!(status, ChapterStatus::Locked);

        ledger.mark_video_watched("ch", "video-2", VideoKind::Linked);
        let status = quiz_status(ledger.progress("ch"), &spec, attempts.state("ch"));
        assert_eq!(status, ChapterStatus::Available);

        attempts.record_attempt("ch", Some(&spec), ledger.progress("ch"), 50.0).unwrap();
        let status = quiz_status(ledger.progress("ch"), &spec, attempts.state("ch"));
        assert_eq!(status, ChapterStatus::InProgress);

        attempts.record_attempt("ch", Some(&spec), ledger.progress("ch"), 85.0).unwrap();
        let status = quiz_status(ledger.progress("ch"), &spec, attempts.state("ch"));
        assert_eq!(status, ChapterStatus::Completed);
    }

    #[test]
    fn exhausted_attempts_still_in_progress() {
        let spec = spec("ch", 0, false);
        let attempt =
            QuizAttemptState { attempts_used: 7, best_score_percent: Some(40.0), passed: false };
        let status = quiz_status(&LearnerChapterProgress::default(), &spec, &attempt);
        assert_eq!(status, ChapterStatus::InProgress);
    }

    #[test]
    fn partial_credit_before_quiz() {
        let spec = spec("ch", 2, true);
        let mut ledger = WatchLedger::default();
        watch(&mut ledger, "ch", 2);

        let no_attempt = QuizAttemptState::default();
        let (evaluation, warning) =
            evaluate_chapter("ch", ledger.progress("ch"), Some(&spec), &no_attempt);
        assert!(warning.is_none());
        assert_eq!(evaluation.status, ChapterStatus::Locked);
        assert_eq!(evaluation.completion_percent, 50.0);
    }

    #[test]
    fn untouched_locked_chapter_earns_nothing() {
        let untouched = LearnerChapterProgress::default();
        let no_attempt = QuizAttemptState::default();

        // one lecture, no slides: the slide half would otherwise be free
        let one_lecture = spec("ch", 1, false);
        let (evaluation, _) = evaluate_chapter("ch", &untouched, Some(&one_lecture), &no_attempt);
        assert_eq!(evaluation.status, ChapterStatus::Locked);
        assert!(evaluation.slides_satisfied);
        assert_eq!(evaluation.completion_percent, 0.0);

        // nothing to consume and no quiz: both halves would otherwise be free
        let quizless = ChapterContentSpec::new("b", 0, false);
        let (evaluation, _) = evaluate_chapter("b", &untouched, Some(&quizless), &no_attempt);
        assert_eq!(evaluation.status, ChapterStatus::Locked);
        assert_eq!(evaluation.completion_percent, 0.0);

        // any real consumption restores partial credit
        let mut ledger = WatchLedger::default();
        ledger.mark_slides_viewed("ch");
        let with_slides = spec("ch", 1, true);
        let (evaluation, _) =
            evaluate_chapter("ch", ledger.progress("ch"), Some(&with_slides), &no_attempt);
        assert_eq!(evaluation.status, ChapterStatus::Locked);
        assert_eq!(evaluation.completion_percent, 50.0);
    }

    #[test]
    fn roll_up_arithmetic() {
        let course = course("c1", &["a", "b"]);
        let catalog: ContentCatalog =
            [spec("a", 1, false), spec("b", 2, true)].into_iter().collect();
        let mut ledger = WatchLedger::default();
        let mut attempts = AttemptRecord::default();

        watch(&mut ledger, "a", 1);
        attempts.record_attempt("a", catalog.get("a"), ledger.progress("a"), 90.0).unwrap();
        watch(&mut ledger, "b", 2);

        let report = evaluate_course(&course, &catalog, &ledger, &attempts);
        assert_eq!(report.status_of("a"), Some(ChapterStatus::Completed));
        assert_eq!(report.status_of("b"), Some(ChapterStatus::Locked));
        assert_eq!(report.progress_percent, 75);
        assert!(!report.completed);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn missing_spec_degrades_without_panicking() {
        let course = course("c1", &["ghost"]);
        let mut ledger = WatchLedger::default();
        watch(&mut ledger, "ghost", 5);
        ledger.mark_slides_viewed("ghost");

        let catalog = ContentCatalog::default();
        let report = evaluate_course(&course, &catalog, &ledger, &AttemptRecord::default());
        assert_eq!(report.status_of("ghost"), Some(ChapterStatus::Locked));
        assert_eq!(report.progress_percent, 0);
        assert_eq!(
            report.warnings,
            vec![IntegrityWarning::MissingChapterSpec { chapter_id: "ghost".into() }]
        );
    }

    #[test]
    fn empty_course_is_zero_and_not_completed() {
        let course = course("c", &[]);
        let catalog = ContentCatalog::default();
        let report =
            evaluate_course(&course, &catalog, &WatchLedger::default(), &AttemptRecord::default());
        assert_eq!(report.progress_percent, 0);
        assert!(!report.completed);
    }

    #[test]
    fn course_completes_when_every_quiz_passed() {
        let course = course("c", &["a", "b"]);
        let catalog: ContentCatalog =
            [spec("a", 0, false), spec("b", 0, false)].into_iter().collect();
        let ledger = WatchLedger::default();
        let mut attempts = AttemptRecord::default();
        attempts.record_attempt("a", catalog.get("a"), ledger.progress("a"), 70.0).unwrap();
        attempts.record_attempt("b", catalog.get("b"), ledger.progress("b"), 100.0).unwrap();

        let report = evaluate_course(&course, &catalog, &ledger, &attempts);
        assert!(report.completed);
        assert_eq!(report.progress_percent, 100);
    }

    #[test]
    fn quizless_chapter_blocks_course_completion() {
        let course = course("c", &["a", "b"]);
        let catalog: ContentCatalog =
            vec![spec("a", 0, false), ChapterContentSpec::new("b", 0, false)].into_iter().collect();
        let ledger = WatchLedger::default();
        let mut attempts = AttemptRecord::default();
        attempts.record_attempt("a", catalog.get("a"), ledger.progress("a"), 100.0).unwrap();

        let report = evaluate_course(&course, &catalog, &ledger, &attempts);
        assert!(!report.completed);
    }

    #[test]
    fn progress_rounds_half_up() {
        let make = |pct: f64| ChapterEvaluation {
            chapter_id: "x".into(),
            status: ChapterStatus::Locked,
            lectures_complete: false,
            slides_satisfied: false,
            completion_percent: pct,
        };
        assert_eq!(course_progress_percent(&[make(100.0), make(0.0), make(0.0)]), 33);
        assert_eq!(course_progress_percent(&[make(100.0), make(50.0), make(0.0), make(50.0)]), 50);
        assert_eq!(course_progress_percent(&[make(50.0), make(0.0), make(0.0), make(0.0)]), 13);
    }
}
