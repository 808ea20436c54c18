//! Validation of remote payloads
//!
//! The platform API is loose about field names and types. Everything it
//! returns is funnelled through here into fully typed values; nothing past
//! this module looks at raw JSON.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use thiserror::Error;

use super::attempts::{AttemptAck, QuizAttemptState};
use super::model::{ChapterContentSpec, Course, LearnerChapterProgress, QuizSpec, VideoId};

const LINKED_KEYS: &[&str] =
    &["watchedLinkedVideos", "watched_linked_videos", "linkedVideos", "watchedVideos"];
const UPLOADED_KEYS: &[&str] =
    &["watchedUploadedVideos", "watched_uploaded_videos", "uploadedVideos"];
const SLIDES_KEYS: &[&str] = &["slidesViewed", "slides_viewed", "viewedSlides", "hasViewedSlides"];
const ATTEMPTS_KEYS: &[&str] = &["attemptsUsed", "attempts", "quizAttempts"];
const BEST_SCORE_KEYS: &[&str] = &["bestScorePercent", "bestScore", "highestScore"];
const PASSED_KEYS: &[&str] = &["passed", "quizPassed", "isPassed"];
const MESSAGES_KEYS: &[&str] = &["messages", "unreadMessages", "unread_messages"];
const NOTIFICATIONS_KEYS: &[&str] =
    &["notifications", "unreadNotifications", "unread_notifications"];
const CHAPTER_ID_KEYS: &[&str] = &["id", "_id", "chapterId"];

/// A payload that cannot be turned into a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// Expected a JSON object
    #[error("Expected a JSON object for {what}, got {found}")]
    NotAnObject {
        /// What was being parsed
        what: &'static str,
        /// JSON type that arrived instead
        found: &'static str,
    },

    /// A required field is absent
    #[error("Missing field {field} in {what}")]
    MissingField {
        /// What was being parsed
        what: &'static str,
        /// Field that was expected
        field: &'static str,
    },
}

/// Typed result of a chapter progress fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChapterSnapshot {
    /// Watched/viewed content
    pub progress: LearnerChapterProgress,
    /// Quiz history, when the server included it
    pub attempts: Option<QuizAttemptState>,
}

/// Authoritative unread totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnreadCounts {
    pub messages: u32,
    pub notifications: u32,
}

/// Course outline plus chapter specs
#[derive(Debug, Clone, PartialEq)]
pub struct CourseContent {
    pub course: Course,
    pub chapters: Vec<ChapterContentSpec>,
}

/// Parse a chapter progress payload
pub fn parse_chapter_snapshot(value: &Value) -> Result<ChapterSnapshot, SnapshotError> {
    let object = root_object(value, "chapter progress")?;

    let progress = LearnerChapterProgress {
        watched_linked_videos: video_set(object, LINKED_KEYS),
        watched_uploaded_videos: video_set(object, UPLOADED_KEYS),
        slides_viewed: lookup(object, SLIDES_KEYS).and_then(as_flag).unwrap_or(false),
    };

    let attempts_used = lookup(object, ATTEMPTS_KEYS).and_then(as_count);
    let best_score = lookup(object, BEST_SCORE_KEYS).and_then(as_score);
    let passed = lookup(object, PASSED_KEYS).and_then(as_flag);
    let attempts = if attempts_used.is_none() && best_score.is_none() && passed.is_none() {
        None
    } else {
        Some(QuizAttemptState {
            attempts_used: attempts_used.unwrap_or(0),
            best_score_percent: best_score,
            passed: passed.unwrap_or(false),
        })
    };

    Ok(ChapterSnapshot { progress, attempts })
}

/// Parse the response to a submitted quiz attempt
pub fn parse_attempt_ack(value: &Value) -> Result<AttemptAck, SnapshotError> {
    let object = root_object(value, "quiz attempt result")?;
    let passed = lookup(object, PASSED_KEYS)
        .and_then(as_flag)
        .ok_or(SnapshotError::MissingField { what: "quiz attempt result", field: "passed" })?;
    let best_score_percent = lookup(object, BEST_SCORE_KEYS).and_then(as_score);
    Ok(AttemptAck { passed, best_score_percent })
}

/// Parse unread totals; absent counters read as zero
pub fn parse_unread_counts(value: &Value) -> Result<UnreadCounts, SnapshotError> {
    let object = root_object(value, "unread counts")?;
    Ok(UnreadCounts {
        messages: lookup(object, MESSAGES_KEYS).and_then(as_count).unwrap_or(0),
        notifications: lookup(object, NOTIFICATIONS_KEYS).and_then(as_count).unwrap_or(0),
    })
}

/// Parse course content: an outline with a `chapters` array
///
/// The outline and the specs are kept apart. A chapter that can be
/// identified stays in the outline even when its spec is unusable, so it
/// evaluates as a chapter without a spec instead of vanishing from the
/// course. Entries may also be bare chapter ids.
pub fn parse_course_content(value: &Value) -> Result<CourseContent, SnapshotError> {
    let object = root_object(value, "course content")?;
    let id = lookup(object, &["id", "_id", "courseId"])
        .and_then(as_id)
        .ok_or(SnapshotError::MissingField { what: "course content", field: "id" })?;
    let title =
        lookup(object, &["title", "name"]).and_then(Value::as_str).unwrap_or_default().to_string();

    let mut chapter_ids = Vec::new();
    let mut chapters = Vec::new();
    for entry in lookup(object, &["chapters"]).and_then(Value::as_array).into_iter().flatten() {
        let Some(chapter_id) = chapter_entry_id(entry) else {
            tracing::warn!(course_id = %id, "Skipping chapter without an id");
            continue;
        };
        match parse_chapter_spec(entry) {
            Ok(spec) => chapters.push(spec),
            Err(e) => tracing::warn!(
                course_id = %id,
                %chapter_id,
                "Chapter has no usable content spec: {}",
                e
            ),
        }
        chapter_ids.push(chapter_id);
    }

    Ok(CourseContent { course: Course { id, title, chapter_ids }, chapters })
}

/// Id of an outline entry: a chapter object or a bare id
fn chapter_entry_id(entry: &Value) -> Option<String> {
    let id = match entry {
        Value::Object(object) => lookup(object, CHAPTER_ID_KEYS).and_then(as_id),
        other => as_id(other),
    };
    id.filter(|id| !id.is_empty())
}

/// Parse a single chapter's content spec
pub fn parse_chapter_spec(value: &Value) -> Result<ChapterContentSpec, SnapshotError> {
    let object = root_object(value, "chapter")?;
    let chapter_id = lookup(object, CHAPTER_ID_KEYS)
        .and_then(as_id)
        .ok_or(SnapshotError::MissingField { what: "chapter", field: "id" })?;

    // Either an explicit count or the length of the lecture list
    let lecture_list = || {
        lookup(object, &["lectures", "videos"]).and_then(Value::as_array).map(|a| a.len() as u32)
    };
    let count_keys = &["totalLectureCount", "lectureCount", "totalLectures"];
    let total_lecture_count = lookup(object, count_keys)
        .and_then(as_count)
        .or_else(lecture_list)
        .unwrap_or(0);

    let slide_flag = lookup(object, &["hasSlideMaterial", "hasSlides"]).and_then(as_flag);
    let has_slide_material = match slide_flag {
        Some(flag) => flag,
        None => lookup(object, &["slides", "slideUrl", "slidesUrl"]).is_some_and(|v| match v {
            Value::String(s) => !s.is_empty(),
            Value::Array(a) => !a.is_empty(),
            _ => true,
        }),
    };

    let quiz = lookup(object, &["quiz", "quizSpec"]).and_then(Value::as_object).map(|quiz| {
        let defaults = QuizSpec::default();
        QuizSpec {
            is_generated: lookup(quiz, &["isGenerated", "generated"])
                .and_then(as_flag)
                .unwrap_or(false),
            number_of_questions: lookup(quiz, &["numberOfQuestions", "questionCount"])
                .and_then(as_count)
                .unwrap_or(defaults.number_of_questions),
            passing_score_percent: lookup(quiz, &["passingScorePercent", "passingScore"])
                .and_then(as_score)
                .unwrap_or(defaults.passing_score_percent),
            max_attempts: lookup(quiz, &["maxAttempts"])
                .and_then(as_count)
                .unwrap_or(defaults.max_attempts),
        }
    });

    Ok(ChapterContentSpec { chapter_id, total_lecture_count, has_slide_material, quiz })
}

/// Unwrap an optional `data` envelope and require an object
fn root_object<'a>(
    value: &'a Value,
    what: &'static str,
) -> Result<&'a Map<String, Value>, SnapshotError> {
    let value = match value.get("data") {
        Some(inner) if inner.is_object() => inner,
        _ => value,
    };
    value.as_object().ok_or(SnapshotError::NotAnObject { what, found: type_name(value) })
}

/// First non-null value under any of the aliases
fn lookup<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|k| object.get(*k)).find(|v| !v.is_null())
}

fn video_set(object: &Map<String, Value>, keys: &[&str]) -> BTreeSet<VideoId> {
    lookup(object, keys)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    Value::Object(o) => lookup(o, &["url", "id", "videoId"]).and_then(as_id),
                    other => as_id(other),
                })
                .filter(|id| !id.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn as_count(value: &Value) -> Option<u32> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    (n.is_finite() && n >= 0.0).then(|| n.min(u32::MAX as f64) as u32)
}

fn as_score(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').parse().ok()?,
        _ => return None,
    };
    n.is_finite().then(|| n.clamp(0.0, 100.0))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_camel_case_progress() {
        let value = json!({
            "watchedLinkedVideos": ["https://youtu.be/a", "https://youtu.be/b"],
            "watchedUploadedVideos": ["up-1"],
            "slidesViewed": true
        });
        let snapshot = parse_chapter_snapshot(&value).unwrap();
        assert_eq!(snapshot.progress.watched_count(), 3);
        assert!(snapshot.progress.slides_viewed);
        assert!(snapshot.attempts.is_none());
    }

    #[test]
    fn parses_aliases_inside_data_envelope() {
        let value = json!({
            "data": {
                "watchedVideos": [{"url": "https://youtu.be/a"}, {"videoId": 42}],
                "uploaded_videos_ignored": ["x"],
                "viewedSlides": "1",
                "quizAttempts": 2,
                "highestScore": "65%",
                "isPassed": false
            }
        });
        let snapshot = parse_chapter_snapshot(&value).unwrap();
        let linked: Vec<_> = snapshot.progress.watched_linked_videos.iter().cloned().collect();
        assert_eq!(linked, vec!["42".to_string(), "https://youtu.be/a".to_string()]);
        assert!(snapshot.progress.watched_uploaded_videos.is_empty());
        assert!(snapshot.progress.slides_viewed);
        assert_eq!(
            snapshot.attempts,
            Some(QuizAttemptState {
                attempts_used: 2,
                best_score_percent: Some(65.0),
                passed: false,
            })
        );
    }

    #[test]
    fn null_fields_read_as_empty() {
        let value = json!({"watchedLinkedVideos": null, "slidesViewed": null});
        assert_eq!(parse_chapter_snapshot(&value).unwrap(), ChapterSnapshot::default());
    }

    #[test]
    fn rejects_non_object() {
        let err = parse_chapter_snapshot(&json!(["a"])).unwrap_err();
        assert_eq!(err, SnapshotError::NotAnObject { what: "chapter progress", found: "array" });
    }

    #[test]
    fn unread_counts_accept_aliases() {
        let value = json!({"unreadMessages": 4, "unread_notifications": "7"});
        let counts = parse_unread_counts(&value).unwrap();
        assert_eq!(counts, UnreadCounts { messages: 4, notifications: 7 });

        let counts = parse_unread_counts(&json!({"messages": -3})).unwrap();
        assert_eq!(counts, UnreadCounts::default());
    }

    #[test]
    fn attempt_ack_requires_passed() {
        let ack = parse_attempt_ack(&json!({"passed": true, "bestScore": 120})).unwrap();
        assert_eq!(ack, AttemptAck { passed: true, best_score_percent: Some(100.0) });

        let err = parse_attempt_ack(&json!({"bestScore": 10})).unwrap_err();
        assert!(matches!(err, SnapshotError::MissingField { field: "passed", .. }));
    }

    #[test]
    fn course_content_derives_specs() {
        let value = json!({
            "_id": "course-1",
            "title": "Rust 101",
            "chapters": [
                {
                    "_id": "ch-1",
                    "lectures": [{"title": "a"}, {"title": "b"}],
                    "slideUrl": "https://cdn/slides.pdf",
                    "quiz": {"isGenerated": true, "numberOfQuestions": 10, "passingScore": 80}
                },
                {"chapterId": "ch-2", "totalLectureCount": 0},
                {"title": "no id"}
            ]
        });
        let content = parse_course_content(&value).unwrap();
        assert_eq!(content.course.id, "course-1");
        assert_eq!(content.course.chapter_ids, vec!["ch-1".to_string(), "ch-2".to_string()]);

        let first = &content.chapters[0];
        assert_eq!(first.total_lecture_count, 2);
        assert!(first.has_slide_material);
        assert_eq!(
            first.quiz,
            Some(QuizSpec {
                is_generated: true,
                number_of_questions: 10,
                passing_score_percent: 80.0,
                max_attempts: 3,
            })
        );

        let second = &content.chapters[1];
        assert!(!second.has_slide_material);
        assert!(second.quiz.is_none());
    }

    #[test]
    fn course_outline_keeps_chapters_without_spec() {
        let value = json!({
            "id": "course-2",
            "chapters": [
                {"id": "a", "totalLectureCount": 1, "quiz": {"isGenerated": true}},
                "b",
                {"title": "broken chapter without id"},
                7
            ]
        });
        let content = parse_course_content(&value).unwrap();
        assert_eq!(content.course.chapter_ids, ["a", "b", "7"].map(String::from));
        let specs: Vec<_> = content.chapters.iter().map(|c| c.chapter_id.as_str()).collect();
        assert_eq!(specs, vec!["a"]);
    }

    #[test]
    fn unspecified_outline_chapter_blocks_completion() {
        use crate::error::IntegrityWarning;
        use crate::progress::{AttemptRecord, ContentCatalog, WatchLedger, evaluate_course};

        let value = json!({
            "id": "course-3",
            "chapters": [{"id": "a", "totalLectureCount": 0, "quiz": {"isGenerated": true}}, "b"]
        });
        let content = parse_course_content(&value).unwrap();
        let catalog: ContentCatalog = content.chapters.into_iter().collect();
        let ledger = WatchLedger::default();
        let mut attempts = AttemptRecord::default();
        attempts.record_attempt("a", catalog.get("a"), ledger.progress("a"), 100.0).unwrap();

        let report = evaluate_course(&content.course, &catalog, &ledger, &attempts);
        assert_eq!(report.progress_percent, 50);
        assert!(!report.completed);
        assert_eq!(
            report.warnings,
            vec![IntegrityWarning::MissingChapterSpec { chapter_id: "b".into() }]
        );
    }
}
