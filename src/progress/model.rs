//! Progress data model
//!
//! Course content (chapters, lectures, slides, quizzes) is owned by the
//! platform and read-only here. Learner progress is a session cache of
//! server truth.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Opaque chapter identifier
pub type ChapterId = String;
/// Opaque video identifier (an external URL or a platform upload id)
pub type VideoId = String;
/// Opaque learner identifier
pub type LearnerId = String;

/// Where a watched video is hosted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoKind {
    /// External video link (e.g. a YouTube URL)
    Linked,
    /// Video uploaded to the platform
    Uploaded,
}

impl VideoKind {
    /// Wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linked => "linked",
            Self::Uploaded => "uploaded",
        }
    }
}

/// Quiz settings of a chapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSpec {
    /// Whether questions have been generated yet
    pub is_generated: bool,
    /// Number of questions in the quiz
    pub number_of_questions: u32,
    /// Score (0-100) needed to pass
    pub passing_score_percent: f64,
    /// Attempts the learner is allowed
    pub max_attempts: u32,
}

impl Default for QuizSpec {
    fn default() -> Self {
        Self {
            is_generated: false,
            number_of_questions: 0,
            passing_score_percent: 70.0,
            max_attempts: 3,
        }
    }
}

/// Content metadata for a single chapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterContentSpec {
    /// Chapter this spec describes
    pub chapter_id: ChapterId,
    /// Number of lectures (videos) in the chapter
    pub total_lecture_count: u32,
    /// Whether the chapter carries slide material
    pub has_slide_material: bool,
    /// Quiz settings, if the chapter has a quiz
    #[serde(default)]
    pub quiz: Option<QuizSpec>,
}

impl ChapterContentSpec {
    /// Create a spec without a quiz
    pub fn new(
        chapter_id: impl Into<ChapterId>,
        total_lecture_count: u32,
        has_slide_material: bool,
    ) -> Self {
        Self { chapter_id: chapter_id.into(), total_lecture_count, has_slide_material, quiz: None }
    }

    /// Attach quiz settings
    pub fn with_quiz(mut self, quiz: QuizSpec) -> Self {
        self.quiz = Some(quiz);
        self
    }

    /// Whether a quiz exists and has been generated
    pub fn quiz_generated(&self) -> bool {
        self.quiz.as_ref().is_some_and(|q| q.is_generated)
    }

    /// Passing score, if a quiz exists
    pub fn passing_score(&self) -> Option<f64> {
        self.quiz.as_ref().map(|q| q.passing_score_percent)
    }
}

/// A course: an ordered list of chapters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    /// Course identifier
    pub id: String,
    /// Display title
    pub title: String,
    /// Chapters in order
    pub chapter_ids: Vec<ChapterId>,
}

/// Content specs indexed by chapter
#[derive(Debug, Clone, Default)]
pub struct ContentCatalog {
    specs: HashMap<ChapterId, ChapterContentSpec>,
}

impl ContentCatalog {
    /// Insert or replace a chapter spec
    pub fn insert(&mut self, spec: ChapterContentSpec) {
        self.specs.insert(spec.chapter_id.clone(), spec);
    }

    /// Look up the spec of a chapter
    pub fn get(&self, chapter_id: &str) -> Option<&ChapterContentSpec> {
        self.specs.get(chapter_id)
    }

    /// Number of chapters with a spec
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether no spec has been installed
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Forget every spec
    pub fn clear(&mut self) {
        self.specs.clear();
    }
}

impl FromIterator<ChapterContentSpec> for ContentCatalog {
    fn from_iter<I: IntoIterator<Item = ChapterContentSpec>>(iter: I) -> Self {
        let mut catalog = Self::default();
        for spec in iter {
            catalog.insert(spec);
        }
        catalog
    }
}

/// What a learner has consumed in one chapter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerChapterProgress {
    /// External videos marked watched
    #[serde(default)]
    pub watched_linked_videos: BTreeSet<VideoId>,
    /// Platform-hosted videos marked watched
    #[serde(default)]
    pub watched_uploaded_videos: BTreeSet<VideoId>,
    /// Whether the slide material has been opened
    #[serde(default)]
    pub slides_viewed: bool,
}

/// Progress of a chapter the learner has not touched yet
pub(crate) static EMPTY_PROGRESS: LearnerChapterProgress = LearnerChapterProgress {
    watched_linked_videos: BTreeSet::new(),
    watched_uploaded_videos: BTreeSet::new(),
    slides_viewed: false,
};

impl LearnerChapterProgress {
    /// Watched videos of one kind
    pub fn videos(&self, kind: VideoKind) -> &BTreeSet<VideoId> {
        match kind {
            VideoKind::Linked => &self.watched_linked_videos,
            VideoKind::Uploaded => &self.watched_uploaded_videos,
        }
    }

    pub(crate) fn videos_mut(&mut self, kind: VideoKind) -> &mut BTreeSet<VideoId> {
        match kind {
            VideoKind::Linked => &mut self.watched_linked_videos,
            VideoKind::Uploaded => &mut self.watched_uploaded_videos,
        }
    }

    /// Distinct watched entries across both kinds
    pub fn watched_count(&self) -> usize {
        self.watched_linked_videos.len() + self.watched_uploaded_videos.len()
    }

    /// Whether nothing has been consumed
    pub fn is_untouched(&self) -> bool {
        self.watched_count() == 0 && !self.slides_viewed
    }
}

/// Derived quiz status of a chapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChapterStatus {
    /// Quiz missing, not generated, or content still unconsumed
    Locked,
    /// Quiz unlocked, never attempted
    Available,
    /// Attempted at least once without passing
    InProgress,
    /// Quiz passed
    Completed,
}

impl ChapterStatus {
    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Available => "available",
            Self::InProgress => "in progress",
            Self::Completed => "completed",
        }
    }
}
