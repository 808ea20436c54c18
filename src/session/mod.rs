//! Per-learner session
//!
//! Owns the ledger, the attempt record and the content catalog for the
//! signed-in learner, and shares the unread counters with every screen.
//! Mutations apply locally first; the matching remote write runs in the
//! background and is never rolled back on failure. Refreshes replace local
//! state with whatever the server says.
//!
//! Closing the session cancels its liveness token. In-flight requests are
//! left to finish but their results are dropped.

pub mod pending;

use std::collections::{BTreeSet, HashMap};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub use pending::PendingWrite;

use crate::config::SessionCache;
use crate::counters::{CounterKind, CounterSynchronizer};
use crate::dashboard::{ActivityEvent, DashboardAggregator, DashboardView, SummaryStats};
use crate::error::{EngineError, IntegrityWarning};
use crate::progress::{
    AttemptAck, AttemptRecord, ChapterEvaluation, ChapterId, ChapterSnapshot, ChapterStatus,
    ContentCatalog, Course, CourseContent, CourseReport, LearnerId, VideoKind, WatchLedger,
    evaluate_chapter, evaluate_course,
};
use crate::remote::RemoteApi;

/// Outcome of a refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Local state now matches the server
    Fresh,
    /// The fetch failed or was discarded; last known values remain
    Stale,
}

impl Freshness {
    fn all(results: impl IntoIterator<Item = Freshness>) -> Freshness {
        if results.into_iter().all(|f| f == Freshness::Fresh) {
            Freshness::Fresh
        } else {
            Freshness::Stale
        }
    }
}

/// Cached state behind the session lock
#[derive(Debug, Default)]
struct SessionState {
    ledger: WatchLedger,
    attempts: AttemptRecord,
    catalog: ContentCatalog,
    courses: HashMap<String, Course>,
}

impl SessionState {
    fn apply_snapshot(&mut self, chapter_id: &str, snapshot: ChapterSnapshot) {
        self.ledger.replace_from_remote(chapter_id, snapshot.progress);
        if let Some(attempts) = snapshot.attempts {
            self.attempts.merge_remote(chapter_id, &attempts);
        }
    }

    fn clear(&mut self) {
        self.ledger.clear();
        self.attempts.clear();
        self.catalog.clear();
        self.courses.clear();
    }
}

/// Progress engine for one signed-in learner
pub struct LearnerSession<R: RemoteApi> {
    learner_id: LearnerId,
    remote: Arc<R>,
    state: Arc<RwLock<SessionState>>,
    counters: Arc<CounterSynchronizer>,
    alive: CancellationToken,
}

impl<R: RemoteApi> Clone for LearnerSession<R> {
    fn clone(&self) -> Self {
        Self {
            learner_id: self.learner_id.clone(),
            remote: Arc::clone(&self.remote),
            state: Arc::clone(&self.state),
            counters: Arc::clone(&self.counters),
            alive: self.alive.clone(),
        }
    }
}

impl<R: RemoteApi> LearnerSession<R> {
    /// Start a session
    pub fn new(
        learner_id: impl Into<LearnerId>,
        remote: Arc<R>,
        counters: Arc<CounterSynchronizer>,
    ) -> Self {
        Self {
            learner_id: learner_id.into(),
            remote,
            state: Arc::new(RwLock::new(SessionState::default())),
            counters,
            alive: CancellationToken::new(),
        }
    }

    pub fn learner_id(&self) -> &str {
        &self.learner_id
    }

    /// Unread counters shared with the rest of the client
    pub fn counters(&self) -> &Arc<CounterSynchronizer> {
        &self.counters
    }

    /// Whether the session is still open
    pub fn is_alive(&self) -> bool {
        !self.alive.is_cancelled()
    }

    /// Run `f` on the state unless the session has closed
    ///
    /// Liveness is checked under the write lock, and [`close`](Self::close)
    /// cancels under the same lock, so nothing lands in a cleared session.
    fn with_live_state<T>(&self, f: impl FnOnce(&mut SessionState) -> T) -> Option<T> {
        let mut state = self.state.write();
        if self.alive.is_cancelled() {
            return None;
        }
        Some(f(&mut *state))
    }

    // ----- course content -----

    /// Install a course outline and its chapter specs
    ///
    /// Returns false, installing nothing, once the session is closed.
    pub fn install_course(&self, content: CourseContent) -> bool {
        let warnings = self.with_live_state(|state| {
            for spec in content.chapters {
                state.catalog.insert(spec);
            }
            let course = content.course;
            let report = evaluate_course(&course, &state.catalog, &state.ledger, &state.attempts);
            state.courses.insert(course.id.clone(), course);
            report.warnings
        });
        let Some(warnings) = warnings else {
            return false;
        };
        for warning in warnings {
            tracing::warn!("{}", warning);
        }
        true
    }

    /// Fetch and install a course's content
    pub async fn load_course(&self, course_id: &str) -> Freshness {
        match self.remote.fetch_course_content(course_id).await {
            Ok(content) => {
                if self.install_course(content) {
                    Freshness::Fresh
                } else {
                    Freshness::Stale
                }
            }
            Err(e) => {
                tracing::warn!(course_id, "Failed to load course content: {}", e);
                Freshness::Stale
            }
        }
    }

    /// Identifiers of the loaded courses
    pub fn course_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state.read().courses.keys().cloned().collect();
        ids.sort();
        ids
    }

    // ----- refresh -----

    /// Replace a chapter's progress with the server's
    pub async fn refresh_chapter(&self, chapter_id: &str) -> Freshness {
        let fetched = self.remote.fetch_chapter_progress(&self.learner_id, chapter_id).await;
        let snapshot = match fetched {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(
                    chapter_id,
                    "Failed to refresh chapter progress; keeping last known: {}",
                    e
                );
                return Freshness::Stale;
            }
        };
        let known = self.with_live_state(|state| {
            state.apply_snapshot(chapter_id, snapshot);
            state.catalog.get(chapter_id).is_some()
        });
        match known {
            Some(true) => Freshness::Fresh,
            Some(false) => {
                let chapter_id = chapter_id.to_string();
                tracing::warn!("{}", IntegrityWarning::MissingChapterSpec { chapter_id });
                Freshness::Fresh
            }
            None => Freshness::Stale,
        }
    }

    /// Refresh every chapter of a loaded course concurrently
    pub async fn refresh_course(&self, course_id: &str) -> Freshness {
        let chapter_ids = self.state.read().courses.get(course_id).map(|c| c.chapter_ids.clone());
        let Some(chapter_ids) = chapter_ids else {
            let warning = IntegrityWarning::UnknownCourse { course_id: course_id.to_string() };
            tracing::warn!("{}", warning);
            return Freshness::Stale;
        };
        let results = join_all(chapter_ids.iter().map(|id| self.refresh_chapter(id))).await;
        Freshness::all(results)
    }

    /// Accept the server's unread totals
    pub async fn refresh_counts(&self) -> Freshness {
        let counts = match self.remote.fetch_unread_counts(&self.learner_id).await {
            Ok(counts) => counts,
            Err(e) => {
                tracing::warn!("Failed to refresh unread counts; keeping last known: {}", e);
                return Freshness::Stale;
            }
        };
        // Counters are reset by close() while it holds the state lock
        match self.with_live_state(|_| self.counters.set_all_authoritative(counts)) {
            Some(()) => Freshness::Fresh,
            None => Freshness::Stale,
        }
    }

    /// Refresh counters and every loaded course
    pub async fn refresh_all(&self) -> Freshness {
        let mut results = vec![self.refresh_counts().await];
        for course_id in self.course_ids() {
            results.push(self.refresh_course(&course_id).await);
        }
        Freshness::all(results)
    }

    /// Refresh everything on a fixed period until the session closes
    pub fn spawn_refresh_loop(&self, period: Duration) -> JoinHandle<()> {
        let session = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = session.alive.cancelled() => break,
                    _ = ticker.tick() => {
                        if session.refresh_all().await == Freshness::Stale {
                            tracing::debug!(
                                learner_id = %session.learner_id,
                                "periodic refresh left stale data"
                            );
                        }
                    }
                }
            }
            tracing::debug!(learner_id = %session.learner_id, "refresh loop stopped");
        })
    }

    // ----- optimistic writes -----

    /// Mark a video watched locally and tell the server in the background
    pub fn mark_video_watched(
        &self,
        chapter_id: &str,
        video_id: &str,
        kind: VideoKind,
    ) -> PendingWrite {
        let marked = self.with_live_state(|state| {
            state.ledger.mark_video_watched(chapter_id, video_id, kind)
        });
        if marked.is_none() {
            return PendingWrite::skipped();
        }

        let remote = Arc::clone(&self.remote);
        let learner_id = self.learner_id.clone();
        let chapter_id = chapter_id.to_string();
        let video_id = video_id.to_string();
        PendingWrite::spawned(tokio::spawn(async move {
            let result =
                remote.submit_video_watched(&learner_id, &chapter_id, &video_id, kind).await;
            if let Err(e) = &result {
                tracing::warn!(
                    %chapter_id,
                    %video_id,
                    "Failed to record watched video; keeping local mark: {}",
                    e
                );
            }
            result
        }))
    }

    /// Mark slides viewed locally and tell the server in the background
    pub fn mark_slides_viewed(&self, chapter_id: &str) -> PendingWrite {
        if self.with_live_state(|state| state.ledger.mark_slides_viewed(chapter_id)).is_none() {
            return PendingWrite::skipped();
        }

        let remote = Arc::clone(&self.remote);
        let learner_id = self.learner_id.clone();
        let chapter_id = chapter_id.to_string();
        PendingWrite::spawned(tokio::spawn(async move {
            let result = remote.submit_slides_viewed(&learner_id, &chapter_id).await;
            if let Err(e) = &result {
                tracing::warn!(
                    %chapter_id,
                    "Failed to record slide view; keeping local mark: {}",
                    e
                );
            }
            result
        }))
    }

    /// Record a quiz attempt locally, then submit it
    ///
    /// Rejected synchronously if the quiz cannot be taken. The server's
    /// acknowledgement is merged without ever lowering local state. A closed
    /// session records and sends nothing.
    pub fn submit_quiz_attempt(
        &self,
        chapter_id: &str,
        score_percent: f64,
    ) -> Result<PendingWrite<AttemptAck>, EngineError> {
        let recorded = self.with_live_state(|state| {
            state
                .attempts
                .record_attempt(
                    chapter_id,
                    state.catalog.get(chapter_id),
                    state.ledger.progress(chapter_id),
                    score_percent,
                )
                .map(|_| ())
        });
        match recorded {
            Some(result) => result?,
            None => return Ok(PendingWrite::skipped()),
        }

        let remote = Arc::clone(&self.remote);
        let state = Arc::clone(&self.state);
        let alive = self.alive.clone();
        let learner_id = self.learner_id.clone();
        let chapter_id = chapter_id.to_string();
        Ok(PendingWrite::spawned(tokio::spawn(async move {
            let result = remote.submit_quiz_attempt(&learner_id, &chapter_id, score_percent).await;
            match &result {
                Ok(ack) => {
                    let mut state = state.write();
                    if !alive.is_cancelled() {
                        state.attempts.apply_ack(&chapter_id, *ack);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        %chapter_id,
                        "Failed to submit quiz attempt; keeping local result: {}",
                        e
                    );
                }
            }
            result
        })))
    }

    /// Decrement an unread counter now and mark the item read remotely
    ///
    /// Call once per read event; the decrement is not idempotent.
    pub fn mark_item_read(&self, kind: CounterKind, item_id: &str) -> PendingWrite {
        if self.with_live_state(|_| self.counters.optimistic_decrement(kind, 1)).is_none() {
            return PendingWrite::skipped();
        }

        let remote = Arc::clone(&self.remote);
        let learner_id = self.learner_id.clone();
        let item_id = item_id.to_string();
        PendingWrite::spawned(tokio::spawn(async move {
            let result = remote.submit_mark_read(&learner_id, kind, &item_id).await;
            if let Err(e) = &result {
                tracing::warn!(
                    kind = kind.as_str(),
                    %item_id,
                    "Failed to mark item read; count stays decremented: {}",
                    e
                );
            }
            result
        }))
    }

    // ----- queries -----

    /// Full evaluation of one chapter
    pub fn chapter_evaluation(&self, chapter_id: &str) -> ChapterEvaluation {
        let state = self.state.read();
        let (evaluation, _) = evaluate_chapter(
            chapter_id,
            state.ledger.progress(chapter_id),
            state.catalog.get(chapter_id),
            state.attempts.state(chapter_id),
        );
        evaluation
    }

    /// Quiz status of one chapter
    pub fn chapter_status(&self, chapter_id: &str) -> ChapterStatus {
        self.chapter_evaluation(chapter_id).status
    }

    /// Roll-up of a loaded course
    pub fn course_report(&self, course_id: &str) -> Option<CourseReport> {
        let state = self.state.read();
        let course = state.courses.get(course_id)?;
        Some(evaluate_course(course, &state.catalog, &state.ledger, &state.attempts))
    }

    /// Reports of every loaded course, ordered by course id
    pub fn course_reports(&self) -> Vec<CourseReport> {
        self.course_ids().iter().filter_map(|id| self.course_report(id)).collect()
    }

    /// Course progress (0-100); unknown courses read as 0
    pub fn course_progress_percent(&self, course_id: &str) -> u8 {
        self.course_report(course_id).map_or(0, |r| r.progress_percent)
    }

    /// Chapters with progress or a place in a loaded course but no content spec
    pub fn integrity_warnings(&self) -> Vec<IntegrityWarning> {
        let state = self.state.read();
        let tracked = state.ledger.iter().map(|(id, _)| id);
        let outlined = state.courses.values().flat_map(|course| course.chapter_ids.iter());
        let missing: BTreeSet<&ChapterId> =
            tracked.chain(outlined).filter(|id| state.catalog.get(id).is_none()).collect();
        missing
            .into_iter()
            .map(|id| IntegrityWarning::MissingChapterSpec { chapter_id: id.clone() })
            .collect()
    }

    /// Unread count to display
    pub fn effective_unread_count(&self, kind: CounterKind) -> u32 {
        self.counters.effective_value(kind)
    }

    /// Dashboard of this learner from local reports and counters
    pub fn dashboard<E: Display>(
        &self,
        aggregator: &mut DashboardAggregator,
        summary: Result<SummaryStats, E>,
        activity: Result<Vec<ActivityEvent>, E>,
        now: i64,
    ) -> DashboardView {
        let reports = self.course_reports();
        aggregator.compose(summary, activity, &reports, &self.counters.snapshot(), now)
    }

    // ----- lifecycle -----

    /// Capture the ledger and attempts for the offline cache
    pub fn to_cache(&self, saved_at: i64) -> SessionCache {
        let state = self.state.read();
        SessionCache {
            learner_id: self.learner_id.clone(),
            chapters: state.ledger.iter().map(|(id, p)| (id.clone(), p.clone())).collect(),
            attempts: state.attempts.iter().map(|(id, a)| (id.clone(), a.clone())).collect(),
            saved_at,
        }
    }

    /// Replace the ledger and attempts with a cached copy
    ///
    /// Ignored if the cache belongs to another learner.
    pub fn restore_cache(&self, cache: SessionCache) -> bool {
        if cache.learner_id != self.learner_id {
            tracing::warn!(cached = %cache.learner_id, "Ignoring session cache of another learner");
            return false;
        }
        let mut state = self.state.write();
        state.ledger.clear();
        for (chapter_id, progress) in cache.chapters {
            state.ledger.replace_from_remote(&chapter_id, progress);
        }
        state.attempts.replace_all(cache.attempts);
        true
    }

    /// End the session: stop applying in-flight results and drop all state
    pub fn close(&self) {
        let mut state = self.state.write();
        self.alive.cancel();
        state.clear();
        self.counters.reset();
        drop(state);
        tracing::debug!(learner_id = %self.learner_id, "session closed");
    }
}
