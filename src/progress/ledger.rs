//! Watch/view ledger
//!
//! Per-chapter record of watched videos and viewed slides for the signed-in
//! learner. Local marks only ever add; a remote snapshot replaces an entry
//! wholesale.

use std::collections::HashMap;

use super::model::{ChapterId, EMPTY_PROGRESS, LearnerChapterProgress, VideoKind};

/// Watched/viewed content per chapter
#[derive(Debug, Clone, Default)]
pub struct WatchLedger {
    chapters: HashMap<ChapterId, LearnerChapterProgress>,
}

impl WatchLedger {
    /// Mark a video as watched. Returns true if it was not already recorded.
    pub fn mark_video_watched(
        &mut self,
        chapter_id: &str,
        video_id: &str,
        kind: VideoKind,
    ) -> bool {
        let added = self.entry(chapter_id).videos_mut(kind).insert(video_id.to_string());
        if added {
            tracing::debug!(chapter_id, video_id, kind = kind.as_str(), "video marked watched");
        }
        added
    }

    /// Mark the slide material as viewed. Returns true if this changed anything.
    pub fn mark_slides_viewed(&mut self, chapter_id: &str) -> bool {
        let entry = self.entry(chapter_id);
        let changed = !entry.slides_viewed;
        entry.slides_viewed = true;
        changed
    }

    /// Replace a chapter's entry with a server snapshot
    ///
    /// The only operation that may remove watched videos.
    pub fn replace_from_remote(&mut self, chapter_id: &str, snapshot: LearnerChapterProgress) {
        self.chapters.insert(chapter_id.to_string(), snapshot);
    }

    /// Progress of a chapter, if any has been recorded or fetched
    pub fn get(&self, chapter_id: &str) -> Option<&LearnerChapterProgress> {
        self.chapters.get(chapter_id)
    }

    /// Progress of a chapter, empty if nothing is known
    pub fn progress(&self, chapter_id: &str) -> &LearnerChapterProgress {
        self.chapters.get(chapter_id).unwrap_or(&EMPTY_PROGRESS)
    }

    /// Iterate over all known entries
    pub fn iter(&self) -> impl Iterator<Item = (&ChapterId, &LearnerChapterProgress)> {
        self.chapters.iter()
    }

    /// Number of chapters with recorded progress
    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    /// Drop every entry (logout or full resync)
    pub fn clear(&mut self) {
        self.chapters.clear();
    }

    fn entry(&mut self, chapter_id: &str) -> &mut LearnerChapterProgress {
        self.chapters.entry(chapter_id.to_string()).or_default()
    }
}
