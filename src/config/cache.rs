//! Offline session cache
//!
//! Keeps the last known ledger and quiz attempts of a learner on disk so a
//! session can start with something to show before the first refresh.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::Config;
use crate::progress::{ChapterId, LearnerChapterProgress, LearnerId, QuizAttemptState};

/// Cached progress of one learner
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionCache {
    /// Learner the cache belongs to
    pub learner_id: LearnerId,

    /// Ledger entries per chapter
    #[serde(default)]
    pub chapters: HashMap<ChapterId, LearnerChapterProgress>,

    /// Quiz attempts per chapter
    #[serde(default)]
    pub attempts: HashMap<ChapterId, QuizAttemptState>,

    /// Unix timestamp of when the cache was written
    pub saved_at: i64,
}

impl SessionCache {
    /// Load a learner's cache, if one was saved
    pub fn load(learner_id: &str) -> Result<Option<Self>> {
        Self::load_from(&Self::cache_path(learner_id)?)
    }

    /// Load a cache from a specific file
    pub fn load_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read session cache from {:?}", path))?;
        let cache = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {:?}", path))?;
        Ok(Some(cache))
    }

    /// Save this cache under the learner's path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::cache_path(&self.learner_id)?)
    }

    /// Save this cache to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create cache directory {:?}", parent))?;
        }

        let contents =
            serde_json::to_string(self).with_context(|| "Failed to serialize session cache")?;

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write session cache to {:?}", path))?;

        Ok(())
    }

    /// Delete a learner's cache (logout)
    pub fn forget(learner_id: &str) -> Result<()> {
        Self::forget_at(&Self::cache_path(learner_id)?)
    }

    /// Delete a cache file if it exists
    pub fn forget_at(path: &Path) -> Result<()> {
        if path.exists() {
            std::fs::remove_file(path)
                .with_context(|| format!("Failed to remove session cache {:?}", path))?;
        }
        Ok(())
    }

    /// Path of a learner's cache file
    pub fn cache_path(learner_id: &str) -> Result<PathBuf> {
        let file_name: String = learner_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        Ok(Config::cache_dir()?.join(format!("{file_name}.json")))
    }
}
