//! Small named blobs that survive across sessions.
//!
//! The only blob today is the quiz record: four counters and the selected
//! generation. Semantics are deliberately minimal: last write wins, read on
//! startup, fall back to defaults when the blob is absent or unreadable.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cache::lock;
use crate::{CacheError, Result};

/// Name under which [`QuizRecord`] is stored.
pub const QUIZ_BLOB: &str = "quiz-storage";

/// Score awarded for a correct answer.
pub const POINTS_PER_ANSWER: u32 = 10;

/// Durable key/value storage for small text blobs.
pub trait BlobStore: Send + Sync {
    /// Read the blob, or `None` if it was never written.
    fn load(&self, name: &str) -> Result<Option<String>>;

    /// Replace the blob's contents.
    fn save(&self, name: &str, contents: &str) -> Result<()>;
}

/// One JSON file per blob under a directory.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default location: `<data dir>/dexcache`.
    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join("dexcache")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

impl BlobStore for FileBlobStore {
    fn load(&self, name: &str) -> Result<Option<String>> {
        let path = self.path_for(name);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::Storage(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    /// Atomic write via tmp file + rename. Creates the directory if needed.
    fn save(&self, name: &str, contents: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            CacheError::Storage(format!(
                "failed to create storage dir {}: {e}",
                self.dir.display()
            ))
        })?;

        let path = self.path_for(name);
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, contents).map_err(|e| {
            CacheError::Storage(format!("failed to write {}: {e}", tmp_path.display()))
        })?;
        std::fs::rename(&tmp_path, &path).map_err(|e| {
            CacheError::Storage(format!(
                "failed to rename {} → {}: {e}",
                tmp_path.display(),
                path.display()
            ))
        })
    }
}

/// In-process blob store, for tests and hosts without durable storage.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn load(&self, name: &str) -> Result<Option<String>> {
        Ok(lock(&self.blobs).get(name).cloned())
    }

    fn save(&self, name: &str, contents: &str) -> Result<()> {
        lock(&self.blobs).insert(name.to_string(), contents.to_string());
        Ok(())
    }
}

/// Persisted quiz statistics and settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuizRecord {
    pub score: u32,
    pub best_streak: u32,
    pub total_rounds: u32,
    pub correct_answers: u32,
    /// Selected generation (1–9), or `None` for all generations.
    pub generation: Option<u8>,
}

impl QuizRecord {
    /// Load the record, falling back to defaults when it is absent or corrupt.
    pub fn load(store: &dyn BlobStore) -> Self {
        let contents = match store.load(QUIZ_BLOB) {
            Ok(Some(contents)) => contents,
            Ok(None) => return Self::default(),
            Err(e) => {
                warn!(blob = QUIZ_BLOB, error = %e, "failed to read quiz record");
                return Self::default();
            }
        };
        match serde_json::from_str(&contents) {
            Ok(record) => record,
            Err(e) => {
                warn!(blob = QUIZ_BLOB, error = %e, "corrupt quiz record, using defaults");
                Self::default()
            }
        }
    }

    /// Write the record, replacing whatever was stored before.
    pub fn save(&self, store: &dyn BlobStore) -> Result<()> {
        let json = serde_json::to_string(self)?;
        store.save(QUIZ_BLOB, &json)?;
        info!(blob = QUIZ_BLOB, "saved quiz record");
        Ok(())
    }

    /// Score one answer. `streak` is the session's current streak (not
    /// persisted); the updated streak is returned.
    pub fn record_answer(&mut self, correct: bool, streak: u32) -> u32 {
        let streak = if correct { streak.saturating_add(1) } else { 0 };
        self.total_rounds = self.total_rounds.saturating_add(1);
        if correct {
            self.score = self.score.saturating_add(POINTS_PER_ANSWER);
            self.correct_answers = self.correct_answers.saturating_add(1);
        }
        self.best_streak = self.best_streak.max(streak);
        streak
    }

    /// Percentage of rounds answered correctly, rounded.
    pub fn accuracy(&self) -> u32 {
        if self.total_rounds == 0 {
            return 0;
        }
        ((f64::from(self.correct_answers) / f64::from(self.total_rounds)) * 100.0).round() as u32
    }

    /// Zero the game counters. Best streak and the generation setting are
    /// kept.
    pub fn reset_counters(&mut self) {
        *self = Self {
            best_streak: self.best_streak,
            generation: self.generation,
            ..Self::default()
        };
    }
}
