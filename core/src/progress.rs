//! Progress checkpoints: the last item index reached per category.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::content::ContentCategory;
use crate::services::ProgressStore;

#[derive(Debug, Default, Clone)]
pub struct MemoryProgressStore {
    saved: HashMap<ContentCategory, usize>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressStore for MemoryProgressStore {
    fn save_progress(&mut self, category: ContentCategory, index: usize) {
        self.saved.insert(category, index);
    }

    fn load_progress(&self, category: ContentCategory) -> usize {
        self.saved.get(&category).copied().unwrap_or(0)
    }
}

/// On-disk layout: `{ "levelProgress": { "progress_easy": 3, ... } }`.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProgressFile {
    #[serde(default)]
    level_progress: BTreeMap<String, usize>,
}

fn progress_key(category: ContentCategory) -> String {
    format!("progress_{}", category.key())
}

/// File-backed store. Every save rewrites the whole file through a
/// temporary sibling and a rename, so a crash never leaves half a file.
#[derive(Debug)]
pub struct JsonProgressStore {
    path: PathBuf,
    data: ProgressFile,
}

impl JsonProgressStore {
    /// Open `path`, starting empty when it does not exist yet.
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("read progress {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("parse progress {}", path.display()))?
        } else {
            ProgressFile::default()
        };
        debug!(path = %path.display(), entries = data.level_progress.len(), "progress opened");
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the current checkpoints to disk.
    pub fn flush(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.data)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("replace {}", self.path.display()))?;
        Ok(())
    }
}

impl ProgressStore for JsonProgressStore {
    fn save_progress(&mut self, category: ContentCategory, index: usize) {
        let previous = self.data.level_progress.insert(progress_key(category), index);
        if previous == Some(index) {
            return;
        }
        if let Err(e) = self.flush() {
            warn!(%category, index, "failed to save progress: {e:#}");
        }
    }

    fn load_progress(&self, category: ContentCategory) -> usize {
        self.data
            .level_progress
            .get(&progress_key(category))
            .copied()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_defaults_to_zero() {
        let mut store = MemoryProgressStore::new();
        assert_eq!(store.load_progress(ContentCategory::Easy), 0);
        store.save_progress(ContentCategory::Easy, 4);
        assert_eq!(store.load_progress(ContentCategory::Easy), 4);
        assert_eq!(store.load_progress(ContentCategory::Hard), 0);
    }

    #[test]
    fn test_json_store_persists_across_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("player_progress.json");

        let mut store = JsonProgressStore::open(&path).unwrap();
        store.save_progress(ContentCategory::Article, 12);
        store.save_progress(ContentCategory::Easy, 3);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"progress_articles\": 12"));
        assert!(!dir.path().join("player_progress.json.tmp").exists());

        let reopened = JsonProgressStore::open(&path).unwrap();
        assert_eq!(reopened.load_progress(ContentCategory::Article), 12);
        assert_eq!(reopened.load_progress(ContentCategory::Easy), 3);
        assert_eq!(reopened.load_progress(ContentCategory::Medium), 0);
    }

    #[test]
    fn test_json_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(JsonProgressStore::open(&path).is_err());
    }
}
