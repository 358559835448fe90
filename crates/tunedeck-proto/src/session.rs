//! Session-scoped key/value storage.
//!
//! One JSON object on disk (`<data_dir>/session.json`). Each key is written as
//! a whole value, so related fields that must change together live under one
//! key. The file carries its last write time; opening a file older than the
//! idle TTL starts a fresh session.

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::protocol::{SearchFilter, SearchHit};

pub const KEY_LIKED_ITEMS: &str = "liked_items";
pub const KEY_LAST_SEARCH: &str = "last_search";
pub const KEY_METRICS_SNAPSHOT: &str = "metrics_snapshot";

/// Everything needed to redraw the results panel without a network round trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedSearch {
    pub query: String,
    #[serde(default)]
    pub filter: SearchFilter,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    entries: Map<String, Value>,
}

#[derive(Debug)]
pub struct SessionStore {
    path: Option<PathBuf>,
    entries: Map<String, Value>,
}

impl SessionStore {
    /// Store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Map::new(),
        }
    }

    /// Open the store at `path`, discarding it if idle longer than `ttl`.
    pub fn open(path: &Path, ttl: Duration) -> anyhow::Result<Self> {
        let mut store = Self {
            path: Some(path.to_path_buf()),
            entries: Map::new(),
        };
        if !path.exists() {
            debug!("no stored session at {}", path.display());
            return Ok(store);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let file: SessionFile = match serde_json::from_str(&content) {
            Ok(f) => f,
            Err(e) => {
                warn!("session file {} is corrupt, starting fresh: {}", path.display(), e);
                return Ok(store);
            }
        };

        let expired = match file.updated_at {
            Some(at) => {
                let idle = Utc::now().signed_duration_since(at);
                idle.to_std().map(|d| d > ttl).unwrap_or(false)
            }
            None => true,
        };
        if expired {
            info!("stored session expired, starting fresh");
            store.clear()?;
            return Ok(store);
        }

        store.entries = file.entries;
        info!("restored session with {} key(s)", store.entries.len());
        Ok(store)
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.entries.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("ignoring undecodable session key '{}': {}", key, e);
                None
            }
        }
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> anyhow::Result<()> {
        self.entries
            .insert(key.to_string(), serde_json::to_value(value)?);
        self.persist()
    }

    pub fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        if self.entries.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    pub fn clear(&mut self) -> anyhow::Result<()> {
        self.entries.clear();
        match &self.path {
            Some(path) if path.exists() => {
                std::fs::remove_file(path)
                    .with_context(|| format!("removing {}", path.display()))?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn persist(&self) -> anyhow::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = SessionFile {
            updated_at: Some(Utc::now()),
            entries: self.entries.clone(),
        };
        // Write-then-rename so a crash never leaves half a file behind.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec(&file)?)
            .with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("renaming to {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut store = SessionStore::open(&path, HOUR).unwrap();
        let saved = SavedSearch {
            query: "radiohead".into(),
            filter: SearchFilter::Artist,
            session_id: Some("abc".into()),
            hits: vec![],
        };
        store.set(KEY_LAST_SEARCH, &saved).unwrap();

        let reopened = SessionStore::open(&path, HOUR).unwrap();
        assert_eq!(reopened.get::<SavedSearch>(KEY_LAST_SEARCH), Some(saved));
    }

    #[test]
    fn test_expired_session_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let old = SessionFile {
            updated_at: Some(Utc::now() - chrono::Duration::hours(2)),
            entries: [(KEY_LIKED_ITEMS.to_string(), serde_json::json!(["a by b"]))]
                .into_iter()
                .collect(),
        };
        std::fs::write(&path, serde_json::to_string(&old).unwrap()).unwrap();

        let store = SessionStore::open(&path, HOUR).unwrap();
        assert!(!store.contains(KEY_LIKED_ITEMS));
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupt_file_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = SessionStore::open(&path, HOUR).unwrap();
        assert!(!store.contains(KEY_LAST_SEARCH));
    }

    #[test]
    fn test_wrong_shape_reads_as_none() {
        let mut store = SessionStore::in_memory();
        store.set(KEY_LAST_SEARCH, &42).unwrap();
        assert_eq!(store.get::<SavedSearch>(KEY_LAST_SEARCH), None);
        store.remove(KEY_LAST_SEARCH).unwrap();
        assert!(!store.contains(KEY_LAST_SEARCH));
    }
}
