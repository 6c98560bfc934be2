use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use super::matching::normalize_title;
use super::models::MediaRecord;
use crate::storage::pages::write_atomic;

pub const CACHE_FILE: &str = "anilist_cache.json";

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// On-disk layout of the metadata cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CacheFile {
    #[serde(default)]
    id: HashMap<String, MediaRecord>,
    #[serde(default)]
    title: HashMap<String, MediaRecord>,
    #[serde(default)]
    last_updated: i64,
}

impl CacheFile {
    fn empty() -> Self {
        Self {
            last_updated: now(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub total_title_lookups: usize,
    /// Unix seconds of the last save
    pub last_updated: i64,
}

fn now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Two-keyspace mirror of `anilist_cache.json`.
///
/// Memory is authoritative; the file is rewritten wholesale after each insert
/// and write failures are only logged.
pub struct MetadataCache {
    path: PathBuf,
    state: RwLock<CacheFile>,
}

impl MetadataCache {
    /// Load the cache from `data_root`, discarding it once older than the retention window
    pub fn load(data_root: &Path, retention_days: u32) -> Self {
        let path = data_root.join(CACHE_FILE);
        let state = read_cache_file(&path, i64::from(retention_days) * SECONDS_PER_DAY);
        Self {
            path,
            state: RwLock::new(state),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn by_id(&self, id: i64) -> Option<MediaRecord> {
        self.read(|c| c.id.get(&id.to_string()).cloned())
    }

    /// Look up by an already normalized title key
    pub fn by_title(&self, key: &str) -> Option<MediaRecord> {
        self.read(|c| c.title.get(key).cloned())
    }

    /// Index `record` by ID, by `query` and by each of its titles and synonyms
    pub fn insert(&self, record: &MediaRecord, query: Option<&str>) {
        let mut keys: Vec<String> = query.map(normalize_title).into_iter().collect();
        keys.extend(record.all_titles().into_iter().map(normalize_title));

        let mut cache = self.state.write().unwrap_or_else(PoisonError::into_inner);
        cache.id.insert(record.id.to_string(), record.clone());
        for key in keys.into_iter().filter(|k| !k.is_empty()) {
            cache.title.insert(key, record.clone());
        }
    }

    /// Persist the whole cache, bumping its timestamp
    pub async fn save(&self) {
        let snapshot = {
            let mut cache = self.state.write().unwrap_or_else(PoisonError::into_inner);
            cache.last_updated = now();
            serde_json::to_vec_pretty(&*cache)
        };

        let bytes = match snapshot {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Could not serialize metadata cache");
                return;
            }
        };

        if let Some(parent) = self.path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                warn!(path = %self.path.display(), error = %e, "Could not save metadata cache");
                return;
            }
        }
        match write_atomic(&self.path, &bytes).await {
            Ok(()) => debug!(path = %self.path.display(), entries = self.stats().total_entries, "Saved metadata cache"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "Could not save metadata cache"),
        }
    }

    /// Drop every entry and persist the empty cache
    pub async fn clear(&self) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = CacheFile::empty();
        self.save().await;
        info!("Metadata cache cleared");
    }

    pub fn stats(&self) -> CacheStats {
        self.read(|c| CacheStats {
            total_entries: c.id.len(),
            total_title_lookups: c.title.len(),
            last_updated: c.last_updated,
        })
    }

    fn read<T>(&self, f: impl FnOnce(&CacheFile) -> T) -> T {
        f(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }
}

fn read_cache_file(path: &Path, retention_secs: i64) -> CacheFile {
    let raw = match std::fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return CacheFile::empty(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not read metadata cache");
            return CacheFile::empty();
        }
    };

    let cache: CacheFile = match serde_json::from_slice(&raw) {
        Ok(cache) => cache,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Corrupt metadata cache, starting empty");
            return CacheFile::empty();
        }
    };

    if now() - cache.last_updated >= retention_secs {
        warn!(path = %path.display(), last_updated = cache.last_updated, "Metadata cache expired");
        return CacheFile::empty();
    }

    info!(entries = cache.id.len(), "Using metadata cache");
    cache
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::models::MediaTitle;
    use tempfile::TempDir;

    fn record(id: i64, english: &str, synonyms: &[&str]) -> MediaRecord {
        MediaRecord {
            id,
            title: MediaTitle {
                english: Some(english.to_string()),
                ..MediaTitle::default()
            },
            synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
            ..MediaRecord::default()
        }
    }

    #[tokio::test]
    async fn test_round_trip_through_disk() {
        let temp_dir = TempDir::new().unwrap();
        let cache = MetadataCache::load(temp_dir.path(), 30);
        cache.insert(&record(7, "Dr. Stone", &["Doctor Stone"]), Some("dr stone!"));
        cache.save().await;

        let reloaded = MetadataCache::load(temp_dir.path(), 30);
        assert_eq!(reloaded.by_id(7).map(|r| r.id), Some(7));
        assert!(reloaded.by_title("drstone").is_some());
        assert!(reloaded.by_title("doctorstone").is_some());
        assert_eq!(reloaded.stats().total_entries, 1);
        assert_eq!(reloaded.stats().total_title_lookups, 2);
    }

    #[tokio::test]
    async fn test_expired_cache_is_discarded() {
        let temp_dir = TempDir::new().unwrap();
        let mut id = HashMap::new();
        id.insert("7".to_string(), record(7, "Dr. Stone", &[]));
        let stale = CacheFile {
            id,
            title: HashMap::new(),
            last_updated: now() - 31 * SECONDS_PER_DAY,
        };
        std::fs::write(
            temp_dir.path().join(CACHE_FILE),
            serde_json::to_vec(&stale).unwrap(),
        )
        .unwrap();

        let cache = MetadataCache::load(temp_dir.path(), 30);
        assert!(cache.by_id(7).is_none());
        assert_eq!(cache.stats().total_entries, 0);

        let fresh = MetadataCache::load(temp_dir.path(), 60);
        assert!(fresh.by_id(7).is_some());
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(CACHE_FILE), b"{not json").unwrap();

        let cache = MetadataCache::load(temp_dir.path(), 30);
        assert_eq!(cache.stats().total_entries, 0);
    }

    #[tokio::test]
    async fn test_clear_persists_empty_cache() {
        let temp_dir = TempDir::new().unwrap();
        let cache = MetadataCache::load(temp_dir.path(), 30);
        cache.insert(&record(1, "Berserk", &[]), None);
        cache.save().await;

        cache.clear().await;

        assert_eq!(cache.stats().total_entries, 0);
        let reloaded = MetadataCache::load(temp_dir.path(), 30);
        assert!(reloaded.by_id(1).is_none());
    }
}
