//! On-disk cache of migration results, keyed by file path and content hash.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::MigrateOptions;
use crate::error::Note;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedResult {
    pub code: String,
    pub changed: bool,
    pub notes: Vec<Note>,
}

#[derive(Serialize, Deserialize)]
pub struct CacheEntry {
    pub hash: String,
    pub result: CachedResult,
}

pub struct MigrationCache {
    cache_dir: PathBuf,
}

impl MigrationCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        let cache_dir = cache_dir.into();
        if !cache_dir.exists() {
            if let Err(e) = fs::create_dir_all(&cache_dir) {
                tracing::warn!(dir = %cache_dir.display(), "cannot create cache dir: {}", e);
            }
        }
        Self { cache_dir }
    }

    /// Hash of the source and the options that shape the output.
    pub fn compute_hash(source: &str, options: &MigrateOptions) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        // `file_name` only feeds diagnostics.
        let shaping = MigrateOptions {
            file_name: String::new(),
            ..options.clone()
        };
        if let Ok(json) = serde_json::to_string(&shaping) {
            hasher.update(json.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    fn entry_path(&self, file_path: &Path) -> PathBuf {
        let safe_name = file_path
            .to_string_lossy()
            .replace(['/', '\\', ':'], "_");
        self.cache_dir.join(format!("{}.json", safe_name))
    }

    pub fn get(&self, file_path: &Path, source: &str, options: &MigrateOptions) -> Option<CachedResult> {
        let entry_path = self.entry_path(file_path);
        let data = fs::read_to_string(&entry_path).ok()?;

        let entry: CacheEntry = match serde_json::from_str(&data) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(file = %file_path.display(), "cache entry unreadable, dropping: {}", e);
                fs::remove_file(entry_path).ok();
                return None;
            }
        };

        if entry.hash == Self::compute_hash(source, options) {
            tracing::trace!(file = %file_path.display(), "cache hit");
            Some(entry.result)
        } else {
            None
        }
    }

    pub fn set(&self, file_path: &Path, source: &str, options: &MigrateOptions, result: CachedResult) {
        let entry = CacheEntry {
            hash: Self::compute_hash(source, options),
            result,
        };
        match serde_json::to_string(&entry) {
            Ok(data) => {
                if let Err(e) = fs::write(self.entry_path(file_path), data) {
                    tracing::warn!(file = %file_path.display(), "cache write failed: {}", e);
                }
            }
            Err(e) => tracing::warn!(file = %file_path.display(), "cache encode failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("setup-migrate-cache-{}-{}", name, std::process::id()));
        fs::remove_dir_all(&dir).ok();
        dir
    }

    #[test]
    fn test_hash_tracks_shaping_options() {
        let base = MigrateOptions::default();
        let renamed = base.clone().with_file_name("Other.vue");
        let consolidated = MigrateOptions {
            consolidate_store: true,
            ..MigrateOptions::default()
        };
        let h = MigrationCache::compute_hash("x", &base);
        assert_eq!(h, MigrationCache::compute_hash("x", &renamed));
        assert_ne!(h, MigrationCache::compute_hash("x", &consolidated));
        assert_ne!(h, MigrationCache::compute_hash("y", &base));
    }

    #[test]
    fn test_round_trip_and_invalidation() {
        let dir = temp_dir("roundtrip");
        let cache = MigrationCache::new(&dir);
        let options = MigrateOptions::default();
        let file = Path::new("src/components/Counter.vue");
        let result = CachedResult {
            code: "migrated".into(),
            changed: true,
            notes: Vec::new(),
        };

        assert!(cache.get(file, "source", &options).is_none());
        cache.set(file, "source", &options, result.clone());
        assert_eq!(cache.get(file, "source", &options), Some(result));
        assert!(cache.get(file, "edited source", &options).is_none());

        fs::write(cache.entry_path(file), "{ not json").unwrap();
        assert!(cache.get(file, "source", &options).is_none());
        assert!(!cache.entry_path(file).exists());
        fs::remove_dir_all(&dir).ok();
    }
}
