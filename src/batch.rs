//! Batch driver: migrates every component file under a directory.
//!
//! Files are processed in parallel with one [`RunContext`](crate::context::RunContext)
//! per file. A failure leaves that file untouched and is reported; it never
//! stops the rest of the batch.

use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::cache::{CachedResult, MigrationCache};
use crate::config::MigrateOptions;
use crate::error::{MigrationError, Note};
use crate::migrate::migrate;

const EXTENSIONS: &[&str] = &["vue", "ts", "js"];
const SKIPPED_DIRS: &[&str] = &["node_modules", ".git", "dist"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FileStatus {
    Migrated,
    Unchanged,
    Cached,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub path: PathBuf,
    pub status: FileStatus,
    pub notes: Vec<Note>,
    /// Error code and message for failed files.
    pub error: Option<(String, String)>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub files: Vec<FileReport>,
}

impl BatchReport {
    pub fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|f| f.status == status).count()
    }
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

/// Candidate files, sorted for a stable report order.
pub fn find_component_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e))
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| EXTENSIONS.contains(&ext))
        })
        .collect();
    files.sort();
    files
}

fn migrate_file(
    path: &Path,
    options: &MigrateOptions,
    write: bool,
    cache: Option<&MigrationCache>,
) -> Result<(FileStatus, Vec<Note>), MigrationError> {
    let source = fs::read_to_string(path).map_err(|source| MigrationError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut file_options = options.clone().with_file_name(path.to_string_lossy());
    if path.extension().is_some_and(|ext| ext != "vue") {
        file_options.script_only = true;
    }

    if let Some(cached) = cache.and_then(|c| c.get(path, &source, &file_options)) {
        return Ok((FileStatus::Cached, cached.notes));
    }

    let output = migrate(&source, &file_options)?;
    if write && output.changed {
        fs::write(path, &output.code).map_err(|source| MigrationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    }
    if let Some(cache) = cache {
        // In write mode the file now holds the output; a later run sees that text.
        let key_source = if write { &output.code } else { &source };
        cache.set(
            path,
            key_source,
            &file_options,
            CachedResult {
                code: output.code.clone(),
                changed: output.changed,
                notes: output.notes.clone(),
            },
        );
    }

    let status = if output.changed {
        FileStatus::Migrated
    } else {
        FileStatus::Unchanged
    };
    Ok((status, output.notes))
}

/// Migrates every `.vue`/`.ts`/`.js` file under `dir`. With `write`, changed
/// files are overwritten in place.
pub fn migrate_dir(
    dir: &Path,
    options: &MigrateOptions,
    write: bool,
    cache: Option<&MigrationCache>,
) -> BatchReport {
    let files = find_component_files(dir);
    tracing::info!(dir = %dir.display(), files = files.len(), "batch migration");

    let reports: Vec<FileReport> = files
        .par_iter()
        .map(|path| match migrate_file(path, options, write, cache) {
            Ok((status, notes)) => FileReport {
                path: path.clone(),
                status,
                notes,
                error: None,
            },
            Err(e) => {
                tracing::warn!(file = %path.display(), code = e.code(), "{}", e);
                FileReport {
                    path: path.clone(),
                    status: FileStatus::Failed,
                    notes: Vec::new(),
                    error: Some((e.code().to_string(), e.to_string())),
                }
            }
        })
        .collect();

    BatchReport { files: reports }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("setup-migrate-batch-{}-{}", name, std::process::id()));
        fs::remove_dir_all(&dir).ok();
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    const COUNTER: &str = "<template><p>{{ count }}</p></template>\n<script lang=\"ts\">\nimport { Component, Vue } from 'vue-property-decorator'\n\n@Component\nexport default class Counter extends Vue {\n  count = 0\n}\n</script>\n";

    #[test]
    fn test_discovery_skips_vendor_dirs() {
        let dir = temp_dir("discovery");
        fs::create_dir_all(dir.join("node_modules/pkg")).unwrap();
        fs::create_dir_all(dir.join("src")).unwrap();
        fs::write(dir.join("node_modules/pkg/A.vue"), COUNTER).unwrap();
        fs::write(dir.join("src/B.vue"), COUNTER).unwrap();
        fs::write(dir.join("src/readme.md"), "# hi").unwrap();

        let files = find_component_files(&dir);
        assert_eq!(files, vec![dir.join("src/B.vue")]);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_batch_isolates_failures() {
        let dir = temp_dir("isolation");
        fs::write(dir.join("Good.vue"), COUNTER).unwrap();
        let broken = "<script lang=\"ts\">\nconst s = 'unterminated\n</script>\n";
        fs::write(dir.join("Broken.vue"), broken).unwrap();
        fs::write(dir.join("util.ts"), "export const x = 1\n").unwrap();

        let report = migrate_dir(&dir, &MigrateOptions::default(), true, None);
        assert_eq!(report.count(FileStatus::Migrated), 1);
        assert_eq!(report.count(FileStatus::Failed), 1);
        assert_eq!(report.count(FileStatus::Unchanged), 1);

        assert_eq!(fs::read_to_string(dir.join("Broken.vue")).unwrap(), broken);
        let migrated = fs::read_to_string(dir.join("Good.vue")).unwrap();
        assert!(migrated.contains("<script lang=\"ts\" setup>"));
        assert!(migrated.contains("const count = ref(0)"));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_store_modules_survive_write_mode() {
        let dir = temp_dir("store-module");
        let module = "import api from '@/api'\n\nexport default {\n  namespaced: true,\n  state: { items: [] },\n  mutations: {\n    set(state, items) {\n      state.items = items\n    },\n  },\n  actions: {\n    async load({ commit }) {\n      commit('set', await api.items())\n    },\n  },\n}\n";
        fs::write(dir.join("cart.js"), module).unwrap();
        fs::write(dir.join("Counter.vue"), COUNTER).unwrap();

        let report = migrate_dir(&dir, &MigrateOptions::default(), true, None);
        assert_eq!(report.count(FileStatus::Unchanged), 1);
        assert_eq!(report.count(FileStatus::Migrated), 1);
        assert_eq!(fs::read_to_string(dir.join("cart.js")).unwrap(), module);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_cache_skips_already_seen_files() {
        let dir = temp_dir("cache");
        let cache = MigrationCache::new(dir.join(".cache"));
        fs::write(dir.join("Counter.vue"), COUNTER).unwrap();

        let first = migrate_dir(&dir, &MigrateOptions::default(), false, Some(&cache));
        assert_eq!(first.count(FileStatus::Migrated), 1);
        let second = migrate_dir(&dir, &MigrateOptions::default(), false, Some(&cache));
        assert_eq!(second.count(FileStatus::Cached), 1);
        fs::remove_dir_all(&dir).ok();
    }
}
