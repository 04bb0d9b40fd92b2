//! Node bindings.

use napi_derive::napi;
use std::path::Path;

use crate::batch::migrate_dir;
use crate::cache::MigrationCache;
use crate::config::MigrateOptions;
use crate::migrate::migrate;

fn options_from(json: Option<String>) -> napi::Result<MigrateOptions> {
    MigrateOptions::from_json(json.as_deref().unwrap_or(""))
        .map_err(|e| napi::Error::from_reason(format!("Options parse error: {}", e)))
}

/// Migrates one document. Errors carry the `MIGRATE-*` code in the message.
#[napi]
pub fn migrate_native(source: String, options_json: Option<String>) -> napi::Result<serde_json::Value> {
    let options = options_from(options_json)?;
    let output = migrate(&source, &options)
        .map_err(|e| napi::Error::from_reason(format!("[{}] {}", e.code(), e)))?;
    serde_json::to_value(output).map_err(|e| napi::Error::from_reason(e.to_string()))
}

#[napi]
pub fn migrate_dir_native(
    dir: String,
    options_json: Option<String>,
    write: bool,
    cache_dir: Option<String>,
) -> napi::Result<serde_json::Value> {
    let options = options_from(options_json)?;
    let cache = cache_dir.map(MigrationCache::new);
    let report = migrate_dir(Path::new(&dir), &options, write, cache.as_ref());
    serde_json::to_value(report).map_err(|e| napi::Error::from_reason(e.to_string()))
}
