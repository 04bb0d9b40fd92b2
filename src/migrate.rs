//! Per-file entry point: extract, rewrite, normalize, reassemble.

use serde::Serialize;

use crate::config::MigrateOptions;
use crate::context::{LifecycleRewriteRecord, RunContext};
use crate::error::{MigrationError, Note};
use crate::normalize::{Pipeline, ScriptState, Stage};
use crate::rewriter::rewrite_script;
use crate::sfc::Document;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrateOutput {
    pub code: String,
    /// False when the input had nothing to migrate and `code` is the input.
    pub changed: bool,
    pub notes: Vec<Note>,
    pub lifecycle: Vec<LifecycleRewriteRecord>,
    pub stages: Vec<Stage>,
}

impl MigrateOutput {
    fn unchanged(source: &str, notes: Vec<Note>) -> Self {
        MigrateOutput {
            code: source.to_string(),
            changed: false,
            notes,
            lifecycle: Vec::new(),
            stages: Vec::new(),
        }
    }
}

/// Migrates one document (or one bare script with `script_only`).
pub fn migrate(source: &str, options: &MigrateOptions) -> Result<MigrateOutput, MigrationError> {
    let _span = tracing::info_span!("migrate", file = %options.file_name).entered();

    let doc = if options.script_only {
        Document::bare(source)
    } else {
        match Document::extract(source) {
            Some(doc) => doc,
            None => {
                tracing::debug!("no script block to migrate");
                return Ok(MigrateOutput::unchanged(source, Vec::new()));
            }
        }
    };

    let mut cx = RunContext::new(&options.file_name);
    let script = rewrite_script(&doc.script, doc.is_typescript(), options, &mut cx)?;
    if !cx.converted_component {
        return Ok(MigrateOutput::unchanged(source, cx.notes));
    }

    let mut state = ScriptState::new(Document { script, ..doc });
    let stages = Pipeline::standard(options).run(&mut state, &mut cx, options)?;

    tracing::info!(
        notes = cx.notes.len(),
        hooks = cx.lifecycle.len(),
        "component migrated"
    );
    Ok(MigrateOutput {
        code: state.doc.assemble(),
        changed: true,
        notes: cx.notes,
        lifecycle: cx.lifecycle,
        stages,
    })
}

/// Never fails: on any error the input comes back unchanged.
pub fn migrate_or_original(source: &str, options: &MigrateOptions) -> String {
    match migrate(source, options) {
        Ok(output) => output.code,
        Err(e) => {
            tracing::warn!(file = %options.file_name, code = e.code(), "{}", e);
            source.to_string()
        }
    }
}
