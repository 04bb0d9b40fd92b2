//! Migration failures and non-fatal notes.
//!
//! A `MigrationError` always means the file is left exactly as it was.
//! Unrecognized decorator or call shapes are *not* errors: the node passes
//! through unchanged and a [`Note`] is attached to the output instead.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::normalize::Stage;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("{file}:{line}:{column}: parse error: {message}")]
    Parse {
        file: String,
        message: String,
        line: u32,
        column: u32,
    },

    #[error("{file}: `{stage}` produced empty output")]
    EmptyOutput { file: String, stage: Stage },

    #[error("stage `{stage}` requires `{missing}` to run first")]
    StageOrder { stage: Stage, missing: Stage },

    #[error("{file}: pass `{pass}` aborted: {message}")]
    PassAborted {
        file: String,
        pass: &'static str,
        message: String,
    },

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MigrationError {
    /// Short machine-readable code, used by the batch report and the native bindings.
    pub fn code(&self) -> &'static str {
        match self {
            MigrationError::Parse { .. } => "MIGRATE-PARSE",
            MigrationError::EmptyOutput { .. } => "MIGRATE-EMPTY",
            MigrationError::StageOrder { .. } => "MIGRATE-ORDER",
            MigrationError::PassAborted { .. } => "MIGRATE-ABORT",
            MigrationError::Io { .. } => "MIGRATE-IO",
        }
    }
}

/// A construct the converters chose not to touch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub pass: String,
    pub message: String,
    pub offset: u32,
}

impl Note {
    pub fn unrecognized(pass: &str, message: impl Into<String>, offset: u32) -> Self {
        Note {
            pass: pass.to_string(),
            message: message.into(),
            offset,
        }
    }
}

/// Converts a byte offset into a 1-based line/column pair.
pub fn line_column(source: &str, offset: usize) -> (u32, u32) {
    let offset = offset.min(source.len());
    let before = &source[..offset];
    let line = before.matches('\n').count() as u32 + 1;
    let column = match before.rfind('\n') {
        Some(nl) => before[nl + 1..].chars().count() as u32 + 1,
        None => before.chars().count() as u32 + 1,
    };
    (line, column)
}

/// Extracts a printable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_column() {
        let src = "ab\ncd\nef";
        assert_eq!(line_column(src, 0), (1, 1));
        assert_eq!(line_column(src, 4), (2, 2));
        assert_eq!(line_column(src, 100), (3, 3));
    }

    #[test]
    fn test_error_display_mentions_stage() {
        let err = MigrationError::StageOrder {
            stage: Stage::StripThis,
            missing: Stage::InjectRouter,
        };
        assert_eq!(
            err.to_string(),
            "stage `strip-this` requires `inject-router` to run first"
        );
        assert_eq!(err.code(), "MIGRATE-ORDER");
    }
}
