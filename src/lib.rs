//! # setup-migrate
//!
//! Rewrites class-decorator and object-configuration Vue components into
//! `<script setup>` composition syntax, one file at a time.
//!
//! ## Run Invariants
//!
//! 1. **Per-file state**: every run owns a fresh [`context::RunContext`].
//!    Nothing is shared between files except immutable regexes.
//!
//! 2. **Classify, freeze, patch**: the binding table is filled by the
//!    classification walk and the field converter, frozen, and only then read
//!    by the use-site walk. Inserts after the freeze are rejected.
//!
//! 3. **First classification wins**: prop and store decorators are read
//!    before fields are planned, so a prop or store name is never turned into
//!    a local `ref`.
//!
//! 4. **`.value` placement**: `this.x` gets `.value` when `x` is a
//!    `RefBinding` or `PropBinding`, except inside a declarator that declares
//!    `x` itself.
//!
//! 5. **Stage order**: text stages run in a fixed order and check their
//!    declared preconditions at runtime
//!    ([`MigrationError::StageOrder`](error::MigrationError::StageOrder)).
//!
//! 6. **All or nothing**: any error leaves the file exactly as it was.
//!    Unrecognized shapes are passed through with a [`error::Note`].

#[cfg(feature = "napi")]
mod native;

pub mod batch;
pub mod cache;
pub mod classify;
pub mod config;
pub mod consolidate;
pub mod context;
pub mod error;
pub mod lifecycle;
pub mod methods;
pub mod migrate;
pub mod normalize;
pub mod object_config;
pub mod rewriter;
pub mod sfc;
pub mod store;
pub mod tree;
pub mod use_site;

#[cfg(test)]
mod normalize_tests;

pub use batch::{migrate_dir, BatchReport, FileReport, FileStatus};
pub use cache::MigrationCache;
pub use config::{MigrateOptions, SourceSyntax};
pub use error::{MigrationError, Note};
pub use migrate::{migrate, migrate_or_original, MigrateOutput};
pub use normalize::{Pipeline, Stage};

#[cfg(feature = "napi")]
pub use native::{migrate_dir_native, migrate_native};
