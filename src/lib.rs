//! Backup, restore and reset engine for a multi-workspace finance store.
//!
//! [`Exporter`] packages a workspace's entity tables into one archive, [`Importer`] writes an
//! archive's rows back, and [`Resetter`] bulk-deletes tables after an optional safety export.

pub mod catalog;
pub mod config;
pub mod db;
mod error;
pub mod export;
pub mod import;
pub mod logging;
pub mod migrate;
pub mod model;
pub mod progress;
pub mod report;
pub mod reset;
pub mod run;
pub mod store;
pub mod tabular;
pub mod time;
pub mod workspace;

pub use catalog::{EntityKind, EntitySelection};
pub use config::EngineConfig;
pub use error::{AppError, AppResult};
pub use export::{ExportArchive, ExportSummary, Exporter};
pub use import::{read_archive, ImportMode, ImportReport, Importer};
pub use logging::init_logging;
pub use model::{EntityRows, ImportPayload};
pub use progress::ProgressSink;
pub use reset::{ResetOptions, ResetPreview, ResetReport, Resetter};
pub use run::{FailurePolicy, RunOutcome};
pub use workspace::WorkspaceId;
