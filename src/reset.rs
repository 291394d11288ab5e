//! Bulk deletion of a workspace's entity tables, with an optional safety export first.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::catalog::{EntityKind, EntitySelection};
use crate::config::EngineConfig;
use crate::export::{ExportArchive, Exporter};
use crate::progress::{scale, ProgressSink};
use crate::run::{RunOutcome, StepLog, StepRunner};
use crate::workspace::{ensure_workspace, WorkspaceId};
use crate::{store, AppError, AppResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResetOptions {
    pub create_backup_before_reset: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPreview {
    pub total_rows: u64,
    pub per_entity_counts: BTreeMap<EntityKind, u64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetReport {
    pub success: bool,
    pub outcome: RunOutcome,
    pub total_deleted: u64,
    pub per_entity_counts: BTreeMap<EntityKind, u64>,
    pub backup_created: bool,
    pub backup_filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<String>,
    pub errors: Vec<AppError>,
    pub warnings: Vec<String>,
    pub log: Vec<StepLog>,
    pub elapsed_ms: u64,
    /// The safety backup itself, for callers that want to keep or offer it.
    #[serde(skip)]
    pub backup: Option<ExportArchive>,
}

pub struct Resetter<'a> {
    pool: &'a SqlitePool,
    config: &'a EngineConfig,
}

impl<'a> Resetter<'a> {
    pub fn new(pool: &'a SqlitePool, config: &'a EngineConfig) -> Self {
        Self { pool, config }
    }

    /// Read-only count of what a reset with `selection` would delete.
    pub async fn preview(
        &self,
        ws: &WorkspaceId,
        selection: &EntitySelection,
    ) -> AppResult<ResetPreview> {
        ensure_workspace(self.pool, ws).await?;
        let mut per_entity_counts = BTreeMap::new();
        for kind in selection.kinds() {
            per_entity_counts.insert(kind, store::count_live(self.pool, ws, kind).await?);
        }
        Ok(ResetPreview {
            total_rows: per_entity_counts.values().sum(),
            per_entity_counts,
        })
    }

    /// Deletes the live rows of every selected entity type, last dependents first.
    ///
    /// A failed backup is downgraded to a warning. With the default best-effort policy a
    /// failing table is recorded and the remaining tables are still attempted.
    pub async fn reset(
        &self,
        ws: &WorkspaceId,
        selection: &EntitySelection,
        options: ResetOptions,
        progress: &mut dyn ProgressSink,
    ) -> ResetReport {
        let mut runner = StepRunner::new("reset", self.config.reset_failure_policy);
        let mut per_entity_counts = BTreeMap::new();
        let mut backup: Option<ExportArchive> = None;
        let mut backup_path = None;

        let kinds = selection.kinds_reversed();
        if kinds.is_empty() {
            runner.warn("reset", "No entity types selected; nothing was deleted");
            return finish(runner, per_entity_counts, backup, backup_path);
        }

        tracing::info!(
            target: "finvault",
            area = "reset",
            event = "reset_started",
            workspace_id = ws.as_str(),
            tables = kinds.len(),
            backup = options.create_backup_before_reset
        );

        runner.start("workspace");
        if let Err(err) = ensure_workspace(self.pool, ws).await {
            runner.abort(err);
            return finish(runner, per_entity_counts, backup, backup_path);
        }
        runner.complete(ws.as_str());

        let backup_share = if options.create_backup_before_reset {
            self.config.backup_progress_share
        } else {
            0.0
        };

        if options.create_backup_before_reset {
            runner.start("backup");
            let exported = {
                let mut scaled = |percent: f64, label: &str| {
                    progress.on_progress(scale(percent, 0.0, backup_share), label)
                };
                Exporter::new(self.pool, self.config)
                    .export(ws, selection, &mut scaled)
                    .await
            };
            let saved = exported.and_then(|archive| match &self.config.backup_dir {
                Some(dir) => archive
                    .write_to(dir)
                    .map(|path| (archive, Some(path.display().to_string()))),
                None => Ok((archive, None)),
            });
            match saved {
                Ok((archive, path)) => {
                    runner.complete(archive.filename.clone());
                    backup_path = path;
                    backup = Some(archive);
                }
                Err(err) => runner.warn(
                    "backup",
                    format!("Backup failed, reset continued without it: {err}"),
                ),
            }
        }

        let span = 100.0 - backup_share;
        for (index, kind) in kinds.iter().copied().enumerate() {
            runner.start(kind.table());
            match store::delete_live(self.pool, ws, kind).await {
                Ok(deleted) => {
                    per_entity_counts.insert(kind, deleted);
                    runner.complete(format!("{deleted} rows deleted"));
                }
                Err(err) => {
                    if runner.fail(err).is_break() {
                        break;
                    }
                }
            }
            let done = (index + 1) as f64 / kinds.len() as f64 * 100.0;
            progress.on_progress(scale(done, backup_share, span), kind.label());
        }

        finish(runner, per_entity_counts, backup, backup_path)
    }
}

fn finish(
    runner: StepRunner,
    per_entity_counts: BTreeMap<EntityKind, u64>,
    backup: Option<ExportArchive>,
    backup_path: Option<String>,
) -> ResetReport {
    let summary = runner.finish();
    let total_deleted = per_entity_counts.values().sum::<u64>();

    tracing::info!(
        target: "finvault",
        area = "reset",
        event = "reset_finished",
        outcome = ?summary.outcome,
        count = total_deleted,
        backup = backup.is_some(),
        ms = summary.elapsed_ms
    );

    ResetReport {
        success: summary.outcome.is_success(),
        outcome: summary.outcome,
        total_deleted,
        per_entity_counts,
        backup_created: backup.is_some(),
        backup_filename: backup.as_ref().map(|archive| archive.filename.clone()),
        backup_path,
        errors: summary.errors,
        warnings: summary.warnings,
        log: summary.log,
        elapsed_ms: summary.elapsed_ms,
        backup,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_default_to_no_backup() {
        let options: ResetOptions = serde_json::from_str("{}").unwrap();
        assert!(!options.create_backup_before_reset);
        let options: ResetOptions =
            serde_json::from_str(r#"{"createBackupBeforeReset": true}"#).unwrap();
        assert!(options.create_backup_before_reset);
    }

    #[test]
    fn report_hides_archive_bytes() {
        let runner = StepRunner::new("reset", crate::run::FailurePolicy::BestEffort);
        let report = finish(runner, BTreeMap::new(), None, None);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["backupCreated"], false);
        assert!(value.get("backup").is_none());
    }
}
