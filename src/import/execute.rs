use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::catalog::EntityKind;
use crate::config::EngineConfig;
use crate::model::{dispatch_rows, EntityRecord, EntityRows, ImportPayload};
use crate::progress::{percent_of, ProgressSink};
use crate::run::{RunOutcome, StepLog, StepRunner};
use crate::store::{self, ConflictPolicy};
use crate::workspace::{ensure_workspace, WorkspaceId};
use crate::AppError;

use super::references::check_references;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Wipe each imported entity type before writing the archive's rows.
    Clean,
    /// Only add rows whose id is not already present.
    Incremental,
}

impl ImportMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ImportMode::Clean => "clean",
            ImportMode::Incremental => "incremental",
        }
    }

    fn conflict_policy(self) -> ConflictPolicy {
        match self {
            ImportMode::Clean => ConflictPolicy::Fail,
            ImportMode::Incremental => ConflictPolicy::Skip,
        }
    }
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportMode {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "clean" => Ok(ImportMode::Clean),
            "incremental" => Ok(ImportMode::Incremental),
            other => Err(AppError::new(
                "IMPORT/MODE",
                format!("unknown import mode {other:?}; expected clean or incremental"),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub success: bool,
    pub mode: ImportMode,
    pub outcome: RunOutcome,
    pub total_imported: u64,
    pub per_entity_counts: BTreeMap<EntityKind, u64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub skipped: BTreeMap<EntityKind, u64>,
    /// Row count of every committed store transaction, per entity type.
    pub batches: BTreeMap<EntityKind, Vec<usize>>,
    pub errors: Vec<AppError>,
    pub warnings: Vec<String>,
    pub log: Vec<StepLog>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Default)]
struct KindTally {
    inserted: u64,
    skipped: u64,
    batches: Vec<usize>,
}

/// Writes parsed archive rows back into a workspace, one entity type at a time.
pub struct Importer<'a> {
    pool: &'a SqlitePool,
    config: &'a EngineConfig,
}

impl<'a> Importer<'a> {
    pub fn new(pool: &'a SqlitePool, config: &'a EngineConfig) -> Self {
        Self { pool, config }
    }

    /// Imports every entity type present in `payload`, in dependency order.
    ///
    /// Always returns a report; with the default fail-fast policy the first failing entity
    /// type stops the run and whatever was committed before it stays committed. Foreign keys
    /// are checked before anything is cleared, and a broken one aborts the run untouched.
    pub async fn import(
        &self,
        ws: &WorkspaceId,
        payload: ImportPayload,
        mode: ImportMode,
        progress: &mut dyn ProgressSink,
    ) -> ImportReport {
        let mut runner = StepRunner::new("import", self.config.import_failure_policy);
        let mut tallies: BTreeMap<EntityKind, KindTally> = BTreeMap::new();
        let kinds = payload.kinds();

        tracing::info!(
            target: "finvault",
            area = "import",
            event = "import_started",
            workspace_id = ws.as_str(),
            mode = mode.as_str(),
            tables = kinds.len()
        );

        runner.start("workspace");
        if let Err(err) = ensure_workspace(self.pool, ws).await {
            runner.abort(err);
            return self.report(runner, mode, tallies);
        }
        runner.complete(ws.as_str());

        if kinds.is_empty() {
            runner.warn("import", "Archive holds no entity tables; nothing was imported");
            return self.report(runner, mode, tallies);
        }

        let sets = payload.into_ordered();
        runner.start("references");
        if let Err(err) = check_references(self.pool, ws, &sets, mode).await {
            runner.abort(err);
            return self.report(runner, mode, tallies);
        }
        runner.complete(format!("{} tables checked", sets.len()));

        if mode == ImportMode::Clean {
            for kind in kinds.iter().rev().copied() {
                runner.start(format!("clear {}", kind.table()));
                match store::delete_all(self.pool, ws, kind).await {
                    Ok(removed) => runner.complete(format!("{removed} rows removed")),
                    Err(err) => {
                        if runner.fail(err).is_break() {
                            return self.report(runner, mode, tallies);
                        }
                    }
                }
            }
        }

        let total_steps = kinds.len();
        let mut sets = sets.into_iter().peekable();
        let mut index = 0;
        for kind in EntityKind::DEPENDENCY_ORDER {
            let Some(rows) = sets.next_if(|rows| rows.kind() == kind) else {
                runner.skip(kind.table(), "not in archive");
                continue;
            };
            index += 1;
            runner.start(kind.table());
            let tally = tallies.entry(kind).or_default();
            let result = self.write_kind(ws, &rows, mode, tally, progress).await;

            match result {
                Ok(()) => {
                    runner.complete(format!(
                        "{} rows in {} batches",
                        tally.inserted,
                        tally.batches.len()
                    ));
                    if tally.skipped > 0 {
                        runner.warn(
                            kind.table(),
                            format!(
                                "{} {} rows already existed and were left unchanged",
                                tally.skipped,
                                kind.label().to_lowercase()
                            ),
                        );
                    }
                }
                Err(err) => {
                    if runner.fail(err).is_break() {
                        break;
                    }
                }
            }

            if kind != EntityKind::Transaction || rows.is_empty() {
                progress.on_progress(percent_of(index, total_steps), kind.label());
            }
        }

        self.report(runner, mode, tallies)
    }

    async fn write_kind(
        &self,
        ws: &WorkspaceId,
        rows: &EntityRows,
        mode: ImportMode,
        tally: &mut KindTally,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), AppError> {
        let batch_size = match rows.kind() {
            EntityKind::Transaction => self.config.transaction_batch_size,
            _ => rows.len(),
        }
        .max(1);
        dispatch_rows!(rows, rows => {
            self.write_batches(ws, rows, batch_size, mode.conflict_policy(), tally, progress)
                .await
        })
    }

    async fn write_batches<T: EntityRecord>(
        &self,
        ws: &WorkspaceId,
        rows: &[T],
        batch_size: usize,
        conflict: ConflictPolicy,
        tally: &mut KindTally,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), AppError> {
        let batched = T::KIND == EntityKind::Transaction;
        let mut processed = 0usize;
        for chunk in rows.chunks(batch_size) {
            let written = store::insert_batch(self.pool, ws, chunk, conflict)
                .await
                .map_err(|err| err.with_context("batch", (tally.batches.len() + 1).to_string()))?;
            processed += chunk.len();
            tally.inserted += written.inserted;
            tally.skipped += written.skipped;
            tally.batches.push(chunk.len());

            tracing::debug!(
                target: "finvault",
                area = "import",
                event = "batch_committed",
                entity = T::KIND.table(),
                workspace_id = ws.as_str(),
                count = chunk.len(),
                processed = processed
            );
            if batched {
                let label = format!("{} {processed}/{}", T::KIND.label(), rows.len());
                progress.on_progress(percent_of(processed, rows.len()), &label);
            }
        }
        Ok(())
    }

    fn report(
        &self,
        runner: StepRunner,
        mode: ImportMode,
        tallies: BTreeMap<EntityKind, KindTally>,
    ) -> ImportReport {
        let summary = runner.finish();
        let mut per_entity_counts = BTreeMap::new();
        let mut skipped = BTreeMap::new();
        let mut batches = BTreeMap::new();
        for (kind, tally) in tallies {
            per_entity_counts.insert(kind, tally.inserted);
            if tally.skipped > 0 {
                skipped.insert(kind, tally.skipped);
            }
            batches.insert(kind, tally.batches);
        }
        let total_imported: u64 = per_entity_counts.values().sum();

        tracing::info!(
            target: "finvault",
            area = "import",
            event = "import_finished",
            mode = mode.as_str(),
            outcome = ?summary.outcome,
            count = total_imported,
            ms = summary.elapsed_ms
        );

        ImportReport {
            success: summary.outcome.is_success(),
            mode,
            outcome: summary.outcome,
            total_imported,
            per_entity_counts,
            skipped,
            batches,
            errors: summary.errors,
            warnings: summary.warnings,
            log: summary.log,
            elapsed_ms: summary.elapsed_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_parse_case_insensitively() {
        assert_eq!("Clean".parse::<ImportMode>().unwrap(), ImportMode::Clean);
        assert_eq!(
            " incremental ".parse::<ImportMode>().unwrap(),
            ImportMode::Incremental
        );
        assert_eq!("merge".parse::<ImportMode>().unwrap_err().code(), "IMPORT/MODE");
    }

    #[test]
    fn modes_map_to_conflict_policies() {
        assert_eq!(ImportMode::Clean.conflict_policy(), ConflictPolicy::Fail);
        assert_eq!(ImportMode::Incremental.conflict_policy(), ConflictPolicy::Skip);
        assert_eq!(serde_json::to_value(ImportMode::Incremental).unwrap(), "incremental");
    }
}
