use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::catalog::{EntityKind, EntitySelection};
use crate::config::EngineConfig;
use crate::progress::{percent_of, ProgressSink};
use crate::run::{FailurePolicy, StepLog, StepRunner};
use crate::time::rfc3339;
use crate::workspace::{ensure_workspace, WorkspaceId};
use crate::{db, store, tabular, AppError, AppResult};

use self::manifest::{ExportManifest, MANIFEST_JSON, MANIFEST_TEXT};

pub mod manifest;

const ZIP_EXTENSION: &str = "zip";

/// One finished export run: the archive bytes plus what went into them.
#[derive(Debug, Clone)]
pub struct ExportArchive {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub summary: ExportSummary,
}

impl ExportArchive {
    /// Writes the archive into `dir` under its own filename.
    pub fn write_to(&self, dir: &Path) -> AppResult<PathBuf> {
        let path = dir.join(&self.filename);
        db::write_atomic(&path, &self.bytes).map_err(|err| {
            AppError::from(err)
                .with_context("operation", "export_write_archive")
                .with_context("path", path.display().to_string())
        })?;
        Ok(path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub exported_at: String,
    pub workspace_id: WorkspaceId,
    pub per_entity_counts: BTreeMap<EntityKind, u64>,
    pub total_rows: u64,
    pub log: Vec<StepLog>,
    pub elapsed_ms: u64,
}

pub struct Exporter<'a> {
    pool: &'a SqlitePool,
    config: &'a EngineConfig,
}

impl<'a> Exporter<'a> {
    pub fn new(pool: &'a SqlitePool, config: &'a EngineConfig) -> Self {
        Self { pool, config }
    }

    /// Reads the selected entity types in dependency order and packages them into one archive.
    ///
    /// The first failing table aborts the run; no partial archive is produced.
    pub async fn export(
        &self,
        ws: &WorkspaceId,
        selection: &EntitySelection,
        progress: &mut dyn ProgressSink,
    ) -> AppResult<ExportArchive> {
        let kinds = selection.kinds();
        if kinds.is_empty() {
            return Err(AppError::new(
                "SELECTION/EMPTY",
                "Select at least one entity type to export",
            )
            .with_context("workspace", ws.as_str()));
        }
        ensure_workspace(self.pool, ws).await?;

        let created_at = Utc::now();
        let mut runner = StepRunner::new("export", FailurePolicy::FailFast);
        let mut manifest = ExportManifest::new(ws.clone(), created_at);
        let mut files: Vec<(String, Vec<u8>)> = Vec::with_capacity(kinds.len() + 2);
        let mut per_entity_counts = BTreeMap::new();

        tracing::info!(
            target: "finvault",
            area = "export",
            event = "export_started",
            workspace_id = ws.as_str(),
            tables = kinds.len()
        );

        for (index, kind) in kinds.iter().copied().enumerate() {
            runner.start(kind.table());
            let (count, text) = match self.export_table(ws, kind).await {
                Ok(value) => value,
                Err(err) => {
                    let _ = runner.fail(err.clone());
                    return Err(err);
                }
            };
            manifest.record_table(kind, count, text.as_bytes());
            per_entity_counts.insert(kind, count);
            files.push((kind.file_name(), text.into_bytes()));
            runner.complete(format!("{count} rows"));
            progress.on_progress(percent_of(index + 1, kinds.len()), kind.label());
        }

        manifest.set_log(runner.log());
        files.push((MANIFEST_TEXT.to_string(), manifest.render_text().into_bytes()));
        let manifest_json = serde_json::to_vec_pretty(&manifest).map_err(|err| {
            AppError::from(err).with_context("operation", "export_manifest_encode")
        })?;
        files.push((MANIFEST_JSON.to_string(), manifest_json));

        let bytes = write_zip(&files)?;
        let summary = runner.finish();
        let filename = archive_filename(&self.config.archive_prefix, ws, created_at);

        tracing::info!(
            target: "finvault",
            area = "export",
            event = "export_finished",
            workspace_id = ws.as_str(),
            file = %filename,
            count = manifest.total_rows,
            bytes = bytes.len(),
            ms = summary.elapsed_ms
        );

        Ok(ExportArchive {
            filename,
            bytes,
            summary: ExportSummary {
                exported_at: rfc3339(created_at),
                workspace_id: ws.clone(),
                per_entity_counts,
                total_rows: manifest.total_rows,
                log: summary.log,
                elapsed_ms: summary.elapsed_ms,
            },
        })
    }

    async fn export_table(&self, ws: &WorkspaceId, kind: EntityKind) -> AppResult<(u64, String)> {
        let rows = store::fetch_live_rows(self.pool, ws, kind).await?;
        let text = tabular::encode_rows(&rows, self.config.delimiter_byte()?)?;
        Ok((rows.len() as u64, text))
    }
}

pub fn archive_filename(prefix: &str, ws: &WorkspaceId, at: DateTime<Utc>) -> String {
    format!(
        "{prefix}-{ws}-{}.{ZIP_EXTENSION}",
        at.format("%Y%m%dT%H%M%S")
    )
}

fn write_zip(files: &[(String, Vec<u8>)]) -> AppResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, bytes) in files {
        writer
            .start_file(name.as_str(), options)
            .map_err(|err| map_zip_error(err, "export_zip_entry").with_context("file", name))?;
        writer.write_all(bytes).map_err(|err| {
            AppError::from(err)
                .with_context("operation", "export_zip_write")
                .with_context("file", name)
        })?;
    }

    let cursor = writer
        .finish()
        .map_err(|err| map_zip_error(err, "export_zip_finish"))?;
    Ok(cursor.into_inner())
}

fn map_zip_error(err: ZipError, operation: &'static str) -> AppError {
    AppError::new("EXPORT/ZIP", "Failed to write backup archive")
        .with_context("operation", operation)
        .with_cause(err)
}
