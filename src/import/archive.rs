use std::collections::BTreeSet;
use std::io::{Cursor, Read};

use thiserror::Error;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::config::EngineConfig;
use crate::export::manifest::{
    sha256_hex, ExportManifest, FORMAT_VERSION, MANIFEST_JSON, MANIFEST_TEXT,
};
use crate::model::ImportPayload;
use crate::tabular::{self, TabularError};
use crate::AppError;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive could not be opened: {0}")]
    Open(#[source] ZipError),
    #[error("manifest.json not found in archive")]
    ManifestMissing,
    #[error("failed to parse manifest.json: {0}")]
    ManifestParse(String),
    #[error("unsupported archive format version {0}")]
    UnsupportedVersion(u32),
    #[error("archive file missing: {0}")]
    FileMissing(String),
    #[error("unexpected file in archive: {0}")]
    UnknownFile(String),
    #[error("checksum mismatch for {file}")]
    Checksum {
        file: String,
        expected: String,
        actual: String,
    },
    #[error("row count mismatch for {file}: manifest lists {expected}, file holds {actual}")]
    Count {
        file: String,
        expected: u64,
        actual: u64,
    },
    #[error("failed to read {file}: {source}")]
    Read {
        file: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Tabular(#[from] TabularError),
    #[error(transparent)]
    Config(AppError),
}

impl From<ArchiveError> for AppError {
    fn from(error: ArchiveError) -> Self {
        let message = error.to_string();
        match error {
            ArchiveError::Open(source) => {
                AppError::new("ARCHIVE/OPEN", message).with_cause(source)
            }
            ArchiveError::ManifestMissing | ArchiveError::ManifestParse(_) => {
                AppError::new("ARCHIVE/MANIFEST", message)
            }
            ArchiveError::UnsupportedVersion(version) => {
                AppError::new("ARCHIVE/VERSION", message)
                    .with_context("format_version", version.to_string())
            }
            ArchiveError::FileMissing(file) => {
                AppError::new("ARCHIVE/FILE_MISSING", message).with_context("file", file)
            }
            ArchiveError::UnknownFile(file) => {
                AppError::new("ARCHIVE/UNKNOWN_FILE", message).with_context("file", file)
            }
            ArchiveError::Checksum {
                file,
                expected,
                actual,
            } => AppError::new("ARCHIVE/CHECKSUM", message)
                .with_context("file", file)
                .with_context("expected", expected)
                .with_context("actual", actual),
            ArchiveError::Count { file, .. } => {
                AppError::new("ARCHIVE/COUNT", message).with_context("file", file)
            }
            ArchiveError::Read { file, source } => AppError::new("ARCHIVE/READ", message)
                .with_context("file", file)
                .with_cause(source),
            ArchiveError::Tabular(inner) => inner.into(),
            ArchiveError::Config(inner) => inner,
        }
    }
}

/// A verified archive: its manifest and the decoded row sets.
#[derive(Debug, Clone)]
pub struct LoadedArchive {
    pub manifest: ExportManifest,
    pub payload: ImportPayload,
}

/// Parses an archive written by the exporter into an import payload.
pub fn read_archive(bytes: &[u8], config: &EngineConfig) -> Result<ImportPayload, ArchiveError> {
    load_archive(bytes, config).map(|loaded| loaded.payload)
}

/// Like [`read_archive`], keeping the manifest. Every listed table is checked for presence,
/// checksum and row count before it is decoded.
pub fn load_archive(bytes: &[u8], config: &EngineConfig) -> Result<LoadedArchive, ArchiveError> {
    let delimiter = config.delimiter_byte().map_err(ArchiveError::Config)?;
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(ArchiveError::Open)?;

    let manifest_bytes = match read_entry(&mut archive, MANIFEST_JSON) {
        Err(ArchiveError::FileMissing(_)) => return Err(ArchiveError::ManifestMissing),
        other => other?,
    };
    let manifest: ExportManifest = serde_json::from_slice(&manifest_bytes)
        .map_err(|err| ArchiveError::ManifestParse(err.to_string()))?;
    if manifest.format_version > FORMAT_VERSION {
        return Err(ArchiveError::UnsupportedVersion(manifest.format_version));
    }

    let mut expected: BTreeSet<String> = [MANIFEST_JSON, MANIFEST_TEXT]
        .into_iter()
        .map(str::to_string)
        .collect();
    for (kind, info) in &manifest.tables {
        if info.file != kind.file_name() {
            return Err(ArchiveError::UnknownFile(info.file.clone()));
        }
        expected.insert(info.file.clone());
    }
    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    if let Some(stray) = names.iter().find(|name| !expected.contains(*name)) {
        return Err(ArchiveError::UnknownFile(stray.clone()));
    }

    let mut payload = ImportPayload::default();
    for (kind, info) in &manifest.tables {
        let raw = read_entry(&mut archive, &info.file)?;
        let actual = sha256_hex(&raw);
        if actual != info.sha256 {
            return Err(ArchiveError::Checksum {
                file: info.file.clone(),
                expected: info.sha256.clone(),
                actual,
            });
        }
        let text = String::from_utf8(raw).map_err(|_| TabularError::Encoding {
            entity: kind.table(),
        })?;
        let rows = tabular::decode_rows(*kind, &text, delimiter)?;
        if rows.len() as u64 != info.count {
            return Err(ArchiveError::Count {
                file: info.file.clone(),
                expected: info.count,
                actual: rows.len() as u64,
            });
        }
        payload.insert(rows);
    }

    tracing::info!(
        target: "finvault",
        area = "import",
        event = "archive_loaded",
        workspace_id = manifest.workspace_id.as_str(),
        tables = manifest.tables.len(),
        count = manifest.total_rows
    );

    Ok(LoadedArchive { manifest, payload })
}

fn read_entry(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<Vec<u8>, ArchiveError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Err(ArchiveError::FileMissing(name.to_string())),
        Err(err) => return Err(ArchiveError::Open(err)),
    };
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).map_err(|source| ArchiveError::Read {
        file: name.to_string(),
        source,
    })?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::EntityKind;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn zip_of(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, bytes) in files {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(bytes).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn manifest_with(kind: EntityKind, text: &str, count: u64) -> Vec<u8> {
        let ws = crate::workspace::WorkspaceId::parse("ws-1").unwrap();
        let mut manifest = ExportManifest::new(ws, chrono::Utc::now());
        manifest.record_table(kind, count, text.as_bytes());
        serde_json::to_vec(&manifest).unwrap()
    }

    const GOALS: &str = "id,category_id,reference_month,goal_amount\ng-1,cat-1,2026-01,250.0\n";

    #[test]
    fn reads_listed_tables() {
        let manifest = manifest_with(EntityKind::MonthlyGoal, GOALS, 1);
        let bytes = zip_of(&[
            ("manifest.json", manifest.as_slice()),
            ("monthly_goals.csv", GOALS.as_bytes()),
        ]);
        let loaded = load_archive(&bytes, &EngineConfig::default()).unwrap();
        let listed: Vec<EntityKind> = loaded.manifest.tables.keys().copied().collect();
        assert_eq!(listed, vec![EntityKind::MonthlyGoal]);
        assert_eq!(loaded.payload.monthly_goals.as_ref().map(Vec::len), Some(1));
        assert!(loaded.payload.categories.is_none());
    }

    #[test]
    fn missing_manifest_is_reported() {
        let bytes = zip_of(&[("monthly_goals.csv", GOALS.as_bytes())]);
        let err = read_archive(&bytes, &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, ArchiveError::ManifestMissing));
    }

    #[test]
    fn count_mismatch_is_rejected() {
        let manifest = manifest_with(EntityKind::MonthlyGoal, GOALS, 2);
        let bytes = zip_of(&[
            ("manifest.json", manifest.as_slice()),
            ("monthly_goals.csv", GOALS.as_bytes()),
        ]);
        let err = read_archive(&bytes, &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, ArchiveError::Count { expected: 2, actual: 1, .. }));
    }

    #[test]
    fn stray_files_are_rejected() {
        let manifest = manifest_with(EntityKind::MonthlyGoal, GOALS, 1);
        let bytes = zip_of(&[
            ("manifest.json", manifest.as_slice()),
            ("monthly_goals.csv", GOALS.as_bytes()),
            ("budgets.csv", b"id\n"),
        ]);
        let err = read_archive(&bytes, &EngineConfig::default()).unwrap_err();
        assert_eq!(AppError::from(err).code(), "ARCHIVE/UNKNOWN_FILE");
    }

    #[test]
    fn unusable_delimiter_is_a_config_error() {
        let manifest = manifest_with(EntityKind::MonthlyGoal, GOALS, 1);
        let bytes = zip_of(&[
            ("manifest.json", manifest.as_slice()),
            ("monthly_goals.csv", GOALS.as_bytes()),
        ]);
        let config = EngineConfig {
            delimiter: 'é',
            ..EngineConfig::default()
        };
        let err = read_archive(&bytes, &config).unwrap_err();
        assert_eq!(AppError::from(err).code(), "CONFIG/INVALID");
    }

    #[test]
    fn garbage_is_not_an_archive() {
        let err = read_archive(b"not a zip", &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, ArchiveError::Open(_)));
    }
}
