use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::run::FailurePolicy;
use crate::{AppError, AppResult};

pub const DEFAULT_TRANSACTION_BATCH_SIZE: usize = 50;
pub const DEFAULT_BACKUP_PROGRESS_SHARE: f64 = 30.0;
pub const DEFAULT_ARCHIVE_PREFIX: &str = "backup";
const DATA_DIR_ENV: &str = "FINVAULT_DATA_DIR";
const APP_DIR_NAME: &str = "finvault";
const DB_FILE_NAME: &str = "finvault.sqlite3";

/// Tunables for export, import and reset runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rows per store transaction when importing transactions.
    pub transaction_batch_size: usize,
    /// Field delimiter of the archive's tabular files; must be a single ASCII character.
    pub delimiter: char,
    pub archive_prefix: String,
    /// Share of a reset's progress bar given to the safety backup.
    pub backup_progress_share: f64,
    pub import_failure_policy: FailurePolicy,
    pub reset_failure_policy: FailurePolicy,
    /// When set, reset backups are also written to this directory.
    pub backup_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            transaction_batch_size: DEFAULT_TRANSACTION_BATCH_SIZE,
            delimiter: ',',
            archive_prefix: DEFAULT_ARCHIVE_PREFIX.to_string(),
            backup_progress_share: DEFAULT_BACKUP_PROGRESS_SHARE,
            import_failure_policy: FailurePolicy::FailFast,
            reset_failure_policy: FailurePolicy::BestEffort,
            backup_dir: None,
        }
    }
}

impl EngineConfig {
    pub fn from_json_file(path: &Path) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            AppError::from(err)
                .with_context("operation", "read_config")
                .with_context("path", path.display().to_string())
        })?;
        let config: EngineConfig = serde_json::from_str(&raw).map_err(|err| {
            AppError::from(err)
                .with_context("operation", "parse_config")
                .with_context("path", path.display().to_string())
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.transaction_batch_size == 0 {
            return Err(AppError::new(
                "CONFIG/INVALID",
                "transaction_batch_size must be at least 1",
            ));
        }
        self.delimiter_byte()?;
        if !(0.0..100.0).contains(&self.backup_progress_share) {
            return Err(AppError::new(
                "CONFIG/INVALID",
                "backup_progress_share must be within 0..100",
            ));
        }
        if self.archive_prefix.trim().is_empty() {
            return Err(AppError::new(
                "CONFIG/INVALID",
                "archive_prefix must not be empty",
            ));
        }
        Ok(())
    }

    /// The delimiter as a single byte; anything but a plain ASCII separator is rejected.
    pub fn delimiter_byte(&self) -> AppResult<u8> {
        match u8::try_from(self.delimiter) {
            Ok(byte) if byte.is_ascii() && !matches!(byte, b'"' | b'\n' | b'\r') => Ok(byte),
            _ => Err(AppError::new(
                "CONFIG/INVALID",
                "delimiter must be an ASCII character other than a quote or line break",
            )
            .with_context("delimiter", self.delimiter.to_string())),
        }
    }
}

/// Database location: `FINVAULT_DATA_DIR` if set, else the platform data directory.
pub fn default_db_path() -> anyhow::Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir).join(DB_FILE_NAME));
    }

    let base = dirs::data_dir()
        .or_else(|| std::env::current_dir().ok())
        .ok_or_else(|| anyhow::anyhow!("failed to resolve application data directory"))?;
    Ok(base.join(APP_DIR_NAME).join(DB_FILE_NAME))
}
