use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::catalog::EntityKind;
use crate::run::StepLog;
use crate::time::rfc3339;
use crate::workspace::WorkspaceId;

pub const MANIFEST_JSON: &str = "manifest.json";
pub const MANIFEST_TEXT: &str = "manifest.txt";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    pub file: String,
    pub count: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportManifest {
    pub format_version: u32,
    pub app_version: String,
    pub build_hash: String,
    pub workspace_id: WorkspaceId,
    pub created_at: String,
    pub tables: BTreeMap<EntityKind, TableInfo>,
    pub total_rows: u64,
    #[serde(default)]
    pub log: Vec<String>,
}

impl ExportManifest {
    pub fn new(workspace_id: WorkspaceId, created_at: DateTime<Utc>) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            build_hash: option_env!("FINVAULT_GIT_HASH")
                .unwrap_or("unknown")
                .to_string(),
            workspace_id,
            created_at: rfc3339(created_at),
            tables: BTreeMap::new(),
            total_rows: 0,
            log: Vec::new(),
        }
    }

    pub fn record_table(&mut self, kind: EntityKind, count: u64, bytes: &[u8]) {
        self.total_rows += count;
        self.tables.insert(
            kind,
            TableInfo {
                file: kind.file_name(),
                count,
                sha256: sha256_hex(bytes),
            },
        );
    }

    pub fn set_log(&mut self, log: &[StepLog]) {
        self.log = log.iter().map(ToString::to_string).collect();
    }

    /// Plain-text companion of the JSON manifest, meant for people opening the archive.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "finvault backup v{}", self.app_version);
        let _ = writeln!(out, "workspace: {}", self.workspace_id);
        let _ = writeln!(out, "exported_at: {}", self.created_at);
        let _ = writeln!(out, "total_rows: {}", self.total_rows);
        let _ = writeln!(out);
        let _ = writeln!(out, "tables:");
        for (kind, info) in &self.tables {
            let _ = writeln!(out, "  {}: {}", kind.table(), info.count);
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "log:");
        for line in &self.log {
            let _ = writeln!(out, "  {line}");
        }
        out
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::StepStatus;

    fn manifest() -> ExportManifest {
        let ws = WorkspaceId::parse("ws-1").unwrap();
        ExportManifest::new(ws, Utc::now())
    }

    #[test]
    fn manifest_defaults() {
        let m = manifest();
        assert_eq!(m.format_version, FORMAT_VERSION);
        assert_eq!(m.app_version, env!("CARGO_PKG_VERSION"));
        assert!(m.created_at.ends_with('Z'));
        assert!(m.tables.is_empty());
        assert_eq!(m.total_rows, 0);
    }

    #[test]
    fn tables_serialize_in_dependency_order() {
        let mut m = manifest();
        m.record_table(EntityKind::MonthlyGoal, 1, b"g");
        m.record_table(EntityKind::Category, 2, b"c");
        assert_eq!(m.total_rows, 3);

        let json = serde_json::to_string(&m).unwrap();
        let categories = json.find("\"category\"").unwrap();
        let goals = json.find("\"monthly_goal\"").unwrap();
        assert!(categories < goals);

        let back: ExportManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tables[&EntityKind::Category].file, "categories.csv");
        assert_eq!(back.tables[&EntityKind::Category].sha256, sha256_hex(b"c"));
    }

    #[test]
    fn text_lists_counts_and_log_lines() {
        let mut m = manifest();
        m.record_table(EntityKind::Transaction, 120, b"t");
        m.set_log(&[StepLog {
            step: "transactions".into(),
            status: StepStatus::Ok,
            detail: "120 rows".into(),
        }]);
        let text = m.render_text();
        assert!(text.contains("total_rows: 120"));
        assert!(text.contains("  transactions: 120"));
        assert!(text.contains("  transactions: ok 120 rows"));
    }
}
