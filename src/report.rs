use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::db::write_atomic;
use crate::time::rfc3339;
use crate::workspace::WorkspaceId;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunReportFile<'a, T> {
    generated_at: String,
    operation: &'a str,
    workspace_id: &'a WorkspaceId,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    report: &'a T,
}

/// Writes `<operation>-YYYYMMDD-HHMMSS.json` into `reports_dir` and returns its path.
pub fn write_run_report<T: Serialize>(
    reports_dir: &Path,
    operation: &str,
    workspace_id: &WorkspaceId,
    source: Option<&Path>,
    report: &T,
) -> Result<PathBuf> {
    std::fs::create_dir_all(reports_dir)
        .with_context(|| format!("create reports directory {}", reports_dir.display()))?;

    let now = Utc::now();
    let file_name = format!("{operation}-{}.json", now.format("%Y%m%d-%H%M%S"));
    let path = reports_dir.join(file_name);
    let payload = RunReportFile {
        generated_at: rfc3339(now),
        operation,
        workspace_id,
        source: source.map(|p| p.display().to_string()),
        report,
    };
    let json = serde_json::to_vec_pretty(&payload)
        .with_context(|| format!("serialize {operation} report"))?;
    write_atomic(&path, &json).with_context(|| format!("write report {}", path.display()))?;

    tracing::info!(
        target: "finvault",
        area = operation,
        event = "report_written",
        path = %path.display()
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Serialize)]
    struct Dummy {
        total: u64,
    }

    #[test]
    fn report_file_wraps_payload() {
        let dir = TempDir::new().unwrap();
        let ws = WorkspaceId::parse("ws-1").unwrap();
        let path = write_run_report(
            &dir.path().join("reports"),
            "reset",
            &ws,
            None,
            &Dummy { total: 7 },
        )
        .unwrap();

        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("reset-") && name.ends_with(".json"));

        let value: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(value["operation"], "reset");
        assert_eq!(value["workspaceId"], "ws-1");
        assert_eq!(value["report"]["total"], 7);
        assert!(value.get("source").is_none());
    }
}
