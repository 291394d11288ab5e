use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::time::now_ms;
use crate::{AppError, AppResult};

/// Tenant scope carried by every store call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(String);

impl WorkspaceId {
    pub fn parse(raw: &str) -> AppResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppError::new(
                "WORKSPACE/INVALID",
                "Workspace id must not be empty",
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub async fn create_workspace(pool: &SqlitePool, name: &str) -> AppResult<WorkspaceId> {
    let id = WorkspaceId::generate();
    insert_workspace(pool, &id, name).await?;
    Ok(id)
}

pub async fn insert_workspace(pool: &SqlitePool, id: &WorkspaceId, name: &str) -> AppResult<()> {
    sqlx::query("INSERT INTO workspaces (id, name, created_at) VALUES (?1, ?2, ?3)")
        .bind(id.as_str())
        .bind(name)
        .bind(now_ms())
        .execute(pool)
        .await
        .map_err(|err| {
            AppError::new("WORKSPACE/CREATE", "Failed to create workspace")
                .with_context("workspace", id.as_str())
                .with_cause(err)
        })?;
    tracing::info!(
        target: "finvault",
        event = "workspace_created",
        workspace_id = id.as_str(),
        name = name
    );
    Ok(())
}

/// Fails with `WORKSPACE/NOT_FOUND` unless the workspace exists.
pub async fn ensure_workspace(pool: &SqlitePool, id: &WorkspaceId) -> AppResult<()> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM workspaces WHERE id = ?1")
        .bind(id.as_str())
        .fetch_optional(pool)
        .await?;
    match found {
        Some(_) => Ok(()),
        None => Err(
            AppError::new("WORKSPACE/NOT_FOUND", "Workspace does not exist")
                .with_context("workspace", id.as_str()),
        ),
    }
}
