//! Workspace-scoped bulk reads, writes and deletes over the seven entity tables.
//!
//! This is the only module that issues SQL against entity tables; every call takes the
//! workspace it operates on.

use std::collections::HashSet;

use serde::Serialize;
use sqlx::SqlitePool;

use crate::catalog::EntityKind;
use crate::model::{dispatch_kind, EntityRecord, EntityRows};
use crate::workspace::WorkspaceId;
use crate::AppError;

/// What to do when an inserted row's id already exists in the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Surface the constraint violation.
    Fail,
    /// Leave the existing row untouched.
    Skip,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchWrite {
    pub inserted: u64,
    pub skipped: u64,
}

fn store_error(
    code: &str,
    verb: &str,
    kind: EntityKind,
    ws: &WorkspaceId,
    err: sqlx::Error,
) -> AppError {
    AppError::new(code, format!("Failed to {verb} {}", kind.label().to_lowercase()))
        .with_context("entity", kind.table())
        .with_context("workspace", ws.as_str())
        .with_cause(err)
}

fn live_filter(kind: EntityKind) -> &'static str {
    if kind.has_enabled_flag() {
        " AND enabled = 1"
    } else {
        ""
    }
}

fn insert_sql(kind: EntityKind, columns: &[&str], conflict: ConflictPolicy) -> String {
    let placeholders: Vec<String> = (1..=columns.len() + 1).map(|i| format!("?{i}")).collect();
    let mut sql = format!(
        "INSERT INTO {} (workspace_id, {}) VALUES ({})",
        kind.table(),
        columns.join(", "),
        placeholders.join(", ")
    );
    if conflict == ConflictPolicy::Skip {
        sql.push_str(" ON CONFLICT DO NOTHING");
    }
    sql
}

/// Live rows of `T` in export order: enabled rows only for catalog entities.
pub async fn fetch_live<T: EntityRecord>(
    pool: &SqlitePool,
    ws: &WorkspaceId,
) -> Result<Vec<T>, AppError> {
    let kind = T::KIND;
    let sql = format!(
        "SELECT {} FROM {} WHERE workspace_id = ?1{} ORDER BY {}",
        T::COLUMNS.join(", "),
        kind.table(),
        live_filter(kind),
        kind.export_order()
    );
    sqlx::query_as::<_, T>(&sql)
        .bind(ws.as_str())
        .fetch_all(pool)
        .await
        .map_err(|err| store_error("STORE/READ", "read", kind, ws, err))
}

pub async fn fetch_live_rows(
    pool: &SqlitePool,
    ws: &WorkspaceId,
    kind: EntityKind,
) -> Result<EntityRows, AppError> {
    dispatch_kind!(kind, T => fetch_live::<T>(pool, ws).await.map(T::into_rows))
}

pub async fn count_live(
    pool: &SqlitePool,
    ws: &WorkspaceId,
    kind: EntityKind,
) -> Result<u64, AppError> {
    let sql = format!(
        "SELECT COUNT(*) FROM {} WHERE workspace_id = ?1{}",
        kind.table(),
        live_filter(kind)
    );
    let count: i64 = sqlx::query_scalar(&sql)
        .bind(ws.as_str())
        .fetch_one(pool)
        .await
        .map_err(|err| store_error("STORE/COUNT", "count", kind, ws, err))?;
    Ok(count.max(0) as u64)
}

/// Deletes the live rows of `kind`; disabled catalog rows stay.
pub async fn delete_live(
    pool: &SqlitePool,
    ws: &WorkspaceId,
    kind: EntityKind,
) -> Result<u64, AppError> {
    let sql = format!(
        "DELETE FROM {} WHERE workspace_id = ?1{}",
        kind.table(),
        live_filter(kind)
    );
    delete_with(pool, ws, kind, &sql).await
}

/// Deletes every row of `kind`, enabled or not.
pub async fn delete_all(
    pool: &SqlitePool,
    ws: &WorkspaceId,
    kind: EntityKind,
) -> Result<u64, AppError> {
    let sql = format!("DELETE FROM {} WHERE workspace_id = ?1", kind.table());
    delete_with(pool, ws, kind, &sql).await
}

async fn delete_with(
    pool: &SqlitePool,
    ws: &WorkspaceId,
    kind: EntityKind,
    sql: &str,
) -> Result<u64, AppError> {
    let result = sqlx::query(sql)
        .bind(ws.as_str())
        .execute(pool)
        .await
        .map_err(|err| store_error("STORE/DELETE", "delete", kind, ws, err))?;
    tracing::debug!(
        target: "finvault",
        area = "store",
        event = "rows_deleted",
        entity = kind.table(),
        workspace_id = ws.as_str(),
        count = result.rows_affected()
    );
    Ok(result.rows_affected())
}

/// Writes `rows` in a single store transaction. Nothing is committed if any row fails.
pub async fn insert_batch<T: EntityRecord>(
    pool: &SqlitePool,
    ws: &WorkspaceId,
    rows: &[T],
    conflict: ConflictPolicy,
) -> Result<BatchWrite, AppError> {
    let kind = T::KIND;
    let sql = insert_sql(kind, T::COLUMNS, conflict);
    let write_err = |err: sqlx::Error| store_error("STORE/WRITE", "write", kind, ws, err);

    let mut tx = pool.begin().await.map_err(write_err)?;
    let mut outcome = BatchWrite::default();
    for row in rows {
        let query = row.bind(sqlx::query(&sql).bind(ws.as_str()));
        let result = query.execute(&mut *tx).await.map_err(|err| {
            store_error("STORE/WRITE", "write", kind, ws, err).with_context("id", row.id())
        })?;
        if result.rows_affected() == 0 {
            outcome.skipped += 1;
        } else {
            outcome.inserted += result.rows_affected();
        }
    }
    tx.commit().await.map_err(write_err)?;
    Ok(outcome)
}

/// Ids of every row of `kind`, enabled or not.
pub async fn fetch_ids(
    pool: &SqlitePool,
    ws: &WorkspaceId,
    kind: EntityKind,
) -> Result<HashSet<String>, AppError> {
    let sql = format!("SELECT id FROM {} WHERE workspace_id = ?1", kind.table());
    let ids: Vec<String> = sqlx::query_scalar(&sql)
        .bind(ws.as_str())
        .fetch_all(pool)
        .await
        .map_err(|err| store_error("STORE/READ", "read", kind, ws, err))?;
    Ok(ids.into_iter().collect())
}

/// `(id, referenced id)` pairs of the rows of `kind` whose `column` is set.
pub async fn fetch_references(
    pool: &SqlitePool,
    ws: &WorkspaceId,
    kind: EntityKind,
    column: &str,
) -> Result<Vec<(String, String)>, AppError> {
    let sql = format!(
        "SELECT id, {column} FROM {} WHERE workspace_id = ?1 AND {column} IS NOT NULL",
        kind.table()
    );
    sqlx::query_as(&sql)
        .bind(ws.as_str())
        .fetch_all(pool)
        .await
        .map_err(|err| {
            store_error("STORE/READ", "read", kind, ws, err).with_context("column", column)
        })
}
