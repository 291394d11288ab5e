//! Foreign-key check run before an import deletes or writes anything.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use sqlx::SqlitePool;

use super::execute::ImportMode;
use crate::catalog::EntityKind;
use crate::model::EntityRows;
use crate::store;
use crate::workspace::WorkspaceId;
use crate::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum ReferenceProblem {
    /// An incoming row points at a row that will not exist once the import has run.
    Dangling {
        entity: EntityKind,
        id: String,
        column: &'static str,
        target: EntityKind,
        target_id: String,
    },
    /// A stored row the import keeps points at a table a clean import would clear.
    BlocksClear {
        entity: EntityKind,
        id: String,
        column: &'static str,
        target: EntityKind,
    },
}

impl ReferenceProblem {
    fn entity(&self) -> EntityKind {
        match self {
            ReferenceProblem::Dangling { entity, .. }
            | ReferenceProblem::BlocksClear { entity, .. } => *entity,
        }
    }
}

impl fmt::Display for ReferenceProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceProblem::Dangling {
                entity,
                id,
                column,
                target,
                target_id,
            } => write!(f, "{entity} {id}: {column} points at missing {target} {target_id}"),
            ReferenceProblem::BlocksClear {
                entity,
                id,
                column,
                target,
            } => write!(
                f,
                "{entity} {id}: {column} still points into {target}, which would be cleared"
            ),
        }
    }
}

/// Verifies every foreign key the import relies on.
///
/// An incoming row may point at another incoming row, or at a stored row of a type the import
/// keeps. A clean import replaces the types it carries, so their stored rows do not count, and
/// stored rows of the types it keeps must not point into them.
pub async fn check_references(
    pool: &SqlitePool,
    ws: &WorkspaceId,
    sets: &[EntityRows],
    mode: ImportMode,
) -> Result<(), AppError> {
    let incoming: BTreeMap<EntityKind, HashSet<&str>> = sets
        .iter()
        .map(|rows| (rows.kind(), rows.ids().into_iter().collect()))
        .collect();
    let replaced = |kind: EntityKind| mode == ImportMode::Clean && incoming.contains_key(&kind);
    let mut stored: BTreeMap<EntityKind, HashSet<String>> = BTreeMap::new();
    let mut problems = Vec::new();

    for rows in sets {
        for &(column, target) in rows.kind().foreign_keys() {
            let references = rows.references(column);
            if references.is_empty() {
                continue;
            }
            if !replaced(target) && !stored.contains_key(&target) {
                stored.insert(target, store::fetch_ids(pool, ws, target).await?);
            }
            for (id, target_id) in references {
                let in_payload = incoming
                    .get(&target)
                    .is_some_and(|ids| ids.contains(target_id));
                let in_store = !replaced(target)
                    && stored.get(&target).is_some_and(|ids| ids.contains(target_id));
                if !in_payload && !in_store {
                    problems.push(ReferenceProblem::Dangling {
                        entity: rows.kind(),
                        id: id.to_string(),
                        column,
                        target,
                        target_id: target_id.to_string(),
                    });
                }
            }
        }
    }

    if mode == ImportMode::Clean {
        for kind in EntityKind::DEPENDENCY_ORDER {
            if incoming.contains_key(&kind) {
                continue;
            }
            for &(column, target) in kind.foreign_keys() {
                if !replaced(target) {
                    continue;
                }
                for (id, _) in store::fetch_references(pool, ws, kind, column).await? {
                    problems.push(ReferenceProblem::BlocksClear {
                        entity: kind,
                        id,
                        column,
                        target,
                    });
                }
            }
        }
    }

    let Some(first) = problems.first() else {
        return Ok(());
    };
    for problem in &problems {
        tracing::warn!(
            target: "finvault",
            area = "import",
            event = "reference_broken",
            workspace_id = ws.as_str(),
            problem = %problem
        );
    }
    Err(AppError::new(
        "IMPORT/REFERENCES",
        format!(
            "{} rows reference data the import would not keep; nothing was changed",
            problems.len()
        ),
    )
    .with_context("entity", first.entity().table())
    .with_context("first", first.to_string())
    .with_context("count", problems.len().to_string())
    .with_context("workspace", ws.as_str()))
}
