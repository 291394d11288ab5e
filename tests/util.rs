#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use finvault_lib::model::{
    Account, Category, CategoryKind, CostCenter, MonthlyGoal, PaymentMethod, Subcategory,
    Transaction, TransactionKind, TransactionStatus,
};
use finvault_lib::store::{insert_batch, ConflictPolicy};
use finvault_lib::workspace::insert_workspace;
use finvault_lib::{EntityKind, WorkspaceId};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

pub async fn temp_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("connect sqlite::memory:");
    sqlx::query("PRAGMA foreign_keys=ON;")
        .execute(&pool)
        .await
        .unwrap();
    finvault_lib::migrate::apply_migrations(&pool)
        .await
        .expect("apply migrations");
    pool
}

pub async fn workspace(pool: &SqlitePool, id: &str) -> WorkspaceId {
    let ws = WorkspaceId::parse(id).unwrap();
    insert_workspace(pool, &ws, &format!("Workspace {id}"))
        .await
        .unwrap();
    ws
}

/// Counts every row of `kind` in `ws`, enabled or not.
pub async fn count_rows(pool: &SqlitePool, ws: &WorkspaceId, kind: EntityKind) -> i64 {
    let sql = format!("SELECT COUNT(*) FROM {} WHERE workspace_id = ?1", kind.table());
    sqlx::query_scalar(&sql)
        .bind(ws.as_str())
        .fetch_one(pool)
        .await
        .unwrap()
}

pub fn category(id: &str, name: &str) -> Category {
    Category {
        id: id.into(),
        name: name.into(),
        kind: CategoryKind::Expense,
        icon: "tag".into(),
        color: "#336699".into(),
        enabled: true,
    }
}

pub fn subcategory(id: &str, category_id: &str) -> Subcategory {
    Subcategory {
        id: id.into(),
        name: format!("Sub {id}"),
        category_id: category_id.into(),
        enabled: true,
    }
}

pub fn account(id: &str) -> Account {
    Account {
        id: id.into(),
        name: format!("Account {id}"),
        kind: "checking".into(),
        bank: "First Bank".into(),
        credit_limit: None,
        closing_day: None,
        enabled: true,
    }
}

pub fn payment_method(id: &str) -> PaymentMethod {
    PaymentMethod {
        id: id.into(),
        name: format!("Method {id}"),
        kind: "card".into(),
        allows_installments: true,
        enabled: true,
    }
}

pub fn cost_center(id: &str) -> CostCenter {
    CostCenter {
        id: id.into(),
        name: format!("Center {id}"),
        description: Some("Shared costs".into()),
        color: "#aa0000".into(),
        budget_amount: Some(1500.5),
        start_date: Some("2026-01-01".into()),
        end_date: None,
        archived: false,
        enabled: true,
    }
}

pub fn transaction(id: &str, account_id: &str, day: u32) -> Transaction {
    Transaction {
        id: id.into(),
        date: format!("2026-03-{:02}", day % 28 + 1),
        description: format!("Purchase {id}"),
        amount: 12.34,
        kind: TransactionKind::Expense,
        account_id: account_id.into(),
        destination_account_id: None,
        category_id: None,
        subcategory_id: None,
        payment_method_id: None,
        cost_center_id: None,
        installment_index: 1,
        installment_count: 1,
        installment_group_id: None,
        recurring: false,
        recurrence_frequency: None,
        next_recurrence_date: None,
        status: TransactionStatus::Settled,
        due_date: None,
        attachment_url: None,
        notes: None,
    }
}

pub fn transactions(count: usize, account_id: &str) -> Vec<Transaction> {
    (0..count)
        .map(|i| transaction(&format!("tx-{i:04}"), account_id, i as u32))
        .collect()
}

pub fn goal(id: &str, category_id: &str) -> MonthlyGoal {
    MonthlyGoal {
        id: id.into(),
        category_id: category_id.into(),
        reference_month: "2026-03".into(),
        goal_amount: 400.0,
    }
}

/// Live row counts per entity type after [`seed_dataset`].
pub const SEEDED: [(EntityKind, u64); 7] = [
    (EntityKind::Category, 2),
    (EntityKind::Subcategory, 2),
    (EntityKind::Account, 2),
    (EntityKind::PaymentMethod, 1),
    (EntityKind::CostCenter, 1),
    (EntityKind::Transaction, 6),
    (EntityKind::MonthlyGoal, 2),
];

/// Fills `ws` with a small, fully linked dataset plus one disabled category.
pub async fn seed_dataset(pool: &SqlitePool, ws: &WorkspaceId) {
    let mut hidden = category("cat-hidden", "Hidden");
    hidden.enabled = false;
    let categories = vec![category("cat-food", "Food"), category("cat-home", "Home"), hidden];
    insert_batch(pool, ws, &categories, ConflictPolicy::Fail).await.unwrap();
    insert_batch(
        pool,
        ws,
        &[subcategory("sub-groceries", "cat-food"), subcategory("sub-rent", "cat-home")],
        ConflictPolicy::Fail,
    )
    .await
    .unwrap();
    insert_batch(pool, ws, &[account("acc-main"), account("acc-savings")], ConflictPolicy::Fail)
        .await
        .unwrap();
    insert_batch(pool, ws, &[payment_method("pm-card")], ConflictPolicy::Fail)
        .await
        .unwrap();
    insert_batch(pool, ws, &[cost_center("cc-house")], ConflictPolicy::Fail)
        .await
        .unwrap();

    let mut rows = transactions(6, "acc-main");
    rows[0].category_id = Some("cat-food".into());
    rows[0].subcategory_id = Some("sub-groceries".into());
    rows[0].payment_method_id = Some("pm-card".into());
    rows[0].cost_center_id = Some("cc-house".into());
    rows[1].kind = TransactionKind::Transfer;
    rows[1].destination_account_id = Some("acc-savings".into());
    rows[2].status = TransactionStatus::Planned;
    rows[2].notes = Some("split with \"Sam\", paid later".into());
    insert_batch(pool, ws, &rows, ConflictPolicy::Fail).await.unwrap();

    insert_batch(
        pool,
        ws,
        &[goal("goal-food", "cat-food"), goal("goal-home", "cat-home")],
        ConflictPolicy::Fail,
    )
    .await
    .unwrap();
}
