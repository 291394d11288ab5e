//! Typed rows for the seven entity types.
//!
//! Field names double as column names in the store and as the header of the archive's
//! tabular files, so renaming a field is a format change.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{FromRow, Row, Sqlite};
use thiserror::Error;

use crate::catalog::{EntityKind, EntitySelection};

pub type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                match raw {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum!(CategoryKind {
    Income => "income",
    Expense => "expense",
    Both => "both",
});

text_enum!(TransactionKind {
    Income => "income",
    Expense => "expense",
    Transfer => "transfer",
});

text_enum!(TransactionStatus {
    Planned => "planned",
    Settled => "settled",
});

fn text_column<T>(row: &SqliteRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = UnknownVariant>,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|err: UnknownVariant| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(err),
    })
}

/// Glue between a row struct, its table and its SQL shape.
pub trait EntityRecord:
    Serialize
    + DeserializeOwned
    + for<'r> FromRow<'r, SqliteRow>
    + Clone
    + Send
    + Sync
    + Unpin
    + 'static
{
    const KIND: EntityKind;
    /// Columns in the order [`EntityRecord::bind`] binds them; `workspace_id` excluded.
    const COLUMNS: &'static [&'static str];

    fn id(&self) -> &str;

    /// Value of the foreign-key `column`, for the columns [`EntityKind::foreign_keys`] lists.
    fn reference(&self, _column: &str) -> Option<&str> {
        None
    }

    fn bind<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q>;

    fn into_rows(rows: Vec<Self>) -> EntityRows;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub kind: CategoryKind,
    pub icon: String,
    pub color: String,
    pub enabled: bool,
}

impl<'r> FromRow<'r, SqliteRow> for Category {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            kind: text_column(row, "kind")?,
            icon: row.try_get("icon")?,
            color: row.try_get("color")?,
            enabled: row.try_get("enabled")?,
        })
    }
}

impl EntityRecord for Category {
    const KIND: EntityKind = EntityKind::Category;
    const COLUMNS: &'static [&'static str] = &["id", "name", "kind", "icon", "color", "enabled"];

    fn id(&self) -> &str {
        &self.id
    }

    fn bind<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.id.as_str())
            .bind(self.name.as_str())
            .bind(self.kind.as_str())
            .bind(self.icon.as_str())
            .bind(self.color.as_str())
            .bind(self.enabled)
    }

    fn into_rows(rows: Vec<Self>) -> EntityRows {
        EntityRows::Categories(rows)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subcategory {
    pub id: String,
    pub name: String,
    pub category_id: String,
    pub enabled: bool,
}

impl<'r> FromRow<'r, SqliteRow> for Subcategory {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            category_id: row.try_get("category_id")?,
            enabled: row.try_get("enabled")?,
        })
    }
}

impl EntityRecord for Subcategory {
    const KIND: EntityKind = EntityKind::Subcategory;
    const COLUMNS: &'static [&'static str] = &["id", "name", "category_id", "enabled"];

    fn id(&self) -> &str {
        &self.id
    }

    fn reference(&self, column: &str) -> Option<&str> {
        match column {
            "category_id" => Some(self.category_id.as_str()),
            _ => None,
        }
    }

    fn bind<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.id.as_str())
            .bind(self.name.as_str())
            .bind(self.category_id.as_str())
            .bind(self.enabled)
    }

    fn into_rows(rows: Vec<Self>) -> EntityRows {
        EntityRows::Subcategories(rows)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub bank: String,
    pub credit_limit: Option<f64>,
    pub closing_day: Option<i64>,
    pub enabled: bool,
}

impl<'r> FromRow<'r, SqliteRow> for Account {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            kind: row.try_get("kind")?,
            bank: row.try_get("bank")?,
            credit_limit: row.try_get("credit_limit")?,
            closing_day: row.try_get("closing_day")?,
            enabled: row.try_get("enabled")?,
        })
    }
}

impl EntityRecord for Account {
    const KIND: EntityKind = EntityKind::Account;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "kind",
        "bank",
        "credit_limit",
        "closing_day",
        "enabled",
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn bind<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.id.as_str())
            .bind(self.name.as_str())
            .bind(self.kind.as_str())
            .bind(self.bank.as_str())
            .bind(self.credit_limit)
            .bind(self.closing_day)
            .bind(self.enabled)
    }

    fn into_rows(rows: Vec<Self>) -> EntityRows {
        EntityRows::Accounts(rows)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub allows_installments: bool,
    pub enabled: bool,
}

impl<'r> FromRow<'r, SqliteRow> for PaymentMethod {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            kind: row.try_get("kind")?,
            allows_installments: row.try_get("allows_installments")?,
            enabled: row.try_get("enabled")?,
        })
    }
}

impl EntityRecord for PaymentMethod {
    const KIND: EntityKind = EntityKind::PaymentMethod;
    const COLUMNS: &'static [&'static str] =
        &["id", "name", "kind", "allows_installments", "enabled"];

    fn id(&self) -> &str {
        &self.id
    }

    fn bind<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.id.as_str())
            .bind(self.name.as_str())
            .bind(self.kind.as_str())
            .bind(self.allows_installments)
            .bind(self.enabled)
    }

    fn into_rows(rows: Vec<Self>) -> EntityRows {
        EntityRows::PaymentMethods(rows)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostCenter {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub budget_amount: Option<f64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub archived: bool,
    pub enabled: bool,
}

impl<'r> FromRow<'r, SqliteRow> for CostCenter {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            color: row.try_get("color")?,
            budget_amount: row.try_get("budget_amount")?,
            start_date: row.try_get("start_date")?,
            end_date: row.try_get("end_date")?,
            archived: row.try_get("archived")?,
            enabled: row.try_get("enabled")?,
        })
    }
}

impl EntityRecord for CostCenter {
    const KIND: EntityKind = EntityKind::CostCenter;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "description",
        "color",
        "budget_amount",
        "start_date",
        "end_date",
        "archived",
        "enabled",
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn bind<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.id.as_str())
            .bind(self.name.as_str())
            .bind(self.description.as_deref())
            .bind(self.color.as_str())
            .bind(self.budget_amount)
            .bind(self.start_date.as_deref())
            .bind(self.end_date.as_deref())
            .bind(self.archived)
            .bind(self.enabled)
    }

    fn into_rows(rows: Vec<Self>) -> EntityRows {
        EntityRows::CostCenters(rows)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub date: String,
    pub description: String,
    pub amount: f64,
    pub kind: TransactionKind,
    pub account_id: String,
    pub destination_account_id: Option<String>,
    pub category_id: Option<String>,
    pub subcategory_id: Option<String>,
    pub payment_method_id: Option<String>,
    pub cost_center_id: Option<String>,
    pub installment_index: i64,
    pub installment_count: i64,
    pub installment_group_id: Option<String>,
    pub recurring: bool,
    pub recurrence_frequency: Option<String>,
    pub next_recurrence_date: Option<String>,
    pub status: TransactionStatus,
    pub due_date: Option<String>,
    pub attachment_url: Option<String>,
    pub notes: Option<String>,
}

impl<'r> FromRow<'r, SqliteRow> for Transaction {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            date: row.try_get("date")?,
            description: row.try_get("description")?,
            amount: row.try_get("amount")?,
            kind: text_column(row, "kind")?,
            account_id: row.try_get("account_id")?,
            destination_account_id: row.try_get("destination_account_id")?,
            category_id: row.try_get("category_id")?,
            subcategory_id: row.try_get("subcategory_id")?,
            payment_method_id: row.try_get("payment_method_id")?,
            cost_center_id: row.try_get("cost_center_id")?,
            installment_index: row.try_get("installment_index")?,
            installment_count: row.try_get("installment_count")?,
            installment_group_id: row.try_get("installment_group_id")?,
            recurring: row.try_get("recurring")?,
            recurrence_frequency: row.try_get("recurrence_frequency")?,
            next_recurrence_date: row.try_get("next_recurrence_date")?,
            status: text_column(row, "status")?,
            due_date: row.try_get("due_date")?,
            attachment_url: row.try_get("attachment_url")?,
            notes: row.try_get("notes")?,
        })
    }
}

impl EntityRecord for Transaction {
    const KIND: EntityKind = EntityKind::Transaction;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "date",
        "description",
        "amount",
        "kind",
        "account_id",
        "destination_account_id",
        "category_id",
        "subcategory_id",
        "payment_method_id",
        "cost_center_id",
        "installment_index",
        "installment_count",
        "installment_group_id",
        "recurring",
        "recurrence_frequency",
        "next_recurrence_date",
        "status",
        "due_date",
        "attachment_url",
        "notes",
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn reference(&self, column: &str) -> Option<&str> {
        match column {
            "account_id" => Some(self.account_id.as_str()),
            "destination_account_id" => self.destination_account_id.as_deref(),
            "category_id" => self.category_id.as_deref(),
            "subcategory_id" => self.subcategory_id.as_deref(),
            "payment_method_id" => self.payment_method_id.as_deref(),
            "cost_center_id" => self.cost_center_id.as_deref(),
            _ => None,
        }
    }

    fn bind<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.id.as_str())
            .bind(self.date.as_str())
            .bind(self.description.as_str())
            .bind(self.amount)
            .bind(self.kind.as_str())
            .bind(self.account_id.as_str())
            .bind(self.destination_account_id.as_deref())
            .bind(self.category_id.as_deref())
            .bind(self.subcategory_id.as_deref())
            .bind(self.payment_method_id.as_deref())
            .bind(self.cost_center_id.as_deref())
            .bind(self.installment_index)
            .bind(self.installment_count)
            .bind(self.installment_group_id.as_deref())
            .bind(self.recurring)
            .bind(self.recurrence_frequency.as_deref())
            .bind(self.next_recurrence_date.as_deref())
            .bind(self.status.as_str())
            .bind(self.due_date.as_deref())
            .bind(self.attachment_url.as_deref())
            .bind(self.notes.as_deref())
    }

    fn into_rows(rows: Vec<Self>) -> EntityRows {
        EntityRows::Transactions(rows)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyGoal {
    pub id: String,
    pub category_id: String,
    pub reference_month: String,
    pub goal_amount: f64,
}

impl<'r> FromRow<'r, SqliteRow> for MonthlyGoal {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            category_id: row.try_get("category_id")?,
            reference_month: row.try_get("reference_month")?,
            goal_amount: row.try_get("goal_amount")?,
        })
    }
}

impl EntityRecord for MonthlyGoal {
    const KIND: EntityKind = EntityKind::MonthlyGoal;
    const COLUMNS: &'static [&'static str] =
        &["id", "category_id", "reference_month", "goal_amount"];

    fn id(&self) -> &str {
        &self.id
    }

    fn reference(&self, column: &str) -> Option<&str> {
        match column {
            "category_id" => Some(self.category_id.as_str()),
            _ => None,
        }
    }

    fn bind<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.id.as_str())
            .bind(self.category_id.as_str())
            .bind(self.reference_month.as_str())
            .bind(self.goal_amount)
    }

    fn into_rows(rows: Vec<Self>) -> EntityRows {
        EntityRows::MonthlyGoals(rows)
    }
}

/// A row set of exactly one entity type.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityRows {
    Categories(Vec<Category>),
    Subcategories(Vec<Subcategory>),
    Accounts(Vec<Account>),
    PaymentMethods(Vec<PaymentMethod>),
    CostCenters(Vec<CostCenter>),
    Transactions(Vec<Transaction>),
    MonthlyGoals(Vec<MonthlyGoal>),
}

/// Expands `$body` once per variant with `$rows` bound to the inner `Vec`.
macro_rules! dispatch_rows {
    ($value:expr, $rows:ident => $body:expr) => {
        match $value {
            $crate::model::EntityRows::Categories($rows) => $body,
            $crate::model::EntityRows::Subcategories($rows) => $body,
            $crate::model::EntityRows::Accounts($rows) => $body,
            $crate::model::EntityRows::PaymentMethods($rows) => $body,
            $crate::model::EntityRows::CostCenters($rows) => $body,
            $crate::model::EntityRows::Transactions($rows) => $body,
            $crate::model::EntityRows::MonthlyGoals($rows) => $body,
        }
    };
}

/// Expands `$body` once per kind with `$ty` aliased to the matching row struct.
macro_rules! dispatch_kind {
    ($kind:expr, $ty:ident => $body:expr) => {
        match $kind {
            $crate::catalog::EntityKind::Category => {
                type $ty = $crate::model::Category;
                $body
            }
            $crate::catalog::EntityKind::Subcategory => {
                type $ty = $crate::model::Subcategory;
                $body
            }
            $crate::catalog::EntityKind::Account => {
                type $ty = $crate::model::Account;
                $body
            }
            $crate::catalog::EntityKind::PaymentMethod => {
                type $ty = $crate::model::PaymentMethod;
                $body
            }
            $crate::catalog::EntityKind::CostCenter => {
                type $ty = $crate::model::CostCenter;
                $body
            }
            $crate::catalog::EntityKind::Transaction => {
                type $ty = $crate::model::Transaction;
                $body
            }
            $crate::catalog::EntityKind::MonthlyGoal => {
                type $ty = $crate::model::MonthlyGoal;
                $body
            }
        }
    };
}

pub(crate) use dispatch_kind;
pub(crate) use dispatch_rows;

impl EntityRows {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRows::Categories(_) => EntityKind::Category,
            EntityRows::Subcategories(_) => EntityKind::Subcategory,
            EntityRows::Accounts(_) => EntityKind::Account,
            EntityRows::PaymentMethods(_) => EntityKind::PaymentMethod,
            EntityRows::CostCenters(_) => EntityKind::CostCenter,
            EntityRows::Transactions(_) => EntityKind::Transaction,
            EntityRows::MonthlyGoals(_) => EntityKind::MonthlyGoal,
        }
    }

    pub fn len(&self) -> usize {
        dispatch_rows!(self, rows => rows.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> Vec<&str> {
        dispatch_rows!(self, rows => rows.iter().map(|row| row.id()).collect())
    }

    /// `(id, referenced id)` pairs for every row whose `column` is set.
    pub fn references(&self, column: &str) -> Vec<(&str, &str)> {
        dispatch_rows!(self, rows => rows
            .iter()
            .filter_map(|row| row.reference(column).map(|target| (row.id(), target)))
            .collect())
    }
}

/// Parsed archive contents handed to the importer; absent entity types are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportPayload {
    pub categories: Option<Vec<Category>>,
    pub subcategories: Option<Vec<Subcategory>>,
    pub accounts: Option<Vec<Account>>,
    pub payment_methods: Option<Vec<PaymentMethod>>,
    pub cost_centers: Option<Vec<CostCenter>>,
    pub transactions: Option<Vec<Transaction>>,
    pub monthly_goals: Option<Vec<MonthlyGoal>>,
}

impl ImportPayload {
    /// Stores `rows`, replacing whatever was held for that entity type.
    pub fn insert(&mut self, rows: EntityRows) {
        match rows {
            EntityRows::Categories(rows) => self.categories = Some(rows),
            EntityRows::Subcategories(rows) => self.subcategories = Some(rows),
            EntityRows::Accounts(rows) => self.accounts = Some(rows),
            EntityRows::PaymentMethods(rows) => self.payment_methods = Some(rows),
            EntityRows::CostCenters(rows) => self.cost_centers = Some(rows),
            EntityRows::Transactions(rows) => self.transactions = Some(rows),
            EntityRows::MonthlyGoals(rows) => self.monthly_goals = Some(rows),
        }
    }

    pub fn with(mut self, rows: EntityRows) -> Self {
        self.insert(rows);
        self
    }

    /// Drops entity types the selection leaves out.
    pub fn retain(&mut self, selection: &EntitySelection) {
        for kind in EntityKind::DEPENDENCY_ORDER {
            if !selection.contains(kind) {
                self.take(kind);
            }
        }
    }

    pub fn take(&mut self, kind: EntityKind) -> Option<EntityRows> {
        match kind {
            EntityKind::Category => self.categories.take().map(EntityRows::Categories),
            EntityKind::Subcategory => self.subcategories.take().map(EntityRows::Subcategories),
            EntityKind::Account => self.accounts.take().map(EntityRows::Accounts),
            EntityKind::PaymentMethod => {
                self.payment_methods.take().map(EntityRows::PaymentMethods)
            }
            EntityKind::CostCenter => self.cost_centers.take().map(EntityRows::CostCenters),
            EntityKind::Transaction => self.transactions.take().map(EntityRows::Transactions),
            EntityKind::MonthlyGoal => self.monthly_goals.take().map(EntityRows::MonthlyGoals),
        }
    }

    pub fn contains(&self, kind: EntityKind) -> bool {
        match kind {
            EntityKind::Category => self.categories.is_some(),
            EntityKind::Subcategory => self.subcategories.is_some(),
            EntityKind::Account => self.accounts.is_some(),
            EntityKind::PaymentMethod => self.payment_methods.is_some(),
            EntityKind::CostCenter => self.cost_centers.is_some(),
            EntityKind::Transaction => self.transactions.is_some(),
            EntityKind::MonthlyGoal => self.monthly_goals.is_some(),
        }
    }

    /// Present entity types in dependency order.
    pub fn kinds(&self) -> Vec<EntityKind> {
        EntityKind::DEPENDENCY_ORDER
            .into_iter()
            .filter(|kind| self.contains(*kind))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds().is_empty()
    }

    /// Consumes the payload into its row sets, in dependency order.
    pub fn into_ordered(mut self) -> Vec<EntityRows> {
        self.kinds()
            .into_iter()
            .filter_map(|kind| self.take(kind))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: &str) -> Category {
        Category {
            id: id.into(),
            name: format!("Category {id}"),
            kind: CategoryKind::Expense,
            icon: "tag".into(),
            color: "#336699".into(),
            enabled: true,
        }
    }

    fn goal(id: &str) -> MonthlyGoal {
        MonthlyGoal {
            id: id.into(),
            category_id: "cat-1".into(),
            reference_month: "2026-01".into(),
            goal_amount: 300.0,
        }
    }

    #[test]
    fn text_enums_parse_their_own_rendering() {
        for kind in [
            TransactionKind::Income,
            TransactionKind::Expense,
            TransactionKind::Transfer,
        ] {
            assert_eq!(kind.as_str().parse::<TransactionKind>(), Ok(kind));
        }
        let err = "archived".parse::<TransactionStatus>().unwrap_err();
        assert_eq!(err.kind, "TransactionStatus");
        assert_eq!(err.value, "archived");
    }

    #[test]
    fn columns_cover_every_serialized_field() {
        let value = serde_json::to_value(category("cat-1")).unwrap();
        let fields: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(|k| k.as_str())
            .collect();
        let mut columns = Category::COLUMNS.to_vec();
        columns.sort();
        let mut sorted = fields.clone();
        sorted.sort();
        assert_eq!(sorted, columns);
    }

    #[test]
    fn payload_orders_present_kinds_by_dependency() {
        let payload = ImportPayload::default()
            .with(EntityRows::MonthlyGoals(vec![goal("g-1")]))
            .with(EntityRows::Categories(vec![category("cat-1")]));

        assert_eq!(
            payload.kinds(),
            vec![EntityKind::Category, EntityKind::MonthlyGoal]
        );
        let ordered = payload.into_ordered();
        assert_eq!(ordered.len(), 2);
        assert_eq!(ordered[0].kind(), EntityKind::Category);
        assert_eq!(ordered[1].kind(), EntityKind::MonthlyGoal);
    }

    #[test]
    fn retain_drops_unselected_kinds() {
        let mut payload = ImportPayload::default()
            .with(EntityRows::MonthlyGoals(vec![goal("g-1")]))
            .with(EntityRows::Categories(vec![category("cat-1")]));
        payload.retain(&EntitySelection::only(&[EntityKind::MonthlyGoal]));
        assert_eq!(payload.kinds(), vec![EntityKind::MonthlyGoal]);
    }
}
