//! The seven entity types the engine moves, and the order they depend on each other.
//!
//! Later entities may reference earlier ones, so writes walk [`EntityKind::DEPENDENCY_ORDER`]
//! forwards and deletes walk it backwards.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Variant order is dependency order; `Ord` and every `BTreeMap<EntityKind, _>` follow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Category,
    Subcategory,
    Account,
    PaymentMethod,
    CostCenter,
    Transaction,
    MonthlyGoal,
}

impl EntityKind {
    pub const DEPENDENCY_ORDER: [EntityKind; 7] = [
        EntityKind::Category,
        EntityKind::Subcategory,
        EntityKind::Account,
        EntityKind::PaymentMethod,
        EntityKind::CostCenter,
        EntityKind::Transaction,
        EntityKind::MonthlyGoal,
    ];

    /// Physical table name, also the stem of the archive file.
    pub fn table(self) -> &'static str {
        match self {
            EntityKind::Category => "categories",
            EntityKind::Subcategory => "subcategories",
            EntityKind::Account => "accounts",
            EntityKind::PaymentMethod => "payment_methods",
            EntityKind::CostCenter => "cost_centers",
            EntityKind::Transaction => "transactions",
            EntityKind::MonthlyGoal => "monthly_goals",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Category => "Categories",
            EntityKind::Subcategory => "Subcategories",
            EntityKind::Account => "Accounts",
            EntityKind::PaymentMethod => "Payment methods",
            EntityKind::CostCenter => "Cost centers",
            EntityKind::Transaction => "Transactions",
            EntityKind::MonthlyGoal => "Monthly goals",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.csv", self.table())
    }

    /// Catalog entities are soft-deleted through `enabled`; only enabled rows are live.
    pub fn has_enabled_flag(self) -> bool {
        !matches!(self, EntityKind::Transaction | EntityKind::MonthlyGoal)
    }

    /// Foreign-key columns of this entity's table and the entity each one points at.
    pub fn foreign_keys(self) -> &'static [(&'static str, EntityKind)] {
        match self {
            EntityKind::Subcategory => &[("category_id", EntityKind::Category)],
            EntityKind::Transaction => &[
                ("account_id", EntityKind::Account),
                ("destination_account_id", EntityKind::Account),
                ("category_id", EntityKind::Category),
                ("subcategory_id", EntityKind::Subcategory),
                ("payment_method_id", EntityKind::PaymentMethod),
                ("cost_center_id", EntityKind::CostCenter),
            ],
            EntityKind::MonthlyGoal => &[("category_id", EntityKind::Category)],
            _ => &[],
        }
    }

    pub fn export_order(self) -> &'static str {
        match self {
            EntityKind::Transaction => "date DESC, id ASC",
            EntityKind::MonthlyGoal => "reference_month ASC, id ASC",
            _ => "name ASC, id ASC",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown entity type: {0}")]
pub struct ParseKindError(pub String);

impl FromStr for EntityKind {
    type Err = ParseKindError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
        let kind = match normalized.as_str() {
            "category" | "categories" => EntityKind::Category,
            "subcategory" | "subcategories" => EntityKind::Subcategory,
            "account" | "accounts" => EntityKind::Account,
            "payment_method" | "payment_methods" => EntityKind::PaymentMethod,
            "cost_center" | "cost_centers" => EntityKind::CostCenter,
            "transaction" | "transactions" => EntityKind::Transaction,
            "monthly_goal" | "monthly_goals" => EntityKind::MonthlyGoal,
            _ => return Err(ParseKindError(raw.to_string())),
        };
        Ok(kind)
    }
}

/// One boolean per entity type, as a caller ticks them in a selection dialog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntitySelection {
    pub categories: bool,
    pub subcategories: bool,
    pub accounts: bool,
    pub payment_methods: bool,
    pub cost_centers: bool,
    pub transactions: bool,
    pub monthly_goals: bool,
}

impl EntitySelection {
    pub fn all() -> Self {
        Self::only(&EntityKind::DEPENDENCY_ORDER)
    }

    pub fn only(kinds: &[EntityKind]) -> Self {
        let mut selection = Self::default();
        for kind in kinds {
            selection.set(*kind, true);
        }
        selection
    }

    pub fn contains(&self, kind: EntityKind) -> bool {
        match kind {
            EntityKind::Category => self.categories,
            EntityKind::Subcategory => self.subcategories,
            EntityKind::Account => self.accounts,
            EntityKind::PaymentMethod => self.payment_methods,
            EntityKind::CostCenter => self.cost_centers,
            EntityKind::Transaction => self.transactions,
            EntityKind::MonthlyGoal => self.monthly_goals,
        }
    }

    pub fn set(&mut self, kind: EntityKind, selected: bool) {
        let flag = match kind {
            EntityKind::Category => &mut self.categories,
            EntityKind::Subcategory => &mut self.subcategories,
            EntityKind::Account => &mut self.accounts,
            EntityKind::PaymentMethod => &mut self.payment_methods,
            EntityKind::CostCenter => &mut self.cost_centers,
            EntityKind::Transaction => &mut self.transactions,
            EntityKind::MonthlyGoal => &mut self.monthly_goals,
        };
        *flag = selected;
    }

    pub fn is_empty(&self) -> bool {
        self.kinds().is_empty()
    }

    /// Selected kinds in dependency order.
    pub fn kinds(&self) -> Vec<EntityKind> {
        EntityKind::DEPENDENCY_ORDER
            .into_iter()
            .filter(|kind| self.contains(*kind))
            .collect()
    }

    /// Selected kinds in reverse dependency order, the order deletes must run in.
    pub fn kinds_reversed(&self) -> Vec<EntityKind> {
        let mut kinds = self.kinds();
        kinds.reverse();
        kinds
    }
}
