//! Ledger entry entity - An immutable record of one balance change.
//!
//! Entries are inserted in the same transaction as the balance write they
//! describe and are never updated or deleted. `kind` holds the string form of
//! [`crate::core::ledger::LedgerKind`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ledger entry database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_entries")]
pub struct Model {
    /// Unique identifier for the entry
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Account whose balance changed
    pub account_id: Uuid,
    /// Operation kind: `"registration"`, `"purchase"`, `"open"`, `"direct_open"`,
    /// `"sale"` or `"daily_reward"`
    pub kind: String,
    /// Signed change (negative for debits)
    pub amount: Decimal,
    /// Balance read at the start of the transaction
    pub balance_before: Decimal,
    /// Balance written by the transaction
    pub balance_after: Decimal,
    /// Human-readable description
    pub description: String,
    /// Entity that caused the change (owned container or inventory item)
    pub reference_id: Option<Uuid>,
    /// When the entry was written
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `LedgerEntry` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entry belongs to one account
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id"
    )]
    Account,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
