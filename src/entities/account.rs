//! Account entity - A user's currency balance and daily-reward cooldown.
//!
//! The balance is only ever written by the ledger engine, always together with
//! a ledger entry in the same transaction. `version` is bumped on every balance
//! write so concurrent writers can detect a lost update.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    /// Resolved account identifier supplied by the authentication layer
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Current balance, never negative
    pub balance: Decimal,
    /// When the daily reward was last claimed, None if never
    pub last_reward_at: Option<DateTimeUtc>,
    /// Optimistic concurrency counter, incremented on every balance write
    pub version: i64,
    /// Set when reconciliation finds the ledger and balance out of sync
    pub is_frozen: bool,
    /// When the account was opened
    pub created_at: DateTimeUtc,
    /// When the account row was last written
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Account and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One account has many ledger entries
    #[sea_orm(has_many = "super::ledger_entry::Entity")]
    LedgerEntries,
    /// One account owns many purchased containers
    #[sea_orm(has_many = "super::owned_container::Entity")]
    OwnedContainers,
    /// One account owns many inventory items
    #[sea_orm(has_many = "super::inventory_item::Entity")]
    InventoryItems,
}

impl Related<super::ledger_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerEntries.def()
    }
}

impl Related<super::owned_container::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OwnedContainers.def()
    }
}

impl Related<super::inventory_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
