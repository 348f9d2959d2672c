//! Inventory item entity - A drawn copy of a skin owned by an account.
//!
//! The wear float and value are fixed at draw time. `is_sold` goes from false
//! to true at most once.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Inventory item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_items")]
pub struct Model {
    /// Unique identifier for the drawn item
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Owning account
    pub account_id: Uuid,
    /// Skin that was drawn
    pub catalog_item_id: Uuid,
    /// Wear float sampled at draw time, in `[0, 1]`
    pub wear: f64,
    /// Value derived from the wear float, credited on sale
    pub value: Decimal,
    /// Container the item was drawn from
    pub source_container_id: Uuid,
    /// Purchased case that was opened, None for direct opens
    pub owned_container_id: Option<Uuid>,
    /// Name of the source container at draw time
    pub acquired_from: String,
    /// Whether the item has been sold back
    pub is_sold: bool,
    /// When the item was sold
    pub sold_at: Option<DateTimeUtc>,
    /// When the item was drawn
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `InventoryItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each item belongs to one account
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id"
    )]
    Account,
    /// Each item is a copy of one skin
    #[sea_orm(
        belongs_to = "super::catalog_item::Entity",
        from = "Column::CatalogItemId",
        to = "super::catalog_item::Column::Id"
    )]
    CatalogItem,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl Related<super::catalog_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CatalogItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
