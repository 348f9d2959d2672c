//! Catalog item entity - A drawable skin.
//!
//! Read-only reference data. The value range bounds what an inventory item
//! drawn from this skin can be worth.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Catalog item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "catalog_items")]
pub struct Model {
    /// Unique identifier for the skin
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Display name (e.g., "AK-47 | Redline")
    pub name: String,
    /// Weapon the skin applies to
    pub weapon_type: String,
    /// Rarity tier label (e.g., "Mil-Spec", "Covert")
    pub rarity: String,
    /// Value of a fully battle-scarred copy
    pub min_value: Decimal,
    /// Value of a pristine factory-new copy
    pub max_value: Decimal,
    /// Image location for presentation layers
    pub image_url: String,
    /// Free-form description
    pub description: String,
}

/// Defines relationships between `CatalogItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A skin appears in many drop tables
    #[sea_orm(has_many = "super::drop_table_entry::Entity")]
    DropTableEntries,
    /// A skin has many drawn copies
    #[sea_orm(has_many = "super::inventory_item::Entity")]
    InventoryItems,
}

impl Related<super::drop_table_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DropTableEntries.def()
    }
}

impl Related<super::inventory_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
