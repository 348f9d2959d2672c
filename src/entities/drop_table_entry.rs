//! Drop table entry entity - One weighted skin inside a container.
//!
//! Weights are unnormalized and are divided by the table total at draw time.
//! `position` defines the stable walk order used by the selector.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Drop table entry database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "drop_table_entries")]
pub struct Model {
    /// Unique identifier for the entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Container this entry belongs to
    pub container_id: Uuid,
    /// Skin that can drop
    pub catalog_item_id: Uuid,
    /// Non-negative probability weight
    pub weight: f64,
    /// Ordering of the entry within its table
    pub position: i32,
}

/// Defines relationships between `DropTableEntry` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entry belongs to one container
    #[sea_orm(
        belongs_to = "super::container::Entity",
        from = "Column::ContainerId",
        to = "super::container::Column::Id"
    )]
    Container,
    /// Each entry references one skin
    #[sea_orm(
        belongs_to = "super::catalog_item::Entity",
        from = "Column::CatalogItemId",
        to = "super::catalog_item::Column::Id"
    )]
    CatalogItem,
}

impl Related<super::container::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Container.def()
    }
}

impl Related<super::catalog_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CatalogItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
