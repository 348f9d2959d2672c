//! Container entity - A purchasable case.
//!
//! Containers are static reference data. Only active containers with a
//! positive price can be bought or opened.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Container database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "containers")]
pub struct Model {
    /// Unique identifier for the case
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Display name of the case
    pub name: String,
    /// Price charged at purchase or direct open
    pub price: Decimal,
    /// Whether the case is currently on sale
    pub is_active: bool,
    /// Image location for presentation layers
    pub image_url: String,
    /// Free-form description
    pub description: String,
}

impl Model {
    /// Whether this container may be bought or opened.
    #[must_use]
    pub fn can_be_opened(&self) -> bool {
        self.is_active && self.price > Decimal::ZERO
    }
}

/// Defines relationships between Container and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One container has many drop table entries
    #[sea_orm(has_many = "super::drop_table_entry::Entity")]
    DropTableEntries,
    /// One container has many purchased instances
    #[sea_orm(has_many = "super::owned_container::Entity")]
    OwnedContainers,
}

impl Related<super::drop_table_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DropTableEntries.def()
    }
}

impl Related<super::owned_container::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OwnedContainers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
