//! Owned container entity - A purchased case waiting to be opened.
//!
//! `is_opened` goes from false to true exactly once, via a conditional update
//! inside the opening transaction.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Owned container database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "owned_containers")]
pub struct Model {
    /// Unique identifier for the purchased instance
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Owning account
    pub account_id: Uuid,
    /// Container that was purchased
    pub container_id: Uuid,
    /// Whether the case has been opened
    pub is_opened: bool,
    /// When the case was opened
    pub opened_at: Option<DateTimeUtc>,
    /// When the case was purchased
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `OwnedContainer` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each purchased case belongs to one account
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id"
    )]
    Account,
    /// Each purchased case is an instance of one container
    #[sea_orm(
        belongs_to = "super::container::Entity",
        from = "Column::ContainerId",
        to = "super::container::Column::Id"
    )]
    Container,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl Related<super::container::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Container.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
