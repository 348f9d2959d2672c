//! Entity module - Contains all SeaORM entity definitions for the economy store.
//! Accounts, owned containers and inventory items are mutable state; the catalog
//! (items, containers, drop tables) is static reference data; ledger entries are
//! append-only.

pub mod account;
pub mod catalog_item;
pub mod container;
pub mod drop_table_entry;
pub mod inventory_item;
pub mod ledger_entry;
pub mod owned_container;

// Re-export specific types to avoid conflicts
pub use account::{Column as AccountColumn, Entity as Account, Model as AccountModel};
pub use catalog_item::{
    Column as CatalogItemColumn, Entity as CatalogItem, Model as CatalogItemModel,
};
pub use container::{Column as ContainerColumn, Entity as Container, Model as ContainerModel};
pub use drop_table_entry::{
    Column as DropTableEntryColumn, Entity as DropTableEntry, Model as DropTableEntryModel,
};
pub use inventory_item::{
    Column as InventoryItemColumn, Entity as InventoryItem, Model as InventoryItemModel,
};
pub use ledger_entry::{
    Column as LedgerEntryColumn, Entity as LedgerEntry, Model as LedgerEntryModel,
};
pub use owned_container::{
    Column as OwnedContainerColumn, Entity as OwnedContainer, Model as OwnedContainerModel,
};
