//! Catalog business logic - read access to containers and their drop tables.
//!
//! The catalog is static reference data owned by an external seeding process;
//! nothing here writes to it. A [`DropTable`] is loaded in its stable order
//! (`position`, then entry id) so that draws walk the same sequence every time.

use crate::{
    core::{
        selector,
        valuation::{self, Valuation},
    },
    entities::{CatalogItem, Container, DropTableEntry, catalog_item, container, drop_table_entry},
    errors::Result,
};
use rand::Rng;
use sea_orm::{QueryOrder, prelude::*};
use tracing::warn;

/// One skin in a drop table together with its raw weight.
#[derive(Debug, Clone, PartialEq)]
pub struct DropSlot {
    /// The skin that can drop
    pub item: catalog_item::Model,
    /// Unnormalized weight as stored
    pub weight: f64,
}

/// A container with its ordered, weighted contents.
#[derive(Debug, Clone, PartialEq)]
pub struct DropTable {
    /// The container the table belongs to
    pub container: container::Model,
    /// Entries in walk order
    pub slots: Vec<DropSlot>,
}

/// Outcome of drawing from a drop table, before anything is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Draw {
    /// The selected skin
    pub item: catalog_item::Model,
    /// Sampled wear float
    pub wear: f64,
    /// Value and condition derived from the wear float
    pub valuation: Valuation,
}

impl DropTable {
    fn weighted(&self) -> Vec<(&catalog_item::Model, f64)> {
        self.slots.iter().map(|slot| (&slot.item, slot.weight)).collect()
    }

    /// Each skin with its share of the table total, in table order.
    pub fn drop_chances(&self) -> Result<Vec<(&catalog_item::Model, f64)>> {
        let weighted = self.weighted();
        let chances = selector::probabilities(&weighted)?;
        Ok(self
            .slots
            .iter()
            .map(|slot| &slot.item)
            .zip(chances)
            .collect())
    }

    /// Selects a skin, samples its wear and values it.
    ///
    /// # Errors
    /// `Selection` if the table is empty or has no positive weight.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Draw> {
        let weighted = self.weighted();
        let item = (*selector::select(&weighted, rng)?).clone();
        let wear = valuation::sample_wear(rng);
        let valuation = valuation::valuate(item.min_value, item.max_value, wear)?;
        Ok(Draw {
            item,
            wear,
            valuation,
        })
    }
}

/// Lists every active container, ordered by name.
pub async fn get_active_containers<C>(db: &C) -> Result<Vec<container::Model>>
where
    C: ConnectionTrait,
{
    Container::find()
        .filter(container::Column::IsActive.eq(true))
        .filter(container::Column::Price.gt(Decimal::ZERO))
        .order_by_asc(container::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a container by id, active or not.
pub async fn get_container<C>(db: &C, container_id: Uuid) -> Result<Option<container::Model>>
where
    C: ConnectionTrait,
{
    Container::find_by_id(container_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a skin by id.
pub async fn get_catalog_item<C>(db: &C, item_id: Uuid) -> Result<Option<catalog_item::Model>>
where
    C: ConnectionTrait,
{
    CatalogItem::find_by_id(item_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Loads the drop table of a container in its stable order.
pub async fn load_drop_table<C>(db: &C, container: container::Model) -> Result<DropTable>
where
    C: ConnectionTrait,
{
    let rows = DropTableEntry::find()
        .filter(drop_table_entry::Column::ContainerId.eq(container.id))
        .order_by_asc(drop_table_entry::Column::Position)
        .order_by_asc(drop_table_entry::Column::Id)
        .find_also_related(CatalogItem)
        .all(db)
        .await?;

    let mut slots = Vec::with_capacity(rows.len());
    for (entry, item) in rows {
        match item {
            Some(item) => slots.push(DropSlot {
                item,
                weight: entry.weight,
            }),
            None => warn!(
                "Drop table entry {} of container {} references missing skin {}",
                entry.id, container.id, entry.catalog_item_id
            ),
        }
    }

    Ok(DropTable { container, slots })
}
