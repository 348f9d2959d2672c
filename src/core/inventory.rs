//! Inventory reads - drawn items and purchased containers still waiting to be opened.

use crate::{
    core::valuation::Condition,
    entities::{
        CatalogItem, Container, InventoryItem, OwnedContainer, catalog_item, container,
        inventory_item, owned_container,
    },
    errors::Result,
};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, prelude::*};
use std::collections::BTreeMap;

/// An inventory item joined with the skin it is an instance of.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryEntry {
    /// The owned instance
    pub item: inventory_item::Model,
    /// The catalog skin, None if it was removed from the catalog
    pub catalog_item: Option<catalog_item::Model>,
    /// Condition bucket of the stored wear float
    pub condition: Condition,
}

/// An account's inventory with aggregate figures over its unsold items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventoryView {
    /// Items, newest first
    pub entries: Vec<InventoryEntry>,
    /// Sum of the values of unsold items
    pub total_value: Decimal,
    /// Number of unsold items
    pub item_count: usize,
    /// Unsold item count per rarity name
    pub rarity_counts: BTreeMap<String, usize>,
}

/// Lists an account's items, newest first, with totals over the unsold ones.
///
/// Sold items are included only when `include_sold` is set; they never count
/// towards the totals.
pub async fn get_inventory<C>(db: &C, account_id: Uuid, include_sold: bool) -> Result<InventoryView>
where
    C: ConnectionTrait,
{
    let mut query = InventoryItem::find().filter(inventory_item::Column::AccountId.eq(account_id));
    if !include_sold {
        query = query.filter(inventory_item::Column::IsSold.eq(false));
    }
    let rows = query
        .order_by_desc(inventory_item::Column::CreatedAt)
        .find_also_related(CatalogItem)
        .all(db)
        .await?;

    let mut view = InventoryView::default();
    for (item, catalog_item) in rows {
        if !item.is_sold {
            view.total_value += item.value;
            view.item_count += 1;
            if let Some(skin) = &catalog_item {
                *view.rarity_counts.entry(skin.rarity.clone()).or_insert(0) += 1;
            }
        }
        let condition = Condition::from_wear(item.wear)?;
        view.entries.push(InventoryEntry {
            item,
            catalog_item,
            condition,
        });
    }
    Ok(view)
}

/// Finds one of an account's inventory items.
pub async fn get_inventory_item<C>(
    db: &C,
    account_id: Uuid,
    item_id: Uuid,
) -> Result<Option<inventory_item::Model>>
where
    C: ConnectionTrait,
{
    InventoryItem::find_by_id(item_id)
        .filter(inventory_item::Column::AccountId.eq(account_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists an account's purchased, unopened containers, newest first.
pub async fn get_unopened_containers<C>(
    db: &C,
    account_id: Uuid,
) -> Result<Vec<(owned_container::Model, Option<container::Model>)>>
where
    C: ConnectionTrait,
{
    OwnedContainer::find()
        .filter(owned_container::Column::AccountId.eq(account_id))
        .filter(owned_container::Column::IsOpened.eq(false))
        .order_by_desc(owned_container::Column::CreatedAt)
        .find_also_related(Container)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds one of an account's owned containers, opened or not.
pub async fn get_owned_container<C>(
    db: &C,
    account_id: Uuid,
    owned_container_id: Uuid,
) -> Result<Option<owned_container::Model>>
where
    C: ConnectionTrait,
{
    OwnedContainer::find_by_id(owned_container_id)
        .filter(owned_container::Column::AccountId.eq(account_id))
        .one(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::ledger;
    use chrono::{Duration, Utc};
    use crate::test_utils::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use sea_orm::TransactionTrait;

    #[tokio::test]
    async fn test_inventory_totals_skip_sold_items() -> Result<()> {
        let (db, account, fixture) = setup_with_case().await?;
        let mut rng = StdRng::seed_from_u64(5);
        let start = Utc::now();

        let txn = db.begin().await?;
        let first =
            ledger::open_container_direct(&txn, account.id, fixture.container.id, &mut rng, start)
                .await?;
        let second = ledger::open_container_direct(
            &txn,
            account.id,
            fixture.container.id,
            &mut rng,
            start + Duration::seconds(1),
        )
        .await?;
        ledger::sell_inventory_item(&txn, account.id, first.item.id, start + Duration::seconds(2))
            .await?;
        txn.commit().await?;

        let view = get_inventory(&db, account.id, false).await?;
        assert_eq!(view.entries.len(), 1);
        assert_eq!(view.item_count, 1);
        assert_eq!(view.total_value, second.item.value);
        assert_eq!(
            view.rarity_counts.get(&second.catalog_item.rarity),
            Some(&1)
        );

        let everything = get_inventory(&db, account.id, true).await?;
        assert_eq!(everything.entries.len(), 2);
        assert_eq!(everything.item_count, 1);
        assert_eq!(everything.entries[0].item.id, second.item.id);
        assert!(everything.entries[1].item.is_sold);
        Ok(())
    }

    #[tokio::test]
    async fn test_inventory_item_scoped_to_owner() -> Result<()> {
        let (db, account, fixture) = setup_with_case().await?;
        let stranger = create_test_account(&db, 0).await?;
        let mut rng = StdRng::seed_from_u64(5);

        let txn = db.begin().await?;
        let opened = ledger::open_container_direct(
            &txn,
            account.id,
            fixture.container.id,
            &mut rng,
            Utc::now(),
        )
        .await?;
        txn.commit().await?;

        assert!(get_inventory_item(&db, account.id, opened.item.id).await?.is_some());
        assert!(get_inventory_item(&db, stranger.id, opened.item.id).await?.is_none());
        assert!(get_inventory(&db, stranger.id, true).await?.entries.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_unopened_containers_newest_first() -> Result<()> {
        let (db, account, fixture) = setup_with_case().await?;
        let mut rng = StdRng::seed_from_u64(5);
        let start = Utc::now();

        let txn = db.begin().await?;
        let older =
            ledger::purchase_container(&txn, account.id, fixture.container.id, start).await?;
        let newer = ledger::purchase_container(
            &txn,
            account.id,
            fixture.container.id,
            start + Duration::seconds(5),
        )
        .await?;
        let opened = ledger::purchase_container(
            &txn,
            account.id,
            fixture.container.id,
            start + Duration::seconds(10),
        )
        .await?;
        ledger::open_owned_container(
            &txn,
            account.id,
            opened.owned_container.id,
            &mut rng,
            start + Duration::seconds(11),
        )
        .await?;
        txn.commit().await?;

        let unopened = get_unopened_containers(&db, account.id).await?;
        let ids: Vec<Uuid> = unopened.iter().map(|(owned, _)| owned.id).collect();
        assert_eq!(ids, vec![newer.owned_container.id, older.owned_container.id]);
        assert_eq!(
            unopened[0].1.as_ref().map(|c| c.id),
            Some(fixture.container.id)
        );

        let consumed = get_owned_container(&db, account.id, opened.owned_container.id)
            .await?
            .unwrap();
        assert!(consumed.is_opened);
        Ok(())
    }
}
