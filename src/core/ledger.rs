//! Ledger engine - the transactional core of the economy.
//!
//! Every balance-affecting operation runs inside a caller-provided
//! [`DatabaseTransaction`]. Within it the account row is read once; that read
//! supplies `balance_before`, `balance_after = balance_before + amount` is
//! written back with an optimistic version check, and the ledger entry is
//! inserted with exactly those two numbers. Flag transitions on owned
//! containers and inventory items are conditional updates (`... WHERE
//! is_opened = false`), so two concurrent attempts can never both succeed.
//!
//! Nothing here commits. If the caller drops the transaction, every write made
//! through these functions is rolled back together.

use crate::{
    core::{catalog, valuation::Condition},
    entities::{
        Account, InventoryItem, OwnedContainer, account, catalog_item, container,
        inventory_item, ledger_entry, owned_container,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::{DatabaseTransaction, Set, prelude::*, sea_query::Expr};
use std::{fmt, str::FromStr};
use tracing::{debug, instrument};

/// Kind of balance-affecting operation recorded in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerKind {
    /// Starting balance granted when the account was opened
    Registration,
    /// A container bought for later opening
    Purchase,
    /// A pre-purchased container opened; moves no currency
    Open,
    /// A container paid for and opened in one step
    DirectOpen,
    /// An inventory item sold back for its value
    Sale,
    /// The periodic login bonus
    DailyReward,
}

impl LedgerKind {
    /// Every kind, in declaration order
    pub const ALL: [Self; 6] = [
        Self::Registration,
        Self::Purchase,
        Self::Open,
        Self::DirectOpen,
        Self::Sale,
        Self::DailyReward,
    ];

    /// Stored string form
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Registration => "registration",
            Self::Purchase => "purchase",
            Self::Open => "open",
            Self::DirectOpen => "direct_open",
            Self::Sale => "sale",
            Self::DailyReward => "daily_reward",
        }
    }
}

impl fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedgerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::InvalidIdentifier {
                value: s.to_string(),
            })
    }
}

/// Result of a successful container purchase.
#[derive(Debug, Clone)]
pub struct PurchaseReceipt {
    /// The unopened container now owned by the account
    pub owned_container: owned_container::Model,
    /// The container that was bought
    pub container: container::Model,
    /// Ledger entry for the debit
    pub entry: ledger_entry::Model,
    /// Balance after the debit
    pub balance: Decimal,
}

/// Result of a successful open, pre-purchased or direct.
#[derive(Debug, Clone)]
pub struct OpenReceipt {
    /// The newly drawn inventory item
    pub item: inventory_item::Model,
    /// The skin that was drawn
    pub catalog_item: catalog_item::Model,
    /// Condition bucket of the drawn wear float
    pub condition: Condition,
    /// The container the draw came from
    pub container: container::Model,
    /// The purchased case that was consumed, None for direct opens
    pub owned_container: Option<owned_container::Model>,
    /// Ledger entry for the open
    pub entry: ledger_entry::Model,
    /// Balance after the operation
    pub balance: Decimal,
}

/// Result of a successful sale.
#[derive(Debug, Clone)]
pub struct SaleReceipt {
    /// The item, now marked sold
    pub item: inventory_item::Model,
    /// Ledger entry for the credit
    pub entry: ledger_entry::Model,
    /// Balance after the credit
    pub balance: Decimal,
}

/// Outcome of a daily reward claim. Ineligibility is not an error.
#[derive(Debug, Clone)]
pub enum DailyRewardOutcome {
    /// The reward was credited
    Claimed {
        /// Ledger entry for the credit
        entry: ledger_entry::Model,
        /// Balance after the credit
        balance: Decimal,
    },
    /// The cooldown has not elapsed yet
    NotYetEligible {
        /// Earliest time the next claim will succeed
        next_eligible_at: DateTime<Utc>,
    },
}

/// A balance change to be applied and recorded.
pub(crate) struct Posting {
    pub(crate) kind: LedgerKind,
    pub(crate) amount: Decimal,
    pub(crate) description: String,
    pub(crate) reference_id: Option<Uuid>,
    pub(crate) claimed_reward_at: Option<DateTime<Utc>>,
}

/// Reads the account inside the transaction and refuses frozen accounts.
pub(crate) async fn load_writable_account(
    txn: &DatabaseTransaction,
    account_id: Uuid,
) -> Result<account::Model> {
    let account = Account::find_by_id(account_id)
        .one(txn)
        .await?
        .ok_or(Error::AccountNotFound { id: account_id })?;

    if account.is_frozen {
        return Err(Error::AccountFrozen { id: account_id });
    }
    Ok(account)
}

/// Applies a posting to an account read earlier in the same transaction.
///
/// The balance write only succeeds if the account's version is unchanged since
/// that read; otherwise another transaction got there first and the whole
/// operation must be retried from scratch.
pub(crate) async fn post(
    txn: &DatabaseTransaction,
    account: &account::Model,
    posting: Posting,
    now: DateTime<Utc>,
) -> Result<(ledger_entry::Model, Decimal)> {
    let balance_before = account.balance;
    let balance_after = balance_before + posting.amount;
    if balance_after < Decimal::ZERO {
        return Err(Error::InsufficientFunds {
            current: balance_before,
            required: -posting.amount,
        });
    }

    let mut update = Account::update_many()
        .col_expr(account::Column::Balance, Expr::value(balance_after))
        .col_expr(
            account::Column::Version,
            Expr::col(account::Column::Version).add(1),
        )
        .col_expr(account::Column::UpdatedAt, Expr::value(now));
    if let Some(claimed_at) = posting.claimed_reward_at {
        update = update.col_expr(account::Column::LastRewardAt, Expr::value(Some(claimed_at)));
    }
    let result = update
        .filter(account::Column::Id.eq(account.id))
        .filter(account::Column::Version.eq(account.version))
        .exec(txn)
        .await?;

    if result.rows_affected != 1 {
        return Err(Error::TransientStore {
            reason: format!("account {} was modified concurrently", account.id),
        });
    }

    let entry = ledger_entry::ActiveModel {
        id: Set(Uuid::new_v4()),
        account_id: Set(account.id),
        kind: Set(posting.kind.as_str().to_string()),
        amount: Set(posting.amount),
        balance_before: Set(balance_before),
        balance_after: Set(balance_after),
        description: Set(posting.description),
        reference_id: Set(posting.reference_id),
        created_at: Set(now),
    }
    .insert(txn)
    .await?;

    debug!(
        "Posted {} of {} to account {}: {} -> {}",
        posting.kind, posting.amount, account.id, balance_before, balance_after
    );
    Ok((entry, balance_after))
}

async fn load_openable_container(
    txn: &DatabaseTransaction,
    container_id: Uuid,
) -> Result<container::Model> {
    let container = catalog::get_container(txn, container_id)
        .await?
        .ok_or(Error::ContainerNotFound { id: container_id })?;
    if !container.can_be_opened() {
        return Err(Error::ContainerInactive { id: container_id });
    }
    Ok(container)
}

fn check_funds(account: &account::Model, price: Decimal) -> Result<()> {
    if account.balance < price {
        return Err(Error::InsufficientFunds {
            current: account.balance,
            required: price,
        });
    }
    Ok(())
}

struct NewItem<'a> {
    account_id: Uuid,
    container: &'a container::Model,
    owned_container_id: Option<Uuid>,
}

async fn draw_into_inventory<R>(
    txn: &DatabaseTransaction,
    new_item: NewItem<'_>,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Result<(inventory_item::Model, catalog_item::Model, Condition)>
where
    R: Rng + ?Sized,
{
    let table = catalog::load_drop_table(txn, new_item.container.clone()).await?;
    let draw = table.draw(rng)?;

    let item = inventory_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        account_id: Set(new_item.account_id),
        catalog_item_id: Set(draw.item.id),
        wear: Set(draw.wear),
        value: Set(draw.valuation.value),
        source_container_id: Set(new_item.container.id),
        owned_container_id: Set(new_item.owned_container_id),
        acquired_from: Set(new_item.container.name.clone()),
        is_sold: Set(false),
        sold_at: Set(None),
        created_at: Set(now),
    }
    .insert(txn)
    .await?;

    Ok((item, draw.item, draw.valuation.condition))
}

/// Buys a container for later opening.
///
/// Debits the price, creates an unopened [`owned_container`] row and records a
/// `purchase` entry of `-price` referencing it.
#[instrument(skip(txn))]
pub async fn purchase_container(
    txn: &DatabaseTransaction,
    account_id: Uuid,
    container_id: Uuid,
    now: DateTime<Utc>,
) -> Result<PurchaseReceipt> {
    let account = load_writable_account(txn, account_id).await?;
    let container = load_openable_container(txn, container_id).await?;
    check_funds(&account, container.price)?;

    let owned_container = owned_container::ActiveModel {
        id: Set(Uuid::new_v4()),
        account_id: Set(account_id),
        container_id: Set(container_id),
        is_opened: Set(false),
        opened_at: Set(None),
        created_at: Set(now),
    }
    .insert(txn)
    .await?;

    let (entry, balance) = post(
        txn,
        &account,
        Posting {
            kind: LedgerKind::Purchase,
            amount: -container.price,
            description: format!("Purchased {}", container.name),
            reference_id: Some(owned_container.id),
            claimed_reward_at: None,
        },
        now,
    )
    .await?;

    Ok(PurchaseReceipt {
        owned_container,
        container,
        entry,
        balance,
    })
}

/// Opens a container the account bought earlier.
///
/// The opened flag is flipped with a conditional update first; if no row
/// matches (missing, someone else's, or already opened) nothing else happens.
/// No currency moves, so the `open` entry has amount zero and references the
/// new inventory item.
#[instrument(skip(txn, rng))]
pub async fn open_owned_container<R>(
    txn: &DatabaseTransaction,
    account_id: Uuid,
    owned_container_id: Uuid,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Result<OpenReceipt>
where
    R: Rng + ?Sized,
{
    let account = load_writable_account(txn, account_id).await?;

    let claimed = OwnedContainer::update_many()
        .col_expr(owned_container::Column::IsOpened, Expr::value(true))
        .col_expr(owned_container::Column::OpenedAt, Expr::value(Some(now)))
        .filter(owned_container::Column::Id.eq(owned_container_id))
        .filter(owned_container::Column::AccountId.eq(account_id))
        .filter(owned_container::Column::IsOpened.eq(false))
        .exec(txn)
        .await?;
    if claimed.rows_affected != 1 {
        return Err(Error::NotFoundOrAlreadyOpened {
            id: owned_container_id,
        });
    }

    let owned_container = OwnedContainer::find_by_id(owned_container_id)
        .one(txn)
        .await?
        .ok_or(Error::NotFoundOrAlreadyOpened {
            id: owned_container_id,
        })?;
    let container = catalog::get_container(txn, owned_container.container_id)
        .await?
        .ok_or(Error::ContainerNotFound {
            id: owned_container.container_id,
        })?;

    let (item, catalog_item, condition) = draw_into_inventory(
        txn,
        NewItem {
            account_id,
            container: &container,
            owned_container_id: Some(owned_container_id),
        },
        rng,
        now,
    )
    .await?;

    let (entry, balance) = post(
        txn,
        &account,
        Posting {
            kind: LedgerKind::Open,
            amount: Decimal::ZERO,
            description: format!("Opened {}", container.name),
            reference_id: Some(item.id),
            claimed_reward_at: None,
        },
        now,
    )
    .await?;

    Ok(OpenReceipt {
        item,
        catalog_item,
        condition,
        container,
        owned_container: Some(owned_container),
        entry,
        balance,
    })
}

/// Pays for a container and opens it in one step.
///
/// Unlike [`open_owned_container`] the price is charged here, so the
/// `direct_open` entry carries `-price`.
#[instrument(skip(txn, rng))]
pub async fn open_container_direct<R>(
    txn: &DatabaseTransaction,
    account_id: Uuid,
    container_id: Uuid,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Result<OpenReceipt>
where
    R: Rng + ?Sized,
{
    let account = load_writable_account(txn, account_id).await?;
    let container = load_openable_container(txn, container_id).await?;
    check_funds(&account, container.price)?;

    let (item, catalog_item, condition) = draw_into_inventory(
        txn,
        NewItem {
            account_id,
            container: &container,
            owned_container_id: None,
        },
        rng,
        now,
    )
    .await?;

    let (entry, balance) = post(
        txn,
        &account,
        Posting {
            kind: LedgerKind::DirectOpen,
            amount: -container.price,
            description: format!("Opened {}", container.name),
            reference_id: Some(item.id),
            claimed_reward_at: None,
        },
        now,
    )
    .await?;

    Ok(OpenReceipt {
        item,
        catalog_item,
        condition,
        container,
        owned_container: None,
        entry,
        balance,
    })
}

/// Sells an inventory item back for its stored value.
#[instrument(skip(txn))]
pub async fn sell_inventory_item(
    txn: &DatabaseTransaction,
    account_id: Uuid,
    item_id: Uuid,
    now: DateTime<Utc>,
) -> Result<SaleReceipt> {
    let account = load_writable_account(txn, account_id).await?;

    let claimed = InventoryItem::update_many()
        .col_expr(inventory_item::Column::IsSold, Expr::value(true))
        .col_expr(inventory_item::Column::SoldAt, Expr::value(Some(now)))
        .filter(inventory_item::Column::Id.eq(item_id))
        .filter(inventory_item::Column::AccountId.eq(account_id))
        .filter(inventory_item::Column::IsSold.eq(false))
        .exec(txn)
        .await?;
    if claimed.rows_affected != 1 {
        return Err(Error::NotFoundOrAlreadySold { id: item_id });
    }

    let item = InventoryItem::find_by_id(item_id)
        .one(txn)
        .await?
        .ok_or(Error::NotFoundOrAlreadySold { id: item_id })?;
    let skin_name = catalog::get_catalog_item(txn, item.catalog_item_id)
        .await?
        .map_or_else(|| item.acquired_from.clone(), |skin| skin.name);

    let (entry, balance) = post(
        txn,
        &account,
        Posting {
            kind: LedgerKind::Sale,
            amount: item.value,
            description: format!("Sold {skin_name}"),
            reference_id: Some(item.id),
            claimed_reward_at: None,
        },
        now,
    )
    .await?;

    Ok(SaleReceipt {
        item,
        entry,
        balance,
    })
}

/// Credits the daily reward if the cooldown has elapsed since the last claim.
#[instrument(skip(txn))]
pub async fn claim_daily_reward(
    txn: &DatabaseTransaction,
    account_id: Uuid,
    reward: Decimal,
    cooldown: Duration,
    now: DateTime<Utc>,
) -> Result<DailyRewardOutcome> {
    if reward.is_sign_negative() {
        return Err(Error::InvalidAmount { amount: reward });
    }
    let account = load_writable_account(txn, account_id).await?;

    if let Some(last) = account.last_reward_at {
        if now - last < cooldown {
            return Ok(DailyRewardOutcome::NotYetEligible {
                next_eligible_at: last + cooldown,
            });
        }
    }

    let (entry, balance) = post(
        txn,
        &account,
        Posting {
            kind: LedgerKind::DailyReward,
            amount: reward,
            description: "Daily login reward".to_string(),
            reference_id: None,
            claimed_reward_at: Some(now),
        },
        now,
    )
    .await?;

    Ok(DailyRewardOutcome::Claimed { entry, balance })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    use super::*;
    use crate::core::history::get_ledger_total;
    use crate::entities::LedgerEntry;
    use crate::test_utils::*;
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use sea_orm::{PaginatorTrait, TransactionTrait};

    fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, hour, minute, second).unwrap()
    }

    #[test]
    fn test_ledger_kind_round_trip_strings() {
        for kind in LedgerKind::ALL {
            assert_eq!(kind.as_str().parse::<LedgerKind>().unwrap(), kind);
        }
        assert!(matches!(
            "refund".parse::<LedgerKind>(),
            Err(Error::InvalidIdentifier { .. })
        ));
    }

    #[tokio::test]
    async fn test_purchase_debits_and_records_entry() -> Result<()> {
        let (db, account, fixture) = setup_with_case().await?;

        let txn = db.begin().await?;
        let receipt =
            purchase_container(&txn, account.id, fixture.container.id, at(9, 0, 0)).await?;
        txn.commit().await?;

        assert_eq!(receipt.balance, cents(7_500));
        assert!(!receipt.owned_container.is_opened);
        assert_eq!(receipt.entry.kind, "purchase");
        assert_eq!(receipt.entry.amount, -cents(2_500));
        assert_eq!(receipt.entry.balance_before, cents(10_000));
        assert_eq!(receipt.entry.balance_after, cents(7_500));
        assert_eq!(receipt.entry.reference_id, Some(receipt.owned_container.id));
        assert_eq!(balance_of(&db, account.id).await?, cents(7_500));
        Ok(())
    }

    #[tokio::test]
    async fn test_purchase_insufficient_funds_changes_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let account = create_test_account(&db, 1_000).await?;
        let fixture = create_test_case(&db, 2_500).await?;
        let entries_before = LedgerEntry::find().count(&db).await?;

        let txn = db.begin().await?;
        let result = purchase_container(&txn, account.id, fixture.container.id, at(9, 0, 0)).await;
        txn.rollback().await?;

        assert!(matches!(
            result,
            Err(Error::InsufficientFunds { current, required })
                if current == cents(1_000) && required == cents(2_500)
        ));
        assert_eq!(balance_of(&db, account.id).await?, cents(1_000));
        assert_eq!(LedgerEntry::find().count(&db).await?, entries_before);
        assert_eq!(OwnedContainer::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_purchase_inactive_container() -> Result<()> {
        let (db, account, fixture) = setup_with_case().await?;
        deactivate_container(&db, fixture.container.id).await?;

        let txn = db.begin().await?;
        let result = purchase_container(&txn, account.id, fixture.container.id, at(9, 0, 0)).await;
        assert!(matches!(result, Err(Error::ContainerInactive { .. })));

        let missing = Uuid::new_v4();
        let result = purchase_container(&txn, account.id, missing, at(9, 0, 0)).await;
        assert!(matches!(result, Err(Error::ContainerNotFound { id }) if id == missing));
        Ok(())
    }

    #[tokio::test]
    async fn test_open_owned_container_draws_without_moving_currency() -> Result<()> {
        let (db, account, fixture) = setup_with_case().await?;
        let mut rng = StdRng::seed_from_u64(17);

        let txn = db.begin().await?;
        let purchase =
            purchase_container(&txn, account.id, fixture.container.id, at(9, 0, 0)).await?;
        let receipt = open_owned_container(
            &txn,
            account.id,
            purchase.owned_container.id,
            &mut rng,
            at(9, 5, 0),
        )
        .await?;
        txn.commit().await?;

        let owned = receipt.owned_container.expect("pre-purchased open");
        assert!(owned.is_opened);
        assert_eq!(owned.opened_at, Some(at(9, 5, 0)));
        assert_eq!(receipt.entry.kind, "open");
        assert_eq!(receipt.entry.amount, Decimal::ZERO);
        assert_eq!(receipt.entry.balance_before, receipt.entry.balance_after);
        assert_eq!(receipt.entry.reference_id, Some(receipt.item.id));
        assert_eq!(receipt.balance, cents(7_500));
        assert_eq!(receipt.item.owned_container_id, Some(owned.id));
        assert_eq!(receipt.item.source_container_id, fixture.container.id);
        assert_eq!(receipt.item.acquired_from, fixture.container.name);
        assert_eq!(
            receipt.condition,
            Condition::from_wear(receipt.item.wear).unwrap()
        );
        assert!(fixture.skin_ids().contains(&receipt.catalog_item.id));
        Ok(())
    }

    #[tokio::test]
    async fn test_open_owned_container_twice_fails() -> Result<()> {
        let (db, account, fixture) = setup_with_case().await?;
        let mut rng = StdRng::seed_from_u64(3);

        let txn = db.begin().await?;
        let purchase =
            purchase_container(&txn, account.id, fixture.container.id, at(9, 0, 0)).await?;
        let owned_id = purchase.owned_container.id;
        open_owned_container(&txn, account.id, owned_id, &mut rng, at(9, 1, 0)).await?;
        let second = open_owned_container(&txn, account.id, owned_id, &mut rng, at(9, 2, 0)).await;
        txn.commit().await?;

        assert!(matches!(second, Err(Error::NotFoundOrAlreadyOpened { id }) if id == owned_id));
        assert_eq!(InventoryItem::find().count(&db).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_open_someone_elses_container_fails() -> Result<()> {
        let (db, owner, fixture) = setup_with_case().await?;
        let stranger = create_test_account(&db, 10_000).await?;
        let mut rng = StdRng::seed_from_u64(3);

        let txn = db.begin().await?;
        let purchase = purchase_container(&txn, owner.id, fixture.container.id, at(9, 0, 0)).await?;
        let result = open_owned_container(
            &txn,
            stranger.id,
            purchase.owned_container.id,
            &mut rng,
            at(9, 1, 0),
        )
        .await;
        assert!(matches!(result, Err(Error::NotFoundOrAlreadyOpened { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_open_rolls_back_flag_when_table_is_empty() -> Result<()> {
        let db = setup_test_db().await?;
        let account = create_test_account(&db, 10_000).await?;
        let empty = crate::test_utils::create_test_container(&db, "Empty", 500, &[]).await?;
        let mut rng = StdRng::seed_from_u64(3);

        let txn = db.begin().await?;
        let purchase = purchase_container(&txn, account.id, empty.id, at(9, 0, 0)).await?;
        txn.commit().await?;

        let txn = db.begin().await?;
        let result = open_owned_container(
            &txn,
            account.id,
            purchase.owned_container.id,
            &mut rng,
            at(9, 1, 0),
        )
        .await;
        txn.rollback().await?;

        assert!(matches!(result, Err(Error::Selection(_))));
        let owned = OwnedContainer::find_by_id(purchase.owned_container.id)
            .one(&db)
            .await?
            .unwrap();
        assert!(!owned.is_opened);
        assert_eq!(LedgerEntry::find().count(&db).await?, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_open_container_direct_charges_price() -> Result<()> {
        let (db, account, fixture) = setup_with_case().await?;
        let mut rng = StdRng::seed_from_u64(29);

        let txn = db.begin().await?;
        let receipt =
            open_container_direct(&txn, account.id, fixture.container.id, &mut rng, at(10, 0, 0))
                .await?;
        txn.commit().await?;

        assert!(receipt.owned_container.is_none());
        assert!(receipt.item.owned_container_id.is_none());
        assert_eq!(receipt.entry.kind, "direct_open");
        assert_eq!(receipt.entry.amount, -cents(2_500));
        assert_eq!(receipt.entry.reference_id, Some(receipt.item.id));
        assert_eq!(receipt.balance, cents(7_500));
        assert_eq!(OwnedContainer::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_open_container_direct_insufficient_funds() -> Result<()> {
        let db = setup_test_db().await?;
        let account = create_test_account(&db, 2_499).await?;
        let fixture = create_test_case(&db, 2_500).await?;
        let mut rng = StdRng::seed_from_u64(29);

        let txn = db.begin().await?;
        let result =
            open_container_direct(&txn, account.id, fixture.container.id, &mut rng, at(10, 0, 0))
                .await;
        txn.rollback().await?;

        assert!(matches!(result, Err(Error::InsufficientFunds { .. })));
        assert_eq!(InventoryItem::find().count(&db).await?, 0);
        assert_eq!(balance_of(&db, account.id).await?, cents(2_499));
        Ok(())
    }

    #[tokio::test]
    async fn test_sell_credits_stored_value() -> Result<()> {
        let (db, account, fixture) = setup_with_case().await?;
        let mut rng = StdRng::seed_from_u64(31);

        let txn = db.begin().await?;
        let opened =
            open_container_direct(&txn, account.id, fixture.container.id, &mut rng, at(10, 0, 0))
                .await?;
        let sale = sell_inventory_item(&txn, account.id, opened.item.id, at(10, 1, 0)).await?;
        txn.commit().await?;

        assert!(sale.item.is_sold);
        assert_eq!(sale.item.sold_at, Some(at(10, 1, 0)));
        assert_eq!(sale.entry.kind, "sale");
        assert_eq!(sale.entry.amount, opened.item.value);
        assert_eq!(sale.entry.reference_id, Some(opened.item.id));
        assert!(sale.entry.description.starts_with("Sold "));
        assert_eq!(sale.balance, cents(7_500) + opened.item.value);

        let txn = db.begin().await?;
        let again = sell_inventory_item(&txn, account.id, opened.item.id, at(10, 2, 0)).await;
        assert!(matches!(again, Err(Error::NotFoundOrAlreadySold { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_sell_someone_elses_item_fails() -> Result<()> {
        let (db, owner, fixture) = setup_with_case().await?;
        let stranger = create_test_account(&db, 10_000).await?;
        let mut rng = StdRng::seed_from_u64(31);

        let txn = db.begin().await?;
        let opened =
            open_container_direct(&txn, owner.id, fixture.container.id, &mut rng, at(10, 0, 0))
                .await?;
        let result = sell_inventory_item(&txn, stranger.id, opened.item.id, at(10, 1, 0)).await;
        assert!(matches!(result, Err(Error::NotFoundOrAlreadySold { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_daily_reward_cooldown() -> Result<()> {
        let db = setup_test_db().await?;
        let account = create_test_account(&db, 10_000).await?;
        let reward = cents(10_000);
        let cooldown = Duration::hours(24);
        let first_claim = at(8, 0, 0);

        let txn = db.begin().await?;
        let first = claim_daily_reward(&txn, account.id, reward, cooldown, first_claim).await?;
        txn.commit().await?;
        assert!(matches!(
            first,
            DailyRewardOutcome::Claimed { balance, .. } if balance == cents(20_000)
        ));

        let txn = db.begin().await?;
        let too_soon = claim_daily_reward(
            &txn,
            account.id,
            reward,
            cooldown,
            first_claim + Duration::hours(23),
        )
        .await?;
        txn.commit().await?;
        match too_soon {
            DailyRewardOutcome::NotYetEligible { next_eligible_at } => {
                assert_eq!(next_eligible_at, first_claim + cooldown);
            }
            DailyRewardOutcome::Claimed { .. } => panic!("claimed inside the cooldown"),
        }
        assert_eq!(balance_of(&db, account.id).await?, cents(20_000));

        let txn = db.begin().await?;
        let later = claim_daily_reward(
            &txn,
            account.id,
            reward,
            cooldown,
            first_claim + cooldown + Duration::seconds(1),
        )
        .await?;
        txn.commit().await?;
        match later {
            DailyRewardOutcome::Claimed { entry, balance } => {
                assert_eq!(entry.kind, "daily_reward");
                assert_eq!(entry.balance_before, cents(20_000));
                assert_eq!(balance, cents(30_000));
            }
            DailyRewardOutcome::NotYetEligible { .. } => panic!("cooldown should have elapsed"),
        }

        let stored = Account::find_by_id(account.id).one(&db).await?.unwrap();
        assert_eq!(
            stored.last_reward_at,
            Some(first_claim + cooldown + Duration::seconds(1))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_post_detects_stale_version() -> Result<()> {
        let db = setup_test_db().await?;
        let account = create_test_account(&db, 10_000).await?;

        let txn = db.begin().await?;
        let stale = load_writable_account(&txn, account.id).await?;
        post(
            &txn,
            &stale,
            Posting {
                kind: LedgerKind::DailyReward,
                amount: cents(100),
                description: "first writer".to_string(),
                reference_id: None,
                claimed_reward_at: None,
            },
            at(12, 0, 0),
        )
        .await?;
        let second = post(
            &txn,
            &stale,
            Posting {
                kind: LedgerKind::DailyReward,
                amount: cents(100),
                description: "second writer".to_string(),
                reference_id: None,
                claimed_reward_at: None,
            },
            at(12, 0, 1),
        )
        .await;
        assert!(matches!(second, Err(ref err) if err.is_transient()));
        Ok(())
    }

    #[tokio::test]
    async fn test_frozen_account_refuses_writes() -> Result<()> {
        let (db, account, fixture) = setup_with_case().await?;
        freeze_account(&db, account.id).await?;

        let txn = db.begin().await?;
        let result = purchase_container(&txn, account.id, fixture.container.id, at(9, 0, 0)).await;
        assert!(matches!(result, Err(Error::AccountFrozen { .. })));
        let result = claim_daily_reward(
            &txn,
            account.id,
            cents(100),
            Duration::hours(24),
            at(9, 0, 0),
        )
        .await;
        assert!(matches!(result, Err(Error::AccountFrozen { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_operation_sequence_reconciles_with_ledger() -> Result<()> {
        let db = setup_test_db().await?;
        let account = create_test_account(&db, 1_000_000).await?;
        let fixture = create_test_case(&db, 2_500).await?;
        let mut rng = StdRng::seed_from_u64(1234);
        let mut now = at(0, 0, 0);

        for round in 0..12 {
            now += Duration::minutes(5);
            let txn = db.begin().await?;
            match round % 4 {
                0 => {
                    let purchase =
                        purchase_container(&txn, account.id, fixture.container.id, now).await?;
                    let opened = open_owned_container(
                        &txn,
                        account.id,
                        purchase.owned_container.id,
                        &mut rng,
                        now,
                    )
                    .await?;
                    sell_inventory_item(&txn, account.id, opened.item.id, now).await?;
                }
                1 => {
                    open_container_direct(&txn, account.id, fixture.container.id, &mut rng, now)
                        .await?;
                }
                2 => {
                    claim_daily_reward(&txn, account.id, cents(500), Duration::hours(1), now)
                        .await?;
                }
                _ => {
                    purchase_container(&txn, account.id, fixture.container.id, now).await?;
                }
            }
            txn.commit().await?;
        }

        let balance = balance_of(&db, account.id).await?;
        let ledger_total = get_ledger_total(&db, account.id).await?;
        assert_eq!(balance, ledger_total);
        Ok(())
    }
}
