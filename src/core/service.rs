//! Economy service - the entry point the request layer talks to.
//!
//! Each write goes through the same steps: parse identifiers (no store access
//! on failure), run cheap read-only pre-checks, then run the engine inside a
//! fresh transaction bounded by the store timeout. Transient failures restart
//! the whole operation, pre-checks included, up to `max_attempts` times, with
//! a jittered exponential pause between attempts.

use crate::{
    config::economy::EconomySettings,
    core::{
        account::{self, ReconciliationReport},
        catalog::{self, DropTable},
        history,
        inventory::{self, InventoryView},
        ledger::{self, DailyRewardOutcome, LedgerKind, OpenReceipt, PurchaseReceipt, SaleReceipt},
    },
    entities::{account as account_entity, container, ledger_entry, owned_container},
    errors::{Error, Result},
};
use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, TransactionTrait};
use std::{future::Future, time::Duration};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Parses an identifier supplied by the request layer.
///
/// # Errors
/// `InvalidIdentifier` if the value is not a UUID.
pub fn parse_id(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|_| Error::InvalidIdentifier {
        value: value.to_string(),
    })
}

/// Retry state of one operation.
#[derive(Debug)]
struct Backoff {
    attempt: u32,
    delay: Duration,
    max_delay: Duration,
}

impl Backoff {
    const fn new(delay: Duration, max_delay: Duration) -> Self {
        Self {
            attempt: 1,
            delay,
            max_delay,
        }
    }

    /// Sleeps before the next attempt, then doubles the delay up to the cap.
    async fn wait(&mut self) {
        let pause = jittered(self.delay);
        if pause > Duration::ZERO {
            tokio::time::sleep(pause).await;
        }
        self.delay = std::cmp::min(self.delay.saturating_mul(2), self.max_delay);
        self.attempt += 1;
    }
}

/// A pause between half of `delay` and all of it.
fn jittered(delay: Duration) -> Duration {
    let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
    if millis == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(millis / 2..=millis))
}

/// Store-backed economy operations with validation, timeouts and retries.
#[derive(Clone, Debug)]
pub struct EconomyService {
    db: DatabaseConnection,
    settings: EconomySettings,
}

impl EconomyService {
    /// Creates a service over an open connection.
    #[must_use]
    pub const fn new(db: DatabaseConnection, settings: EconomySettings) -> Self {
        Self { db, settings }
    }

    /// Settings the service was built with.
    #[must_use]
    pub const fn settings(&self) -> &EconomySettings {
        &self.settings
    }

    /// Underlying connection, for read-only callers.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.settings.store_timeout_ms)
    }

    /// Runs one attempt under the store timeout. Dropping the attempt on
    /// timeout drops its transaction, which rolls it back.
    async fn bounded<T, F>(&self, operation: &'static str, attempt: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.store_timeout(), attempt)
            .await
            .unwrap_or_else(|_| {
                Err(Error::TransientStore {
                    reason: format!(
                        "{operation} exceeded {}ms",
                        self.settings.store_timeout_ms
                    ),
                })
            })
    }

    fn backoff(&self) -> Backoff {
        Backoff::new(self.settings.retry_backoff(), self.settings.max_backoff())
    }

    fn should_retry(&self, operation: &'static str, backoff: &Backoff, err: &Error) -> bool {
        if err.is_transient() && backoff.attempt < self.settings.max_attempts {
            warn!(
                "{} attempt {}/{} failed, retrying in up to {:?}: {}",
                operation, backoff.attempt, self.settings.max_attempts, backoff.delay, err
            );
            true
        } else {
            false
        }
    }

    async fn with_retries<T, F, Fut>(&self, operation: &'static str, mut run: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut backoff = self.backoff();
        loop {
            match self.bounded(operation, run()).await {
                Err(err) if self.should_retry(operation, &backoff, &err) => backoff.wait().await,
                result => return result,
            }
        }
    }

    async fn writable_account(&self, account_id: Uuid) -> Result<account_entity::Model> {
        let account = account::get_account(&self.db, account_id)
            .await?
            .ok_or(Error::AccountNotFound { id: account_id })?;
        if account.is_frozen {
            return Err(Error::AccountFrozen { id: account_id });
        }
        Ok(account)
    }

    async fn openable_container(&self, container_id: Uuid) -> Result<container::Model> {
        let container = catalog::get_container(&self.db, container_id)
            .await?
            .ok_or(Error::ContainerNotFound { id: container_id })?;
        if !container.can_be_opened() {
            return Err(Error::ContainerInactive { id: container_id });
        }
        Ok(container)
    }

    async fn unopened_container(
        &self,
        account_id: Uuid,
        owned_container_id: Uuid,
    ) -> Result<owned_container::Model> {
        inventory::get_owned_container(&self.db, account_id, owned_container_id)
            .await?
            .filter(|owned| !owned.is_opened)
            .ok_or(Error::NotFoundOrAlreadyOpened {
                id: owned_container_id,
            })
    }

    /// Opens an account with the configured starting balance.
    #[instrument(skip(self))]
    pub async fn open_account(&self, account_id: Uuid) -> Result<account_entity::Model> {
        let starting_balance = self.settings.starting_balance;
        self.with_retries("open_account", move || {
            account::open_account(&self.db, account_id, starting_balance, Utc::now())
        })
        .await
    }

    /// Buys a container for later opening.
    #[instrument(skip(self))]
    pub async fn purchase_container(
        &self,
        account_id: Uuid,
        container_id: &str,
    ) -> Result<PurchaseReceipt> {
        let container_id = parse_id(container_id)?;
        self.with_retries("purchase_container", move || {
            self.try_purchase(account_id, container_id)
        })
        .await
    }

    async fn try_purchase(&self, account_id: Uuid, container_id: Uuid) -> Result<PurchaseReceipt> {
        let account = self.writable_account(account_id).await?;
        let container = self.openable_container(container_id).await?;
        if account.balance < container.price {
            return Err(Error::InsufficientFunds {
                current: account.balance,
                required: container.price,
            });
        }

        let txn = self.db.begin().await?;
        let receipt = ledger::purchase_container(&txn, account_id, container_id, Utc::now()).await?;
        txn.commit().await?;

        info!(
            "Account {} purchased {} for {}, balance {}",
            account_id, receipt.container.name, receipt.container.price, receipt.balance
        );
        Ok(receipt)
    }

    /// Opens a container the account purchased earlier.
    ///
    /// The generator is reborrowed for every attempt, so the retry loop is
    /// written out here; it shares `Backoff` with `with_retries`.
    #[instrument(skip(self, rng))]
    pub async fn open_owned_container<R>(
        &self,
        account_id: Uuid,
        owned_container_id: &str,
        rng: &mut R,
    ) -> Result<OpenReceipt>
    where
        R: Rng + ?Sized,
    {
        let owned_container_id = parse_id(owned_container_id)?;
        let mut backoff = self.backoff();
        loop {
            let run = self.try_open_owned(account_id, owned_container_id, &mut *rng);
            match self.bounded("open_owned_container", run).await {
                Err(err) if self.should_retry("open_owned_container", &backoff, &err) => {
                    backoff.wait().await;
                }
                result => return result,
            }
        }
    }

    async fn try_open_owned<R>(
        &self,
        account_id: Uuid,
        owned_container_id: Uuid,
        rng: &mut R,
    ) -> Result<OpenReceipt>
    where
        R: Rng + ?Sized,
    {
        self.writable_account(account_id).await?;
        self.unopened_container(account_id, owned_container_id).await?;

        let txn = self.db.begin().await?;
        let receipt =
            ledger::open_owned_container(&txn, account_id, owned_container_id, rng, Utc::now())
                .await?;
        txn.commit().await?;

        info!(
            "Account {} opened {} and received {} ({}) worth {}",
            account_id,
            receipt.container.name,
            receipt.catalog_item.name,
            receipt.condition,
            receipt.item.value
        );
        Ok(receipt)
    }

    /// Pays for a container and opens it immediately.
    #[instrument(skip(self, rng))]
    pub async fn open_container_direct<R>(
        &self,
        account_id: Uuid,
        container_id: &str,
        rng: &mut R,
    ) -> Result<OpenReceipt>
    where
        R: Rng + ?Sized,
    {
        let container_id = parse_id(container_id)?;
        let mut backoff = self.backoff();
        loop {
            let run = self.try_open_direct(account_id, container_id, &mut *rng);
            match self.bounded("open_container_direct", run).await {
                Err(err) if self.should_retry("open_container_direct", &backoff, &err) => {
                    backoff.wait().await;
                }
                result => return result,
            }
        }
    }

    async fn try_open_direct<R>(
        &self,
        account_id: Uuid,
        container_id: Uuid,
        rng: &mut R,
    ) -> Result<OpenReceipt>
    where
        R: Rng + ?Sized,
    {
        let account = self.writable_account(account_id).await?;
        let container = self.openable_container(container_id).await?;
        if account.balance < container.price {
            return Err(Error::InsufficientFunds {
                current: account.balance,
                required: container.price,
            });
        }

        let txn = self.db.begin().await?;
        let receipt =
            ledger::open_container_direct(&txn, account_id, container_id, rng, Utc::now()).await?;
        txn.commit().await?;

        info!(
            "Account {} opened {} directly and received {} ({}) worth {}",
            account_id,
            receipt.container.name,
            receipt.catalog_item.name,
            receipt.condition,
            receipt.item.value
        );
        Ok(receipt)
    }

    /// Sells an inventory item back for its stored value.
    #[instrument(skip(self))]
    pub async fn sell_inventory_item(
        &self,
        account_id: Uuid,
        item_id: &str,
    ) -> Result<SaleReceipt> {
        let item_id = parse_id(item_id)?;
        self.with_retries("sell_inventory_item", move || self.try_sell(account_id, item_id))
            .await
    }

    async fn try_sell(&self, account_id: Uuid, item_id: Uuid) -> Result<SaleReceipt> {
        self.writable_account(account_id).await?;
        inventory::get_inventory_item(&self.db, account_id, item_id)
            .await?
            .filter(|item| !item.is_sold)
            .ok_or(Error::NotFoundOrAlreadySold { id: item_id })?;

        let txn = self.db.begin().await?;
        let receipt = ledger::sell_inventory_item(&txn, account_id, item_id, Utc::now()).await?;
        txn.commit().await?;

        info!(
            "Account {} sold item {} for {}, balance {}",
            account_id, item_id, receipt.item.value, receipt.balance
        );
        Ok(receipt)
    }

    /// Claims the daily reward if the cooldown has elapsed.
    #[instrument(skip(self))]
    pub async fn claim_daily_reward(&self, account_id: Uuid) -> Result<DailyRewardOutcome> {
        self.with_retries("claim_daily_reward", move || self.try_claim(account_id))
            .await
    }

    async fn try_claim(&self, account_id: Uuid) -> Result<DailyRewardOutcome> {
        self.writable_account(account_id).await?;

        let txn = self.db.begin().await?;
        let outcome = ledger::claim_daily_reward(
            &txn,
            account_id,
            self.settings.daily_reward_amount,
            self.settings.daily_reward_cooldown(),
            Utc::now(),
        )
        .await?;
        txn.commit().await?;

        match &outcome {
            DailyRewardOutcome::Claimed { balance, .. } => {
                info!("Account {} claimed daily reward, balance {}", account_id, balance);
            }
            DailyRewardOutcome::NotYetEligible { next_eligible_at } => {
                info!(
                    "Account {} not eligible for daily reward until {}",
                    account_id, next_eligible_at
                );
            }
        }
        Ok(outcome)
    }

    /// Current balance.
    pub async fn balance(&self, account_id: Uuid) -> Result<Decimal> {
        self.bounded("balance", account::get_balance(&self.db, account_id))
            .await
    }

    /// Inventory with totals over unsold items.
    pub async fn inventory(&self, account_id: Uuid, include_sold: bool) -> Result<InventoryView> {
        self.bounded(
            "inventory",
            inventory::get_inventory(&self.db, account_id, include_sold),
        )
        .await
    }

    /// Purchased containers not opened yet, newest first.
    pub async fn unopened_containers(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<(owned_container::Model, Option<container::Model>)>> {
        self.bounded(
            "unopened_containers",
            inventory::get_unopened_containers(&self.db, account_id),
        )
        .await
    }

    /// Ledger entries newest first, optionally of one kind.
    pub async fn history(
        &self,
        account_id: Uuid,
        kind: Option<LedgerKind>,
        limit: Option<u64>,
    ) -> Result<Vec<ledger_entry::Model>> {
        self.bounded(
            "history",
            history::get_ledger_entries(&self.db, account_id, kind, limit),
        )
        .await
    }

    /// Containers that can currently be bought or opened.
    pub async fn active_containers(&self) -> Result<Vec<container::Model>> {
        self.bounded("active_containers", catalog::get_active_containers(&self.db))
            .await
    }

    /// A container with its ordered drop table.
    pub async fn drop_table(&self, container_id: &str) -> Result<DropTable> {
        let container_id = parse_id(container_id)?;
        self.bounded("drop_table", self.find_drop_table(container_id))
            .await
    }

    async fn find_drop_table(&self, container_id: Uuid) -> Result<DropTable> {
        let container = catalog::get_container(&self.db, container_id)
            .await?
            .ok_or(Error::ContainerNotFound { id: container_id })?;
        catalog::load_drop_table(&self.db, container).await
    }

    /// Checks the account against its ledger, freezing it on mismatch.
    pub async fn reconcile_account(&self, account_id: Uuid) -> Result<ReconciliationReport> {
        self.bounded(
            "reconcile_account",
            account::reconcile_account(&self.db, account_id),
        )
        .await
    }
}
