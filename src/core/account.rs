//! Account business logic - opening accounts and checking them against the ledger.
//!
//! An account's balance must always equal the sum of its ledger entries. The
//! engine keeps that true by construction; [`reconcile_account`] verifies it
//! and freezes the account when it does not hold, so no further writes can
//! compound the damage before someone looks at it.

use crate::{
    core::ledger::LedgerKind,
    entities::{Account, LedgerEntry, account, ledger_entry},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{DatabaseTransaction, QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{debug, error, info, instrument};

/// Outcome of a successful consistency check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationReport {
    /// The account that was checked
    pub account_id: Uuid,
    /// Stored balance
    pub balance: Decimal,
    /// Sum of all ledger amounts
    pub ledger_total: Decimal,
    /// Number of ledger entries examined
    pub entry_count: usize,
}

/// Summary of a sweep over every account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditSummary {
    /// Accounts whose balance matched their ledger
    pub consistent: usize,
    /// Accounts frozen by this sweep
    pub newly_frozen: Vec<Uuid>,
    /// Accounts that were already frozen and were skipped
    pub already_frozen: Vec<Uuid>,
}

impl AuditSummary {
    /// True when no account is frozen after the sweep.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.newly_frozen.is_empty() && self.already_frozen.is_empty()
    }
}

/// Opens an account with its starting balance and a matching `registration` entry.
///
/// Opening an id that already exists returns the stored account unchanged.
#[instrument(skip(db))]
pub async fn open_account(
    db: &DatabaseConnection,
    account_id: Uuid,
    starting_balance: Decimal,
    now: DateTime<Utc>,
) -> Result<account::Model> {
    if starting_balance < Decimal::ZERO {
        return Err(Error::InvalidAmount {
            amount: starting_balance,
        });
    }

    let txn = db.begin().await?;

    if let Some(existing) = Account::find_by_id(account_id).one(&txn).await? {
        debug!("Account {} already open", account_id);
        return Ok(existing);
    }

    let account = account::ActiveModel {
        id: Set(account_id),
        balance: Set(starting_balance),
        last_reward_at: Set(None),
        version: Set(0),
        is_frozen: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;

    ledger_entry::ActiveModel {
        id: Set(Uuid::new_v4()),
        account_id: Set(account_id),
        kind: Set(LedgerKind::Registration.as_str().to_string()),
        amount: Set(starting_balance),
        balance_before: Set(Decimal::ZERO),
        balance_after: Set(starting_balance),
        description: Set("Starting balance".to_string()),
        reference_id: Set(None),
        created_at: Set(now),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    info!("Opened account {} with {}", account_id, starting_balance);
    Ok(account)
}

/// Finds an account by id.
pub async fn get_account<C>(db: &C, account_id: Uuid) -> Result<Option<account::Model>>
where
    C: ConnectionTrait,
{
    Account::find_by_id(account_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Current balance of an account.
///
/// # Errors
/// `AccountNotFound` if the account does not exist.
pub async fn get_balance<C>(db: &C, account_id: Uuid) -> Result<Decimal>
where
    C: ConnectionTrait,
{
    get_account(db, account_id)
        .await?
        .map(|account| account.balance)
        .ok_or(Error::AccountNotFound { id: account_id })
}

/// Checks every entry and the ledger total against the stored balance.
///
/// Returns the mismatch as an `InvariantViolation` without touching the
/// account; callers decide whether to freeze.
async fn check_consistency(
    txn: &DatabaseTransaction,
    account: &account::Model,
) -> Result<ReconciliationReport> {
    let entries = LedgerEntry::find()
        .filter(ledger_entry::Column::AccountId.eq(account.id))
        .order_by_asc(ledger_entry::Column::CreatedAt)
        .all(txn)
        .await?;

    let ledger_total: Decimal = entries.iter().map(|entry| entry.amount).sum();
    let violation = || Error::InvariantViolation {
        account_id: account.id,
        balance: account.balance,
        ledger_total,
    };

    if let Some(broken) = entries
        .iter()
        .find(|entry| entry.balance_after - entry.balance_before != entry.amount)
    {
        error!(
            "Ledger entry {} of account {} does not bracket its amount: {} -> {} for {}",
            broken.id, account.id, broken.balance_before, broken.balance_after, broken.amount
        );
        return Err(violation());
    }

    if ledger_total != account.balance {
        error!(
            "Account {} balance {} does not match ledger total {}",
            account.id, account.balance, ledger_total
        );
        return Err(violation());
    }

    Ok(ReconciliationReport {
        account_id: account.id,
        balance: account.balance,
        ledger_total,
        entry_count: entries.len(),
    })
}

async fn set_frozen(txn: &DatabaseTransaction, account_id: Uuid, frozen: bool) -> Result<()> {
    Account::update_many()
        .col_expr(account::Column::IsFrozen, Expr::value(frozen))
        .col_expr(
            account::Column::Version,
            Expr::col(account::Column::Version).add(1),
        )
        .filter(account::Column::Id.eq(account_id))
        .exec(txn)
        .await?;
    Ok(())
}

/// Verifies that an account's balance equals the sum of its ledger.
///
/// On mismatch the account is frozen and `InvariantViolation` is returned.
/// Frozen accounts refuse every writing operation until [`release_account`]
/// succeeds.
#[instrument(skip(db))]
pub async fn reconcile_account(
    db: &DatabaseConnection,
    account_id: Uuid,
) -> Result<ReconciliationReport> {
    let txn = db.begin().await?;
    let account = Account::find_by_id(account_id)
        .one(&txn)
        .await?
        .ok_or(Error::AccountNotFound { id: account_id })?;

    match check_consistency(&txn, &account).await {
        Ok(report) => {
            txn.commit().await?;
            Ok(report)
        }
        Err(violation @ Error::InvariantViolation { .. }) => {
            if !account.is_frozen {
                set_frozen(&txn, account_id, true).await?;
                txn.commit().await?;
                error!("Account {} frozen pending manual reconciliation", account_id);
            }
            Err(violation)
        }
        Err(err) => Err(err),
    }
}

/// Clears the frozen flag, but only once the account reconciles again.
#[instrument(skip(db))]
pub async fn release_account(
    db: &DatabaseConnection,
    account_id: Uuid,
) -> Result<ReconciliationReport> {
    let txn = db.begin().await?;
    let account = Account::find_by_id(account_id)
        .one(&txn)
        .await?
        .ok_or(Error::AccountNotFound { id: account_id })?;

    let report = check_consistency(&txn, &account).await?;
    if account.is_frozen {
        set_frozen(&txn, account_id, false).await?;
        info!("Account {} released", account_id);
    }
    txn.commit().await?;
    Ok(report)
}

/// Reconciles every account that is not already frozen.
#[instrument(skip(db))]
pub async fn reconcile_all(db: &DatabaseConnection) -> Result<AuditSummary> {
    let accounts = Account::find()
        .order_by_asc(account::Column::CreatedAt)
        .all(db)
        .await?;

    let mut summary = AuditSummary::default();
    for account in accounts {
        if account.is_frozen {
            summary.already_frozen.push(account.id);
            continue;
        }
        match reconcile_account(db, account.id).await {
            Ok(_) => summary.consistent += 1,
            Err(Error::InvariantViolation { account_id, .. }) => {
                summary.newly_frozen.push(account_id);
            }
            Err(err) => return Err(err),
        }
    }

    info!(
        "Audit finished: {} consistent, {} newly frozen, {} already frozen",
        summary.consistent,
        summary.newly_frozen.len(),
        summary.already_frozen.len()
    );
    Ok(summary)
}
