//! Ledger history queries.

use crate::{
    core::ledger::LedgerKind,
    entities::{LedgerEntry, ledger_entry},
    errors::Result,
};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, QuerySelect, prelude::*};

/// Page size used when the caller asks for nothing or for zero entries.
pub const DEFAULT_HISTORY_LIMIT: u64 = 50;
/// Largest page a caller may request; bigger requests are cut down to it.
pub const MAX_HISTORY_LIMIT: u64 = 100;

/// Clamps a requested page size into `1..=MAX_HISTORY_LIMIT`.
#[must_use]
pub const fn clamp_limit(limit: Option<u64>) -> u64 {
    match limit {
        None | Some(0) => DEFAULT_HISTORY_LIMIT,
        Some(limit) if limit > MAX_HISTORY_LIMIT => MAX_HISTORY_LIMIT,
        Some(limit) => limit,
    }
}

/// Lists an account's ledger entries newest first, optionally of one kind.
pub async fn get_ledger_entries<C>(
    db: &C,
    account_id: Uuid,
    kind: Option<LedgerKind>,
    limit: Option<u64>,
) -> Result<Vec<ledger_entry::Model>>
where
    C: ConnectionTrait,
{
    let mut query = LedgerEntry::find().filter(ledger_entry::Column::AccountId.eq(account_id));
    if let Some(kind) = kind {
        query = query.filter(ledger_entry::Column::Kind.eq(kind.as_str()));
    }
    query
        .order_by_desc(ledger_entry::Column::CreatedAt)
        .limit(clamp_limit(limit))
        .all(db)
        .await
        .map_err(Into::into)
}

/// Sum of every ledger amount recorded for an account.
pub async fn get_ledger_total<C>(db: &C, account_id: Uuid) -> Result<Decimal>
where
    C: ConnectionTrait,
{
    let entries = LedgerEntry::find()
        .filter(ledger_entry::Column::AccountId.eq(account_id))
        .all(db)
        .await?;
    Ok(entries.iter().map(|entry| entry.amount).sum())
}
