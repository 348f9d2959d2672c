//! Unified error type for the economy engine.
//!
//! Business-rule failures are ordinary variants so callers can match on them;
//! store failures are split into transient ones (safe to retry the whole
//! operation) and everything else.

use crate::core::selector::SelectionError;
use rust_decimal::Decimal;
use sea_orm::{DbErr, RuntimeErr};
use thiserror::Error;
use uuid::Uuid;

/// Errors produced by the economy engine.
#[derive(Debug, Error)]
pub enum Error {
    /// An identifier could not be parsed. Raised before any store access.
    #[error("Invalid identifier: {value}")]
    InvalidIdentifier {
        /// The raw value that was rejected
        value: String,
    },

    /// A wear float outside `[0, 1]` or not finite.
    #[error("Invalid wear float: {wear}")]
    InvalidWear {
        /// The rejected wear value
        wear: f64,
    },

    /// A monetary amount that cannot be used (negative, or wrong sign).
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: Decimal,
    },

    /// No account with this id.
    #[error("Account not found: {id}")]
    AccountNotFound {
        /// The requested account
        id: Uuid,
    },

    /// No container with this id in the catalog.
    #[error("Container not found: {id}")]
    ContainerNotFound {
        /// The requested container
        id: Uuid,
    },

    /// The container exists but is retired from sale and opening.
    #[error("Container is not available: {id}")]
    ContainerInactive {
        /// The inactive container
        id: Uuid,
    },

    /// The balance does not cover the price.
    #[error("Insufficient funds: balance {current}, required {required}")]
    InsufficientFunds {
        /// Balance at the time of the check
        current: Decimal,
        /// Price that had to be paid
        required: Decimal,
    },

    /// The owned container does not belong to the account or was opened.
    #[error("Owned container not found or already opened: {id}")]
    NotFoundOrAlreadyOpened {
        /// The owned container the caller asked to open
        id: Uuid,
    },

    /// The item does not belong to the account or was sold.
    #[error("Inventory item not found or already sold: {id}")]
    NotFoundOrAlreadySold {
        /// The inventory item the caller asked to sell
        id: Uuid,
    },

    /// Writes are halted for this account until it is reconciled by hand.
    #[error("Account is frozen pending reconciliation: {id}")]
    AccountFrozen {
        /// The frozen account
        id: Uuid,
    },

    /// The drop table could not produce an item.
    #[error("Drop selection failed: {0}")]
    Selection(#[from] SelectionError),

    /// Timeout, lock contention or a lost optimistic version check.
    #[error("Transient store error: {reason}")]
    TransientStore {
        /// What went wrong, for logs
        reason: String,
    },

    /// Balance and ledger disagree. Fatal for the account.
    #[error(
        "Ledger invariant violated for account {account_id}: \
         balance {balance}, ledger total {ledger_total}"
    )]
    InvariantViolation {
        /// The account that failed reconciliation
        account_id: Uuid,
        /// Stored balance
        balance: Decimal,
        /// Sum of the account's ledger amounts
        ledger_total: Decimal,
    },

    /// Settings could not be read, parsed or validated.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },

    /// Any other store failure. Not retried.
    #[error("Database error: {0}")]
    Database(DbErr),
}

impl Error {
    /// Whether retrying the whole operation from scratch may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::TransientStore { .. })
    }

    /// Whether this is an expected business outcome rather than a fault.
    #[must_use]
    pub const fn is_business_rule(&self) -> bool {
        matches!(
            self,
            Self::AccountNotFound { .. }
                | Self::ContainerNotFound { .. }
                | Self::ContainerInactive { .. }
                | Self::InsufficientFunds { .. }
                | Self::NotFoundOrAlreadyOpened { .. }
                | Self::NotFoundOrAlreadySold { .. }
                | Self::AccountFrozen { .. }
        )
    }
}

impl From<DbErr> for Error {
    fn from(err: DbErr) -> Self {
        if is_transient_db_error(&err) {
            Self::TransientStore {
                reason: err.to_string(),
            }
        } else {
            Self::Database(err)
        }
    }
}

fn is_transient_db_error(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) => true,
        DbErr::Conn(RuntimeErr::SqlxError(_))
        | DbErr::Exec(RuntimeErr::SqlxError(_))
        | DbErr::Query(RuntimeErr::SqlxError(_)) => {
            let message = err.to_string().to_lowercase();
            ["database is locked", "database is busy", "deadlock", "could not serialize"]
                .iter()
                .any(|needle| message.contains(needle))
        }
        _ => false,
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::ConnAcquireErr;

    #[test]
    fn test_acquire_timeout_is_transient() {
        let err: Error = DbErr::ConnectionAcquire(ConnAcquireErr::Timeout).into();
        assert!(err.is_transient());
    }

    #[test]
    fn test_record_not_found_is_not_transient() {
        let err: Error = DbErr::RecordNotFound("accounts".to_string()).into();
        assert!(!err.is_transient());
        assert!(matches!(err, Error::Database(_)));
    }

    #[test]
    fn test_business_rule_classification() {
        let err = Error::InsufficientFunds {
            current: Decimal::from(5),
            required: Decimal::from(10),
        };
        assert!(err.is_business_rule());
        assert!(!err.is_transient());

        let err = Error::TransientStore {
            reason: "timeout".to_string(),
        };
        assert!(!err.is_business_rule());
    }

    #[test]
    fn test_invariant_violation_message() {
        let err = Error::InvariantViolation {
            account_id: Uuid::nil(),
            balance: Decimal::from(500),
            ledger_total: Decimal::from(100),
        };
        assert_eq!(
            err.to_string(),
            "Ledger invariant violated for account 00000000-0000-0000-0000-000000000000: \
             balance 500, ledger total 100"
        );
    }
}
