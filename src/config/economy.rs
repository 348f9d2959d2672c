//! Economy settings loading from economy.toml
//!
//! Every field has a default, so a missing file or a partial `[economy]`
//! table is fine. Values are validated after parsing.

use crate::errors::{Error, Result};
use chrono::Duration;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Top-level structure of the economy.toml file
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Economy tuning parameters
    #[serde(default)]
    pub economy: EconomySettings,
}

/// Tunable parameters of the economy engine
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EconomySettings {
    /// Balance granted when an account is opened
    pub starting_balance: Decimal,
    /// Fixed credit for a daily reward claim
    pub daily_reward_amount: Decimal,
    /// Minimum hours between two daily reward claims
    pub daily_reward_cooldown_hours: i64,
    /// Upper bound on one atomic attempt, and on acquiring a connection
    pub store_timeout_ms: u64,
    /// Whole-operation attempts before a transient error is surfaced
    pub max_attempts: u32,
    /// Pause before the first retry; doubles after every further failure
    pub retry_backoff_ms: u64,
    /// Cap on the pause between retries
    pub max_backoff_ms: u64,
    /// Connection pool size
    pub max_connections: u32,
}

impl Default for EconomySettings {
    fn default() -> Self {
        Self {
            starting_balance: Decimal::from(100),
            daily_reward_amount: Decimal::from(100),
            daily_reward_cooldown_hours: 24,
            store_timeout_ms: 5_000,
            max_attempts: 5,
            retry_backoff_ms: 25,
            max_backoff_ms: 1_000,
            max_connections: 5,
        }
    }
}

impl EconomySettings {
    /// Cooldown between daily reward claims.
    #[must_use]
    pub fn daily_reward_cooldown(&self) -> Duration {
        Duration::hours(self.daily_reward_cooldown_hours)
    }

    /// Pause before the first retry.
    #[must_use]
    pub const fn retry_backoff(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.retry_backoff_ms)
    }

    /// Longest pause between two retries.
    #[must_use]
    pub const fn max_backoff(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.max_backoff_ms)
    }

    /// Rejects settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.starting_balance.is_sign_negative() {
            return Err(Error::InvalidAmount {
                amount: self.starting_balance,
            });
        }
        if self.daily_reward_amount.is_sign_negative() {
            return Err(Error::InvalidAmount {
                amount: self.daily_reward_amount,
            });
        }
        if self.daily_reward_cooldown_hours <= 0 {
            return Err(Error::Config {
                message: "daily_reward_cooldown_hours must be positive".to_string(),
            });
        }
        if self.max_attempts == 0 || self.max_connections == 0 || self.store_timeout_ms == 0 {
            return Err(Error::Config {
                message: "max_attempts, max_connections and store_timeout_ms must be non-zero"
                    .to_string(),
            });
        }
        if self.max_backoff_ms < self.retry_backoff_ms {
            return Err(Error::Config {
                message: "max_backoff_ms must not be below retry_backoff_ms".to_string(),
            });
        }
        Ok(())
    }
}

/// Parses and validates settings from TOML text.
pub fn parse_settings(contents: &str) -> Result<EconomySettings> {
    let config: Config = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse economy settings: {e}"),
    })?;
    config.economy.validate()?;
    Ok(config.economy)
}

/// Loads economy settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A value fails validation
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<EconomySettings> {
    let path_ref = path.as_ref();
    debug!("Loading economy settings from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read settings file {}: {e}", path_ref.display()),
    })?;
    parse_settings(&contents)
}

/// Loads settings from `ECONOMY_CONFIG` or ./economy.toml, falling back to
/// defaults when neither file exists.
pub fn load_default_settings() -> Result<EconomySettings> {
    let path = std::env::var("ECONOMY_CONFIG").unwrap_or_else(|_| "economy.toml".to_string());
    if Path::new(&path).exists() {
        load_settings(&path)
    } else {
        info!("No settings file at {}, using defaults", path);
        Ok(EconomySettings::default())
    }
}
