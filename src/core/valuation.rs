//! Wear-based item valuation.
//!
//! A lower wear float means a better-kept item and therefore a higher value:
//! `value = min + (max - min) * (1 - wear)`, rounded to cents.

use crate::errors::{Error, Result};
use rand::Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Condition bucket derived from a wear float.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Condition {
    /// `[0, 0.07)`
    FactoryNew,
    /// `[0.07, 0.15)`
    MinimalWear,
    /// `[0.15, 0.38)`
    FieldTested,
    /// `[0.38, 0.45)`
    WellWorn,
    /// `[0.45, 1.0]`
    BattleScarred,
}

impl Condition {
    /// Buckets a wear float. Lower bounds are inclusive, upper bounds exclusive,
    /// except the last bucket which includes 1.0.
    pub fn from_wear(wear: f64) -> Result<Self> {
        validate_wear(wear)?;
        Ok(if wear < 0.07 {
            Self::FactoryNew
        } else if wear < 0.15 {
            Self::MinimalWear
        } else if wear < 0.38 {
            Self::FieldTested
        } else if wear < 0.45 {
            Self::WellWorn
        } else {
            Self::BattleScarred
        })
    }

    /// Display label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::FactoryNew => "Factory New",
            Self::MinimalWear => "Minimal Wear",
            Self::FieldTested => "Field-Tested",
            Self::WellWorn => "Well-Worn",
            Self::BattleScarred => "Battle-Scarred",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Value and condition of a drawn item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Valuation {
    /// Monetary value, rounded to two decimal places
    pub value: Decimal,
    /// Condition bucket of the wear float
    pub condition: Condition,
}

fn validate_wear(wear: f64) -> Result<()> {
    if wear.is_finite() && (0.0..=1.0).contains(&wear) {
        Ok(())
    } else {
        Err(Error::InvalidWear { wear })
    }
}

/// Computes the value and condition for a wear float within a skin's value range.
///
/// # Errors
/// `InvalidWear` if `wear` is outside `[0, 1]`; `InvalidAmount` if the range is
/// negative or inverted.
pub fn valuate(min_value: Decimal, max_value: Decimal, wear: f64) -> Result<Valuation> {
    let condition = Condition::from_wear(wear)?;
    if min_value.is_sign_negative() {
        return Err(Error::InvalidAmount { amount: min_value });
    }
    if max_value < min_value {
        return Err(Error::InvalidAmount { amount: max_value });
    }

    let wear_decimal = Decimal::from_f64(wear).ok_or(Error::InvalidWear { wear })?;
    let multiplier = Decimal::ONE - wear_decimal;
    let value = (min_value + (max_value - min_value) * multiplier)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    Ok(Valuation { value, condition })
}

/// Samples a wear float uniformly from `[0, 1)`.
pub fn sample_wear<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen_range(0.0..1.0)
}
