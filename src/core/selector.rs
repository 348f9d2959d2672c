//! Weighted drop selection using cumulative-weight sampling.
//!
//! Weights are treated as unnormalized: probabilities summing to 1.0 and
//! percentages summing to 100 behave identically because every draw divides by
//! the table's own total. Non-finite and negative weights count as zero.
//! Entries are walked in the order given, so callers must pass the table in its
//! stable, defined order.

use rand::Rng;
use thiserror::Error;

/// Reasons a selection cannot be made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// The drop table has no entries.
    #[error("drop table is empty")]
    EmptyPool,
    /// No entry has a positive weight.
    #[error("drop table has no positive weight")]
    DegenerateWeights,
}

fn effective_weight(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        0.0
    }
}

/// Sum of the usable weights in a table.
///
/// # Errors
/// `EmptyPool` for an empty table, `DegenerateWeights` when the total is not a
/// positive finite number.
pub fn total_weight<T>(entries: &[(T, f64)]) -> Result<f64, SelectionError> {
    if entries.is_empty() {
        return Err(SelectionError::EmptyPool);
    }
    let total: f64 = entries.iter().map(|(_, weight)| effective_weight(*weight)).sum();
    if total.is_finite() && total > 0.0 {
        Ok(total)
    } else {
        Err(SelectionError::DegenerateWeights)
    }
}

/// Draws one entry with probability `weight / total`.
pub fn select<'a, T, R>(entries: &'a [(T, f64)], rng: &mut R) -> Result<&'a T, SelectionError>
where
    R: Rng + ?Sized,
{
    let total = total_weight(entries)?;
    select_at(entries, rng.gen_range(0.0..total))
}

/// Returns the entry whose cumulative range contains `point`.
///
/// `point` is clamped into `[0, total)`; a point at or past the total (from
/// rounding in the caller or in the accumulation) lands on the last entry with
/// a positive weight.
pub fn select_at<T>(entries: &[(T, f64)], point: f64) -> Result<&T, SelectionError> {
    total_weight(entries)?;
    Ok(walk(entries, point))
}

/// Normalized probability of every entry, in table order.
pub fn probabilities<T>(entries: &[(T, f64)]) -> Result<Vec<f64>, SelectionError> {
    let total = total_weight(entries)?;
    Ok(entries
        .iter()
        .map(|(_, weight)| effective_weight(*weight) / total)
        .collect())
}

// Callers have already checked that at least one weight is positive.
fn walk<T>(entries: &[(T, f64)], point: f64) -> &T {
    let point = if point.is_nan() { 0.0 } else { point.max(0.0) };
    let mut cumulative = 0.0;
    let mut last_positive = &entries[entries.len() - 1].0;

    for (item, weight) in entries {
        let weight = effective_weight(*weight);
        if weight <= 0.0 {
            continue;
        }
        cumulative += weight;
        last_positive = item;
        // Strict comparison: each entry owns `[start, cumulative)`. This differs
        // from `cumulative >= point` only on exact boundaries, a measure-zero
        // set for a continuous draw, and keeps a point on a boundary from
        // resolving to an entry of zero width.
        if point < cumulative {
            return item;
        }
    }

    last_positive
}
