//! Conversion between decimal currency amounts and ledger fixed-point units.

use super::error::LedgerError;

/// Number of stroops (smallest indivisible ledger unit) per whole unit.
pub const STROOPS_PER_UNIT: i128 = 10_000_000;

const SCALE: f64 = STROOPS_PER_UNIT as f64;

/// Convert a decimal amount into stroops.
///
/// Rounds to the nearest stroop with ties away from zero, which on the
/// accepted (non-negative) domain is round-half-up.
///
/// # Errors
/// Returns [`LedgerError::InvalidAmount`] for negative, NaN, infinite, or
/// amounts whose scaled value does not fit an `i128`.
pub fn to_ledger_units(amount: f64) -> Result<i128, LedgerError> {
    if !amount.is_finite() {
        return Err(LedgerError::InvalidAmount(format!(
            "amount must be finite, got {amount}"
        )));
    }
    if amount < 0.0 {
        return Err(LedgerError::InvalidAmount(format!(
            "amount must not be negative, got {amount}"
        )));
    }

    let scaled = (amount * SCALE).round();
    // i128::MAX as f64 rounds up to 2^127, so the comparison must be strict
    if scaled >= i128::MAX as f64 {
        return Err(LedgerError::InvalidAmount(format!(
            "amount {amount} exceeds the ledger's range"
        )));
    }

    Ok(scaled as i128)
}

/// Convert stroops back into a decimal amount, for display only.
#[must_use]
pub fn from_ledger_units(stroops: i128) -> f64 {
    stroops as f64 / SCALE
}
