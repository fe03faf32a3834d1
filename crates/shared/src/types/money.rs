//! Strictly positive monetary amount.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! This type wraps `rust_decimal::Decimal` for arbitrary precision.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Decimal places the ledger stores (`NUMERIC(19, 4)`).
pub const AMOUNT_SCALE: u32 = 4;

/// Exclusive upper bound on the magnitude of any stored amount (10^15).
pub const AMOUNT_LIMIT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

/// Returns true if `amount` fits the ledger columns without rounding.
///
/// Trailing zeros do not count towards the scale, so `1.50000` fits.
#[must_use]
pub fn fits_ledger(amount: Decimal) -> bool {
    amount.abs() < AMOUNT_LIMIT && amount.normalize().scale() <= AMOUNT_SCALE
}

/// A monetary amount that is always greater than zero and fits the ledger.
///
/// Ledger movements never carry a sign; their direction comes from the
/// movement kind. Deserialization rejects zero, negative and out-of-range
/// values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct PositiveAmount(Decimal);

impl PositiveAmount {
    /// Wraps `amount` if it is strictly positive and [`fits_ledger`].
    #[must_use]
    pub fn new(amount: Decimal) -> Option<Self> {
        (amount > Decimal::ZERO && fits_ledger(amount)).then_some(Self(amount))
    }

    /// Returns the inner decimal value.
    #[must_use]
    pub const fn get(self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for PositiveAmount {
    type Error = String;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount).ok_or_else(|| format!(
                "amount must be greater than zero with at most {AMOUNT_SCALE} decimal places \
                 and below {AMOUNT_LIMIT}, got {amount}"
            ))
    }
}

impl From<PositiveAmount> for Decimal {
    fn from(amount: PositiveAmount) -> Self {
        amount.0
    }
}

impl std::fmt::Display for PositiveAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
