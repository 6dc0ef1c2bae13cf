//! Exact text encoding for currency columns on SQLite.
//!
//! Postgres stores these as `NUMERIC(10, 2)` and the driver hands back
//! `Decimal` directly. SQLite gets canonical two-place strings instead, rounded
//! the same way Postgres rounds on insert (half away from zero) and held to the
//! same eight integer digits.

use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

/// Fractional digits kept for every currency column.
pub(crate) const CURRENCY_SCALE: u32 = 2;

/// Largest magnitude a `NUMERIC(10, 2)` column accepts, in cents.
const CURRENCY_MAX_CENTS: i64 = 9_999_999_999;

/// Round to [`CURRENCY_SCALE`] places and pin the scale (`12.5` becomes `12.50`).
pub(crate) fn to_scale(value: Decimal) -> Decimal {
    let mut v = value.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    v.rescale(CURRENCY_SCALE);
    v
}

/// Round, then reject anything the column could not hold.
pub(crate) fn to_column(value: Decimal) -> Option<Decimal> {
    let scaled = to_scale(value);
    (scaled.abs() <= Decimal::new(CURRENCY_MAX_CENTS, CURRENCY_SCALE)).then_some(scaled)
}

pub(crate) fn to_storage(value: Decimal) -> String {
    to_scale(value).to_string()
}

pub(crate) fn from_storage(text: &str) -> Result<Decimal, rust_decimal::Error> {
    Decimal::from_str(text.trim())
}
