//! Plausibility check for a parsed rate

use crate::core::error::RateError;
use rust_decimal::Decimal;

/// Accepts `rate` only when it lies in `[min, max]`.
///
/// A value outside the band almost always means the page layout shifted and
/// the wrong cell was read, so it is reported rather than stored.
pub fn check_range(rate: Decimal, min: Decimal, max: Decimal) -> Result<Decimal, RateError> {
    if rate < min || rate > max {
        return Err(RateError::Range { rate, min, max });
    }
    Ok(rate)
}
