// used for decimal numbers
use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};

use crate::error::{Error, Result};

/// Scales `number` by `10^precision`, rounds half away from zero and returns
/// the integer part, e.g. money kept as cents.
pub fn to_i64_for_storage(number: &BigDecimal, precision: i64) -> Result<i64> {
    let multiplier = BigDecimal::new(1.into(), -precision);
    let scaled = (number * &multiplier).with_scale_round(0, RoundingMode::HalfUp);
    scaled
        .to_i64()
        .ok_or_else(|| Error::conversion("i64", format!("{scaled} is out of range")))
}

/// Scales `number` by `10^precision` and truncates.
pub fn float_to_i64_for_storage(number: f64, precision: i32) -> i64 {
    (number * 10f64.powi(precision)) as i64
}
