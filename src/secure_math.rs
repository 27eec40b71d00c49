//! Exact arithmetic used when generating differentially private noise.
//!
//! Floating-point rounding that depends on a secret value can leak that value.
//! The functions here avoid it by working on the binary64 layout directly, so
//! that every result is exact and bit-for-bit reproducible on every platform.

use crate::{
    bits::{Binary64, EXPONENT_UNIT, MAX_FINITE_EXPONENT_BITS},
    errors::{ensure, Result},
};

/// Ratios at or above this magnitude carry no fractional bits relative to the
/// granularity.
const RATIO_LIMIT: f64 = (1u64 << 54) as f64;

/// Returns the smallest power of 2 larger than or equal to `x`.
///
/// `x` must be a finite positive number not greater than `2^1023`. The result
/// is an exact power of 2 with zero mantissa, so subnormal inputs yield
/// `2^-1022`, the smallest such power.
pub fn ceil_power_of_two(x: f64) -> Result<f64> {
    ensure!(!x.is_nan(), "Input must be a number. Provided value: NaN");
    ensure!(x > 0.0, "Input must be positive. Provided value: {x}");
    ensure!(x.is_finite(), "Input must be finite. Provided value: {x}");

    let bits = Binary64::new(x);

    // A positive normal x is a power of 2 if and only if its mantissa is 0.
    if bits.mantissa() == 0 {
        return Ok(x);
    }

    let exponent_bits = bits.exponent_bits();
    ensure!(
        exponent_bits < MAX_FINITE_EXPONENT_BITS,
        "Input must not be greater than 2^1023. Provided value: {x}"
    );

    // Bump the exponent by one and drop the mantissa. A subnormal has exponent
    // bits 0 and lands on 2^-1022.
    Ok(Binary64::from_bits(exponent_bits + EXPONENT_UNIT).value())
}

/// Rounds `x` to the closest multiple of `granularity`, where `granularity` is
/// a power of 2. Because `granularity` is a power of 2 the result is exact.
///
/// Ties round half up, towards positive infinity, so `10.0` with granularity
/// `4.0` becomes `12.0` and `-10.0` becomes `-8.0`. A zero result is always
/// `+0.0`.
/// Non-finite `x` is returned unchanged.
///
/// Fails if `granularity` is not a positive finite power of 2 with zero
/// mantissa, or if the nearest multiple overflows (only possible for
/// `granularity == 2^1023`).
pub fn round_to_multiple_of_power_of_two(x: f64, granularity: f64) -> Result<f64> {
    ensure!(
        Binary64::new(granularity).is_exact_power_of_two(),
        "Granularity must be a power of 2. Provided value: {granularity}"
    );

    // Dividing by a power of 2 only moves the exponent.
    let ratio = x / granularity;
    if ratio.abs() < RATIO_LIMIT {
        // For |ratio| < 2^54 the fractional part `ratio - floor` is exact.
        let floor = ratio.floor();
        let nearest = if ratio - floor >= 0.5 { floor + 1.0 } else { floor };
        // |nearest| <= 2^54 < 2^63, so the conversion to i64 cannot saturate
        // and the conversion back is exact.
        let multiple = nearest as i64;
        let rounded = multiple as f64 * granularity;
        ensure!(
            rounded.is_finite(),
            "Rounding {x} to a multiple of {granularity} is not representable"
        );
        Ok(rounded)
    } else {
        // |ratio| >= 2^54 > 2^53: the ratio has no fractional bits, so x is
        // already a multiple of the granularity.
        Ok(x)
    }
}

/// Returns the smallest double that is larger than or equal to `n`.
///
/// Converting an `i64` above `2^53` in magnitude rounds to a nearby double in
/// either direction. When the default conversion lands below `n` the result is
/// moved up by one ulp.
///
/// For `n = 288230376151711767` the conversion yields `288230376151711744`,
/// which lies 23 below `n`, so `288230376151711808` is returned.
pub fn next_larger_double(n: i64) -> f64 {
    let result = n as f64;
    // Compare in i128: at i64::MAX the conversion gives 2^63, which does not
    // fit back into an i64.
    if (result as i128) < i128::from(n) {
        result.next_up()
    } else {
        result
    }
}

/// Returns the largest double that is smaller than or equal to `n`.
///
/// See [`next_larger_double`]. For `n = 288230376151711790` the conversion
/// yields `288230376151711808`, 18 above `n`, so `288230376151711744` is
/// returned.
pub fn next_smaller_double(n: i64) -> f64 {
    let result = n as f64;
    if (result as i128) > i128::from(n) {
        result.next_down()
    } else {
        result
    }
}
