//! Field-level view of IEEE-754 binary64 values.
//!
//! A double is laid out as `1*s 11*e 52*m`: one sign bit, eleven biased
//! exponent bits and fifty-two mantissa (fraction) bits. Everything in this
//! crate that must be exact works on this layout directly instead of on
//! floating-point arithmetic. Adjacent doubles come from `f64::next_up` and
//! `f64::next_down`, which step this pattern by one.

use std::hash::Hash;

use serde::{Serialize, Serializer};

pub const SIGN_MASK: u64 = 0x8000_0000_0000_0000;
pub const EXPONENT_MASK: u64 = 0x7ff0_0000_0000_0000;
pub const MANTISSA_MASK: u64 = 0x000f_ffff_ffff_ffff;

/// Adding this to the bit pattern increments the biased exponent by one.
pub const EXPONENT_UNIT: u64 = 0x0010_0000_0000_0000;

pub const MANTISSA_BITS: u32 = 52;
pub const EXPONENT_BIAS: i32 = 1023;

/// Exponent bits of the largest finite double, i.e. of `2^1023`.
pub const MAX_FINITE_EXPONENT_BITS: u64 = 0x7fe0_0000_0000_0000;

/// Wrapper exposing the sign, exponent and mantissa fields of an `f64`.
#[derive(Debug, Clone, Copy)]
pub struct Binary64(f64);

impl Hash for Binary64 {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

// Equality is on the bit pattern, so NaN == NaN and 0.0 != -0.0.
impl PartialEq for Binary64 {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for Binary64 {}

impl Binary64 {
    pub const fn new(value: f64) -> Self {
        Binary64(value)
    }

    pub fn from_bits(bits: u64) -> Self {
        Binary64(f64::from_bits(bits))
    }

    pub const fn value(&self) -> f64 {
        self.0
    }

    pub fn to_bits(&self) -> u64 {
        self.0.to_bits()
    }

    pub fn sign(&self) -> bool {
        self.to_bits() & SIGN_MASK != 0
    }

    /// The raw 11-bit exponent field, `0..=2047`.
    pub fn biased_exponent(&self) -> u16 {
        ((self.to_bits() & EXPONENT_MASK) >> MANTISSA_BITS) as u16
    }

    pub fn exponent_bits(&self) -> u64 {
        self.to_bits() & EXPONENT_MASK
    }

    pub fn mantissa(&self) -> u64 {
        self.to_bits() & MANTISSA_MASK
    }

    pub fn is_subnormal(&self) -> bool {
        self.biased_exponent() == 0 && self.mantissa() != 0
    }

    /// A positive finite double is an exact power of two iff its mantissa is zero.
    ///
    /// Subnormal powers of two carry their bit in the mantissa and therefore do
    /// not qualify.
    pub fn is_exact_power_of_two(&self) -> bool {
        self.0 > 0.0 && self.0.is_finite() && self.mantissa() == 0
    }

    /// Unbiased exponent `k` of a normal value, so that `|x| = 1.m * 2^k`.
    pub fn unbiased_exponent(&self) -> i32 {
        i32::from(self.biased_exponent()) - EXPONENT_BIAS
    }
}

impl From<f64> for Binary64 {
    fn from(value: f64) -> Self {
        Binary64::new(value)
    }
}

impl From<Binary64> for f64 {
    fn from(bits: Binary64) -> Self {
        bits.0
    }
}

impl Serialize for Binary64 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Binary64", 4)?;
        state.serialize_field("value", &self.0)?;
        state.serialize_field("sign", &self.sign())?;
        state.serialize_field("exponent", &self.biased_exponent())?;
        state.serialize_field("mantissa", &format!("{:#015x}", self.mantissa()))?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields() {
        let one = Binary64::new(1.0);
        assert!(!one.sign());
        assert_eq!(one.biased_exponent(), 1023);
        assert_eq!(one.unbiased_exponent(), 0);
        assert_eq!(one.mantissa(), 0);

        let x = Binary64::new(-1.5);
        assert!(x.sign());
        assert_eq!(x.biased_exponent(), 1023);
        assert_eq!(x.mantissa(), 1 << 51);

        assert_eq!(Binary64::new(f64::INFINITY).biased_exponent(), 0x7ff);
        assert_eq!(MAX_FINITE_EXPONENT_BITS, f64::MAX.to_bits() & EXPONENT_MASK);
    }

    #[test]
    fn test_exact_power_of_two() {
        for x in [1.0, 2.0, 0.5, 1024.0, 2f64.powi(1023), 2f64.powi(-1022)] {
            assert!(Binary64::new(x).is_exact_power_of_two(), "{x}");
        }
        for x in [
            0.0,
            -0.0,
            -2.0,
            3.0,
            0.75,
            f64::INFINITY,
            f64::NAN,
            f64::MAX,
            f64::from_bits(1),
        ] {
            assert!(!Binary64::new(x).is_exact_power_of_two(), "{x}");
        }
        assert!(Binary64::new(f64::from_bits(1)).is_subnormal());
    }

    #[test]
    fn test_bit_equality() {
        assert_eq!(Binary64::new(f64::NAN), Binary64::new(f64::NAN));
        assert_ne!(Binary64::new(0.0), Binary64::new(-0.0));
    }

    #[test]
    fn test_from_bits() {
        assert_eq!(Binary64::from_bits(0x3ff0_0000_0000_0000).value(), 1.0);
        assert_eq!(
            Binary64::from_bits(MAX_FINITE_EXPONENT_BITS).value(),
            2f64.powi(1023)
        );
        let x = Binary64::new(-1.5);
        assert_eq!(Binary64::from_bits(x.to_bits()), x);
    }

    #[test]
    fn test_adjacent_values_step_the_bit_pattern() {
        // Positive values move away from zero by incrementing the pattern.
        assert_eq!(1f64.next_up().to_bits(), 1f64.to_bits() + 1);
        assert_eq!(1f64.next_down().to_bits(), 1f64.to_bits() - 1);
        // Negative values step the magnitude the other way.
        assert_eq!((-1f64).next_up().to_bits(), (-1f64).to_bits() - 1);
        assert_eq!((-1f64).next_down().to_bits(), (-1f64).to_bits() + 1);
        // Both zeros step to the smallest subnormal.
        assert_eq!(0f64.next_up().to_bits(), 1);
        assert_eq!((-0f64).next_up().to_bits(), 1);
        assert_eq!(0f64.next_down().to_bits(), SIGN_MASK | 1);
        // Carrying out of the mantissa bumps the exponent.
        let below_two = Binary64::from_bits(0x3fff_ffff_ffff_ffff);
        assert_eq!(below_two.value().next_up(), 2.0);
        assert_eq!(f64::MAX.next_up(), f64::INFINITY);
        assert_eq!(f64::INFINITY.next_up(), f64::INFINITY);
        assert_eq!(f64::NEG_INFINITY.next_down(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_value(Binary64::new(-1.5)).unwrap();
        assert_eq!(json["sign"], true);
        assert_eq!(json["exponent"], 1023);
        assert_eq!(json["mantissa"], "0x8000000000000");
        assert_eq!(json["value"], -1.5);
    }
}
