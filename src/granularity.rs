use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::{
    bits::{Binary64, EXPONENT_BIAS, MANTISSA_BITS},
    errors::{ensure, Error, Result},
    parameters::GranularityParameters,
    secure_math::{ceil_power_of_two, round_to_multiple_of_power_of_two},
};

/// Smallest exponent of a normal double.
const MIN_NORMAL_EXPONENT: i32 = 1 - EXPONENT_BIAS;

/// Step size that noised values are snapped onto.
///
/// Always a positive, finite power of 2 with zero mantissa, so multiplying or
/// dividing by it only moves the exponent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Granularity(f64);

impl Granularity {
    pub fn new(granularity: f64) -> Result<Self> {
        ensure!(
            Binary64::new(granularity).is_exact_power_of_two(),
            "Granularity must be a power of 2. Provided value: {granularity}"
        );
        Ok(Granularity(granularity))
    }

    /// Granularity for a noise distribution with the given `scale`, keeping
    /// `resolution_bits` binary digits of resolution below it.
    ///
    /// Equals `ceil_power_of_two(scale / 2^resolution_bits)`. The division is
    /// carried out on the exponent of the ceiling, so it is exact and never
    /// underflows silently: a result below the smallest normal double fails.
    pub fn for_scale(scale: f64, resolution_bits: u32) -> Result<Self> {
        let ceiling = Binary64::new(ceil_power_of_two(scale)?);

        let exponent = i64::from(ceiling.unbiased_exponent()) - i64::from(resolution_bits);
        ensure!(
            exponent >= i64::from(MIN_NORMAL_EXPONENT),
            "Granularity 2^{exponent} for scale {scale} with {resolution_bits} resolution bits is not a normal double"
        );

        let biased = (exponent + i64::from(EXPONENT_BIAS)) as u64;
        Ok(Granularity(f64::from_bits(biased << MANTISSA_BITS)))
    }

    pub fn with_parameters(scale: f64, parameters: &GranularityParameters) -> Result<Self> {
        parameters.validate()?;
        Self::for_scale(scale, parameters.resolution_bits)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// The exponent `k` such that the granularity is `2^k`.
    pub fn log2(&self) -> i32 {
        Binary64::new(self.0).unbiased_exponent()
    }

    /// Rounds `x` to the closest multiple of this granularity.
    pub fn round(&self, x: f64) -> Result<f64> {
        round_to_multiple_of_power_of_two(x, self.0)
    }
}

impl TryFrom<f64> for Granularity {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self> {
        Granularity::new(value)
    }
}

impl From<Granularity> for f64 {
    fn from(granularity: Granularity) -> Self {
        granularity.0
    }
}

impl Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "2^{} ({})", self.log2(), self.0)
    }
}
