//! Randomized self-check of the exact primitives.
//!
//! Every sample owns a ChaCha stream derived from the seed and its index, so
//! the report is identical whether or not the samples run in parallel.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::Serialize;
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    bits::{Binary64, EXPONENT_BIAS, MANTISSA_BITS, MANTISSA_MASK, SIGN_MASK},
    errors::Result,
    parameters::SweepParameters,
    secure_math::{
        ceil_power_of_two, next_larger_double, next_smaller_double,
        round_to_multiple_of_power_of_two,
    },
};

/// Biased exponent of `2^1021`. With any mantissa, inputs stay below `2^1022`
/// so rounding never overflows.
const MAX_ROUNDING_INPUT_EXPONENT: u64 = 0x7fc;
const MAX_CEIL_INPUT_BITS: u64 = 0x7fe0_0000_0000_0000;

/// Properties checked on every sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Property {
    CeilMinimality,
    CeilIdempotence,
    RoundingExactness,
    GranularityRejection,
    UpperBound,
    LowerBound,
}

impl Property {
    pub const ALL: [Property; 6] = [
        Property::CeilMinimality,
        Property::CeilIdempotence,
        Property::RoundingExactness,
        Property::GranularityRejection,
        Property::UpperBound,
        Property::LowerBound,
    ];
}

/// An input on which a property failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub sample: usize,
    pub property: Property,
    pub input: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    pub parameters: SweepParameters,
    pub checks: usize,
    pub violations: Vec<Violation>,
}

impl SweepReport {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Draws `parameters.samples` random inputs and checks every [`Property`] on them.
#[cfg_attr(feature = "tracing", instrument(skip_all, fields(samples = parameters.samples, seed = parameters.seed)))]
pub fn run(parameters: &SweepParameters) -> Result<SweepReport> {
    parameters.validate()?;

    #[cfg(not(feature = "parallel"))]
    let mut violations: Vec<Violation> = (0..parameters.samples)
        .flat_map(|sample| check_sample(parameters.seed, sample))
        .collect();

    #[cfg(feature = "parallel")]
    let mut violations: Vec<Violation> = (0..parameters.samples)
        .into_par_iter()
        .flat_map_iter(|sample| check_sample(parameters.seed, sample))
        .collect();

    violations.sort_by_key(|v| v.sample);

    #[cfg(feature = "tracing")]
    tracing::info!(violations = violations.len(), "sweep finished");

    Ok(SweepReport {
        parameters: *parameters,
        checks: parameters.samples * Property::ALL.len(),
        violations,
    })
}

fn sample_rng(seed: u64, sample: usize) -> ChaCha20Rng {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    rng.set_stream(sample as u64);
    rng
}

fn check_sample(seed: u64, sample: usize) -> Vec<Violation> {
    let mut rng = sample_rng(seed, sample);
    let mut violations = Vec::new();
    let mut fail = |property: Property, input: String| {
        violations.push(Violation {
            sample,
            property,
            input,
        })
    };

    // Positive finite values not above 2^1023, subnormals included.
    let x = Binary64::from_bits(rng.gen_range(1..=MAX_CEIL_INPUT_BITS)).value();
    match ceil_power_of_two(x) {
        Ok(p) => {
            // Subnormals round up to the smallest power of 2 with zero mantissa.
            let minimal = if Binary64::new(x).is_subnormal() {
                p == f64::MIN_POSITIVE
            } else {
                p / 2.0 < x
            };
            if !(Binary64::new(p).is_exact_power_of_two() && p >= x && minimal) {
                fail(Property::CeilMinimality, format!("x = {x:e}"));
            }
            if ceil_power_of_two(p) != Ok(p) {
                fail(Property::CeilIdempotence, format!("p = {p:e}"));
            }
        }
        Err(_) => fail(Property::CeilMinimality, format!("x = {x:e}")),
    }

    let x = random_rounding_input(&mut rng);
    let k: i32 = rng.gen_range(-1022..=1000);
    let g = power_of_two(k);
    let exact = match round_to_multiple_of_power_of_two(x, g) {
        Ok(r) if (x / g).abs() < (1u64 << 54) as f64 => {
            (r / g).fract() == 0.0 && (r - x).abs() <= g / 2.0
        }
        Ok(r) => r == x,
        Err(_) => false,
    };
    if !exact {
        fail(Property::RoundingExactness, format!("x = {x:e}, g = 2^{k}"));
    }

    // Any normal positive value with a non-zero mantissa is not a power of 2.
    let mantissa = rng.gen_range(1..=MANTISSA_MASK);
    let not_power = f64::from_bits(g.to_bits() | mantissa);
    if round_to_multiple_of_power_of_two(x, not_power).is_ok() {
        fail(
            Property::GranularityRejection,
            format!("granularity = {not_power:e}"),
        );
    }

    let n: i64 = rng.gen();
    if (next_larger_double(n) as i128) < i128::from(n) {
        fail(Property::UpperBound, format!("n = {n}"));
    }
    if (next_smaller_double(n) as i128) > i128::from(n) {
        fail(Property::LowerBound, format!("n = {n}"));
    }

    violations
}

/// Finite value of either sign with magnitude below `2^1022`, subnormals included.
fn random_rounding_input(rng: &mut impl Rng) -> f64 {
    let sign = if rng.gen() { SIGN_MASK } else { 0 };
    let exponent = rng.gen_range(0..=MAX_ROUNDING_INPUT_EXPONENT) << MANTISSA_BITS;
    let mantissa = rng.gen_range(0..=MANTISSA_MASK);
    f64::from_bits(sign | exponent | mantissa)
}

/// `2^k` for a normal exponent `k`.
fn power_of_two(k: i32) -> f64 {
    f64::from_bits(((k + EXPONENT_BIAS) as u64) << MANTISSA_BITS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errors::Error, parameters::ParameterError};

    #[test]
    fn test_sweep_passes() {
        let params = SweepParameters {
            samples: 2000,
            seed: 7,
        };
        let report = run(&params).unwrap();
        assert!(report.passed(), "{:?}", report.violations);
        assert_eq!(report.checks, 2000 * Property::ALL.len());
    }

    #[test]
    fn test_sweep_is_deterministic() {
        let params = SweepParameters {
            samples: 16,
            seed: 3,
        };
        let a: Vec<f64> = (0..params.samples)
            .map(|i| sample_rng(params.seed, i).gen())
            .collect();
        let b: Vec<f64> = (0..params.samples)
            .map(|i| sample_rng(params.seed, i).gen())
            .collect();
        assert_eq!(a, b);
        // Streams differ between samples.
        assert_ne!(a[0], a[1]);
        assert_eq!(run(&params).unwrap(), run(&params).unwrap());
    }

    #[test]
    fn test_sweep_rejects_zero_samples() {
        let params = SweepParameters {
            samples: 0,
            seed: 0,
        };
        assert_eq!(
            run(&params),
            Err(Error::Parameters(ParameterError::ZeroSamples))
        );
    }

    #[test]
    fn test_power_of_two() {
        assert_eq!(power_of_two(0), 1.0);
        assert_eq!(power_of_two(-1), 0.5);
        assert_eq!(power_of_two(-1022), f64::MIN_POSITIVE);
        assert_eq!(power_of_two(10), 1024.0);
    }

    #[test]
    fn test_random_rounding_input_is_bounded() {
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        for _ in 0..1000 {
            let x = random_rounding_input(&mut rng);
            assert!(x.is_finite());
            assert!(x.abs() < 2f64.powi(1022));
        }
    }

    #[test]
    fn test_largest_rounding_input_is_below_bound() {
        let largest =
            f64::from_bits((MAX_ROUNDING_INPUT_EXPONENT << MANTISSA_BITS) | MANTISSA_MASK);
        assert!(largest < 2f64.powi(1022));
        assert_eq!(largest.next_up(), 2f64.powi(1022));
    }

    #[test]
    fn test_subnormal_ceiling_is_smallest_normal() {
        for bits in [1, 5, MANTISSA_MASK] {
            let p = ceil_power_of_two(f64::from_bits(bits)).unwrap();
            assert_eq!(p, f64::MIN_POSITIVE);
            assert!(Binary64::new(p).is_exact_power_of_two());
        }
    }
}
