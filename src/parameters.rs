use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Resolution used by the Laplace sampler: granularity is `ceil_power_of_two(lambda / 2^40)`.
pub const LAPLACE_RESOLUTION_BITS: u32 = 40;

/// Resolution used by the Gaussian sampler: granularity is `ceil_power_of_two(2 * sigma / 2^57)`.
pub const GAUSSIAN_RESOLUTION_BITS: u32 = 57;

pub const DEFAULT_SWEEP_SAMPLES: usize = 100_000;
pub const DEFAULT_SWEEP_SEED: u64 = 42;

/// Errors that can occur when validating parameters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParameterError {
    /// A sweep without samples checks nothing.
    #[error("Number of samples shouldn't be zero.")]
    ZeroSamples,

    /// No granularity has more binary digits of resolution than this.
    #[error("Resolution of {0} bits exceeds the maximum of {1} bits.")]
    ResolutionTooLarge(u32, u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GranularityParameters {
    /// Binary digits of resolution kept below the noise scale.
    pub resolution_bits: u32,
}

impl GranularityParameters {
    /// Largest resolution that can still map a scale of `2^1023` to a normal granularity.
    pub const MAX_RESOLUTION_BITS: u32 = 2045;

    pub const fn laplace() -> Self {
        Self {
            resolution_bits: LAPLACE_RESOLUTION_BITS,
        }
    }

    pub const fn gaussian() -> Self {
        Self {
            resolution_bits: GAUSSIAN_RESOLUTION_BITS,
        }
    }

    pub const fn validate(&self) -> Result<(), ParameterError> {
        if self.resolution_bits > Self::MAX_RESOLUTION_BITS {
            Err(ParameterError::ResolutionTooLarge(
                self.resolution_bits,
                Self::MAX_RESOLUTION_BITS,
            ))
        } else {
            Ok(())
        }
    }
}

impl Default for GranularityParameters {
    fn default() -> Self {
        Self::laplace()
    }
}

impl Display for GranularityParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Resolution: {} bits", self.resolution_bits)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepParameters {
    /// Number of random inputs drawn per checked property.
    pub samples: usize,
    /// Seed of the ChaCha stream the inputs are drawn from.
    pub seed: u64,
}

impl SweepParameters {
    pub const fn validate(&self) -> Result<(), ParameterError> {
        if self.samples == 0 {
            Err(ParameterError::ZeroSamples)
        } else {
            Ok(())
        }
    }
}

impl Default for SweepParameters {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SWEEP_SAMPLES,
            seed: DEFAULT_SWEEP_SEED,
        }
    }
}

impl Display for SweepParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Samples: {}, seed: {}", self.samples, self.seed)
    }
}
