use std::{fmt::Display, process::ExitCode};

use clap::{Parser, Subcommand};
use secure_noise_math::{
    bits::Binary64,
    cmdline_utils::{BoundDirection, OutputFormat},
    errors::Error,
    granularity::Granularity,
    parameters::{
        GranularityParameters, SweepParameters, DEFAULT_SWEEP_SAMPLES, DEFAULT_SWEEP_SEED,
        LAPLACE_RESOLUTION_BITS,
    },
    secure_math::{
        ceil_power_of_two, next_larger_double, next_smaller_double,
        round_to_multiple_of_power_of_two,
    },
    sweep::{self, SweepReport},
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "secure-noise-math", author, version, about, long_about = None)]
struct Args {
    #[arg(short = 'f', long, global = true, default_value = "text")]
    format: OutputFormat,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Smallest power of 2 larger than or equal to X.
    #[command(allow_negative_numbers = true)]
    Ceil { x: f64 },

    /// Closest multiple of a power-of-2 GRANULARITY to X.
    #[command(allow_negative_numbers = true)]
    Round { x: f64, granularity: f64 },

    /// Doubles bounding the integer N from above and/or below.
    #[command(allow_negative_numbers = true)]
    Bounds {
        n: i64,

        #[arg(short, long, default_value = "both")]
        direction: BoundDirection,
    },

    /// Granularity used for a noise distribution with the given SCALE.
    #[command(allow_negative_numbers = true)]
    Granularity {
        scale: f64,

        #[arg(short, long, default_value_t = LAPLACE_RESOLUTION_BITS)]
        resolution_bits: u32,
    },

    /// Check every property on random inputs.
    Sweep {
        #[arg(short, long, default_value_t = DEFAULT_SWEEP_SAMPLES)]
        samples: usize,

        #[arg(long, default_value_t = DEFAULT_SWEEP_SEED)]
        seed: u64,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Math(#[from] Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("{0} of {1} checks failed")]
    SweepFailed(usize, usize),
}

#[derive(Serialize)]
struct CeilOutput {
    input: Binary64,
    result: Binary64,
}

impl Display for CeilOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ceil_power_of_two({}) = {}",
            self.input.value(),
            self.result.value()
        )
    }
}

#[derive(Serialize)]
struct RoundOutput {
    input: f64,
    granularity: f64,
    result: f64,
}

impl Display for RoundOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "round_to_multiple_of_power_of_two({}, {}) = {}",
            self.input, self.granularity, self.result
        )
    }
}

#[derive(Serialize)]
struct BoundsOutput {
    input: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    upper: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lower: Option<f64>,
}

impl Display for BoundsOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(upper) = self.upper {
            writeln!(f, "next_larger_double({}) = {upper:.0}", self.input)?;
        }
        if let Some(lower) = self.lower {
            writeln!(f, "next_smaller_double({}) = {lower:.0}", self.input)?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct GranularityOutput {
    scale: f64,
    parameters: GranularityParameters,
    granularity: Granularity,
    log2: i32,
}

impl Display for GranularityOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.parameters)?;
        write!(f, "Granularity for scale {}: {}", self.scale, self.granularity)
    }
}

struct SweepOutput<'a>(&'a SweepReport);

impl Serialize for SweepOutput<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl Display for SweepOutput<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let report = self.0;
        write!(f, "{}", report.parameters)?;
        writeln!(
            f,
            "Checks: {}, violations: {}",
            report.checks,
            report.violations.len()
        )?;
        for violation in &report.violations {
            writeln!(
                f,
                "  sample {}: {:?} ({})",
                violation.sample, violation.property, violation.input
            )?;
        }
        Ok(())
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    #[cfg(feature = "tracing")]
    init_tracing(args.verbose);
    #[cfg(not(feature = "tracing"))]
    let _ = args.verbose;

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(feature = "tracing")]
fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> Result<(), CliError> {
    match args.command {
        Command::Ceil { x } => {
            let result = ceil_power_of_two(x)?;
            emit(
                args.format,
                &CeilOutput {
                    input: Binary64::new(x),
                    result: Binary64::new(result),
                },
            )
        }
        Command::Round { x, granularity } => {
            let result = round_to_multiple_of_power_of_two(x, granularity)?;
            emit(
                args.format,
                &RoundOutput {
                    input: x,
                    granularity,
                    result,
                },
            )
        }
        Command::Bounds { n, direction } => emit(
            args.format,
            &BoundsOutput {
                input: n,
                upper: direction.includes_up().then(|| next_larger_double(n)),
                lower: direction.includes_down().then(|| next_smaller_double(n)),
            },
        ),
        Command::Granularity {
            scale,
            resolution_bits,
        } => {
            let parameters = GranularityParameters { resolution_bits };
            let granularity = Granularity::with_parameters(scale, &parameters)?;
            emit(
                args.format,
                &GranularityOutput {
                    scale,
                    parameters,
                    granularity,
                    log2: granularity.log2(),
                },
            )
        }
        Command::Sweep { samples, seed } => {
            let report = sweep::run(&SweepParameters { samples, seed })?;
            emit(args.format, &SweepOutput(&report))?;
            if report.passed() {
                Ok(())
            } else {
                Err(CliError::SweepFailed(
                    report.violations.len(),
                    report.checks,
                ))
            }
        }
    }
}

fn emit<T: Serialize + Display>(format: OutputFormat, output: &T) -> Result<(), CliError> {
    match format {
        OutputFormat::Text => println!("{output}"),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(output)?),
    }
    Ok(())
}
