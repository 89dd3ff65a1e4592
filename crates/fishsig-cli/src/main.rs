//! Signs and verifies a fixed message over freshly sampled LowMC instances and
//! reports the time spent in each phase.
use std::time::Instant;

use anyhow::{Context, bail};
use clap::Parser;
use fishsig::{
    DEFAULT_REPETITIONS, Instance, Metrics, keygen_with_metrics,
    params::validate_dimensions,
    signature::{sign_to_bytes, verify_bytes},
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

const MESSAGE: [u8; 32] = [
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26,
    27, 28, 29, 30, 31, 32,
];

/// Benchmarks Fish signatures over random LowMC instances.
///
/// Every iteration samples a new instance and key pair, signs a fixed message,
/// serializes and parses the signature and verifies it. Timings are printed as
/// CSV in microseconds, one row per iteration.
///
/// Logging can be controlled with an EnvFilter via the `FISHSIG_LOG`
/// environment variable.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// Number of S-boxes per round.
    sboxes: usize,
    /// Block size in bits.
    block_size: usize,
    /// Number of rounds.
    rounds: usize,
    /// Key size in bits.
    key_size: usize,
    /// Number of iterations.
    iterations: usize,
    /// Number of parallel repetitions per signature.
    #[arg(long, env = "FISHSIG_REPETITIONS", default_value_t = DEFAULT_REPETITIONS)]
    repetitions: usize,
    /// Seed for all randomness, for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,
    /// Print a breakdown per phase instead of CSV.
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    init_tracing().context("tracing initialization")?;
    let cli = Cli::parse();
    validate_dimensions(cli.sboxes, cli.block_size, cli.rounds, cli.key_size)
        .context("invalid LowMC parameters")?;

    let mut rng = match cli.seed {
        Some(seed) => ChaCha20Rng::seed_from_u64(seed),
        None => ChaCha20Rng::from_rng(&mut rand::rng()),
    };

    if !cli.verbose {
        println!("{}", Metrics::csv_header());
    }
    let mut total = Metrics::default();
    let mut verified = 0;
    let mut failures = 0;
    for i in 0..cli.iterations {
        let metrics = run_iteration(&cli, &mut rng)
            .with_context(|| format!("iteration {i} failed"))?;
        let Some(metrics) = metrics else {
            error!(iteration = i, "signature did not verify");
            failures += 1;
            continue;
        };
        if cli.verbose {
            println!("Iteration {i}:\n{metrics}\n");
        } else {
            println!("{}", metrics.csv_row());
        }
        total += &metrics;
        verified += 1;
    }
    if failures > 0 {
        bail!("{failures} of {} signatures did not verify", cli.iterations);
    }
    if verified > 0 {
        let average = total.average(verified);
        if cli.verbose {
            println!("Average over {verified} runs:\n{average}");
        } else {
            info!(runs = verified, average = %average.csv_row(), "done");
        }
    }
    Ok(())
}

/// Runs one iteration, returning `None` if the signature was rejected.
fn run_iteration(cli: &Cli, rng: &mut ChaCha20Rng) -> anyhow::Result<Option<Metrics>> {
    let mut metrics = Metrics::default();

    let start = Instant::now();
    let instance = Instance::generate(
        cli.sboxes,
        cli.block_size,
        cli.rounds,
        cli.key_size,
        cli.repetitions,
        rng,
    )?;
    metrics.setup = start.elapsed();

    let (sk, pk) = keygen_with_metrics(&instance, rng, &mut metrics)?;
    let bytes = sign_to_bytes(&instance, &sk, &MESSAGE, rng, &mut metrics)?;
    info!(size = bytes.len(), strategy = ?instance.strategy(), "signed");
    let valid = verify_bytes(&instance, &pk, &MESSAGE, &bytes, &mut metrics)?;
    Ok(valid.then_some(metrics))
}

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = EnvFilter::builder()
        .with_env_var("FISHSIG_LOG")
        .with_default_directive("fishsig=warn".parse()?)
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
