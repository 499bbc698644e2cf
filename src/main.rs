mod buffer;
mod error;
mod factor;
mod pipeline;
mod sink;
mod storage;
mod verify;

use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;
use tracing::{Level, debug, warn};
use tracing_subscriber::FmtSubscriber;

use pipeline::{DEFAULT_CAPACITY, Pipeline, PipelineConfig};
use sink::TextSink;

#[derive(Parser)]
#[command(name = "pfactor")]
#[command(
    about = "Factor integers into primes through a bounded producer/consumer pipeline",
    long_about = None
)]
struct Cli {
    #[arg(
        allow_negative_numbers = true,
        help = "Integers to factor, emitted in the order given"
    )]
    numbers: Vec<i64>,
    #[arg(
        short,
        long,
        default_value_t = DEFAULT_CAPACITY,
        value_parser = parse_positive,
        help = "Number of slots in each buffer"
    )]
    capacity: usize,
    #[arg(
        short,
        long,
        default_value_t = factor::DEFAULT_MAX_FACTORS,
        value_parser = parse_positive,
        help = "Maximum number of prime factors per number"
    )]
    max_factors: usize,
    #[arg(long, help = "Cross-check every result with GMP before printing it")]
    verify: bool,
    #[arg(long, help = "Print item counts and timings to stderr")]
    stats: bool,
    #[arg(long, help = "Do not append this run to the execution log")]
    no_log: bool,
    #[arg(short, long, help = "Enable debug logging")]
    verbose: bool,
}

fn parse_positive(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("invalid number '{}': {}", s, e)),
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_micros() as f64 / 1000.0
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set logger")?;

    let config = PipelineConfig {
        capacity: cli.capacity,
        max_factors: cli.max_factors,
        verify: cli.verify,
    };
    debug!(?config, count = cli.numbers.len(), "starting pipeline");

    let mut pipeline = Pipeline::new(config);
    let (_, summary) = pipeline
        .run(&cli.numbers, TextSink::stdout())
        .context("Factoring pipeline failed")?;
    debug!(state = ?pipeline.state(), "pipeline finished");

    if cli.stats {
        eprintln!(
            "\nTotal: {} of {} numbers factored, {} printed",
            summary.factored, summary.submitted, summary.emitted
        );
        eprintln!(
            "Buffer peaks: input {}/{}, output {}/{}",
            summary.input_peak, cli.capacity, summary.output_peak, cli.capacity
        );
        eprintln!(
            "Producer finished: {}us ({:.2}ms)",
            summary.producer_elapsed.as_micros(),
            millis(summary.producer_elapsed)
        );
        eprintln!(
            "Total execution time: {}us ({:.2}ms)",
            summary.elapsed.as_micros(),
            millis(summary.elapsed)
        );
    }

    if !cli.no_log {
        let execution = storage::Execution {
            subcommand: "factor",
            inputs: summary.submitted,
            capacity: cli.capacity,
            duration: summary.elapsed,
        };
        if let Err(e) = storage::log_execution(&execution) {
            warn!(error = %e, "failed to log execution");
        }
    }

    Ok(())
}
