//! nmfrec - NMF recommender training CLI
//!
//! Usage:
//!   nmfrec                          # Search (or resume), retrain, evaluate
//!   nmfrec --fresh                  # Discard an existing checkpoint first
//!   nmfrec --random-state 0 --json  # Reproducible run, JSON report
//!   nmfrec --init nndsvda,nndsvdar  # Search other init strategies
//!   RUST_LOG=nmfrec=debug nmfrec    # Per-candidate logging

use clap::Parser;
use nmfrec::decomposition::Init;
use nmfrec::pipeline::{self, RunConfig, DEFAULT_CHECKPOINT, DEFAULT_MODEL};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Train an NMF recommender with cross-validated grid search.
///
/// The search result is checkpointed; a later run with the checkpoint in
/// place skips the search and retrains the saved best configuration.
#[derive(Parser, Debug)]
#[command(name = "nmfrec")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Grid search checkpoint file
    #[arg(long, default_value = DEFAULT_CHECKPOINT)]
    checkpoint: PathBuf,

    /// Trained model output file
    #[arg(long, default_value = DEFAULT_MODEL)]
    model_out: PathBuf,

    /// Seed for the synthetic data
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Seed for NMF initialisation (entropy if omitted)
    #[arg(long)]
    random_state: Option<u64>,

    /// Number of cross-validation folds
    #[arg(long, default_value_t = 3)]
    folds: usize,

    /// Synthetic training rows
    #[arg(long, default_value_t = 100)]
    train_rows: usize,

    /// Synthetic validation rows
    #[arg(long, default_value_t = 20)]
    val_rows: usize,

    /// Synthetic feature count
    #[arg(long, default_value_t = 50)]
    features: usize,

    /// Init strategies to search, comma-separated (default: random,nndsvd)
    #[arg(long, value_delimiter = ',', value_parser = parse_init)]
    init: Vec<Init>,

    /// Evaluate candidates in parallel
    #[arg(long)]
    parallel: bool,

    /// Delete an existing checkpoint before running
    #[arg(long)]
    fresh: bool,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output (debug logging)
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn config(&self) -> RunConfig {
        let mut config = RunConfig::default()
            .with_checkpoint_path(&self.checkpoint)
            .with_model_path(&self.model_out)
            .with_data_seed(self.seed)
            .with_random_state(self.random_state)
            .with_folds(self.folds)
            .with_shape(self.train_rows, self.val_rows, self.features)
            .with_parallel(self.parallel);
        if !self.init.is_empty() {
            config.grid.init = self.init.clone();
        }
        config
    }

    fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

fn parse_init(name: &str) -> Result<Init, String> {
    Init::parse(name).ok_or_else(|| {
        format!("unknown init '{name}' (expected random, nndsvd, nndsvda or nndsvdar)")
    })
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn execute(cli: &Cli) -> nmfrec::Result<()> {
    if cli.fresh && cli.checkpoint.exists() {
        std::fs::remove_file(&cli.checkpoint)?;
        tracing::info!(path = %cli.checkpoint.display(), "Removed existing checkpoint");
    }

    let report = pipeline::run(&cli.config())?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| nmfrec::NmfRecError::Serialization(e.to_string()))?;
        println!("{json}");
    }
    println!("Model training and hyperparameter tuning completed successfully.");
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level());

    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
