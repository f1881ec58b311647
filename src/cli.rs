use std::path::PathBuf;

use clap::Parser;

/// Kronos stochastic-process ensemble simulator and estimator.
#[derive(Parser)]
#[command(
    name = "kronos",
    version,
    about = "Stochastic-process ensemble simulator and estimator"
)]
pub struct Cli {
    /// Scenario selector: R1, R2, R2.1, R2.3, R2.4, R3, R3.1, R3.2,
    /// R3.3, R4.1, R4.2.
    pub scenario: String,

    /// Path to a TOML file overriding members/steps/dt/batch/seed.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the collected event stream as JSON to this path.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Override the global RNG seed.
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
