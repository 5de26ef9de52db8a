use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

mod app;
mod terminal;

pub use app::{App, Options};

#[derive(Parser)]
#[command(name = "percept", about = "Timed perception experiment runner")]
#[command(version)]
struct Cli {
    /// Experiment configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Participant identifier; prompted for when omitted
    #[arg(short, long)]
    participant: Option<String>,

    /// Short timings for operator rehearsal
    #[arg(long)]
    rehearsal: bool,

    /// Answer every trial automatically instead of reading the keyboard
    #[arg(long)]
    simulate: bool,

    /// Seed for the trial shuffle
    #[arg(long)]
    seed: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let app = App::new(Options {
        config: cli.config,
        participant: cli.participant,
        rehearsal: cli.rehearsal,
        simulate: cli.simulate,
        seed: cli.seed,
    })?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    runtime.block_on(app.run())?;

    Ok(())
}
