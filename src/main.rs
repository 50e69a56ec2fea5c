//! OrbitGlobe command line
//!
//! Headless replay of telemetry catalogs through the globe engine, and quick
//! catalog inspection.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use orbitglobe::replay::{run_inspect, run_replay, InspectArgs, ReplayArgs};
use orbitglobe::Settings;

#[derive(Parser, Debug)]
#[command(name = "orbitglobe", version, about)]
struct Cli {
    /// Settings JSON file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay catalogs (or propagated TLEs) through the engine on a simulated clock
    Replay(ReplayArgs),
    /// Print risk and filter counts for a catalog
    Inspect(InspectArgs),
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    match cli.command {
        Command::Replay(args) => run_replay(args, settings),
        Command::Inspect(args) => run_inspect(args, settings),
    }
}
