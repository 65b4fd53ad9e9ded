use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use create_config::create_config;
use run::run;
use scenario::SimulationArgs;
use trace::trace;

mod create_config;
mod run;
mod scenario;
mod trace;

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the default five-station bus topology to a file
    GenConfig {
        /// File to write the network config to
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Run a simulation, logging what every station does
    Run {
        #[command(flatten)]
        simulation: SimulationArgs,

        /// Pace ticks at the configured tick rate instead of running flat out
        #[arg(long)]
        realtime: bool,
    },
    /// Run a simulation silently and dump a snapshot of every tick as JSON
    Trace {
        #[command(flatten)]
        simulation: SimulationArgs,

        /// File to write the trace to, printed to stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Simulate stations sharing an Ethernet collision domain.", long_about = None)]
struct Args {
    #[command(subcommand)]
    pub command: Command,
}

fn main() -> Result<()> {
    let args = Args::parse();
    match args.command {
        Command::GenConfig { output } => create_config(&output),
        Command::Run {
            simulation,
            realtime,
        } => run(&simulation, realtime),
        Command::Trace { simulation, output } => trace(&simulation, output.as_deref()),
    }
}
