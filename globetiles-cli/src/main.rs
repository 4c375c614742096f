//! GlobeTiles CLI - developer front-end for the tile LOD engine.
//!
//! Converts coordinates between reference systems, simulates frame-by-frame
//! tile streaming for a fixed camera and manages the configuration file.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::convert::ConvertArgs;
use commands::simulate::SimulateArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "globetiles", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Convert a coordinate between reference systems
    Convert {
        /// Source CRS (e.g., EPSG:4326)
        #[arg(long, default_value = "EPSG:4326")]
        from: String,

        /// Target CRS (e.g., EPSG:4978)
        #[arg(long, default_value = "EPSG:4978")]
        to: String,

        /// First axis: longitude in degrees or x in meters
        #[arg(allow_hyphen_values = true)]
        x: f64,

        /// Second axis: latitude in degrees or y in meters
        #[arg(allow_hyphen_values = true)]
        y: f64,

        /// Third axis: altitude or z in meters
        #[arg(default_value_t = 0.0, allow_hyphen_values = true)]
        z: f64,
    },

    /// Stream tiles for a fixed camera and report each frame
    Simulate {
        /// Camera longitude in degrees
        #[arg(long, allow_hyphen_values = true, default_value_t = 2.33)]
        lon: f64,

        /// Camera latitude in degrees
        #[arg(long, allow_hyphen_values = true, default_value_t = 48.24)]
        lat: f64,

        /// Camera altitude in meters
        #[arg(long, default_value_t = 100_000.0)]
        altitude: f64,

        /// Number of frames to run
        #[arg(long, default_value_t = 32)]
        frames: u32,

        /// Override subdivision.max_level
        #[arg(long)]
        max_level: Option<u8>,

        /// Override subdivision.sse_threshold
        #[arg(long)]
        sse_threshold: Option<f64>,

        /// Simulated fetch latency in milliseconds
        #[arg(long, default_value_t = 0)]
        latency_ms: u64,

        /// Print one JSON summary per frame
        #[arg(long)]
        json: bool,
    },

    /// View or modify the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Convert { from, to, x, y, z } => {
            commands::convert::run(ConvertArgs { from, to, x, y, z })
        }
        Commands::Simulate {
            lon,
            lat,
            altitude,
            frames,
            max_level,
            sse_threshold,
            latency_ms,
            json,
        } => commands::simulate::run(SimulateArgs {
            lon,
            lat,
            altitude,
            frames,
            max_level,
            sse_threshold,
            latency_ms,
            json,
        }),
        Commands::Config { command } => commands::config::run(command),
    }
}
