//! Command implementations for vrwheelctl

pub mod config;
pub mod ffb;
pub mod simulate;

use std::path::PathBuf;

use clap::{Args, Subcommand};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Load and validate a configuration file
    Check {
        /// Path to the JSON config
        path: PathBuf,
    },

    /// Write the default configuration
    Init {
        /// Destination path
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the effective configuration (defaults when no path is given)
    Show {
        path: Option<PathBuf>,
    },
}

#[derive(Args)]
pub struct SimulateArgs {
    /// Config file to simulate with (defaults otherwise)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Ticks spent in each phase of the script
    #[arg(long, default_value_t = 45, value_parser = clap::value_parser!(u32).range(1..=10_000))]
    pub steps: u32,

    /// How far the scripted hand turns the wheel, degrees
    #[arg(long, default_value_t = 90.0)]
    pub turn: f64,

    /// Play a constant-force effect throughout the run
    #[arg(long)]
    pub ffb: bool,

    /// Run on the loop thread at the configured tick rate instead of stepping
    #[arg(long)]
    pub realtime: bool,

    /// Reload the config file while running (with --realtime)
    #[arg(long, requires_all = ["realtime", "config"])]
    pub watch: bool,
}

#[derive(Subcommand)]
pub enum FfbCommands {
    /// Decode raw output reports given as hex strings
    Decode {
        /// One report per argument, e.g. 0a010101
        #[arg(required = true)]
        reports: Vec<String>,
    },

    /// Feed reports through a decoder and print the smoothed magnitude per tick
    Replay {
        #[arg(required = true)]
        reports: Vec<String>,

        /// Decoder ticks to run after the last report
        #[arg(long, default_value_t = 30)]
        ticks: u32,

        /// Tick interval, milliseconds
        #[arg(long, default_value_t = 16)]
        interval_ms: u64,

        /// Smoothing factor, `0 < alpha <= 1`
        #[arg(long)]
        alpha: Option<f32>,
    },
}
