//! vrwheelctl - VR wheel control CLI
//!
//! Checks configuration files, drives the frame loop through a scripted
//! session and decodes force-feedback reports captured from a game.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod commands;
mod completion;
mod error;
mod output;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{ConfigCommands, FfbCommands, SimulateArgs};
use crate::error::CliError;

#[derive(Parser)]
#[command(name = "vrwheelctl")]
#[command(about = "VR wheel control CLI - check configs, simulate the loop, decode FFB reports")]
#[command(version)]
#[command(long_about = "
vrwheelctl works on the same configuration file and engine the overlay uses.
It never talks to a headset: simulations run against scripted controller
poses and log what the virtual joystick would have received.

Use --json for machine-readable output.
")]
struct Cli {
    /// Output in JSON format for machine parsing
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration file commands
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Run the frame loop through a scripted grab, turn and shift
    Simulate(SimulateArgs),

    /// Force-feedback report commands
    #[command(subcommand)]
    Ffb(FfbCommands),

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "vrwheelctl={log_level},vrwheel_engine={log_level},\
                     vrwheel_ffb={log_level},vrwheel_shifter={log_level}"
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match execute_command(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                output::print_error_json(&e);
            } else {
                output::print_error_human(&e);
            }
            ExitCode::from(exit_code(&e))
        }
    }
}

fn execute_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Config(cmd) => commands::config::execute(cmd, cli.json),
        Commands::Simulate(args) => commands::simulate::execute(args, cli.json),
        Commands::Ffb(cmd) => commands::ffb::execute(cmd, cli.json),
        Commands::Completion { shell } => {
            completion::generate_completion(*shell);
            Ok(())
        }
    }
}

fn exit_code(error: &anyhow::Error) -> u8 {
    match error.downcast_ref::<CliError>() {
        Some(CliError::InvalidConfiguration(_)) => 4,
        Some(CliError::InvalidReport { .. } | CliError::InvalidHex { .. }) => 5,
        Some(CliError::AlreadyExists(_)) => 6,
        Some(CliError::Engine(_)) => 7,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn parse_config_check() -> TestResult {
        let cli = Cli::try_parse_from(["vrwheelctl", "config", "check", "wheel.json"])?;
        assert!(!cli.json);
        assert!(matches!(
            cli.command,
            Commands::Config(ConfigCommands::Check { ref path }) if path.as_os_str() == "wheel.json"
        ));
        Ok(())
    }

    #[test]
    fn parse_global_flags_after_subcommand() -> TestResult {
        let cli = Cli::try_parse_from(["vrwheelctl", "simulate", "--json", "-vv"])?;
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Simulate(_)));
        Ok(())
    }

    #[test]
    fn parse_ffb_decode_takes_many_reports() -> TestResult {
        let cli = Cli::try_parse_from(["vrwheelctl", "ffb", "decode", "0d80", "0c01"])?;
        match cli.command {
            Commands::Ffb(FfbCommands::Decode { reports }) => assert_eq!(reports.len(), 2),
            _ => return Err("expected ffb decode".into()),
        }
        Ok(())
    }

    #[test]
    fn parse_rejects_missing_subcommand() {
        assert!(Cli::try_parse_from(["vrwheelctl"]).is_err());
    }

    #[test]
    fn exit_codes_follow_error_kind() {
        let err = anyhow::Error::new(CliError::InvalidConfiguration("bad".into()));
        assert_eq!(exit_code(&err), 4);
        let err = anyhow::Error::new(CliError::AlreadyExists("x".into()));
        assert_eq!(exit_code(&err), 6);
        assert_eq!(exit_code(&anyhow::anyhow!("other")), 1);
    }
}
