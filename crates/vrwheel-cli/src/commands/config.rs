//! Configuration file commands

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;
use vrwheel_engine::Config;
use vrwheel_errors::ErrorCategory;

use crate::commands::ConfigCommands;
use crate::error::CliError;
use crate::output;

pub fn execute(cmd: &ConfigCommands, json: bool) -> Result<()> {
    match cmd {
        ConfigCommands::Check { path } => check(path, json),
        ConfigCommands::Init { path, force } => init(path, *force, json),
        ConfigCommands::Show { path } => {
            let config = match path {
                Some(path) => load(path)?,
                None => Config::default(),
            };
            output::print_config(&config, json);
            Ok(())
        }
    }
}

/// Load a config, separating unreadable files from invalid contents.
pub fn load(path: &Path) -> Result<Config> {
    match Config::load(path) {
        Ok(config) => Ok(config),
        Err(e) if e.category() == ErrorCategory::Io => {
            Err(e).with_context(|| format!("Failed to read {}", path.display()))
        }
        Err(e) => Err(CliError::InvalidConfiguration(format!("{}: {e}", path.display())).into()),
    }
}

fn check(path: &Path, json: bool) -> Result<()> {
    let config = load(path)?;
    if !json {
        println!("{} {} is valid", "✓".green(), path.display());
    }
    output::print_config(&config, json);
    Ok(())
}

fn init(path: &Path, force: bool, json: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(CliError::AlreadyExists(path.display().to_string()).into());
    }
    Config::default()
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "Wrote default config");

    if json {
        output::print_success_json("path", &path.display().to_string());
    } else {
        println!("{} Wrote default config to {}", "✓".green(), path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_distinguishes_missing_from_invalid() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;

        let missing = dir.path().join("missing.json");
        let err = load(&missing).err().ok_or("missing file loaded")?;
        assert!(err.downcast_ref::<CliError>().is_none());

        let invalid = dir.path().join("invalid.json");
        std::fs::write(&invalid, r#"{"wheel": {"degrees": -5}}"#)?;
        let err = load(&invalid).err().ok_or("invalid file loaded")?;
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::InvalidConfiguration(_))
        ));
        Ok(())
    }

    #[test]
    fn test_init_refuses_to_overwrite() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("wheel.json");

        init(&path, false, true)?;
        assert_eq!(load(&path)?, Config::default());

        let err = init(&path, false, true).err().ok_or("overwrote without --force")?;
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::AlreadyExists(_))
        ));
        init(&path, true, true)?;
        Ok(())
    }
}
