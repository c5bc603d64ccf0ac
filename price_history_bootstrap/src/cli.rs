// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface
//!
//! Two-stage parse-then-validate CLI, mirroring the rest of this crate's
//! bootstrap pattern: [`clap`] produces a raw [`Cli`], which [`validate_cli`]
//! turns into a [`ValidatedCli`] the application layer can trust without
//! re-checking argument shapes.
//!
//! `serve` starts the HTTP server; `check` walks the on-disk store and
//! reports filename-decoding and hard-link-parity problems without starting
//! a server.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use thiserror::Error;

/// Price history service command-line interface.
#[derive(Debug, Parser)]
#[command(name = "price-history", version, about = "A durable, append-only log of per-product price updates")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to an optional TOML configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity. Repeatable (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Starts the HTTP server.
    Serve {
        /// Directory holding `results/` and `results_by_product/`.
        #[arg(long)]
        data_root: Option<PathBuf>,

        /// Address to bind the HTTP listener to.
        #[arg(long)]
        host: Option<String>,

        /// Port to bind the HTTP listener to.
        #[arg(long)]
        port: Option<u16>,
    },

    /// Validates the on-disk store without starting a server: decodes every
    /// filename and checks that each finalized batch's hard-link count in
    /// `results_by_product/` matches its `nProductIds` field.
    Check {
        /// Directory holding `results/` and `results_by_product/`.
        #[arg(long)]
        data_root: Option<PathBuf>,
    },
}

/// Parse errors surfaced before any validation runs.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to parse command line arguments: {0}")]
    Clap(#[from] clap::Error),
}

/// Validation errors: the arguments parsed, but their values don't make
/// sense together (e.g. a data root that doesn't exist).
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("data root `{0}` does not exist")]
    DataRootMissing(PathBuf),

    #[error("data root `{0}` is not a directory")]
    DataRootNotADirectory(PathBuf),
}

/// A validated, application-ready representation of the parsed CLI.
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub config_path: Option<PathBuf>,
    pub verbose: u8,
}

#[derive(Debug, Clone)]
pub enum ValidatedCommand {
    Serve {
        data_root: Option<PathBuf>,
        host: Option<String>,
        port: Option<u16>,
    },
    Check {
        data_root: Option<PathBuf>,
    },
}

/// Parses `std::env::args()` into a raw [`Cli`].
pub fn parse_cli() -> Result<Cli, ParseError> {
    Cli::try_parse().map_err(ParseError::from)
}

/// Validates a parsed [`Cli`], returning a [`ValidatedCli`] ready for the
/// application layer.
///
/// For `check`, the data root (if given) must already exist as a
/// directory -- there is nothing to check otherwise. `serve` is permitted a
/// data root that doesn't exist yet; the service creates it on first write.
pub fn validate_cli(cli: Cli) -> Result<ValidatedCli, ValidationError> {
    let command = match cli.command {
        Commands::Serve { data_root, host, port } => ValidatedCommand::Serve { data_root, host, port },
        Commands::Check { data_root } => {
            if let Some(path) = &data_root {
                validate_existing_directory(path)?;
            }
            ValidatedCommand::Check { data_root }
        }
    };

    Ok(ValidatedCli {
        command,
        config_path: cli.config,
        verbose: cli.verbose,
    })
}

/// Parses and validates the CLI in one step; the composition used by `main`.
pub fn parse_and_validate() -> Result<ValidatedCli, CliError> {
    let cli = parse_cli()?;
    let validated = validate_cli(cli)?;
    Ok(validated)
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

fn validate_existing_directory(path: &Path) -> Result<(), ValidationError> {
    if !path.exists() {
        return Err(ValidationError::DataRootMissing(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(ValidationError::DataRootNotADirectory(path.to_path_buf()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_serve_with_overrides() {
        let cli = Cli::try_parse_from([
            "price-history",
            "serve",
            "--host",
            "127.0.0.1",
            "--port",
            "9090",
        ])
        .unwrap();

        let validated = validate_cli(cli).unwrap();
        match validated.command {
            ValidatedCommand::Serve { host, port, data_root } => {
                assert_eq!(host.as_deref(), Some("127.0.0.1"));
                assert_eq!(port, Some(9090));
                assert!(data_root.is_none());
            }
            _ => panic!("expected Serve"),
        }
    }

    #[test]
    fn parses_check_without_data_root() {
        let cli = Cli::try_parse_from(["price-history", "check"]).unwrap();
        let validated = validate_cli(cli).unwrap();
        assert!(matches!(validated.command, ValidatedCommand::Check { data_root: None }));
    }

    #[test]
    fn check_rejects_missing_data_root() {
        let cli = Cli::try_parse_from(["price-history", "check", "--data-root", "/does/not/exist/anywhere"]).unwrap();
        let result = validate_cli(cli);
        assert!(matches!(result, Err(ValidationError::DataRootMissing(_))));
    }

    #[test]
    fn check_accepts_existing_data_root() {
        let dir = std::env::temp_dir().join(format!("price-history-cli-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let cli = Cli::try_parse_from(["price-history", "check", "--data-root", dir.to_str().unwrap()]).unwrap();
        let validated = validate_cli(cli).unwrap();
        assert!(matches!(validated.command, ValidatedCommand::Check { .. }));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn global_flags_are_threaded_through() {
        let cli = Cli::try_parse_from(["price-history", "-vv", "--config", "custom.toml", "check"]).unwrap();
        let validated = validate_cli(cli).unwrap();
        assert_eq!(validated.verbose, 2);
        assert_eq!(validated.config_path, Some(PathBuf::from("custom.toml")));
    }

    #[test]
    fn rejects_unknown_subcommand() {
        let result = Cli::try_parse_from(["price-history", "bogus"]);
        assert!(result.is_err());
    }
}
