// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

// Production code safety enforced via CI and `make lint-strict`
// (lib/bins checked separately from tests - tests may use unwrap/expect)

//! # Bootstrap Module
//!
//! The bootstrap module sits **outside** the domain/application/
//! infrastructure/presentation layers in [`price_history`] and provides the
//! ambient machinery every one of those layers depends on but none of them
//! should own:
//!
//! - **CLI** - argument parsing and validation (`serve` / `check`)
//! - **Configuration** - layered file/env configuration loading
//! - **Signal handling** - graceful shutdown (SIGTERM, SIGINT, SIGHUP)
//! - **Shutdown coordination** - cancellation tokens and grace periods
//! - **Exit codes** - Unix `sysexits.h`-style process exit mapping
//! - **Bootstrap logging** - a minimal logging trait for the startup phase,
//!   before the application's own `tracing` subscriber is installed
//!
//! ## Architecture Position
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │          BOOTSTRAP (this crate)              │
//! │  - CLI parsing & validation                  │
//! │  - Configuration loading                     │
//! │  - Signal handling & shutdown coordination   │
//! └─────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────┐
//! │      price_history (application layer)       │
//! │  - engine (linearizer, batch writer, ...)    │
//! │  - presentation (HTTP)                       │
//! └─────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────┐
//! │         price_history_domain                 │
//! │  - Entities, value objects, repository traits│
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Bootstrap can see every layer; no enterprise layer depends back on it.
//!
//! ## Usage
//!
//! ```no_run
//! use price_history_bootstrap::{bootstrap_cli, exit_code::result_to_exit_code};
//!
//! #[tokio::main]
//! async fn main() -> std::process::ExitCode {
//!     let validated_cli = match bootstrap_cli() {
//!         Ok(cli) => cli,
//!         Err(e) => {
//!             eprintln!("CLI Error: {}", e);
//!             return std::process::ExitCode::from(65); // EX_DATAERR
//!         }
//!     };
//!
//!     let result = run_application(validated_cli).await;
//!     result_to_exit_code(result)
//! }
//!
//! async fn run_application(_cli: price_history_bootstrap::ValidatedCli) -> Result<(), std::io::Error> {
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod exit_code;
pub mod logger;
pub mod shutdown;
pub mod signals;

pub use cli::{ValidatedCli, ValidatedCommand};
pub use config::PriceHistoryConfig;
pub use exit_code::ExitCode;

/// Parses and validates `std::env::args()`, the main entry point for the
/// bootstrap layer.
///
/// The caller is responsible for running the application with the returned
/// [`ValidatedCli`] and mapping the outcome to a process exit code with
/// [`exit_code::result_to_exit_code`].
///
/// # Errors
///
/// Returns [`cli::CliError`] if parsing or validation fails. `clap` handles
/// `--help`/`--version` itself and exits the process before returning here.
pub fn bootstrap_cli() -> Result<ValidatedCli, cli::CliError> {
    cli::parse_and_validate()
}
