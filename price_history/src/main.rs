// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Process entry point: parses and validates the CLI (bootstrap layer),
//! loads layered configuration, and dispatches to either `serve` (start the
//! HTTP server and run until a shutdown signal) or `check` (validate the
//! on-disk store and exit).

use std::process::ExitCode;
use std::sync::Arc;

use price_history::presentation::http::{self, AppState};
use price_history::Engine;
use price_history_bootstrap::cli::{CliError, ValidatedCommand};
use price_history_bootstrap::config::{ConfigError, PriceHistoryConfig};
use price_history_bootstrap::exit_code::{result_to_exit_code, ExitCode as AppExitCode};
use price_history_bootstrap::logger::{BootstrapLogger, ConsoleLogger};
use price_history_bootstrap::shutdown::ShutdownCoordinator;
use price_history_bootstrap::signals::create_signal_handler;
use price_history_bootstrap::{bootstrap_cli, ValidatedCli};
use thiserror::Error;

#[derive(Debug, Error)]
enum MainError {
    #[error(transparent)]
    Cli(#[from] CliError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("engine startup failed: {0}")]
    Engine(#[from] price_history_domain::error::PriceHistoryError),
    #[error("server failed: {0}")]
    Server(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let bootstrap_logger = ConsoleLogger::new();

    let cli = match bootstrap_cli() {
        Ok(cli) => cli,
        Err(e) => {
            bootstrap_logger.error(&format!("argument error: {e}"));
            return AppExitCode::UsageError.into();
        }
    };

    price_history::infrastructure::logging::init_logging(cli.verbose);

    let result = run(cli).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "price-history exited with an error");
    }
    result_to_exit_code(result)
}

async fn run(cli: ValidatedCli) -> Result<(), MainError> {
    let config = PriceHistoryConfig::load(cli.config_path.as_deref())?;

    match cli.command {
        ValidatedCommand::Serve { data_root, host, port } => serve(config, data_root, host, port).await,
        ValidatedCommand::Check { data_root } => check(config, data_root).await,
    }
}

/// Starts the engine and the HTTP server, running until a shutdown signal
/// (SIGTERM/SIGINT/SIGHUP on Unix, Ctrl-C on Windows) arrives.
async fn serve(
    config: PriceHistoryConfig,
    data_root_override: Option<std::path::PathBuf>,
    host_override: Option<String>,
    port_override: Option<u16>,
) -> Result<(), MainError> {
    let data_root = data_root_override.unwrap_or_else(|| config.data_root().to_path_buf());
    let host = host_override.unwrap_or_else(|| config.http_host().to_string());
    let port = port_override.unwrap_or_else(|| config.http_port());

    tracing::info!(?data_root, %host, port, "starting price-history");

    let engine = Engine::start(
        data_root,
        config.max_records_per_file(),
        config.flush_interval(),
        config.write_queue_length(),
    )
    .await?;

    let state = AppState {
        price_model: engine.price_model(),
        price_log_reader: engine.price_log_reader(),
        default_page_size: config.default_page_size(),
    };
    let app = http::router(state, config.read_concurrency_limit() as usize);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");

    let shutdown = Arc::new(ShutdownCoordinator::default());
    let shutdown_for_signal = shutdown.clone();
    tokio::spawn(async move {
        create_signal_handler()
            .wait_for_signal(Box::new(move || shutdown_for_signal.initiate_shutdown()))
            .await;
    });

    let shutdown_token = shutdown.token();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown_token.cancelled().await })
        .await?;

    engine.shutdown().await;
    Ok(())
}

/// Runs the `check` subcommand: walks the on-disk store and reports
/// filename-decoding and hard-link-parity problems without starting a
/// server.
async fn check(config: PriceHistoryConfig, data_root_override: Option<std::path::PathBuf>) -> Result<(), MainError> {
    let data_root = data_root_override.unwrap_or_else(|| config.data_root().to_path_buf());
    let report = price_history::application::engine::check::run(&data_root).await?;

    println!(
        "checked {} batch file(s) and {} per-product link(s)",
        report.files_checked, report.product_links_checked
    );
    for err in &report.filename_errors {
        println!("filename error: {err}");
    }
    for err in &report.link_parity_errors {
        println!("link parity error: {err}");
    }

    if report.is_healthy() {
        println!("store is healthy");
        Ok(())
    } else {
        Err(MainError::Engine(price_history_domain::error::PriceHistoryError::invariant(
            "store failed integrity check",
        )))
    }
}
