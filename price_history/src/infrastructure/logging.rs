// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Logging Setup
//!
//! Installs a [`tracing_subscriber`] formatter driven by `RUST_LOG` (falling
//! back to a verbosity derived from the CLI's repeated `-v` flag). Called
//! exactly once at process start, before any engine or HTTP code runs.

use tracing_subscriber::EnvFilter;

/// Initializes the global `tracing` subscriber.
///
/// `verbosity` is the count of `-v` flags from the CLI; it sets the default
/// level when `RUST_LOG` is not set. `RUST_LOG`, if present, always wins.
pub fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .ok();
}
