// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Operating System Signal Handling
//!
//! Waits for the platform's shutdown signals (SIGTERM/SIGINT on Unix,
//! Ctrl-C on Windows) and invokes a callback so [`crate::shutdown`] can
//! begin a graceful drain.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use price_history_bootstrap::signals::{create_signal_handler, SystemSignals};
//!
//! # async fn example() {
//! let handler = create_signal_handler();
//! handler
//!     .wait_for_signal(Box::new(|| {
//!         println!("shutdown signal received");
//!     }))
//!     .await;
//! # }
//! ```

use std::future::Future;
use std::pin::Pin;

/// Callback invoked once a shutdown signal is observed.
pub type ShutdownCallback = Box<dyn FnOnce() + Send>;

/// Waits for the operating system's shutdown signal(s).
pub trait SystemSignals: Send + Sync {
    /// Waits for a shutdown signal, then runs `on_shutdown` and returns.
    fn wait_for_signal<'a>(&'a self, on_shutdown: ShutdownCallback) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

/// Unix signal handler: SIGTERM, SIGINT, and SIGHUP all trigger shutdown.
#[cfg(unix)]
pub struct UnixSignalHandler;

#[cfg(unix)]
impl UnixSignalHandler {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(unix)]
impl Default for UnixSignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
impl SystemSignals for UnixSignalHandler {
    fn wait_for_signal<'a>(&'a self, on_shutdown: ShutdownCallback) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            use tokio::signal::unix::{signal, SignalKind};

            let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");
            let mut sigint = signal(SignalKind::interrupt()).expect("failed to register SIGINT handler");
            let mut sighup = signal(SignalKind::hangup()).expect("failed to register SIGHUP handler");

            tokio::select! {
                _ = sigterm.recv() => tracing::info!(target: "bootstrap", "received SIGTERM"),
                _ = sigint.recv() => tracing::info!(target: "bootstrap", "received SIGINT"),
                _ = sighup.recv() => tracing::info!(target: "bootstrap", "received SIGHUP"),
            }

            on_shutdown();
        })
    }
}

/// Windows signal handler: Ctrl-C triggers shutdown.
#[cfg(windows)]
pub struct WindowsSignalHandler;

#[cfg(windows)]
impl WindowsSignalHandler {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(windows)]
impl Default for WindowsSignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(windows)]
impl SystemSignals for WindowsSignalHandler {
    fn wait_for_signal<'a>(&'a self, on_shutdown: ShutdownCallback) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!(target: "bootstrap", "received Ctrl-C");
            on_shutdown();
        })
    }
}

/// No-op handler that never fires. Used in tests that drive shutdown
/// through [`crate::shutdown::CancellationToken`] directly.
pub struct NoOpSignalHandler;

impl NoOpSignalHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoOpSignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemSignals for NoOpSignalHandler {
    fn wait_for_signal<'a>(&'a self, _on_shutdown: ShutdownCallback) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(std::future::pending())
    }
}

/// Creates the appropriate signal handler for the current platform.
#[cfg(unix)]
pub fn create_signal_handler() -> Box<dyn SystemSignals> {
    Box::new(UnixSignalHandler::new())
}

#[cfg(windows)]
pub fn create_signal_handler() -> Box<dyn SystemSignals> {
    Box::new(WindowsSignalHandler::new())
}

#[cfg(not(any(unix, windows)))]
pub fn create_signal_handler() -> Box<dyn SystemSignals> {
    compile_error!("price_history_bootstrap::signals requires a unix or windows target");
}
