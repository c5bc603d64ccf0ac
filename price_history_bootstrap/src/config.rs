// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Application Configuration
//!
//! Layered configuration for the price history service, built on the
//! [`config`] crate: compiled-in defaults, then an optional TOML file, then
//! environment variables prefixed `PRICE_HISTORY_` (double underscore as the
//! nesting separator, e.g. `PRICE_HISTORY_HTTP__PORT=9090`). Each layer
//! overrides the one before it.
//!
//! The resulting [`PriceHistoryConfig`] is immutable once built, following
//! the builder pattern used elsewhere in this crate for bootstrap-phase
//! settings.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Fully resolved, validated configuration for a running service instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceHistoryConfig {
    /// Directory on disk under which `results/` and `results_by_product/`
    /// live.
    data_root: PathBuf,

    /// Address the HTTP server binds to (e.g. `0.0.0.0`).
    http_host: String,

    /// Port the HTTP server listens on.
    http_port: u16,

    /// Maximum number of records a single batch file may hold before it is
    /// finalized and hard-linked into the per-product directories.
    max_records_per_file: u32,

    /// Maximum wall-clock age of an open batch before it is force-flushed,
    /// even with no further writes.
    flush_interval: Duration,

    /// Bound on the number of writes that may be in flight (accepted but
    /// not yet durable) before `updatePrice` starts returning a retryable
    /// backpressure error.
    write_queue_length: u32,

    /// Default page size for `GET /api/query` when the caller does not
    /// specify one.
    default_page_size: u32,

    /// Maximum number of concurrent in-flight GET requests admitted to the
    /// read endpoints before later arrivals queue behind the concurrency
    /// limiter.
    read_concurrency_limit: u32,
}

impl PriceHistoryConfig {
    pub fn data_root(&self) -> &std::path::Path {
        &self.data_root
    }

    pub fn http_host(&self) -> &str {
        &self.http_host
    }

    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    pub fn max_records_per_file(&self) -> u32 {
        self.max_records_per_file
    }

    pub fn flush_interval(&self) -> Duration {
        self.flush_interval
    }

    pub fn write_queue_length(&self) -> u32 {
        self.write_queue_length
    }

    pub fn default_page_size(&self) -> u32 {
        self.default_page_size
    }

    pub fn read_concurrency_limit(&self) -> u32 {
        self.read_concurrency_limit
    }

    /// Loads configuration from compiled-in defaults, an optional TOML file
    /// at `config_path`, and `PRICE_HISTORY_`-prefixed environment
    /// variables, in that order of increasing precedence.
    pub fn load(config_path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let defaults = RawConfig::default();

        let mut builder = config::Config::builder()
            .set_default("data_root", defaults.data_root)?
            .set_default("http.host", defaults.http.host)?
            .set_default("http.port", defaults.http.port as i64)?
            .set_default("max_records_per_file", defaults.max_records_per_file as i64)?
            .set_default("flush_interval_secs", defaults.flush_interval_secs as i64)?
            .set_default("write_queue_length", defaults.write_queue_length as i64)?
            .set_default("default_page_size", defaults.default_page_size as i64)?
            .set_default("read_concurrency_limit", defaults.read_concurrency_limit as i64)?;

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("PRICE_HISTORY")
                .separator("__")
                .try_parsing(true),
        );

        let raw: RawConfig = builder.build()?.try_deserialize()?;
        raw.into_validated()
    }

    /// Builds a config directly from already-known values, bypassing the
    /// layered loader. Used by the `check` CLI subcommand and by tests.
    pub fn builder() -> PriceHistoryConfigBuilder {
        PriceHistoryConfigBuilder::new()
    }
}

impl Default for PriceHistoryConfig {
    fn default() -> Self {
        RawConfig::default().into_validated().expect("compiled-in defaults are always valid")
    }
}

/// The raw, pre-validation shape deserialized by the `config` crate. Exists
/// so field names in the TOML/env layer (snake_case, nested `http.*`) don't
/// need to match [`PriceHistoryConfig`]'s flattened accessor names.
#[derive(Debug, Deserialize)]
struct RawConfig {
    data_root: String,
    http: RawHttpConfig,
    max_records_per_file: u32,
    flush_interval_secs: u64,
    write_queue_length: u32,
    default_page_size: u32,
    read_concurrency_limit: u32,
}

#[derive(Debug, Deserialize)]
struct RawHttpConfig {
    host: String,
    port: u16,
}

impl Default for RawConfig {
    fn default() -> Self {
        RawConfig {
            data_root: "./data".to_string(),
            http: RawHttpConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            max_records_per_file: 10,
            flush_interval_secs: 1,
            write_queue_length: 50,
            default_page_size: 25,
            read_concurrency_limit: 50,
        }
    }
}

impl RawConfig {
    fn into_validated(self) -> Result<PriceHistoryConfig, ConfigError> {
        if self.max_records_per_file == 0 {
            return Err(ConfigError::Invalid {
                field: "max_records_per_file",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.write_queue_length == 0 {
            return Err(ConfigError::Invalid {
                field: "write_queue_length",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.default_page_size == 0 {
            return Err(ConfigError::Invalid {
                field: "default_page_size",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(PriceHistoryConfig {
            data_root: PathBuf::from(self.data_root),
            http_host: self.http.host,
            http_port: self.http.port,
            max_records_per_file: self.max_records_per_file,
            flush_interval: Duration::from_secs(self.flush_interval_secs),
            write_queue_length: self.write_queue_length,
            default_page_size: self.default_page_size,
            read_concurrency_limit: self.read_concurrency_limit,
        })
    }
}

/// Immutable builder for constructing a [`PriceHistoryConfig`] without going
/// through the layered file/env loader, e.g. from parsed CLI flags.
#[derive(Debug, Clone)]
pub struct PriceHistoryConfigBuilder {
    raw: RawConfig,
}

impl PriceHistoryConfigBuilder {
    pub fn new() -> Self {
        Self { raw: RawConfig::default() }
    }

    pub fn data_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.raw.data_root = path.into().to_string_lossy().into_owned();
        self
    }

    pub fn http_host(mut self, host: impl Into<String>) -> Self {
        self.raw.http.host = host.into();
        self
    }

    pub fn http_port(mut self, port: u16) -> Self {
        self.raw.http.port = port;
        self
    }

    pub fn max_records_per_file(mut self, n: u32) -> Self {
        self.raw.max_records_per_file = n;
        self
    }

    pub fn flush_interval(mut self, duration: Duration) -> Self {
        self.raw.flush_interval_secs = duration.as_secs();
        self
    }

    pub fn write_queue_length(mut self, n: u32) -> Self {
        self.raw.write_queue_length = n;
        self
    }

    pub fn default_page_size(mut self, n: u32) -> Self {
        self.raw.default_page_size = n;
        self
    }

    pub fn read_concurrency_limit(mut self, n: u32) -> Self {
        self.raw.read_concurrency_limit = n;
        self
    }

    pub fn build(self) -> Result<PriceHistoryConfig, ConfigError> {
        self.raw.into_validated()
    }
}

impl Default for PriceHistoryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
