// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! A single `thiserror`-derived enum plus an [`ErrorKind`] classification
//! the HTTP adapter can match on directly, rather than sniffing the error
//! for a `Temporary() bool`-style marker.
//!
//! `NotFound` is deliberately absent: a missing product is a logical empty
//! result at the core boundary, never an error (see `PriceHistoryError`'s
//! doc comment below).

use thiserror::Error;

/// Coarse classification used by callers (notably the HTTP adapter) to map
/// an error onto a response without inspecting the error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed filename, malformed record, or invalid API input.
    InputValidation,
    /// The write queue is saturated; retrying later may succeed.
    BackpressureTemporary,
    /// A linearizer/batch-writer invariant was violated (non-monotonic
    /// timestamp, duplicate `fileSeq`, missing file in a sequence).
    InvariantViolation,
    /// A disk operation failed.
    StorageIo,
}

/// Errors surfaced by the price history core.
///
/// Note that "no data for this product" is represented by `Option`/empty
/// results, not by a variant here: a missing product is logical, not an
/// error, at the core boundary.
#[derive(Error, Debug, Clone)]
pub enum PriceHistoryError {
    #[error("invalid input: {0}")]
    InputValidation(String),

    #[error("write capacity exceeded: {0}")]
    BackpressureTemporary(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("storage I/O error: {0}")]
    StorageIo(String),
}

impl PriceHistoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PriceHistoryError::InputValidation(_) => ErrorKind::InputValidation,
            PriceHistoryError::BackpressureTemporary(_) => ErrorKind::BackpressureTemporary,
            PriceHistoryError::InvariantViolation(_) => ErrorKind::InvariantViolation,
            PriceHistoryError::StorageIo(_) => ErrorKind::StorageIo,
        }
    }

    /// Whether retrying the same operation later might succeed.
    pub fn is_temporary(&self) -> bool {
        self.kind() == ErrorKind::BackpressureTemporary
    }

    pub fn storage_io(msg: impl Into<String>) -> Self {
        PriceHistoryError::StorageIo(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        PriceHistoryError::InvariantViolation(msg.into())
    }

    pub fn input_validation(msg: impl Into<String>) -> Self {
        PriceHistoryError::InputValidation(msg.into())
    }

    pub fn backpressure(msg: impl Into<String>) -> Self {
        PriceHistoryError::BackpressureTemporary(msg.into())
    }
}

impl From<std::io::Error> for PriceHistoryError {
    fn from(e: std::io::Error) -> Self {
        PriceHistoryError::StorageIo(e.to_string())
    }
}
