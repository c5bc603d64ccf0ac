// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Filesystem Abstraction
//!
//! The uniform create/open/link/rename/list contract that lets the batch
//! writer and price loader run unmodified over real disk (`price-history`'s
//! `OsFilesystem`) or a deterministic in-memory backend (`MemFilesystem`).
//!
//! Kept as capability-sized traits rather than one fat interface: the batch
//! writer needs `WriteFs` plus read access for per-product `entrySeq`
//! lookups, the price loader needs only `ReadFs`, and `Filesystem` is their
//! intersection.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PriceHistoryError;

/// Read-only access to a directory tree.
#[async_trait]
pub trait ReadFs: Send + Sync {
    /// Reads a file's full contents. Files in this system are always small
    /// (bounded by `MaxRecordsPerFile`), so there is no streaming contract.
    async fn open(&self, path: &str) -> Result<Vec<u8>, PriceHistoryError>;

    /// Lists the basenames of a directory in lexicographic order,
    /// excluding subdirectories. A missing directory is not an error -- it
    /// yields an empty list, since "no directory yet" and "no records yet"
    /// are the same state for a store that creates directories lazily.
    async fn list_sorted(&self, dir: &str) -> Result<Vec<String>, PriceHistoryError>;

    /// Returns a read-only view rooted at `dir` beneath this one.
    fn sub_view(&self, dir: &str) -> Arc<dyn ReadFs>;
}

/// Write access: creating, linking, and renaming files.
#[async_trait]
pub trait WriteFs: Send + Sync {
    /// Creates `path` for appending, failing if it already exists -- guards
    /// against accidental reuse of a `fileSeq`. Creates intermediate
    /// directories as needed.
    async fn create_exclusive(&self, path: &str) -> Result<Box<dyn AppendHandle>, PriceHistoryError>;

    /// Atomically renames a file within the same backend, creating
    /// intermediate directories for `new_path` as needed.
    async fn rename(&self, old_path: &str, new_path: &str) -> Result<(), PriceHistoryError>;

    /// Makes a second directory entry pointing at the same file contents as
    /// `target`; subsequent writes through the original handle remain
    /// visible via `link_path`. Creates intermediate directories as needed.
    async fn link(&self, target: &str, link_path: &str) -> Result<(), PriceHistoryError>;
}

/// An open file being appended to.
#[async_trait]
pub trait AppendHandle: Send + Sync {
    async fn write(&mut self, data: &[u8]) -> Result<(), PriceHistoryError>;
    async fn sync(&mut self) -> Result<(), PriceHistoryError>;
    async fn close(&mut self) -> Result<(), PriceHistoryError>;
}

/// The combined capability the batch writer is constructed with.
pub trait Filesystem: ReadFs + WriteFs {}
impl<T: ReadFs + WriteFs + ?Sized> Filesystem for T {}
