// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Background Failure Counter
//!
//! Errors raised inside the linearizer's spawned snapshot-load completions or
//! the flush loop's batch finalization have no request to report back to --
//! the writer that triggered them has long since received its (unrelated)
//! acceptance. These are counted and logged here as a lightweight shared
//! counter rather than routed through a full supervisor mailbox, since no
//! retry/escalation policy is needed beyond counting and logging.

use std::sync::atomic::{AtomicU64, Ordering};

/// The kinds of background failure this service counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    /// A snapshot-load triggered by a read-miss or write-miss failed.
    SnapshotLoad,
    /// The batch writer failed to append, rename, finalize, or hard-link.
    BatchWrite,
}

/// Process-wide counters for background task failures, logged via `tracing`
/// at the point of increment and exposed here for callers (e.g. a future
/// metrics exporter) that want the running totals.
#[derive(Debug, Default)]
pub struct FailureCounter {
    snapshot_load: AtomicU64,
    batch_write: AtomicU64,
}

impl FailureCounter {
    pub fn new() -> Self {
        FailureCounter::default()
    }

    /// Increments the counter for `category` and emits a `tracing::error!`
    /// with `reason` as context. Callers should call this exactly once per
    /// observed background failure.
    pub fn record(&self, category: FailureCategory, reason: &str) {
        match category {
            FailureCategory::SnapshotLoad => {
                self.snapshot_load.fetch_add(1, Ordering::Relaxed);
                tracing::error!(reason, "snapshot load failed in the background");
            }
            FailureCategory::BatchWrite => {
                self.batch_write.fetch_add(1, Ordering::Relaxed);
                tracing::error!(reason, "batch write failed in the background");
            }
        }
    }

    pub fn snapshot_load_failures(&self) -> u64 {
        self.snapshot_load.load(Ordering::Relaxed)
    }

    pub fn batch_write_failures(&self) -> u64 {
        self.batch_write.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_are_independent_per_category() {
        let counter = FailureCounter::new();
        counter.record(FailureCategory::SnapshotLoad, "disk error");
        counter.record(FailureCategory::SnapshotLoad, "disk error");
        counter.record(FailureCategory::BatchWrite, "rename failed");

        assert_eq!(counter.snapshot_load_failures(), 2);
        assert_eq!(counter.batch_write_failures(), 1);
    }
}
