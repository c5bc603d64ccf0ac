// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Snapshot Filesystem
//!
//! A read-only view of the global `results/` directory truncated at a fixed
//! filename cutoff, so that a snapshot load started at time T never
//! observes a batch file finalized after T -- even if the underlying
//! filesystem keeps growing concurrently.
//!
//! Because filenames are big-endian hex and therefore byte-sortable by
//! `fileSeq` (see `value_objects::filename`), the cutoff only needs to
//! compare against the encoded `fileSeq` prefix of each name -- a
//! `partition_point` binary search over the already-sorted listing.

use std::sync::Arc;

use async_trait::async_trait;
use price_history_domain::error::PriceHistoryError;
use price_history_domain::repositories::filesystem::ReadFs;

/// Wraps an inner [`ReadFs`] and hides every entry whose name sorts at or
/// after `cutoff_exclusive` when listing. `open` is unrestricted: callers
/// that already hold a name (e.g. from a prior bounded listing) may read it
/// regardless of the cutoff.
pub struct SnapshotFs {
    inner: Arc<dyn ReadFs>,
    cutoff_exclusive: String,
}

impl SnapshotFs {
    pub fn new(inner: Arc<dyn ReadFs>, cutoff_exclusive: String) -> Self {
        SnapshotFs { inner, cutoff_exclusive }
    }
}

#[async_trait]
impl ReadFs for SnapshotFs {
    async fn open(&self, path: &str) -> Result<Vec<u8>, PriceHistoryError> {
        self.inner.open(path).await
    }

    async fn list_sorted(&self, dir: &str) -> Result<Vec<String>, PriceHistoryError> {
        let names = self.inner.list_sorted(dir).await?;
        let bound = names.partition_point(|name| name.as_str() < self.cutoff_exclusive.as_str());
        Ok(names[..bound].to_vec())
    }

    fn sub_view(&self, dir: &str) -> Arc<dyn ReadFs> {
        Arc::new(SnapshotFs {
            inner: self.inner.sub_view(dir),
            cutoff_exclusive: self.cutoff_exclusive.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::infrastructure::filesystem::MemFilesystem;
    use price_history_domain::repositories::filesystem::WriteFs;

    #[tokio::test]
    async fn excludes_names_at_or_after_cutoff() {
        let fs = MemFilesystem::new();
        fs.create_exclusive("results/a.json").await.unwrap();
        fs.create_exclusive("results/b.json").await.unwrap();
        fs.create_exclusive("results/c.json").await.unwrap();

        let snapshot = SnapshotFs::new(Arc::new(fs) as Arc<dyn ReadFs>, "b.json".to_string());
        let names = snapshot.list_sorted("results").await.unwrap();
        assert_eq!(names, vec!["a.json".to_string()]);
    }

    #[tokio::test]
    async fn cutoff_past_every_name_includes_everything() {
        let fs = MemFilesystem::new();
        fs.create_exclusive("results/a.json").await.unwrap();

        let snapshot = SnapshotFs::new(Arc::new(fs) as Arc<dyn ReadFs>, "zzzz".to_string());
        let names = snapshot.list_sorted("results").await.unwrap();
        assert_eq!(names, vec!["a.json".to_string()]);
    }

    #[tokio::test]
    async fn open_is_unrestricted_by_cutoff() {
        let fs = MemFilesystem::new();
        let mut handle = fs.create_exclusive("results/a.json").await.unwrap();
        use price_history_domain::repositories::filesystem::AppendHandle;
        handle.write(b"data").await.unwrap();

        let snapshot = SnapshotFs::new(Arc::new(fs) as Arc<dyn ReadFs>, "".to_string());
        assert_eq!(snapshot.open("results/a.json").await.unwrap(), b"data");
    }
}
