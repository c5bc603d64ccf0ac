// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Disk-Backed Filesystem
//!
//! The real-disk [`ReadFs`]/[`WriteFs`] implementation used in production.
//! A rooted view is just a directory path; `sub_view` returns the same
//! type rooted one level deeper, creating parent directories lazily on
//! every write rather than up front.

use std::path::PathBuf;

use async_trait::async_trait;
use price_history_domain::error::PriceHistoryError;
use price_history_domain::repositories::filesystem::{AppendHandle, ReadFs, WriteFs};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// A filesystem view rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct OsFilesystem {
    root: PathBuf,
}

impl OsFilesystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        OsFilesystem { root: root.into() }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl ReadFs for OsFilesystem {
    async fn open(&self, path: &str) -> Result<Vec<u8>, PriceHistoryError> {
        fs::read(self.full_path(path)).await.map_err(PriceHistoryError::from)
    }

    async fn list_sorted(&self, dir: &str) -> Result<Vec<String>, PriceHistoryError> {
        let full_dir = self.full_path(dir);

        let mut read_dir = match fs::read_dir(&full_dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PriceHistoryError::from(e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = read_dir.next_entry().await.map_err(PriceHistoryError::from)? {
            let file_type = entry.file_type().await.map_err(PriceHistoryError::from)?;
            if file_type.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn sub_view(&self, dir: &str) -> std::sync::Arc<dyn ReadFs> {
        std::sync::Arc::new(OsFilesystem::new(self.full_path(dir)))
    }
}

#[async_trait]
impl WriteFs for OsFilesystem {
    async fn create_exclusive(&self, path: &str) -> Result<Box<dyn AppendHandle>, PriceHistoryError> {
        let full = self.full_path(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).await.map_err(PriceHistoryError::from)?;
        }
        let file = fs::OpenOptions::new()
            .append(true)
            .create_new(true)
            .open(&full)
            .await
            .map_err(PriceHistoryError::from)?;
        Ok(Box::new(OsAppendHandle { file }))
    }

    async fn rename(&self, old_path: &str, new_path: &str) -> Result<(), PriceHistoryError> {
        let old_full = self.full_path(old_path);
        let new_full = self.full_path(new_path);
        if let Some(parent) = new_full.parent() {
            fs::create_dir_all(parent).await.map_err(PriceHistoryError::from)?;
        }
        fs::rename(old_full, new_full).await.map_err(PriceHistoryError::from)
    }

    async fn link(&self, target: &str, link_path: &str) -> Result<(), PriceHistoryError> {
        let target_full = self.full_path(target);
        let link_full = self.full_path(link_path);
        if let Some(parent) = link_full.parent() {
            fs::create_dir_all(parent).await.map_err(PriceHistoryError::from)?;
        }
        fs::hard_link(target_full, link_full).await.map_err(PriceHistoryError::from)
    }
}

struct OsAppendHandle {
    file: fs::File,
}

#[async_trait]
impl AppendHandle for OsAppendHandle {
    async fn write(&mut self, data: &[u8]) -> Result<(), PriceHistoryError> {
        self.file.write_all(data).await.map_err(PriceHistoryError::from)
    }

    async fn sync(&mut self) -> Result<(), PriceHistoryError> {
        self.file.sync_all().await.map_err(PriceHistoryError::from)
    }

    async fn close(&mut self) -> Result<(), PriceHistoryError> {
        self.file.flush().await.map_err(PriceHistoryError::from)
    }
}
