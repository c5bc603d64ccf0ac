// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # In-Memory Filesystem Backend
//!
//! A deterministic backend for [`ReadFs`]/[`WriteFs`] used by the test suite
//! to exercise the batch writer, price loader, and linearizer without
//! touching disk. One flat map holds every path ever created; a "directory"
//! is just a common path prefix, so `rename`/`link` need no explicit
//! directory-creation step.
//!
//! Each file records its operations (`write`, `sync`, `close`) in order
//! rather than holding a byte buffer directly, and `deep_clone` gives
//! snapshot-consistency tests two independent views of "the same disk" at
//! different points in time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use price_history_domain::error::PriceHistoryError;
use price_history_domain::repositories::filesystem::{AppendHandle, ReadFs, WriteFs};

#[derive(Debug, Clone)]
enum FileOp {
    Write(Vec<u8>),
    Sync,
    Close,
}

#[derive(Debug, Default)]
struct MemFile {
    ops: Vec<FileOp>,
}

impl MemFile {
    fn contents(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for op in &self.ops {
            if let FileOp::Write(data) = op {
                buf.extend_from_slice(data);
            }
        }
        buf
    }
}

type Store = Mutex<HashMap<String, Arc<Mutex<MemFile>>>>;

/// A rooted view over the shared in-memory store. The top-level instance
/// returned by [`MemFilesystem::new`] has an empty prefix; `sub_view`
/// returns a new view sharing the same backing store with a deeper prefix.
#[derive(Clone)]
pub struct MemFilesystem {
    store: Arc<Store>,
    prefix: String,
}

fn join(prefix: &str, rest: &str) -> String {
    if prefix.is_empty() {
        rest.trim_start_matches('/').to_string()
    } else if rest.is_empty() {
        prefix.to_string()
    } else {
        format!("{}/{}", prefix, rest.trim_start_matches('/'))
    }
}

impl MemFilesystem {
    pub fn new() -> Self {
        MemFilesystem {
            store: Arc::new(Mutex::new(HashMap::new())),
            prefix: String::new(),
        }
    }

    /// A deep copy of every file's recorded operations, sharing no state
    /// with the original -- used to pin a filesystem at a checkpoint while
    /// the original continues accepting writes.
    pub fn deep_clone(&self) -> Self {
        let src = self.store.lock().expect("mem fs lock poisoned");
        let mut dst = HashMap::with_capacity(src.len());
        for (path, file) in src.iter() {
            let file = file.lock().expect("mem file lock poisoned");
            dst.insert(path.clone(), Arc::new(Mutex::new(MemFile { ops: file.ops.clone() })));
        }
        MemFilesystem {
            store: Arc::new(Mutex::new(dst)),
            prefix: self.prefix.clone(),
        }
    }
}

impl Default for MemFilesystem {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReadFs for MemFilesystem {
    async fn open(&self, path: &str) -> Result<Vec<u8>, PriceHistoryError> {
        let full = join(&self.prefix, path);
        let store = self.store.lock().expect("mem fs lock poisoned");
        let file = store
            .get(&full)
            .ok_or_else(|| PriceHistoryError::storage_io(format!("no such file: {full}")))?;
        Ok(file.lock().expect("mem file lock poisoned").contents())
    }

    async fn list_sorted(&self, dir: &str) -> Result<Vec<String>, PriceHistoryError> {
        let full_dir = join(&self.prefix, dir);
        let store = self.store.lock().expect("mem fs lock poisoned");

        let prefix = if full_dir.is_empty() {
            String::new()
        } else {
            format!("{full_dir}/")
        };

        let mut names: Vec<String> = store
            .keys()
            .filter_map(|key| {
                let rest = key.strip_prefix(&prefix)?;
                if rest.is_empty() || rest.contains('/') {
                    None
                } else {
                    Some(rest.to_string())
                }
            })
            .collect();
        names.sort();
        Ok(names)
    }

    fn sub_view(&self, dir: &str) -> Arc<dyn ReadFs> {
        Arc::new(MemFilesystem {
            store: self.store.clone(),
            prefix: join(&self.prefix, dir),
        })
    }
}

#[async_trait]
impl WriteFs for MemFilesystem {
    async fn create_exclusive(&self, path: &str) -> Result<Box<dyn AppendHandle>, PriceHistoryError> {
        let full = join(&self.prefix, path);
        let mut store = self.store.lock().expect("mem fs lock poisoned");
        if store.contains_key(&full) {
            return Err(PriceHistoryError::storage_io(format!("already exists: {full}")));
        }
        let file = Arc::new(Mutex::new(MemFile::default()));
        store.insert(full, file.clone());
        Ok(Box::new(MemAppendHandle { file }))
    }

    async fn rename(&self, old_path: &str, new_path: &str) -> Result<(), PriceHistoryError> {
        let old_full = join(&self.prefix, old_path);
        let new_full = join(&self.prefix, new_path);
        let mut store = self.store.lock().expect("mem fs lock poisoned");
        let file = store
            .remove(&old_full)
            .ok_or_else(|| PriceHistoryError::storage_io(format!("no such file: {old_full}")))?;
        store.insert(new_full, file);
        Ok(())
    }

    async fn link(&self, target: &str, link_path: &str) -> Result<(), PriceHistoryError> {
        let target_full = join(&self.prefix, target);
        let link_full = join(&self.prefix, link_path);
        let mut store = self.store.lock().expect("mem fs lock poisoned");
        let file = store
            .get(&target_full)
            .cloned()
            .ok_or_else(|| PriceHistoryError::storage_io(format!("no such file: {target_full}")))?;
        store.insert(link_full, file);
        Ok(())
    }
}

struct MemAppendHandle {
    file: Arc<Mutex<MemFile>>,
}

#[async_trait]
impl AppendHandle for MemAppendHandle {
    async fn write(&mut self, data: &[u8]) -> Result<(), PriceHistoryError> {
        self.file
            .lock()
            .expect("mem file lock poisoned")
            .ops
            .push(FileOp::Write(data.to_vec()));
        Ok(())
    }

    async fn sync(&mut self) -> Result<(), PriceHistoryError> {
        self.file.lock().expect("mem file lock poisoned").ops.push(FileOp::Sync);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), PriceHistoryError> {
        self.file.lock().expect("mem file lock poisoned").ops.push(FileOp::Close);
        Ok(())
    }
}
