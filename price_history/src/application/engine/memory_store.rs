// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Concurrent Memory Store
//!
//! A lock-free-reading `productId -> entry` cache shadowing disk, backed by
//! `dashmap` rather than a `Mutex<HashMap<_, _>>` so concurrent reads never
//! block each other.
//!
//! The linearizer is the sole writer except for [`MemoryStore::set_if_missing`]
//! during a snapshot-load completion, which it also issues -- no other task
//! ever mutates this store.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use price_history_domain::entities::entry::Entry;
use price_history_domain::error::PriceHistoryError;
use price_history_domain::repositories::price::{PriceReader, PriceSetter, PriceSetterAtomic};
use price_history_domain::value_objects::product_id::ProductId;

/// No eviction: values are small (a decimal string and a timestamp) and the
/// product space a single deployment sees in practice is bounded.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: DashMap<ProductId, Entry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Non-blocking read, used directly by the linearizer loop (which must
    /// never await on its own memory store).
    pub fn get(&self, product_id: &ProductId) -> Option<Entry> {
        self.inner.get(product_id).map(|r| r.value().clone())
    }

    pub fn put(&self, product_id: &ProductId, entry: Entry) {
        self.inner.insert(product_id.clone(), entry);
    }

    pub fn put_if_missing(&self, product_id: &ProductId, entry: Entry) {
        self.inner.entry(product_id.clone()).or_insert(entry);
    }
}

#[async_trait]
impl PriceReader for MemoryStore {
    async fn last_price(&self, product_id: &ProductId) -> Result<Option<Entry>, PriceHistoryError> {
        Ok(self.get(product_id))
    }
}

impl PriceSetter for MemoryStore {
    fn set_price(&self, product_id: &ProductId, entry: Entry) {
        self.put(product_id, entry)
    }
}

impl PriceSetterAtomic for MemoryStore {
    fn set_price_if_missing(&self, product_id: &ProductId, entry: Entry) {
        self.put_if_missing(product_id, entry)
    }
}

/// Convenience alias used by the engine wiring; the memory store is always
/// shared behind an `Arc` once the linearizer and HTTP adapter both hold it.
pub type SharedMemoryStore = Arc<MemoryStore>;
