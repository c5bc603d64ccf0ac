// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Price Loader
//!
//! Read-side algorithms over the on-disk, dual-indexed log: resolving a
//! product's last known price (`lastPrice`) and answering paginated,
//! time-windowed historical queries (`priceLog`). Both read through a
//! [`ReadFs`] that may be either the live filesystem or a
//! [`super::snapshot::SnapshotFs`]-bounded view, so the same code serves
//! both the linearizer's prevPrice lookups and the HTTP adapter's reads.
//!
//! `priceLog` locates the file that could hold the first record at or after
//! `from` by binary search over filename-encoded start times, then scans
//! files oldest-to-newest from there, filtering to the requested product
//! (since a per-product hard-linked file still contains every other
//! product's records that landed in the same batch), skipping `offset`
//! records forward from `from` before collecting up to `limit` records
//! moving toward `to`.

use std::sync::Arc;

use async_trait::async_trait;
use price_history_domain::entities::entry::Entry;
use price_history_domain::entities::logged_price::{LoggedPrice, PriceLogQuery};
use price_history_domain::entities::record::Record;
use price_history_domain::error::PriceHistoryError;
use price_history_domain::repositories::filesystem::ReadFs;
use price_history_domain::repositories::price::{PriceLogRetriever, PriceReader};
use price_history_domain::value_objects::filename::Filename;
use price_history_domain::value_objects::product_id::{hash_product_id, ProductId};

use super::layout::{product_dir, product_file_path, result_file_path, RESULTS_DIR};

pub struct PriceLoader {
    fs: Arc<dyn ReadFs>,
}

impl PriceLoader {
    pub fn new(fs: Arc<dyn ReadFs>) -> Self {
        PriceLoader { fs }
    }

    async fn read_records(&self, path: &str) -> Result<Vec<Record>, PriceHistoryError> {
        let bytes = self.fs.open(path).await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| PriceHistoryError::invariant(format!("batch file {path} is not a valid record array: {e}")))
    }

    /// Phase 1: binary search the sorted, decoded filenames for the
    /// greatest-lower-bound file on `start <= from` -- every file before it
    /// starts strictly after `from` and cannot hold the first matching
    /// record. `from == None` means "from the beginning of the log".
    fn lower_bound_index(decoded: &[Filename], from: Option<chrono::DateTime<chrono::Utc>>) -> usize {
        match from {
            Some(from) => decoded.partition_point(|f| f.start <= from).saturating_sub(1),
            None => 0,
        }
    }

    async fn decode_all(names: &[String]) -> Result<Vec<Filename>, PriceHistoryError> {
        names.iter().map(|n| Filename::decode(n)).collect()
    }
}

#[async_trait]
impl PriceReader for PriceLoader {
    async fn last_price(&self, product_id: &ProductId) -> Result<Option<Entry>, PriceHistoryError> {
        let hash = hash_product_id(product_id.as_str());
        let names = self.fs.list_sorted(&product_dir(&hash)).await?;

        for name in names.iter().rev() {
            let records = self.read_records(&product_file_path(product_id, name)).await?;
            if let Some(record) = records.iter().rev().find(|r| &r.product_id == product_id) {
                return Ok(Some(record.entry()));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl PriceLogRetriever for PriceLoader {
    async fn price_log(&self, query: PriceLogQuery) -> Result<Vec<LoggedPrice>, PriceHistoryError> {
        let dir = match &query.product_id {
            Some(product_id) => product_dir(&hash_product_id(product_id.as_str())),
            None => RESULTS_DIR.to_string(),
        };
        let names = self.fs.list_sorted(&dir).await?;
        if names.is_empty() {
            return Ok(Vec::new());
        }

        // Phase 1 & 2: locate the first file that could hold a record at or
        // after `from`.
        let decoded = Self::decode_all(&names).await?;
        let start_idx = Self::lower_bound_index(&decoded, query.from);

        let mut results = Vec::with_capacity(query.limit);
        let mut remaining_offset = query.offset.max(0);

        // Phase 3 & 4: walk candidate files oldest to newest, stopping as
        // soon as a file starts after `to` -- nothing in it or later can be
        // in range.
        'files: for idx in start_idx..names.len() {
            if decoded[idx].start > query.to {
                break;
            }
            let name = &names[idx];
            let path = match &query.product_id {
                Some(product_id) => product_file_path(product_id, name),
                None => result_file_path(name),
            };
            let records = self.read_records(&path).await?;

            // Within a file, filter to the requested product and window,
            // skip `offset` records forward from `from`, then collect up to
            // `limit` records moving toward `to` -- a file's record order on
            // disk is already chronological.
            for record in records.iter() {
                if let Some(product_id) = &query.product_id {
                    if &record.product_id != product_id {
                        continue;
                    }
                }
                if let Some(from) = query.from {
                    if record.timestamp < from {
                        continue;
                    }
                }
                if record.timestamp > query.to {
                    break 'files;
                }

                if remaining_offset > 0 {
                    remaining_offset -= 1;
                    continue;
                }

                results.push(LoggedPrice {
                    product_id: record.product_id.clone(),
                    price: record.price.clone(),
                    timestamp: record.timestamp,
                });
                if results.len() >= query.limit {
                    break 'files;
                }
            }
        }

        Ok(results)
    }
}
