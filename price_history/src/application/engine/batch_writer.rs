// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Batch Writer
//!
//! Owns the single open [`Batch`]: appends incoming records to its global
//! file under `results/`, hard-links each finalized file into every product
//! it touched under `results_by_product/<hash>/`, and rolls the batch over
//! once it reaches `MaxRecordsPerFile` records or `FlushInterval` elapses
//! with no activity.
//!
//! This type is exclusively owned by the flush loop task (see
//! `engine::startup::spawn_flush_loop`) -- no other task ever touches it,
//! which is what lets the force-flush timer post into that task's own
//! mailbox instead of needing a mutex around shared batch state.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use price_history_domain::entities::record::Record;
use price_history_domain::error::PriceHistoryError;
use price_history_domain::repositories::filesystem::{AppendHandle, Filesystem};
use price_history_domain::repositories::price::RecordWriter;
use price_history_domain::value_objects::filename::Filename;
use price_history_domain::value_objects::product_id::{hash_product_id, ProductId};

use super::layout::{product_dir, product_file_path, result_file_path};

/// A product's contribution to the currently open batch: where its first
/// record in this batch landed (for the per-product link's `entrySeq`) and
/// how many of its records the batch holds so far (for the link's
/// `nRecords`) -- distinct from the batch's own global counters.
struct ProductStats {
    first_entry_seq: i64,
    count: i64,
}

/// The batch file currently being appended to.
struct Batch {
    /// Filename fields as last written to disk. `n_records`/`n_product_ids`
    /// here always describe the records actually flushed so far -- the
    /// struct's own counters below may be one ahead, anticipating the next
    /// write.
    current_name: String,
    file_seq: i64,
    /// Ordinal of the first record that will land in this batch, assigned
    /// when the batch was opened.
    first_entry_seq: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    n_records: i64,
    /// Distinct products seen in this batch, in first-seen order.
    product_order: Vec<ProductId>,
    product_stats: HashMap<ProductId, ProductStats>,
    handle: Box<dyn AppendHandle>,
}

/// Persists records into the global, chronologically-ordered log and
/// maintains the per-product hard-linked index.
pub struct BatchWriter<F: Filesystem> {
    fs: Arc<F>,
    max_records_per_file: i64,
    flush_interval: chrono::Duration,
    next_file_seq: i64,
    next_entry_seq: i64,
    /// Per-product entrySeq counters, lazily seeded on first sight by
    /// reading the last filename under that product's hard-link directory.
    product_entry_seq: HashMap<ProductId, i64>,
    open: Option<Batch>,
}

impl<F: Filesystem> BatchWriter<F> {
    /// `next_file_seq`/`next_entry_seq` are the ordinals the *next* record
    /// written will receive -- i.e. one past whatever was last persisted,
    /// as recovered at startup by `engine::startup`.
    pub fn new(
        fs: Arc<F>,
        max_records_per_file: i64,
        flush_interval: std::time::Duration,
        next_file_seq: i64,
        next_entry_seq: i64,
    ) -> Self {
        BatchWriter {
            fs,
            max_records_per_file: max_records_per_file.max(1),
            flush_interval: chrono::Duration::from_std(flush_interval).unwrap_or(chrono::Duration::seconds(1)),
            next_file_seq,
            next_entry_seq,
            product_entry_seq: HashMap::new(),
            open: None,
        }
    }

    pub fn has_open_batch(&self) -> bool {
        self.open.is_some()
    }

    async fn product_entry_seq_for(&mut self, product_id: &ProductId) -> Result<i64, PriceHistoryError> {
        if let Some(seq) = self.product_entry_seq.get(product_id) {
            return Ok(*seq);
        }

        let hash = hash_product_id(product_id.as_str());
        let names = self.fs.list_sorted(&product_dir(&hash)).await?;
        let next = match names.last() {
            Some(name) => {
                let f = Filename::decode(name)?;
                f.entry_seq + f.n_records
            }
            None => 1,
        };

        self.product_entry_seq.insert(product_id.clone(), next);
        Ok(next)
    }

    /// Opens a new batch, pre-counting the first record's contribution to
    /// `nRecords`/`nProductIds` so the filename this batch is eventually
    /// renamed to is always encodable (all four invariant-bearing fields
    /// are already >= 1 the moment the batch is created).
    async fn open_batch(&mut self, record_time: DateTime<Utc>) -> Result<(), PriceHistoryError> {
        let file_seq = self.next_file_seq;
        let entry_seq = self.next_entry_seq;

        let provisional = Filename::new(file_seq, entry_seq, 1, 1, record_time);
        let name = provisional.encode()?;
        let handle = self.fs.create_exclusive(&result_file_path(&name)).await?;

        self.open = Some(Batch {
            current_name: name,
            file_seq,
            first_entry_seq: entry_seq,
            start: record_time,
            end: record_time,
            n_records: 0,
            product_order: Vec::new(),
            product_stats: HashMap::new(),
            handle,
        });
        Ok(())
    }

    /// Appends `record` to the currently open batch (opening one if none is
    /// open), rolling the batch over first if it has reached
    /// `MaxRecordsPerFile` or if `record`'s timestamp is `FlushInterval` or
    /// more past the batch's start.
    ///
    /// Rejects a record whose timestamp is strictly before the open batch's
    /// `end` -- the linearizer assigns timestamps in acceptance order inside
    /// a single task, so this can only happen if that invariant has already
    /// been broken upstream.
    async fn append(&mut self, record: Record) -> Result<(), PriceHistoryError> {
        if let Some(batch) = &self.open {
            debug_assert!(
                record.timestamp >= batch.end,
                "batch writer received a non-monotonic timestamp: {:?} < {:?}",
                record.timestamp,
                batch.end
            );
            if record.timestamp < batch.end {
                return Err(PriceHistoryError::invariant(format!(
                    "record timestamp {} precedes open batch's end {}",
                    record.timestamp, batch.end
                )));
            }

            let elapsed = record.timestamp - batch.start;
            if batch.n_records >= self.max_records_per_file || elapsed >= self.flush_interval {
                self.finalize().await?;
            }
        }
        if self.open.is_none() {
            self.open_batch(record.timestamp).await?;
        }

        let product_id = record.product_id.clone();
        let product_entry_seq = self.product_entry_seq_for(&product_id).await?;

        let batch = self.open.as_mut().expect("just opened or already open");

        let prefix = if batch.n_records == 0 { "[\n\t" } else { ",\n\t" };
        let body = serde_json::to_vec(&record)
            .map_err(|e| PriceHistoryError::invariant(format!("record does not serialize: {e}")))?;

        batch.handle.write(prefix.as_bytes()).await?;
        batch.handle.write(&body).await?;

        batch.n_records += 1;
        batch.end = record.timestamp;
        if !batch.product_stats.contains_key(&product_id) {
            batch.product_order.push(product_id.clone());
            batch.product_stats.insert(product_id.clone(), ProductStats { first_entry_seq: product_entry_seq, count: 0 });
        }
        batch.product_stats.get_mut(&product_id).expect("just inserted").count += 1;

        self.product_entry_seq.insert(product_id, product_entry_seq + 1);
        self.next_entry_seq += 1;

        let new_name = Filename::new(batch.file_seq, batch.first_entry_seq, batch.n_records, batch.product_order.len() as i64, batch.start)
            .encode()?;
        if new_name != batch.current_name {
            self.fs.rename(&result_file_path(&batch.current_name), &result_file_path(&new_name)).await?;
            batch.current_name = new_name;
        }

        Ok(())
    }

    /// Closes the currently open batch (if any), syncs it to disk, and
    /// hard-links it into every product directory it touched -- each link
    /// named with *that product's* `entrySeq`/`nRecords` within this batch,
    /// not the batch's own global counters. A no-op if no batch is open or
    /// the open batch has no records yet.
    pub async fn finalize(&mut self) -> Result<(), PriceHistoryError> {
        let Some(mut batch) = self.open.take() else {
            return Ok(());
        };
        if batch.n_records == 0 {
            self.open = Some(batch);
            return Ok(());
        }

        batch.handle.write(b"\n]\n").await?;
        batch.handle.sync().await?;
        batch.handle.close().await?;

        let n_product_ids = batch.product_order.len() as i64;
        for product_id in &batch.product_order {
            let stats = &batch.product_stats[product_id];
            let link_name = Filename::new(batch.file_seq, stats.first_entry_seq, stats.count, n_product_ids, batch.start).encode()?;
            let _ = hash_product_id(product_id.as_str());
            let link_path = product_file_path(product_id, &link_name);
            self.fs.link(&result_file_path(&batch.current_name), &link_path).await?;
        }

        self.next_file_seq = batch.file_seq + 1;
        Ok(())
    }
}

#[async_trait]
impl<F: Filesystem> RecordWriter for BatchWriter<F> {
    async fn write_record(&mut self, record: Record) -> Result<(), PriceHistoryError> {
        self.append(record).await
    }
}
