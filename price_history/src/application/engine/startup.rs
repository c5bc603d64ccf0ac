// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Engine Startup
//!
//! Wires the linearizer, memory store, batch writer, and price loader into a
//! running [`Engine`]: recovers the durable sequence cursor from whatever is
//! already on disk, builds a snapshot view bounded to "as of process start"
//! for the linearizer's own previous-price lookups, and spawns the two
//! long-running tasks (the linearizer loop and the flush loop) that own the
//! write path between them.
//!
//! The flush loop is its own task precisely so the batch writer it owns
//! never needs a mutex: it is the sole consumer of the ordered record queue
//! the linearizer publishes into, and the sole caller of [`BatchWriter`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use price_history_domain::entities::record::Record;
use price_history_domain::error::PriceHistoryError;
use price_history_domain::repositories::filesystem::ReadFs;
use price_history_domain::repositories::price::{PriceLogRetriever, PriceModel, PriceReader, RecordWriter};
use price_history_domain::value_objects::filename::Filename;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::batch_writer::BatchWriter;
use super::failure_counter::{FailureCategory, FailureCounter};
use super::layout::RESULTS_DIR;
use super::linearizer::LinearizerHandle;
use super::memory_store::MemoryStore;
use super::price_loader::PriceLoader;
use super::snapshot::SnapshotFs;
use crate::infrastructure::filesystem::OsFilesystem;

/// The running engine: every handle a caller (the HTTP adapter, the `check`
/// subcommand) needs, plus the two background tasks it owns.
pub struct Engine {
    memory: Arc<MemoryStore>,
    linearizer: LinearizerHandle,
    price_log_reader: Arc<PriceLoader>,
    failures: Arc<FailureCounter>,
    linearizer_join: JoinHandle<()>,
    flush_join: JoinHandle<()>,
}

impl Engine {
    /// Builds and starts the engine against `data_root`, recovering the
    /// `fileSeq`/`entrySeq` cursor from whatever batches are already there.
    /// An empty or missing `data_root` starts both counters at 1.
    pub async fn start(
        data_root: impl Into<std::path::PathBuf>,
        max_records_per_file: u32,
        flush_interval: std::time::Duration,
        write_queue_length: u32,
    ) -> Result<Engine, PriceHistoryError> {
        let disk: Arc<OsFilesystem> = Arc::new(OsFilesystem::new(data_root.into()));
        let (next_file_seq, next_entry_seq) = recover_sequence_cursor(disk.as_ref()).await?;

        let cutoff = Filename::new(next_file_seq, 1, 1, 1, DateTime::<Utc>::from_timestamp(0, 0).expect("epoch")).encode()?;
        let snapshot_fs: Arc<dyn ReadFs> = Arc::new(SnapshotFs::new(disk.clone() as Arc<dyn ReadFs>, cutoff));
        let snapshot_reader: Arc<dyn PriceReader> = Arc::new(PriceLoader::new(snapshot_fs));
        let price_log_reader = Arc::new(PriceLoader::new(disk.clone() as Arc<dyn ReadFs>));

        let memory = Arc::new(MemoryStore::new());
        let failures = Arc::new(FailureCounter::new());

        let (record_tx, record_rx) = tokio::sync::mpsc::channel::<oneshot::Receiver<Record>>(write_queue_length.max(1) as usize);

        let (linearizer, linearizer_join) = super::linearizer::spawn(
            memory.clone(),
            snapshot_reader,
            record_tx,
            failures.clone(),
            write_queue_length.max(1) as usize,
        );

        let writer = BatchWriter::new(disk, max_records_per_file.max(1) as i64, flush_interval, next_file_seq, next_entry_seq);
        let flush_join = spawn_flush_loop(writer, record_rx, flush_interval, failures.clone());

        Ok(Engine {
            memory,
            linearizer,
            price_log_reader,
            failures,
            linearizer_join,
            flush_join,
        })
    }

    /// The combined read/write model the HTTP adapter's `reprice` and
    /// `product price` endpoints are handed.
    pub fn price_model(&self) -> Arc<dyn PriceModel> {
        Arc::new(self.linearizer.clone())
    }

    /// The historical-query reader behind `GET /api/query`. Deliberately
    /// distinct from `price_model`'s reader: a log query always goes
    /// straight to disk, bypassing the memory store, since it asks about
    /// more than just "the latest" value.
    pub fn price_log_reader(&self) -> Arc<dyn PriceLogRetriever> {
        self.price_log_reader.clone()
    }

    pub fn memory(&self) -> Arc<MemoryStore> {
        self.memory.clone()
    }

    pub fn failures(&self) -> Arc<FailureCounter> {
        self.failures.clone()
    }

    /// Waits for both background tasks to finish. The caller must have
    /// already dropped every other clone of the handle returned by
    /// [`Engine::price_model`] (e.g. by tearing down the HTTP server first)
    /// -- otherwise the linearizer's write channel never closes and this
    /// never returns.
    pub async fn shutdown(self) {
        drop(self.linearizer);
        let _ = self.linearizer_join.await;
        let _ = self.flush_join.await;
    }
}

/// Reads the last finalized global filename (if any) and derives the
/// ordinals the *next* record written should receive.
async fn recover_sequence_cursor(fs: &dyn ReadFs) -> Result<(i64, i64), PriceHistoryError> {
    let names = fs.list_sorted(RESULTS_DIR).await?;
    match names.last() {
        Some(name) => {
            let f = Filename::decode(name)?;
            Ok((f.file_seq + 1, f.entry_seq + f.n_records))
        }
        None => Ok((1, 1)),
    }
}

/// The sole task that ever touches the [`BatchWriter`]: drains records in
/// acceptance order from the linearizer, and force-flushes an idle open
/// batch once `flush_interval` has passed with no new arrivals -- a plain
/// append only rolls a batch over on its *next* write, so a product that
/// goes quiet would otherwise leave its last batch open indefinitely.
fn spawn_flush_loop<F>(
    mut writer: BatchWriter<F>,
    mut record_rx: tokio::sync::mpsc::Receiver<oneshot::Receiver<Record>>,
    flush_interval: std::time::Duration,
    failures: Arc<FailureCounter>,
) -> JoinHandle<()>
where
    F: price_history_domain::repositories::filesystem::Filesystem + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(flush_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                maybe_promise = record_rx.recv() => {
                    match maybe_promise {
                        Some(promise) => {
                            if let Ok(record) = promise.await {
                                if let Err(e) = writer.write_record(record).await {
                                    failures.record(FailureCategory::BatchWrite, &e.to_string());
                                }
                            }
                        }
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    if writer.has_open_batch() {
                        if let Err(e) = writer.finalize().await {
                            failures.record(FailureCategory::BatchWrite, &e.to_string());
                        }
                    }
                }
            }
        }

        if let Err(e) = writer.finalize().await {
            failures.record(FailureCategory::BatchWrite, &e.to_string());
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::filesystem::MemFilesystem;
    use price_history_domain::value_objects::product_id::ProductId;

    #[tokio::test]
    async fn fresh_store_recovers_sequence_one() {
        let fs = MemFilesystem::new();
        let (file_seq, entry_seq) = recover_sequence_cursor(&fs).await.unwrap();
        assert_eq!(file_seq, 1);
        assert_eq!(entry_seq, 1);
    }

    #[tokio::test]
    async fn recovers_cursor_from_last_finalized_batch() {
        let fs = Arc::new(MemFilesystem::new());
        let mut writer = BatchWriter::new(fs.clone(), 10, std::time::Duration::from_secs(60), 1, 1);
        writer
            .write_record(Record::new(
                ProductId::new("widget"),
                None,
                price_history_domain::entities::entry::Entry::new(
                    price_history_domain::value_objects::decimal::Decimal::parse("1").unwrap(),
                    Utc::now(),
                ),
            ))
            .await
            .unwrap();
        writer.finalize().await.unwrap();

        let (file_seq, entry_seq) = recover_sequence_cursor(fs.as_ref()).await.unwrap();
        assert_eq!(file_seq, 2);
        assert_eq!(entry_seq, 2);
    }

    #[tokio::test]
    async fn flush_loop_drains_records_and_finalizes_on_channel_close() {
        let fs = Arc::new(MemFilesystem::new());
        let writer = BatchWriter::new(fs.clone(), 10, std::time::Duration::from_secs(60), 1, 1);
        let (tx, rx) = tokio::sync::mpsc::channel(8);
        let failures = Arc::new(FailureCounter::new());

        let join = spawn_flush_loop(writer, rx, std::time::Duration::from_secs(60), failures);

        let (rec_tx, rec_rx) = oneshot::channel();
        rec_tx
            .send(Record::new(
                ProductId::new("widget"),
                None,
                price_history_domain::entities::entry::Entry::new(
                    price_history_domain::value_objects::decimal::Decimal::parse("1").unwrap(),
                    Utc::now(),
                ),
            ))
            .unwrap();
        tx.send(rec_rx).await.unwrap();
        drop(tx);

        join.await.unwrap();

        let names = fs.list_sorted("results").await.unwrap();
        assert_eq!(names.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_loop_force_flushes_idle_batch_after_interval() {
        let fs = Arc::new(MemFilesystem::new());
        let flush_interval = std::time::Duration::from_millis(30);
        let writer = BatchWriter::new(fs.clone(), 10, flush_interval, 1, 1);
        let (tx, rx) = tokio::sync::mpsc::channel(8);
        let failures = Arc::new(FailureCounter::new());

        let join = spawn_flush_loop(writer, rx, flush_interval, failures);

        let (rec_tx, rec_rx) = oneshot::channel();
        rec_tx
            .send(Record::new(
                ProductId::new("widget"),
                None,
                price_history_domain::entities::entry::Entry::new(
                    price_history_domain::value_objects::decimal::Decimal::parse("1").unwrap(),
                    Utc::now(),
                ),
            ))
            .unwrap();
        tx.send(rec_rx).await.unwrap();

        // Drive the ticker past `flush_interval` on paused virtual time
        // rather than sleeping a hand-picked real margin.
        tokio::time::advance(flush_interval + std::time::Duration::from_millis(1)).await;
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        let names = fs.list_sorted("results").await.unwrap();
        assert_eq!(names.len(), 1, "idle batch should be force-flushed by the ticker");

        drop(tx);
        join.await.unwrap();
    }
}
