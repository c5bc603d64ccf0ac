// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Linearizer
//!
//! The single task that owns the serialization point for every write:
//! resolving `previousPrice`, assigning the canonical timestamp, updating
//! the memory store, and handing each finished [`Record`]'s promise to the
//! batch writer's own flush loop in acceptance order.
//!
//! Both the write path (`update_price`) and the read path (`last_price`) are
//! strictly non-blocking at the handle: a write either enqueues or returns
//! `BackpressureTemporary` immediately, without waiting for the record to be
//! resolved or durably written; a read returns as soon as memory answers or,
//! on a miss, submits into the loop and awaits just the single reply it
//! asked for. The loop itself never blocks the caller of either path on a
//! disk operation it isn't personally waiting on.
//!
//! A write whose product already has a memory-resident entry is resolved
//! immediately. A write for a product this process has never seen publishes
//! its new value to memory right away (so a second write for the same
//! product, or a concurrent read, observes it without waiting) and then
//! arranges to fill in `previousPrice` from disk: joining an in-flight
//! snapshot load for the same product if one exists, via
//! [`futures::future::Shared`] -- the Rust replacement for the Go
//! implementation's in-flight-channel-borrowing trick, since a second
//! consumer of the same load can simply clone and await it instead of
//! re-issuing the read.
//!
//! Reads that miss memory for a product with no load in flight trigger one
//! and queue behind it in `read_waiters`; a write for that same product
//! short-circuits those waiters with the value it just published instead of
//! making them wait out the slower disk round trip.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::Shared;
use futures::FutureExt;
use price_history_domain::entities::entry::Entry;
use price_history_domain::entities::record::Record;
use price_history_domain::error::PriceHistoryError;
use price_history_domain::repositories::price::{PriceReader, PriceSetter, PriceSetterAtomic, PriceUpdater};
use price_history_domain::value_objects::decimal::Decimal;
use price_history_domain::value_objects::product_id::ProductId;
use tokio::sync::{mpsc, oneshot};

use super::failure_counter::{FailureCategory, FailureCounter};
use super::memory_store::MemoryStore;

/// A single pending write, carried from the client-facing handle into the
/// loop. There is no ack channel here -- `update_price` only needs to know
/// the write was *accepted*, which happens the moment it lands in
/// `write_tx`.
struct WriteRequest {
    product_id: ProductId,
    price: Decimal,
}

/// A single pending read, carried into the loop once the caller's own
/// memory-store check has already missed.
struct ReadRequest {
    product_id: ProductId,
    reply: oneshot::Sender<Option<Entry>>,
}

enum LoopEvent {
    SnapshotLoaded(ProductId, Option<Entry>),
}

type PrevPriceFuture = Shared<oneshot::Receiver<Option<Entry>>>;

/// Client-facing handle to the linearizer: the only way a caller submits a
/// write or a (post-memory-miss) read. Cloned freely -- the underlying
/// channels are the serialization point, not this handle.
#[derive(Clone)]
pub struct LinearizerHandle {
    write_tx: mpsc::Sender<WriteRequest>,
    read_tx: mpsc::UnboundedSender<ReadRequest>,
    memory: Arc<MemoryStore>,
}

#[async_trait]
impl PriceUpdater for LinearizerHandle {
    /// Enqueues the write and returns immediately. Never waits for the
    /// record to be resolved, timestamped, or flushed -- only for admission.
    async fn update_price(&self, product_id: ProductId, price: Decimal) -> Result<(), PriceHistoryError> {
        let request = WriteRequest { product_id, price };
        self.write_tx
            .try_send(request)
            .map_err(|_| PriceHistoryError::backpressure("write queue is full; retry later"))
    }
}

#[async_trait]
impl PriceReader for LinearizerHandle {
    /// Fast path: answer directly from memory without touching the loop.
    /// Only a genuine miss is submitted as a `ReadRequest`.
    async fn last_price(&self, product_id: &ProductId) -> Result<Option<Entry>, PriceHistoryError> {
        if let Some(entry) = self.memory.get(product_id) {
            return Ok(Some(entry));
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        self.read_tx
            .send(ReadRequest { product_id: product_id.clone(), reply: reply_tx })
            .map_err(|_| PriceHistoryError::invariant("linearizer loop is no longer running"))?;

        reply_rx
            .await
            .map_err(|_| PriceHistoryError::invariant("linearizer dropped a read without replying"))
    }
}

/// Spawns the linearizer loop and returns the handle callers submit reads
/// and writes through. `record_queue_tx` carries one promise per *accepted*
/// write, in acceptance order -- the flush loop (see `batch_writer`) awaits
/// them strictly in order, so a slow snapshot-load-bound write delays the
/// records behind it rather than letting a faster one jump ahead on disk.
/// `snapshot_reader` resolves `previousPrice` for products not yet seen in
/// `memory`, bounded to "as of process start" by a
/// [`super::snapshot::SnapshotFs`].
pub fn spawn(
    memory: Arc<MemoryStore>,
    snapshot_reader: Arc<dyn PriceReader>,
    record_queue_tx: mpsc::Sender<oneshot::Receiver<Record>>,
    failures: Arc<FailureCounter>,
    write_queue_length: usize,
) -> (LinearizerHandle, tokio::task::JoinHandle<()>) {
    let (write_tx, write_rx) = mpsc::channel(write_queue_length.max(1));
    let (read_tx, read_rx) = mpsc::unbounded_channel();
    let (internal_tx, internal_rx) = mpsc::channel(write_queue_length.max(1));

    let join = tokio::spawn(run(
        memory.clone(),
        snapshot_reader,
        record_queue_tx,
        failures,
        write_rx,
        read_rx,
        internal_rx,
        internal_tx,
    ));

    (LinearizerHandle { write_tx, read_tx, memory }, join)
}

#[allow(clippy::too_many_arguments)]
async fn run(
    memory: Arc<MemoryStore>,
    snapshot_reader: Arc<dyn PriceReader>,
    record_queue_tx: mpsc::Sender<oneshot::Receiver<Record>>,
    failures: Arc<FailureCounter>,
    mut write_rx: mpsc::Receiver<WriteRequest>,
    mut read_rx: mpsc::UnboundedReceiver<ReadRequest>,
    mut internal_rx: mpsc::Receiver<LoopEvent>,
    internal_tx: mpsc::Sender<LoopEvent>,
) {
    let mut read_waiters: HashMap<ProductId, Vec<oneshot::Sender<Option<Entry>>>> = HashMap::new();
    let mut pending_prev_price: HashMap<ProductId, PrevPriceFuture> = HashMap::new();
    let mut writers_closed = false;
    let mut readers_closed = false;

    loop {
        if writers_closed && readers_closed && read_waiters.is_empty() && pending_prev_price.is_empty() {
            break;
        }

        tokio::select! {
            biased;
            Some(event) = internal_rx.recv() => {
                match event {
                    LoopEvent::SnapshotLoaded(product_id, loaded) => {
                        pending_prev_price.remove(&product_id);
                        if let Some(entry) = &loaded {
                            memory.set_price_if_missing(&product_id, entry.clone());
                        }
                        if let Some(waiters) = read_waiters.remove(&product_id) {
                            for waiter in waiters {
                                let _ = waiter.send(loaded.clone());
                            }
                        }
                    }
                }
            }
            maybe_request = write_rx.recv(), if !writers_closed => {
                match maybe_request {
                    Some(request) => {
                        handle_write(
                            request,
                            &memory,
                            &snapshot_reader,
                            &record_queue_tx,
                            &failures,
                            &mut read_waiters,
                            &mut pending_prev_price,
                            &internal_tx,
                        )
                        .await;
                    }
                    None => writers_closed = true,
                }
            }
            maybe_read = read_rx.recv(), if !readers_closed => {
                match maybe_read {
                    Some(request) => {
                        handle_read(
                            request,
                            &memory,
                            &snapshot_reader,
                            &failures,
                            &mut read_waiters,
                            &mut pending_prev_price,
                            &internal_tx,
                        );
                    }
                    None => readers_closed = true,
                }
            }
        }
    }
}

/// Joins an in-flight snapshot load for `product_id`, or starts one if none
/// exists, returning the shared future either way.
fn join_or_start_snapshot_load(
    product_id: &ProductId,
    snapshot_reader: &Arc<dyn PriceReader>,
    failures: &Arc<FailureCounter>,
    pending_prev_price: &mut HashMap<ProductId, PrevPriceFuture>,
    internal_tx: &mpsc::Sender<LoopEvent>,
) -> PrevPriceFuture {
    if let Some(shared) = pending_prev_price.get(product_id) {
        return shared.clone();
    }

    let (tx, rx) = oneshot::channel();
    let loader = snapshot_reader.clone();
    let load_product = product_id.clone();
    let load_failures = failures.clone();
    tokio::spawn(async move {
        let resolved = match loader.last_price(&load_product).await {
            Ok(entry) => entry,
            Err(e) => {
                load_failures.record(FailureCategory::SnapshotLoad, &e.to_string());
                None
            }
        };
        let _ = tx.send(resolved);
    });

    let shared = rx.shared();
    pending_prev_price.insert(product_id.clone(), shared.clone());

    let driver_tx = internal_tx.clone();
    let driver_product = product_id.clone();
    let driver_shared = shared.clone();
    tokio::spawn(async move {
        if let Ok(entry) = driver_shared.await {
            let _ = driver_tx.send(LoopEvent::SnapshotLoaded(driver_product, entry)).await;
        }
    });

    shared
}

/// Handles one write request: resolves immediately if `memory` already has
/// an entry. Otherwise publishes the new value to memory up front, wakes any
/// readers already queued on this product with that new value, and arranges
/// for a background task to fill in `previousPrice` once the snapshot load
/// (new or already in flight) resolves.
#[allow(clippy::too_many_arguments)]
async fn handle_write(
    request: WriteRequest,
    memory: &Arc<MemoryStore>,
    snapshot_reader: &Arc<dyn PriceReader>,
    record_queue_tx: &mpsc::Sender<oneshot::Receiver<Record>>,
    failures: &Arc<FailureCounter>,
    read_waiters: &mut HashMap<ProductId, Vec<oneshot::Sender<Option<Entry>>>>,
    pending_prev_price: &mut HashMap<ProductId, PrevPriceFuture>,
    internal_tx: &mpsc::Sender<LoopEvent>,
) {
    let WriteRequest { product_id, price } = request;

    if let Some(existing) = memory.get(&product_id) {
        enqueue_resolved(product_id, price, Some(existing.price), memory, record_queue_tx).await;
        return;
    }

    let now = Utc::now();
    let entry = Entry::new(price, now);
    memory.set_price(&product_id, entry.clone());

    if let Some(waiters) = read_waiters.remove(&product_id) {
        for waiter in waiters {
            let _ = waiter.send(Some(entry.clone()));
        }
    }

    let shared = join_or_start_snapshot_load(&product_id, snapshot_reader, failures, pending_prev_price, internal_tx);

    let (rec_tx, rec_rx) = oneshot::channel::<Record>();
    if record_queue_tx.send(rec_rx).await.is_err() {
        return;
    }

    tokio::spawn(async move {
        let prev = shared.await.ok().flatten().map(|e| e.price);
        let record = Record::new(product_id, prev, entry);
        let _ = rec_tx.send(record);
    });
}

/// Builds the finished record for a write whose `previousPrice` is already
/// known and enqueues its (already-resolved) promise onto the flush loop's
/// ordered queue.
async fn enqueue_resolved(
    product_id: ProductId,
    price: Decimal,
    prev: Option<Decimal>,
    memory: &Arc<MemoryStore>,
    record_queue_tx: &mpsc::Sender<oneshot::Receiver<Record>>,
) {
    let now = Utc::now();
    let entry = Entry::new(price, now);
    memory.set_price(&product_id, entry.clone());

    let record = Record::new(product_id, prev, entry);
    let (rec_tx, rec_rx) = oneshot::channel();
    let _ = rec_tx.send(record);
    let _ = record_queue_tx.send(rec_rx).await;
}

/// Handles one read request: resolves immediately if `memory` already has an
/// entry (a concurrent write may have landed between the caller's own
/// memory check and this request reaching the loop). Otherwise queues the
/// reply behind the product's snapshot load, starting one if needed.
fn handle_read(
    request: ReadRequest,
    memory: &Arc<MemoryStore>,
    snapshot_reader: &Arc<dyn PriceReader>,
    failures: &Arc<FailureCounter>,
    read_waiters: &mut HashMap<ProductId, Vec<oneshot::Sender<Option<Entry>>>>,
    pending_prev_price: &mut HashMap<ProductId, PrevPriceFuture>,
    internal_tx: &mpsc::Sender<LoopEvent>,
) {
    if let Some(entry) = memory.get(&request.product_id) {
        let _ = request.reply.send(Some(entry));
        return;
    }

    let product_id = request.product_id.clone();
    read_waiters.entry(product_id.clone()).or_default().push(request.reply);
    join_or_start_snapshot_load(&product_id, snapshot_reader, failures, pending_prev_price, internal_tx);
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use price_history_domain::entities::entry::Entry as DomainEntry;

    use super::*;

    struct NeverSeen;

    #[async_trait]
    impl PriceReader for NeverSeen {
        async fn last_price(&self, _product_id: &ProductId) -> Result<Option<DomainEntry>, PriceHistoryError> {
            Ok(None)
        }
    }

    struct AlwaysHasPrior(Decimal);

    #[async_trait]
    impl PriceReader for AlwaysHasPrior {
        async fn last_price(&self, _product_id: &ProductId) -> Result<Option<DomainEntry>, PriceHistoryError> {
            Ok(Some(DomainEntry::new(self.0.clone(), Utc::now())))
        }
    }

    struct SlowNone(Duration);

    #[async_trait]
    impl PriceReader for SlowNone {
        async fn last_price(&self, _product_id: &ProductId) -> Result<Option<DomainEntry>, PriceHistoryError> {
            tokio::time::sleep(self.0).await;
            Ok(None)
        }
    }

    async fn next_record(queue_rx: &mut mpsc::Receiver<oneshot::Receiver<Record>>) -> Record {
        let rec_rx = tokio::time::timeout(Duration::from_secs(1), queue_rx.recv()).await.unwrap().unwrap();
        tokio::time::timeout(Duration::from_secs(1), rec_rx).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn first_write_for_unseen_product_has_no_previous_price() {
        let memory = Arc::new(MemoryStore::new());
        let (queue_tx, mut queue_rx) = mpsc::channel(8);
        let failures = Arc::new(FailureCounter::new());
        let (handle, _join) = spawn(memory, Arc::new(NeverSeen), queue_tx, failures, 8);

        handle
            .update_price(ProductId::new("widget"), Decimal::parse("3.50").unwrap())
            .await
            .unwrap();

        let record = next_record(&mut queue_rx).await;
        assert!(record.previous_price.is_none());
        assert_eq!(record.price.as_str(), "3.50");
    }

    #[tokio::test]
    async fn write_for_product_known_on_disk_picks_up_its_last_price() {
        let memory = Arc::new(MemoryStore::new());
        let (queue_tx, mut queue_rx) = mpsc::channel(8);
        let failures = Arc::new(FailureCounter::new());
        let loader = AlwaysHasPrior(Decimal::parse("1.00").unwrap());
        let (handle, _join) = spawn(memory, Arc::new(loader), queue_tx, failures, 8);

        handle
            .update_price(ProductId::new("widget"), Decimal::parse("2.00").unwrap())
            .await
            .unwrap();

        let record = next_record(&mut queue_rx).await;
        assert_eq!(record.previous_price.unwrap().as_str(), "1.00");
    }

    #[tokio::test]
    async fn second_write_for_same_unseen_product_chains_off_the_first() {
        let memory = Arc::new(MemoryStore::new());
        let (queue_tx, mut queue_rx) = mpsc::channel(8);
        let failures = Arc::new(FailureCounter::new());
        let (handle, _join) = spawn(memory, Arc::new(NeverSeen), queue_tx, failures, 8);

        handle
            .update_price(ProductId::new("widget"), Decimal::parse("1").unwrap())
            .await
            .unwrap();
        handle
            .update_price(ProductId::new("widget"), Decimal::parse("2").unwrap())
            .await
            .unwrap();

        let first = next_record(&mut queue_rx).await;
        let second = next_record(&mut queue_rx).await;

        assert!(first.previous_price.is_none());
        assert_eq!(second.previous_price.unwrap().as_str(), first.price.as_str());
    }

    #[tokio::test]
    async fn queue_preserves_acceptance_order_even_when_a_later_write_resolves_first() {
        let memory = Arc::new(MemoryStore::new());
        memory.set_price(&ProductId::new("b"), DomainEntry::new(Decimal::parse("9.00").unwrap(), Utc::now()));

        let (queue_tx, mut queue_rx) = mpsc::channel(8);
        let failures = Arc::new(FailureCounter::new());
        let (handle, _join) = spawn(memory, Arc::new(SlowNone(Duration::from_millis(80))), queue_tx, failures, 8);

        // "a" is unseen and will block on the slow snapshot load; "b" is
        // already memory-resident and resolves synchronously. Acceptance
        // order must still win on the flush side.
        handle.update_price(ProductId::new("a"), Decimal::parse("1").unwrap()).await.unwrap();
        handle.update_price(ProductId::new("b"), Decimal::parse("2").unwrap()).await.unwrap();

        let first = next_record(&mut queue_rx).await;
        let second = next_record(&mut queue_rx).await;

        assert_eq!(first.product_id, ProductId::new("a"));
        assert_eq!(second.product_id, ProductId::new("b"));
    }

    #[tokio::test]
    async fn write_for_unseen_product_immediately_wakes_pending_read_waiters() {
        let memory = Arc::new(MemoryStore::new());
        let (queue_tx, mut queue_rx) = mpsc::channel(8);
        let failures = Arc::new(FailureCounter::new());
        let (handle, _join) = spawn(memory, Arc::new(SlowNone(Duration::from_millis(200))), queue_tx, failures, 8);

        let reader = handle.clone();
        let read_task = tokio::spawn(async move { reader.last_price(&ProductId::new("widget")).await });

        tokio::time::sleep(Duration::from_millis(20)).await;

        handle
            .update_price(ProductId::new("widget"), Decimal::parse("5.00").unwrap())
            .await
            .unwrap();

        let read_result = tokio::time::timeout(Duration::from_millis(150), read_task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(read_result.unwrap().price.as_str(), "5.00");

        let _ = next_record(&mut queue_rx).await;
    }

    #[tokio::test]
    async fn read_on_unknown_product_resolves_via_snapshot_load() {
        let memory = Arc::new(MemoryStore::new());
        let (queue_tx, _queue_rx) = mpsc::channel(8);
        let failures = Arc::new(FailureCounter::new());
        let loader = AlwaysHasPrior(Decimal::parse("7.25").unwrap());
        let (handle, _join) = spawn(memory, Arc::new(loader), queue_tx, failures, 8);

        let result = handle.last_price(&ProductId::new("widget")).await.unwrap();
        assert_eq!(result.unwrap().price.as_str(), "7.25");
    }

    #[tokio::test]
    async fn full_write_queue_rejects_with_backpressure() {
        let memory = Arc::new(MemoryStore::new());
        let (queue_tx, _queue_rx) = mpsc::channel(1);
        let failures = Arc::new(FailureCounter::new());
        let (handle, _join) = spawn(memory, Arc::new(NeverSeen), queue_tx, failures, 1);

        let mut saw_backpressure = false;
        for i in 0..50 {
            let result = handle
                .update_price(ProductId::new(format!("p{i}")), Decimal::parse("1").unwrap())
                .await;
            if let Err(e) = result {
                assert_eq!(e.kind(), price_history_domain::error::ErrorKind::BackpressureTemporary);
                saw_backpressure = true;
                break;
            }
        }
        assert!(saw_backpressure, "expected at least one write to observe backpressure");
    }
}
