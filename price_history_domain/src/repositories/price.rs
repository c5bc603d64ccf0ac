// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Price Capability Traits
//!
//! Narrow capability traits, one per responsibility, rather than one broad
//! interface, so each component in the core engine depends on exactly the
//! capability set it needs: the memory store implements `PriceSetter` +
//! `PriceSetterAtomic` + `PriceReader`, the batch writer implements only
//! `RecordWriter`, and the HTTP adapter is handed a `PriceModel` /
//! `PriceLogRetriever` pair.

use async_trait::async_trait;

use crate::entities::entry::Entry;
use crate::entities::logged_price::{LoggedPrice, PriceLogQuery};
use crate::entities::record::Record;
use crate::error::PriceHistoryError;
use crate::value_objects::decimal::Decimal;
use crate::value_objects::product_id::ProductId;

/// Non-blocking acceptance of a new price, as exposed to the HTTP adapter.
#[async_trait]
pub trait PriceUpdater: Send + Sync {
    /// Accepts a new price for `product_id`. Returns
    /// `PriceHistoryError::BackpressureTemporary` if the write queue is
    /// saturated -- the caller should surface that as retryable (503),
    /// never block.
    async fn update_price(&self, product_id: ProductId, price: Decimal) -> Result<(), PriceHistoryError>;
}

/// Reads of the last known price, possibly blocking on a disk load for a
/// product this process has not yet seen.
#[async_trait]
pub trait PriceReader: Send + Sync {
    /// `Ok(None)` means no data for this product -- never an error.
    async fn last_price(&self, product_id: &ProductId) -> Result<Option<Entry>, PriceHistoryError>;
}

/// Synchronous, non-blocking write into a memory-resident store.
pub trait PriceSetter: Send + Sync {
    fn set_price(&self, product_id: &ProductId, entry: Entry);
}

/// Synchronous, non-blocking conditional write: store only if absent.
/// Used when a snapshot load completes, so it never overwrites a newer
/// value an intervening write may have already published.
pub trait PriceSetterAtomic: Send + Sync {
    fn set_price_if_missing(&self, product_id: &ProductId, entry: Entry);
}

/// The memory store's full capability set.
pub trait PriceState: PriceReader + PriceSetter + PriceSetterAtomic {}
impl<T: PriceReader + PriceSetter + PriceSetterAtomic + ?Sized> PriceState for T {}

/// The combined read/write model the HTTP adapter is handed for the
/// `reprice` and `product price` endpoints.
pub trait PriceModel: PriceReader + PriceUpdater {}
impl<T: PriceReader + PriceUpdater + ?Sized> PriceModel for T {}

/// The batch writer's sole responsibility: physically persist one finalized
/// record. Not safe for concurrent calls -- the flush loop is its one
/// caller and owns it exclusively.
#[async_trait]
pub trait RecordWriter: Send + Sync {
    async fn write_record(&mut self, record: Record) -> Result<(), PriceHistoryError>;
}

/// Paginated, time-windowed historical query over the log, behind
/// `GET /api/query`.
#[async_trait]
pub trait PriceLogRetriever: Send + Sync {
    async fn price_log(&self, query: PriceLogQuery) -> Result<Vec<LoggedPrice>, PriceHistoryError>;
}
