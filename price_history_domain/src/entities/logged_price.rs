// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Result row of a `priceLog` query and the parameters that select it.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::value_objects::decimal::Decimal;
use crate::value_objects::product_id::ProductId;

/// One row returned by `priceLog`: the historical record flattened with its
/// owning product id, as `{productId, price, timestamp}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoggedPrice {
    #[serde(rename = "productId")]
    pub product_id: ProductId,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Parameters for a paginated, time-windowed historical query.
#[derive(Debug, Clone)]
pub struct PriceLogQuery {
    /// Restrict to one product's subdirectory; `None` scans the global log.
    pub product_id: Option<ProductId>,
    pub from: Option<DateTime<Utc>>,
    /// Defaults to "now" at the adapter boundary.
    pub to: DateTime<Utc>,
    pub offset: i64,
    pub limit: usize,
}
