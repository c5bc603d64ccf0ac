// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Request/response bodies for the HTTP surface. Kept distinct from the
//! domain's [`price_history_domain::entities`] types: the wire shapes here
//! are camelCase JSON and the query string's flat `productId`/`from`/`to`
//! parameters, not the domain's internal representations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/reprice`.
#[derive(Debug, Deserialize)]
pub struct RepriceRequest {
    #[serde(rename = "productId")]
    pub product_id: String,
    pub price: String,
}

/// Response body of `GET /api/product/{productId}/price`.
#[derive(Debug, Serialize)]
pub struct ProductPriceResponse {
    #[serde(rename = "productId")]
    pub product_id: String,
    pub price: String,
    pub timestamp: DateTime<Utc>,
}

/// Query parameters for `GET /api/query`.
/// `from`/`to` are RFC3339 timestamps; `pageSize`/`pageNumber` default to 25
/// and 1 respectively when omitted.
#[derive(Debug, Deserialize)]
pub struct QueryParams {
    #[serde(rename = "productId")]
    pub product_id: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<u32>,
    #[serde(rename = "pageNumber")]
    pub page_number: Option<u32>,
}

/// One row of `GET /api/query`'s response array.
#[derive(Debug, Serialize)]
pub struct LoggedPriceResponse {
    #[serde(rename = "productId")]
    pub product_id: String,
    pub price: String,
    pub timestamp: DateTime<Utc>,
}

impl From<price_history_domain::entities::logged_price::LoggedPrice> for LoggedPriceResponse {
    fn from(row: price_history_domain::entities::logged_price::LoggedPrice) -> Self {
        LoggedPriceResponse {
            product_id: row.product_id.as_str().to_string(),
            price: row.price.as_str().to_string(),
            timestamp: row.timestamp,
        }
    }
}
