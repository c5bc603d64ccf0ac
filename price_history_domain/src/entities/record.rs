// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Record
//!
//! The unit written to disk by the batch writer: a product id, its price
//! entry, and the `previousPrice` the linearizer resolved for it.
//!
//! `previousPrice` serializes as JSON `null` -- never `"0"` or `""` -- the
//! first time a product is ever seen: it is modeled as an explicit
//! `Option<Decimal>` rather than borrowing a sentinel value from `Decimal`
//! itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::entry::Entry;
use crate::value_objects::decimal::Decimal;
use crate::value_objects::product_id::ProductId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "productId")]
    pub product_id: ProductId,

    #[serde(rename = "previousPrice")]
    pub previous_price: Option<Decimal>,

    #[serde(rename = "newPrice")]
    pub price: Decimal,

    pub timestamp: DateTime<Utc>,
}

impl Record {
    pub fn new(product_id: ProductId, previous_price: Option<Decimal>, entry: Entry) -> Self {
        Record {
            product_id,
            previous_price,
            price: entry.price,
            timestamp: entry.timestamp,
        }
    }

    /// A record for a not-yet-timestamped, not-yet-resolved write: only
    /// `productId` and the new price are known. The linearizer fills in
    /// `timestamp` and `previousPrice` before this is ever written out or
    /// observed outside the core.
    pub fn pending(product_id: ProductId, price: Decimal) -> Self {
        Record {
            product_id,
            previous_price: None,
            price,
            timestamp: DateTime::<Utc>::from_timestamp(0, 0).expect("epoch is representable"),
        }
    }

    pub fn entry(&self) -> Entry {
        Entry::new(self.price.clone(), self.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_previous_price_as_explicit_null() {
        let rec = Record::new(
            ProductId::new("widget"),
            None,
            Entry::new(Decimal::parse("3.50").unwrap(), Utc::now()),
        );
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains("\"previousPrice\":null"));
        assert!(json.contains("\"newPrice\":\"3.50\""));
    }

    #[test]
    fn round_trips_through_json() {
        let rec = Record::new(
            ProductId::new("widget"),
            Some(Decimal::parse("3.50").unwrap()),
            Entry::new(Decimal::parse("42.0").unwrap(), Utc::now()),
        );
        let json = serde_json::to_string(&rec).unwrap();
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(rec, back);
    }
}
