// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! A price at an instant -- the unit the memory store and the `lastPrice`
//! read path deal in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::decimal::Decimal;

/// A price observed at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Entry {
    pub fn new(price: Decimal, timestamp: DateTime<Utc>) -> Self {
        Entry { price, timestamp }
    }
}
