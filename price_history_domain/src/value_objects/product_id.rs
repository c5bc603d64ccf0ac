// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Product Identifier
//!
//! `productId` is an unbounded-length string supplied by callers; filenames
//! are not. `hash_product_id` is the stable mapping used to place a
//! product's hard-linked history under `results_by_product/<hash>/`.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A product identifier, as supplied by a caller. No length or charset
/// constraint is imposed here -- that is why [`hash_product_id`] exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        ProductId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ProductId {
    fn from(s: String) -> Self {
        ProductId(s)
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        ProductId(s.to_string())
    }
}

/// Lowercase hex SHA-256 of a product id, used as the per-product directory
/// name under `results_by_product/` -- product ids have no length bound,
/// directory/file names do.
pub fn hash_product_id(product_id: &str) -> String {
    let digest = Sha256::digest(product_id.as_bytes());
    hex::encode(digest)
}
