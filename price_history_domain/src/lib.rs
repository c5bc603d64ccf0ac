// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Price History Domain
//!
//! Pure, reusable types and repository traits for the price history service:
//! the [`Entry`]/[`Record`] data model, the byte-sortable [`Filename`] codec,
//! the `productId` hashing used to fan records out into per-product
//! directories, and the capability traits (`PriceReader`, `PriceUpdater`,
//! `PriceSetter`, ...) that the core engine composes rather than depending on
//! one fat interface.
//!
//! This crate has no knowledge of disk, sockets, or async runtimes beyond the
//! `async-trait` plumbing needed to express I/O-bound ports; the concrete
//! filesystem, linearizer, and HTTP adapter all live in the `price-history`
//! crate.

pub mod entities;
pub mod error;
pub mod repositories;
pub mod value_objects;

pub use entities::entry::Entry;
pub use entities::logged_price::{LoggedPrice, PriceLogQuery};
pub use entities::record::Record;
pub use error::{ErrorKind, PriceHistoryError};
pub use value_objects::decimal::Decimal;
pub use value_objects::filename::Filename;
pub use value_objects::product_id::{hash_product_id, ProductId};

pub type Result<T> = std::result::Result<T, PriceHistoryError>;
