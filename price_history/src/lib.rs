// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Price History Service
//!
//! A durable, append-only log of per-product price updates: a non-blocking
//! write path that assigns a canonical timestamp and a consistent
//! `previousPrice` to every update, a last-known-price read path that serves
//! memory where possible and disk otherwise, and a paginated,
//! time-windowed historical query over the log.
//!
//! The hard part -- and the bulk of this crate -- is the **linearized state
//! engine** in [`application::engine`] and its backing batched,
//! dual-indexed file store. [`presentation::http`] is a thin adapter on
//! top: it validates input and calls the core through the capability
//! traits defined in [`price_history_domain::repositories`].
//!
//! ```text
//! presentation::http  (axum handlers, request/response DTOs)
//!          │
//!          ▼
//! application::engine (linearizer, batch writer, price loader, memory store)
//!          │
//!          ▼
//! price_history_domain (entities, value objects, repository traits)
//! ```
//!
//! Bootstrap concerns (CLI parsing, layered configuration, signal handling,
//! process exit codes) live one level up, in the `price-history-bootstrap`
//! crate, which this crate's `main.rs` composes with the above to run the
//! service.

pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use application::engine::Engine;
