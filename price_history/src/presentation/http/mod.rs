// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # HTTP Surface
//!
//! Three endpoints: `POST /api/reprice`, `GET
//! /api/product/{productId}/price`, and `GET /api/query`. The two GET
//! endpoints sit behind a [`tower::limit::ConcurrencyLimitLayer`] admission
//! semaphore; `POST /api/reprice` is deliberately left unthrottled -- its
//! own backpressure comes from the write queue, not an admission semaphore.

mod dto;
mod error;
mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use price_history_domain::repositories::price::{PriceLogRetriever, PriceModel};
use tower::limit::ConcurrencyLimitLayer;

/// Everything a handler needs: the combined read/write model for `reprice`
/// and the product-price lookup, and the historical-query reader, which
/// deliberately bypasses the memory store (see `engine::startup::Engine::price_log_reader`).
#[derive(Clone)]
pub struct AppState {
    pub price_model: Arc<dyn PriceModel>,
    pub price_log_reader: Arc<dyn PriceLogRetriever>,
    pub default_page_size: u32,
}

/// Builds the full router: an unthrottled write route and a
/// concurrency-limited pair of read routes, merged into one [`Router`].
pub fn router(state: AppState, read_concurrency_limit: usize) -> Router {
    let reprice_routes = Router::new().route("/api/reprice", post(handlers::reprice));

    let read_routes = Router::new()
        .route("/api/product/:product_id/price", get(handlers::product_price))
        .route("/api/query", get(handlers::query))
        .layer(ConcurrencyLimitLayer::new(read_concurrency_limit.max(1)));

    reprice_routes.merge(read_routes).with_state(state)
}
