// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Maps [`PriceHistoryError`]'s [`ErrorKind`] onto an HTTP status: `400` for
//! `InputValidation`, `503` for `BackpressureTemporary`, `500` for
//! `InvariantViolation`/`StorageIo`. `NotFound` has no variant here -- a
//! missing product is an empty `200`/`404` body constructed directly by the
//! handler, never an error that reaches this type.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use price_history_domain::error::{ErrorKind, PriceHistoryError};
use serde::Serialize;

/// Thin wrapper so this crate can implement [`IntoResponse`] for a
/// domain-crate error type without violating the orphan rule.
pub struct ApiError(pub PriceHistoryError);

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl From<PriceHistoryError> for ApiError {
    fn from(err: PriceHistoryError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            ErrorKind::InputValidation => StatusCode::BAD_REQUEST,
            ErrorKind::BackpressureTemporary => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::InvariantViolation | ErrorKind::StorageIo => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed with a server error");
        }

        (status, Json(ErrorBody { error: self.0.to_string() })).into_response()
    }
}
