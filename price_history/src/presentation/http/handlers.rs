// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Handler functions for the three endpoints. Each validates its input into
//! domain types, calls the core through the capability trait it was handed
//! in [`super::AppState`], and translates the result back into a response --
//! no linearization or storage logic lives here.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use price_history_domain::entities::logged_price::PriceLogQuery;
use price_history_domain::error::PriceHistoryError;
use price_history_domain::value_objects::decimal::Decimal;
use price_history_domain::value_objects::product_id::ProductId;

use super::dto::{LoggedPriceResponse, ProductPriceResponse, QueryParams, RepriceRequest};
use super::error::ApiError;
use super::AppState;

const DEFAULT_PAGE_NUMBER: u32 = 1;

/// `POST /api/reprice` -- accepts a new price and returns immediately with
/// a "non-committal" `202 Accepted`: the response does not wait for the
/// record to be durable on disk.
pub async fn reprice(State(state): State<AppState>, Json(body): Json<RepriceRequest>) -> Result<StatusCode, ApiError> {
    if body.product_id.trim().is_empty() {
        return Err(PriceHistoryError::input_validation("productId must not be empty").into());
    }
    let price = Decimal::parse(body.price)?;
    state.price_model.update_price(ProductId::new(body.product_id), price).await?;
    Ok(StatusCode::ACCEPTED)
}

/// `GET /api/product/{productId}/price` -- `404` when the product has no
/// recorded price.
pub async fn product_price(State(state): State<AppState>, Path(product_id): Path<String>) -> Result<Response, ApiError> {
    let product_id = ProductId::new(product_id);
    let entry = state.price_model.last_price(&product_id).await?;

    match entry {
        Some(entry) => Ok(Json(ProductPriceResponse {
            product_id: product_id.as_str().to_string(),
            price: entry.price.as_str().to_string(),
            timestamp: entry.timestamp,
        })
        .into_response()),
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

/// `GET /api/query` -- paginated, time-windowed historical query.
/// `pageNumber`/`pageSize` are translated into `offset`/`limit`:
/// `offset = (pageNumber - 1) * pageSize`, clamped to `>= 0`.
pub async fn query(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<Vec<LoggedPriceResponse>>, ApiError> {
    let from = parse_optional_rfc3339("from", params.from.as_deref())?;
    let to = match parse_optional_rfc3339("to", params.to.as_deref())? {
        Some(to) => to,
        None => Utc::now(),
    };

    let page_size = params.page_size.unwrap_or(state.default_page_size).max(1) as i64;
    let page_number = params.page_number.unwrap_or(DEFAULT_PAGE_NUMBER).max(1) as i64;
    let offset = ((page_number - 1) * page_size).max(0);

    let product_id = match params.product_id {
        Some(id) if !id.trim().is_empty() => Some(ProductId::new(id)),
        _ => None,
    };

    let query = PriceLogQuery {
        product_id,
        from,
        to,
        offset,
        limit: page_size as usize,
    };

    let rows = state.price_log_reader.price_log(query).await?;
    Ok(Json(rows.into_iter().map(LoggedPriceResponse::from).collect()))
}

fn parse_optional_rfc3339(field: &'static str, raw: Option<&str>) -> Result<Option<DateTime<Utc>>, ApiError> {
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| ApiError(PriceHistoryError::input_validation(format!("invalid `{field}`: {e}")))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_rfc3339() {
        let parsed = parse_optional_rfc3339("from", Some("2026-01-01T00:00:00Z")).unwrap();
        assert!(parsed.is_some());
    }

    #[test]
    fn empty_string_is_none() {
        assert!(parse_optional_rfc3339("from", Some("")).unwrap().is_none());
        assert!(parse_optional_rfc3339("from", None).unwrap().is_none());
    }

    #[test]
    fn malformed_timestamp_is_input_validation_error() {
        let err = parse_optional_rfc3339("from", Some("not-a-date")).unwrap_err();
        assert_eq!(err.0.kind(), price_history_domain::error::ErrorKind::InputValidation);
    }
}
