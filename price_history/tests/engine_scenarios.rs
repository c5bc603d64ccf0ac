// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! End-to-end scenarios against a fully wired [`Engine`] on real disk: the
//! literal `updatePrice`/`lastPrice`/`priceLog` surface the HTTP adapter
//! calls through, rather than any one component in isolation.

use std::time::Duration;

use chrono::Utc;
use price_history::Engine;
use price_history_domain::entities::logged_price::PriceLogQuery;
use price_history_domain::value_objects::decimal::Decimal;
use price_history_domain::value_objects::product_id::ProductId;

async fn start(dir: &std::path::Path, max_records_per_file: u32, flush_interval: Duration) -> Engine {
    Engine::start(dir, max_records_per_file, flush_interval, 64).await.unwrap()
}

/// Drives the flush loop's background ticker past `flush_interval` on
/// paused virtual time, then yields a few times so the now-ready tick is
/// actually polled and the idle batch finalized -- avoids a real sleep with
/// a hand-picked margin for scenarios that only wait on that ticker.
async fn advance_past_flush_interval(flush_interval: Duration) {
    tokio::time::advance(flush_interval + Duration::from_millis(1)).await;
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn missing_then_set() {
    let dir = tempfile::tempdir().unwrap();
    let engine = start(dir.path(), 100, Duration::from_millis(30)).await;
    let model = engine.price_model();

    let before_write = Utc::now();
    assert!(model.last_price(&ProductId::new("foo")).await.unwrap().is_none());

    model.update_price(ProductId::new("foo"), Decimal::parse("3.50").unwrap()).await.unwrap();

    let entry = model.last_price(&ProductId::new("foo")).await.unwrap().unwrap();
    assert_eq!(entry.price.as_str(), "3.50");
    assert!(entry.timestamp >= before_write);

    drop(model);
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn overwrite_emits_previous_price_and_non_decreasing_timestamp() {
    let dir = tempfile::tempdir().unwrap();
    let flush_interval = Duration::from_millis(30);
    let engine = start(dir.path(), 100, flush_interval).await;
    let model = engine.price_model();

    model.update_price(ProductId::new("foo"), Decimal::parse("3.50").unwrap()).await.unwrap();
    let first = model.last_price(&ProductId::new("foo")).await.unwrap().unwrap();

    model.update_price(ProductId::new("foo"), Decimal::parse("42.0").unwrap()).await.unwrap();
    let second = model.last_price(&ProductId::new("foo")).await.unwrap().unwrap();

    assert_eq!(second.price.as_str(), "42.0");
    assert!(second.timestamp >= first.timestamp);

    // Drive the flush ticker so both records are durable, then confirm the
    // second record's previousPrice on disk matches the first's price.
    advance_past_flush_interval(flush_interval).await;
    let reader = engine.price_log_reader();
    let rows = reader
        .price_log(PriceLogQuery {
            product_id: Some(ProductId::new("foo")),
            from: None,
            to: Utc::now(),
            offset: 0,
            limit: 10,
        })
        .await
        .unwrap();
    assert_eq!(rows.len(), 2, "both the first write and the overwrite should be durable: {rows:?}");
    assert_eq!(rows[0].price.as_str(), "3.50", "priceLog returns ascending chronological order");
    assert_eq!(rows[1].price.as_str(), "42.0");

    drop(model);
    engine.shutdown().await;
}

#[tokio::test]
async fn independence_across_products() {
    let dir = tempfile::tempdir().unwrap();
    let engine = start(dir.path(), 100, Duration::from_millis(30)).await;
    let model = engine.price_model();

    model.update_price(ProductId::new("foo"), Decimal::parse("3.50").unwrap()).await.unwrap();
    model.update_price(ProductId::new("bar"), Decimal::parse("21.00").unwrap()).await.unwrap();

    assert_eq!(
        model.last_price(&ProductId::new("foo")).await.unwrap().unwrap().price.as_str(),
        "3.50"
    );
    assert_eq!(
        model.last_price(&ProductId::new("bar")).await.unwrap().unwrap().price.as_str(),
        "21.00"
    );

    drop(model);
    engine.shutdown().await;
}

#[tokio::test]
async fn batch_boundary_splits_into_two_files_at_capacity() {
    let dir = tempfile::tempdir().unwrap();
    let engine = start(dir.path(), 3, Duration::from_secs(60)).await;
    let model = engine.price_model();

    for i in 0..4 {
        model
            .update_price(ProductId::new("widget"), Decimal::parse(format!("{}", i + 1)).unwrap())
            .await
            .unwrap();
    }
    // Force the still-open second batch to finalize so its file appears on
    // disk for the assertion below.
    drop(model);
    engine.shutdown().await;

    let entries = std::fs::read_dir(dir.path().join("results")).unwrap();
    let mut names: Vec<String> = entries.map(|e| e.unwrap().file_name().to_string_lossy().into_owned()).collect();
    names.sort();
    assert_eq!(names.len(), 2, "4 records at MaxRecordsPerFile=3 should produce exactly two files");

    use price_history_domain::value_objects::filename::Filename;
    let first = Filename::decode(&names[0]).unwrap();
    let second = Filename::decode(&names[1]).unwrap();
    assert_eq!(first.n_records, 3);
    assert_eq!(second.n_records, 1);
}

#[tokio::test]
async fn time_boundary_splits_into_two_files_under_capacity() {
    // Rollover here is decided by comparing real record timestamps
    // (`chrono::Utc::now()`, set when the write is accepted) against the
    // batch's start time, not by a tokio timer -- paused virtual time
    // would never move them apart, so this one still needs a real sleep.
    let dir = tempfile::tempdir().unwrap();
    let engine = start(dir.path(), 100, Duration::from_millis(40)).await;
    let model = engine.price_model();

    model.update_price(ProductId::new("widget"), Decimal::parse("1").unwrap()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(80)).await;
    model.update_price(ProductId::new("widget"), Decimal::parse("2").unwrap()).await.unwrap();

    drop(model);
    engine.shutdown().await;

    let entries = std::fs::read_dir(dir.path().join("results")).unwrap();
    let names: Vec<String> = entries.map(|e| e.unwrap().file_name().to_string_lossy().into_owned()).collect();
    assert_eq!(names.len(), 2, "a write past FlushInterval should roll the batch over even under capacity");
}

#[tokio::test(start_paused = true)]
async fn restart_recovers_sequence_cursor_and_prior_prices() {
    let dir = tempfile::tempdir().unwrap();
    let flush_interval = Duration::from_millis(20);

    {
        let engine = start(dir.path(), 100, flush_interval).await;
        let model = engine.price_model();
        model.update_price(ProductId::new("widget"), Decimal::parse("1.00").unwrap()).await.unwrap();
        model.update_price(ProductId::new("widget"), Decimal::parse("2.00").unwrap()).await.unwrap();
        drop(model);
        engine.shutdown().await;
    }

    // A fresh Engine over the same data root must not reuse a fileSeq the
    // first process already finalized, and must still answer `lastPrice`
    // for a product it has not seen in this process's own memory.
    let engine = start(dir.path(), 100, flush_interval).await;
    let model = engine.price_model();
    let entry = model.last_price(&ProductId::new("widget")).await.unwrap().unwrap();
    assert_eq!(entry.price.as_str(), "2.00");

    model.update_price(ProductId::new("widget"), Decimal::parse("3.00").unwrap()).await.unwrap();
    advance_past_flush_interval(flush_interval).await;
    drop(model);
    engine.shutdown().await;

    let names: Vec<_> = std::fs::read_dir(dir.path().join("results")).unwrap().map(|e| e.unwrap().file_name()).collect();
    assert_eq!(names.len(), 2, "the second process's batch must not collide with the first's fileSeq");
}

#[tokio::test(start_paused = true)]
async fn global_query_spans_every_product() {
    let dir = tempfile::tempdir().unwrap();
    let flush_interval = Duration::from_millis(20);
    let engine = start(dir.path(), 100, flush_interval).await;
    let model = engine.price_model();

    model.update_price(ProductId::new("a"), Decimal::parse("1").unwrap()).await.unwrap();
    model.update_price(ProductId::new("b"), Decimal::parse("2").unwrap()).await.unwrap();
    model.update_price(ProductId::new("a"), Decimal::parse("3").unwrap()).await.unwrap();

    advance_past_flush_interval(flush_interval).await;

    let reader = engine.price_log_reader();
    let rows = reader
        .price_log(PriceLogQuery { product_id: None, from: None, to: Utc::now(), offset: 0, limit: 10 })
        .await
        .unwrap();
    assert_eq!(rows.len(), 3, "an unfiltered query spans every product's records: {rows:?}");

    drop(model);
    engine.shutdown().await;
}
