// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use ledgerclip::commands::{assets, stocks, users};
use ledgerclip::commands::assets::{AssetView, NewAsset, SubmitOutcome, TradeAction};
use ledgerclip::quotes::QuoteSource;
use ledgerclip::store::{self, paths};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde_json::json;
use std::cell::Cell;
use std::collections::HashMap;

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        r#"
        CREATE TABLE documents(
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY(collection, id)
        );
        "#,
    )
    .unwrap();
    conn
}

struct CountingQuote {
    price: Option<Decimal>,
    calls: Cell<usize>,
}

impl CountingQuote {
    fn some(price: i64) -> Self {
        CountingQuote {
            price: Some(Decimal::from(price)),
            calls: Cell::new(0),
        }
    }

    fn none() -> Self {
        CountingQuote {
            price: None,
            calls: Cell::new(0),
        }
    }
}

impl QuoteSource for CountingQuote {
    fn lookup(&self, _ticker: &str) -> Option<Decimal> {
        self.calls.set(self.calls.get() + 1);
        self.price
    }
}

struct MapQuote(HashMap<String, Decimal>);

impl QuoteSource for MapQuote {
    fn lookup(&self, ticker: &str) -> Option<Decimal> {
        self.0.get(ticker).copied()
    }
}

fn new_asset(item: &str, asset_type: &str, value: i64, quantity: i64) -> NewAsset {
    NewAsset {
        item: item.to_string(),
        asset_type: asset_type.to_string(),
        acquisition_date: "2025/08/01".to_string(),
        acquisition_value: Decimal::from(value),
        quantity,
        notes: None,
    }
}

fn dec(v: &serde_json::Value, field: &str) -> Decimal {
    ledgerclip::utils::coerce_decimal(v.get(field).unwrap()).unwrap()
}

#[test]
fn non_tradable_assets_are_never_priced_externally() {
    let mut conn = setup();
    users::register(&mut conn, "u1", "u1@example.com", None).unwrap();

    let quotes = CountingQuote::some(600);
    let outcome =
        assets::submit_stock(&mut conn, "u1", new_asset("定存A", "定期存款", 100_000, -1), &quotes)
            .unwrap();
    assert!(matches!(outcome, SubmitOutcome::Created { .. }));
    assert_eq!(quotes.calls.get(), 0);

    let doc = store::get(&conn, &paths::assets("u1"), "1").unwrap().unwrap();
    assert_eq!(dec(&doc.data, "current_amount"), Decimal::from(100_000));
    assert_eq!(doc.data["quantity"], json!(-1));
    assert!(doc.data.get("current_price").is_none());
    // nothing lands in the shared catalog
    assert!(store::list(&conn, paths::STOCK_CATALOG).unwrap().is_empty());
}

#[test]
fn new_tradable_asset_is_priced_and_cataloged() {
    let mut conn = setup();
    users::register(&mut conn, "u1", "u1@example.com", None).unwrap();

    let quotes = CountingQuote::some(600);
    assets::submit_stock(&mut conn, "u1", new_asset("2330", "股票", 5800, 10), &quotes).unwrap();

    let doc = store::get(&conn, &paths::assets("u1"), "1").unwrap().unwrap();
    assert_eq!(dec(&doc.data, "current_amount"), Decimal::from(6000));
    assert_eq!(dec(&doc.data, "current_price"), Decimal::from(600));
    assert_eq!(dec(&doc.data, "acquisition_value"), Decimal::from(5800));

    let entry = store::get(&conn, paths::STOCK_CATALOG, "2330").unwrap().unwrap();
    assert_eq!(dec(&entry.data, "current_price"), Decimal::from(600));
}

#[test]
fn resubmitting_an_item_is_a_buy() {
    let mut conn = setup();
    users::register(&mut conn, "u1", "u1@example.com", None).unwrap();

    assets::submit_stock(&mut conn, "u1", new_asset("2330", "股票", 6000, 10), &CountingQuote::some(600))
        .unwrap();
    let outcome = assets::submit_stock(
        &mut conn,
        "u1",
        new_asset("2330", "股票", 0, 5),
        &CountingQuote::some(700),
    )
    .unwrap();
    assert!(matches!(outcome, SubmitOutcome::Bought { quantity: 15, .. }));

    let doc = store::get(&conn, &paths::assets("u1"), "1").unwrap().unwrap();
    assert_eq!(doc.data["quantity"], json!(15));
    // 6000 + 5 x 700 bought at the fresh price
    assert_eq!(dec(&doc.data, "acquisition_value"), Decimal::from(9500));
    // revalued at the fresh price across the whole position
    assert_eq!(dec(&doc.data, "current_amount"), Decimal::from(10_500));
}

#[test]
fn tradable_asset_with_no_price_falls_back_to_acquisition_value() {
    let mut conn = setup();
    users::register(&mut conn, "u1", "u1@example.com", None).unwrap();

    let quotes = CountingQuote::none();
    assets::submit_stock(&mut conn, "u1", new_asset("9999", "股票", 4200, 7), &quotes).unwrap();

    let doc = store::get(&conn, &paths::assets("u1"), "1").unwrap().unwrap();
    assert_eq!(dec(&doc.data, "current_amount"), Decimal::from(4200));
    assert!(doc.data.get("current_price").is_none());
}

#[test]
fn buying_into_a_position_with_no_price_fails_without_mutation() {
    let mut conn = setup();
    users::register(&mut conn, "u1", "u1@example.com", None).unwrap();
    assets::submit_stock(&mut conn, "u1", new_asset("2330", "股票", 6000, 10), &CountingQuote::some(600))
        .unwrap();

    let err = assets::submit_stock(
        &mut conn,
        "u1",
        new_asset("2330", "股票", 0, 5),
        &CountingQuote::none(),
    );
    assert!(err.is_err());
    let doc = store::get(&conn, &paths::assets("u1"), "1").unwrap().unwrap();
    assert_eq!(doc.data["quantity"], json!(10));
}

#[test]
fn sells_are_bounded_and_release_cost_proportionally() {
    let mut conn = setup();
    users::register(&mut conn, "u1", "u1@example.com", None).unwrap();
    assets::submit_stock(&mut conn, "u1", new_asset("2330", "股票", 6000, 10), &CountingQuote::some(600))
        .unwrap();

    assets::adjust_position(&conn, "u1", "2330", TradeAction::Sell, 4, &CountingQuote::some(700))
        .unwrap();
    let doc = store::get(&conn, &paths::assets("u1"), "1").unwrap().unwrap();
    assert_eq!(doc.data["quantity"], json!(6));
    assert_eq!(dec(&doc.data, "acquisition_value"), Decimal::from(3600));
    assert_eq!(dec(&doc.data, "current_amount"), Decimal::from(4200));

    assert!(
        assets::adjust_position(&conn, "u1", "2330", TradeAction::Sell, 7, &CountingQuote::some(700))
            .is_err()
    );
    assert!(
        assets::adjust_position(&conn, "u1", "2330", TradeAction::Sell, 0, &CountingQuote::some(700))
            .is_err()
    );
    let doc = store::get(&conn, &paths::assets("u1"), "1").unwrap().unwrap();
    assert_eq!(doc.data["quantity"], json!(6));
}

#[test]
fn per_user_sync_revalues_from_cached_prices() {
    let mut conn = setup();
    users::register(&mut conn, "u1", "u1@example.com", None).unwrap();

    stocks::register_entry(&conn, "2330", Some(Decimal::from(600))).unwrap();
    let assets_path = paths::assets("u1");
    store::add(
        &conn,
        &assets_path,
        &json!({"id": 1, "item": "2330", "asset_type": "股票", "quantity": 10,
                "acquisition_value": "5000", "current_amount": "1", "acquisition_date": "2025/01/01"}),
        Some("1"),
    )
    .unwrap();
    // sentinel holding and unlisted ticker stay unmodified
    store::add(
        &conn,
        &assets_path,
        &json!({"id": 2, "item": "定存A", "asset_type": "定期存款", "quantity": -1,
                "acquisition_value": "100000", "current_amount": "100000", "acquisition_date": "2025/01/01"}),
        Some("2"),
    )
    .unwrap();
    store::add(
        &conn,
        &assets_path,
        &json!({"id": 3, "item": "8888", "asset_type": "股票", "quantity": 3,
                "acquisition_value": "900", "current_amount": "900", "acquisition_date": "2025/01/01"}),
        Some("3"),
    )
    .unwrap();

    let synced = stocks::sync_user(&conn, "u1").unwrap();
    assert_eq!(synced, 1);

    let doc = store::get(&conn, &assets_path, "1").unwrap().unwrap();
    assert_eq!(dec(&doc.data, "current_amount"), Decimal::from(6000));
    assert_eq!(dec(&doc.data, "current_price"), Decimal::from(600));

    let untouched = store::get(&conn, &assets_path, "3").unwrap().unwrap();
    assert_eq!(dec(&untouched.data, "current_amount"), Decimal::from(900));
}

#[test]
fn bulk_refresh_isolates_ticker_failures() {
    let conn = setup();
    stocks::register_entry(&conn, "2330", Some(Decimal::from(500))).unwrap();
    stocks::register_entry(&conn, "9999", Some(Decimal::from(42))).unwrap();

    let mut prices = HashMap::new();
    prices.insert("2330".to_string(), Decimal::from(650));
    let updated = stocks::refresh_all(&conn, &MapQuote(prices)).unwrap();
    assert_eq!(updated, 1);

    let hit = store::get(&conn, paths::STOCK_CATALOG, "2330").unwrap().unwrap();
    assert_eq!(dec(&hit.data, "current_price"), Decimal::from(650));
    // the miss keeps its cached value
    let miss = store::get(&conn, paths::STOCK_CATALOG, "9999").unwrap().unwrap();
    assert_eq!(dec(&miss.data, "current_price"), Decimal::from(42));
}

#[test]
fn catalog_registration_is_idempotent() {
    let conn = setup();
    stocks::register_entry(&conn, "2330", Some(Decimal::from(600))).unwrap();
    stocks::register_entry(&conn, "2330", Some(Decimal::from(999))).unwrap();
    let entry = store::get(&conn, paths::STOCK_CATALOG, "2330").unwrap().unwrap();
    assert_eq!(dec(&entry.data, "current_price"), Decimal::from(600));
}

#[test]
fn asset_views_split_on_tradable_types() {
    let mut conn = setup();
    users::register(&mut conn, "u1", "u1@example.com", None).unwrap();
    assets::submit_stock(&mut conn, "u1", new_asset("2330", "股票", 6000, 10), &CountingQuote::some(600))
        .unwrap();
    assets::submit_stock(&mut conn, "u1", new_asset("定存A", "定期存款", 100_000, -1), &CountingQuote::none())
        .unwrap();

    let tradable = assets::list_assets(&conn, "u1", AssetView::Tradable).unwrap();
    assert_eq!(tradable.len(), 1);
    assert_eq!(tradable[0].data["item"], json!("2330"));

    let rest = assets::list_assets(&conn, "u1", AssetView::NonTradable).unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].data["item"], json!("定存A"));

    assert_eq!(assets::list_assets(&conn, "u1", AssetView::All).unwrap().len(), 2);
}

#[test]
fn update_whitelists_fields_and_revalues_on_acquisition_change() {
    let mut conn = setup();
    users::register(&mut conn, "u1", "u1@example.com", None).unwrap();
    assets::submit_stock(&mut conn, "u1", new_asset("定存A", "定期存款", 100_000, -1), &CountingQuote::none())
        .unwrap();

    let mut patch = serde_json::Map::new();
    patch.insert("acquisition_value".to_string(), json!("120000"));
    patch.insert("asset_type".to_string(), json!("活期存款"));
    patch.insert("password".to_string(), json!("sneaky"));
    assets::update_fields(&conn, "u1", "1", &patch).unwrap();

    let doc = store::get(&conn, &paths::assets("u1"), "1").unwrap().unwrap();
    assert_eq!(dec(&doc.data, "acquisition_value"), Decimal::from(120_000));
    assert_eq!(dec(&doc.data, "current_amount"), Decimal::from(120_000));
    assert_eq!(doc.data["asset_type"], json!("活期存款"));
    assert!(doc.data.get("password").is_none());

    let mut bad = serde_json::Map::new();
    bad.insert("quantity".to_string(), json!("-5"));
    assert!(assets::update_fields(&conn, "u1", "1", &bad).is_err());
}
