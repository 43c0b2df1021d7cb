// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{NON_QUANTITY, StockEntry};
use crate::quotes::{QuoteSource, YahooQuotes};
use crate::store::{self, StoreError, paths};
use crate::utils::{coerce_decimal, coerce_i64, pretty_table, str_field};
use anyhow::Result;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::collections::HashMap;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("register", sub)) => {
            let ticker = sub.get_one::<String>("ticker").unwrap().trim().to_string();
            let quotes = YahooQuotes::new()?;
            let price = quotes.lookup(&ticker);
            if price.is_none() {
                eprintln!("warning: no market price for '{}' yet", ticker);
            }
            register_entry(conn, &ticker, price)?;
            println!("Registered '{}' in the stock catalog", ticker);
        }
        Some(("list", _)) => list(conn)?,
        Some(("refresh", _)) => {
            let quotes = YahooQuotes::new()?;
            let updated = refresh_all(conn, &quotes)?;
            println!("Refreshed {} catalog prices", updated);
        }
        Some(("sync", sub)) => {
            let uid = sub.get_one::<String>("user").unwrap();
            let synced = sync_user(conn, uid)?;
            println!("Synced {} positions for '{}'", synced, uid);
        }
        _ => {}
    }
    Ok(())
}

/// Insert a catalog entry keyed by ticker; already-present tickers are
/// left alone (the scheduled refresh owns price updates).
pub fn register_entry(conn: &Connection, ticker: &str, price: Option<Decimal>) -> Result<()> {
    let entry = StockEntry {
        item: ticker.to_string(),
        current_price: price,
    };
    match store::add(
        conn,
        paths::STOCK_CATALOG,
        &serde_json::to_value(&entry)?,
        Some(ticker),
    ) {
        Ok(_) | Err(StoreError::Duplicate { .. }) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Re-fetch every catalog price. Idempotent, no ordering between
/// tickers; one bad ticker never aborts the rest, and a miss keeps the
/// last cached value.
pub fn refresh_all(conn: &Connection, quotes: &dyn QuoteSource) -> Result<usize> {
    let entries = store::list(conn, paths::STOCK_CATALOG)?;
    let mut updated = 0;
    for doc in entries {
        let ticker = str_field(&doc.data, "item");
        if ticker.is_empty() {
            eprintln!("warning: catalog entry {} has no ticker; skipped", doc.id);
            continue;
        }
        match quotes.lookup(ticker) {
            Some(price) => {
                if let Err(e) = store::update(
                    conn,
                    paths::STOCK_CATALOG,
                    &doc.id,
                    &json!({"current_price": price}),
                ) {
                    eprintln!("warning: could not update '{}': {}", ticker, e);
                    continue;
                }
                println!("Updated {} price to {}", ticker, price);
                updated += 1;
            }
            None => eprintln!("warning: no price for '{}'; keeping cached value", ticker),
        }
    }
    Ok(updated)
}

pub fn catalog_prices(conn: &Connection) -> Result<HashMap<String, Decimal>> {
    let mut out = HashMap::new();
    for doc in store::list(conn, paths::STOCK_CATALOG)? {
        let ticker = str_field(&doc.data, "item");
        if ticker.is_empty() {
            continue;
        }
        if let Some(price) = doc.data.get("current_price").and_then(coerce_decimal) {
            out.insert(ticker.to_string(), price);
        }
    }
    Ok(out)
}

/// Revalue every tradable position of one user from the cached catalog
/// prices. Positions whose ticker has no cached price stay unmodified.
pub fn sync_user(conn: &Connection, uid: &str) -> Result<usize> {
    let prices = catalog_prices(conn)?;
    let assets_path = paths::assets(uid);
    let mut synced = 0;
    for doc in store::list(conn, &assets_path)? {
        let quantity = doc
            .data
            .get("quantity")
            .and_then(coerce_i64)
            .unwrap_or(NON_QUANTITY);
        if quantity < 0 {
            continue;
        }
        let item = str_field(&doc.data, "item");
        let Some(price) = prices.get(item) else {
            eprintln!(
                "warning: no cached price for '{}'; asset {} left unmodified",
                item, doc.id
            );
            continue;
        };
        let amount = *price * Decimal::from(quantity);
        store::update(
            conn,
            &assets_path,
            &doc.id,
            &json!({"current_price": price, "current_amount": amount}),
        )?;
        synced += 1;
    }
    Ok(synced)
}

fn list(conn: &Connection) -> Result<()> {
    let docs = store::list(conn, paths::STOCK_CATALOG)?;
    let rows = docs
        .iter()
        .map(|d| {
            vec![
                str_field(&d.data, "item").to_string(),
                coerce_decimal(d.data.get("current_price").unwrap_or(&Value::Null))
                    .map(|p| format!("{:.2}", p))
                    .unwrap_or_else(|| "unavailable".to_string()),
            ]
        })
        .collect();
    println!("{}", pretty_table(&["Ticker", "Price"], rows));
    Ok(())
}
