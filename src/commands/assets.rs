// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{Asset, NON_QUANTITY};
use crate::options;
use crate::quotes::{QuoteSource, YahooQuotes};
use crate::store::{self, Doc, paths};
use crate::utils::{
    coerce_decimal, coerce_i64, maybe_print_json, parse_date, parse_decimal, pretty_table,
    str_field,
};
use anyhow::{Context, Result, anyhow, bail};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde_json::{Map, Value, json};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let quotes = YahooQuotes::new()?;
            add_cmd(conn, sub, &quotes)?;
        }
        Some(("buy", sub)) => {
            let quotes = YahooQuotes::new()?;
            trade_cmd(conn, sub, TradeAction::Buy, &quotes)?;
        }
        Some(("sell", sub)) => {
            let quotes = YahooQuotes::new()?;
            trade_cmd(conn, sub, TradeAction::Sell, &quotes)?;
        }
        Some(("update", sub)) => update_cmd(conn, sub)?,
        Some(("rm", sub)) => {
            let uid = sub.get_one::<String>("user").unwrap();
            let id = sub.get_one::<String>("id").unwrap();
            delete(conn, uid, id)?;
            println!("Removed asset {}", id);
        }
        Some(("list", sub)) => list_cmd(conn, sub)?,
        _ => {}
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeAction {
    Buy,
    Sell,
}

#[derive(Debug, Clone)]
pub struct NewAsset {
    pub item: String,
    pub asset_type: String,
    pub acquisition_date: String,
    pub acquisition_value: Decimal,
    pub quantity: i64,
    pub notes: Option<String>,
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// Item already held: treated as a buy against the existing record.
    Bought { id: String, quantity: i64 },
    Created { id: String },
}

pub fn find_by_name(conn: &Connection, uid: &str, item: &str) -> Result<Option<Doc>> {
    Ok(store::list(conn, &paths::assets(uid))?
        .into_iter()
        .find(|d| str_field(&d.data, "item") == item))
}

fn load_asset(doc: &Doc) -> Result<Asset> {
    serde_json::from_value(doc.data.clone())
        .with_context(|| format!("asset record {} is malformed", doc.id))
}

/// Add a holding. An existing item is a buy: quantity grows, the
/// acquisition value grows by shares x fresh price, and the position is
/// revalued. A new tradable item is priced from the quote source and
/// registered in the shared catalog; anything else is valued at its
/// acquisition value and never priced externally.
pub fn submit_stock(
    conn: &mut Connection,
    uid: &str,
    input: NewAsset,
    quotes: &dyn QuoteSource,
) -> Result<SubmitOutcome> {
    parse_date(&input.acquisition_date)?;
    if input.acquisition_value < Decimal::ZERO {
        bail!("acquisition value must not be negative");
    }
    if input.quantity < NON_QUANTITY {
        bail!("quantity must be -1 or a non-negative share count");
    }

    if let Some(existing) = find_by_name(conn, uid, &input.item)? {
        let asset = load_asset(&existing)?;
        let shares = input.quantity.max(0);
        let price = quotes
            .lookup(&input.item)
            .ok_or_else(|| anyhow!("no market price available for '{}'", input.item))?;
        let quantity = asset.quantity.max(0) + shares;
        let acquisition_value = asset.acquisition_value + price * Decimal::from(shares);
        let current_amount = price * Decimal::from(quantity);
        store::update(
            conn,
            &paths::assets(uid),
            &existing.id,
            &json!({
                "quantity": quantity,
                "current_price": price,
                "acquisition_value": acquisition_value,
                "current_amount": current_amount,
            }),
        )?;
        return Ok(SubmitOutcome::Bought {
            id: existing.id,
            quantity,
        });
    }

    let opts = options::load(conn, uid).unwrap_or_default();
    let tradable = opts.fixed_assets().iter().any(|t| t == &input.asset_type);

    let mut current_price = None;
    let mut current_amount = input.acquisition_value;
    if tradable {
        match quotes.lookup(&input.item) {
            Some(price) => {
                current_price = Some(price);
                current_amount = price * Decimal::from(input.quantity.max(0));
            }
            None => eprintln!(
                "warning: no market price for '{}'; keeping acquisition value",
                input.item
            ),
        }
    }

    let mut asset = Asset {
        id: 0,
        item: input.item,
        asset_type: input.asset_type,
        acquisition_date: input.acquisition_date,
        acquisition_value: input.acquisition_value,
        current_price,
        current_amount,
        quantity: input.quantity,
        notes: input.notes,
    };

    let assets_path = paths::assets(uid);
    let tx = conn.transaction()?;
    let id = store::next_record_id(&tx, &assets_path)?;
    asset.id = id;
    store::add(
        &tx,
        &assets_path,
        &serde_json::to_value(&asset)?,
        Some(&id.to_string()),
    )?;
    tx.commit()?;

    // Price-fetch cost is shared through the catalog, not paid per user.
    if tradable && asset.quantity > 0 && !store::exists(conn, paths::STOCK_CATALOG, &asset.item)? {
        crate::commands::stocks::register_entry(conn, &asset.item, asset.current_price)?;
    }

    Ok(SubmitOutcome::Created { id: id.to_string() })
}

/// Reconcile an existing position after a buy or sell at the current
/// market price. Sells are bounded by the held quantity and release a
/// proportional share of the acquisition cost.
pub fn adjust_position(
    conn: &Connection,
    uid: &str,
    item: &str,
    action: TradeAction,
    shares: i64,
    quotes: &dyn QuoteSource,
) -> Result<()> {
    if shares <= 0 {
        bail!("shares must be a positive integer");
    }
    let existing = find_by_name(conn, uid, item)?
        .ok_or_else(|| anyhow!("no asset named '{}' for user '{}'", item, uid))?;
    let asset = load_asset(&existing)?;
    if asset.quantity < 0 {
        bail!("'{}' is not a tradable position", item);
    }
    let price = quotes
        .lookup(item)
        .ok_or_else(|| anyhow!("no market price available for '{}'", item))?;

    let (quantity, acquisition_value) = match action {
        TradeAction::Buy => (
            asset.quantity + shares,
            asset.acquisition_value + price * Decimal::from(shares),
        ),
        TradeAction::Sell => {
            if shares > asset.quantity {
                bail!(
                    "cannot sell {} shares of '{}'; only {} held",
                    shares,
                    item,
                    asset.quantity
                );
            }
            let remaining = asset.quantity - shares;
            let released = asset.acquisition_value * Decimal::from(remaining)
                / Decimal::from(asset.quantity);
            (remaining, released)
        }
    };
    let current_amount = price * Decimal::from(quantity);

    store::update(
        conn,
        &paths::assets(uid),
        &existing.id,
        &json!({
            "quantity": quantity,
            "current_price": price,
            "acquisition_value": acquisition_value,
            "current_amount": current_amount,
        }),
    )?;
    Ok(())
}

/// Whitelisted partial update; acquisition_value also resets the
/// current amount, as a manual revaluation.
pub fn update_fields(
    conn: &Connection,
    uid: &str,
    asset_id: &str,
    patch: &Map<String, Value>,
) -> Result<()> {
    const ALLOWED: [&str; 6] = [
        "item",
        "asset_type",
        "acquisition_date",
        "acquisition_value",
        "quantity",
        "notes",
    ];
    let mut payload = Map::new();
    for field in ALLOWED {
        let Some(v) = patch.get(field) else { continue };
        match field {
            "acquisition_value" => {
                let d = coerce_decimal(v).context("acquisition_value must be numeric")?;
                if d < Decimal::ZERO {
                    bail!("acquisition_value must not be negative");
                }
                payload.insert(field.to_string(), json!(d));
                payload.insert("current_amount".to_string(), json!(d));
            }
            "quantity" => {
                let q = coerce_i64(v).context("quantity must be an integer")?;
                if q < NON_QUANTITY {
                    bail!("quantity must be -1 or a non-negative share count");
                }
                payload.insert(field.to_string(), json!(q));
            }
            "acquisition_date" => {
                let date = v.as_str().context("acquisition_date must be a string")?;
                parse_date(date)?;
                payload.insert(field.to_string(), v.clone());
            }
            _ => {
                payload.insert(field.to_string(), v.clone());
            }
        }
    }
    if payload.is_empty() {
        bail!("no updatable fields supplied");
    }
    store::update(conn, &paths::assets(uid), asset_id, &Value::Object(payload))?;
    Ok(())
}

pub fn delete(conn: &Connection, uid: &str, asset_id: &str) -> Result<()> {
    store::delete(conn, &paths::assets(uid), asset_id)?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetView {
    All,
    Tradable,
    NonTradable,
}

/// Holdings filtered the way the stock and asset screens split them:
/// by membership of the asset type in the tradable set.
pub fn list_assets(conn: &Connection, uid: &str, view: AssetView) -> Result<Vec<Doc>> {
    let docs = store::list(conn, &paths::assets(uid))?;
    if view == AssetView::All {
        return Ok(docs);
    }
    let tradable_types = options::load(conn, uid).unwrap_or_default().tradable_types();
    Ok(docs
        .into_iter()
        .filter(|d| {
            let is_tradable = tradable_types
                .iter()
                .any(|t| t == str_field(&d.data, "asset_type"));
            match view {
                AssetView::Tradable => is_tradable,
                AssetView::NonTradable => !is_tradable,
                AssetView::All => true,
            }
        })
        .collect())
}

fn add_cmd(conn: &mut Connection, sub: &clap::ArgMatches, quotes: &dyn QuoteSource) -> Result<()> {
    let uid = sub.get_one::<String>("user").unwrap();
    let input = NewAsset {
        item: sub.get_one::<String>("item").unwrap().trim().to_string(),
        asset_type: sub.get_one::<String>("type").unwrap().trim().to_string(),
        acquisition_date: sub.get_one::<String>("date").unwrap().trim().to_string(),
        acquisition_value: parse_decimal(sub.get_one::<String>("value").unwrap().trim())?,
        quantity: *sub.get_one::<i64>("quantity").unwrap(),
        notes: sub.get_one::<String>("notes").cloned(),
    };
    match submit_stock(conn, uid, input, quotes)? {
        SubmitOutcome::Bought { id, quantity } => {
            println!("Bought into existing asset {} (now {} shares)", id, quantity)
        }
        SubmitOutcome::Created { id } => println!("Added asset {}", id),
    }
    Ok(())
}

fn trade_cmd(
    conn: &Connection,
    sub: &clap::ArgMatches,
    action: TradeAction,
    quotes: &dyn QuoteSource,
) -> Result<()> {
    let uid = sub.get_one::<String>("user").unwrap();
    let item = sub.get_one::<String>("item").unwrap().trim().to_string();
    let shares = *sub.get_one::<i64>("shares").unwrap();
    adjust_position(conn, uid, &item, action, shares, quotes)?;
    let verb = match action {
        TradeAction::Buy => "Bought",
        TradeAction::Sell => "Sold",
    };
    println!("{} {} x {}", verb, shares, item);
    Ok(())
}

fn update_cmd(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let uid = sub.get_one::<String>("user").unwrap();
    let id = sub.get_one::<String>("id").unwrap();
    let mut patch = Map::new();
    for (arg, field) in [
        ("item", "item"),
        ("type", "asset_type"),
        ("date", "acquisition_date"),
        ("value", "acquisition_value"),
        ("quantity", "quantity"),
        ("notes", "notes"),
    ] {
        if let Some(v) = sub.get_one::<String>(arg) {
            patch.insert(field.to_string(), json!(v));
        }
    }
    update_fields(conn, uid, id, &patch)?;
    println!("Updated asset {}", id);
    Ok(())
}

fn list_cmd(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let uid = sub.get_one::<String>("user").unwrap();
    let view = if sub.get_flag("tradable") {
        AssetView::Tradable
    } else if sub.get_flag("non-tradable") {
        AssetView::NonTradable
    } else {
        AssetView::All
    };
    let docs = list_assets(conn, uid, view)?;
    let data: Vec<Value> = docs.into_iter().map(|d| d.data).collect();
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .iter()
            .map(|v| {
                vec![
                    v.get("id").map(|i| i.to_string()).unwrap_or_default(),
                    str_field(v, "item").to_string(),
                    str_field(v, "asset_type").to_string(),
                    v.get("quantity").map(|q| q.to_string()).unwrap_or_default(),
                    coerce_decimal(v.get("current_price").unwrap_or(&Value::Null))
                        .map(|d| format!("{:.2}", d))
                        .unwrap_or_default(),
                    coerce_decimal(v.get("current_amount").unwrap_or(&Value::Null))
                        .map(|d| format!("{:.2}", d))
                        .unwrap_or_default(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["ID", "Item", "Type", "Qty", "Price", "Value"], rows)
        );
    }
    Ok(())
}
