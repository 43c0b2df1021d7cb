// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::{expenses, ledgers};
use crate::store::{self, paths};
use crate::utils::{coerce_i64, str_field};
use anyhow::Result;
use rusqlite::Connection;
use serde_json::Value;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("expenses", sub)) => export_expenses(conn, sub),
        Some(("assets", sub)) => export_assets(conn, sub),
        _ => Ok(()),
    }
}

fn sorted_by_record_id(mut docs: Vec<store::Doc>) -> Vec<Value> {
    docs.sort_by_key(|d| d.data.get("id").and_then(coerce_i64).unwrap_or(0));
    docs.into_iter().map(|d| d.data).collect()
}

fn export_expenses(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let uid = sub.get_one::<String>("user").unwrap();
    let kind = ledgers::parse_kind(sub)?;
    let ledger = sub.get_one::<String>("ledger").unwrap();
    let fmt = sub.get_one::<String>("format").unwrap().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap();

    let rows = sorted_by_record_id(store::list(
        conn,
        &expenses::collection_path(uid, kind, ledger),
    )?);

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record([
                "id",
                "date",
                "item",
                "amount",
                "payment_method",
                "category",
                "transactionType",
                "merchant",
                "notes",
                "invoice_number",
            ])?;
            for v in &rows {
                wtr.write_record([
                    v.get("id").map(|i| i.to_string()).unwrap_or_default(),
                    str_field(v, "date").to_string(),
                    str_field(v, "item").to_string(),
                    v.get("amount").map(|a| a.to_string()).unwrap_or_default(),
                    str_field(v, "payment_method").to_string(),
                    str_field(v, "category").to_string(),
                    str_field(v, "transactionType").to_string(),
                    str_field(v, "merchant").to_string(),
                    str_field(v, "notes").to_string(),
                    str_field(v, "invoice_number").to_string(),
                ])?;
            }
            wtr.flush()?;
        }
        _ => {
            std::fs::write(out, serde_json::to_string_pretty(&rows)?)?;
        }
    }
    println!("Exported {} expenses to {}", rows.len(), out);
    Ok(())
}

fn export_assets(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let uid = sub.get_one::<String>("user").unwrap();
    let fmt = sub.get_one::<String>("format").unwrap().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap();

    let rows = sorted_by_record_id(store::list(conn, &paths::assets(uid))?);

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record([
                "id",
                "item",
                "asset_type",
                "acquisition_date",
                "acquisition_value",
                "current_amount",
                "quantity",
                "current_price",
                "notes",
            ])?;
            for v in &rows {
                wtr.write_record([
                    v.get("id").map(|i| i.to_string()).unwrap_or_default(),
                    str_field(v, "item").to_string(),
                    str_field(v, "asset_type").to_string(),
                    str_field(v, "acquisition_date").to_string(),
                    str_field(v, "acquisition_value").to_string(),
                    str_field(v, "current_amount").to_string(),
                    v.get("quantity").map(|q| q.to_string()).unwrap_or_default(),
                    str_field(v, "current_price").to_string(),
                    str_field(v, "notes").to_string(),
                ])?;
            }
            wtr.flush()?;
        }
        _ => {
            std::fs::write(out, serde_json::to_string_pretty(&rows)?)?;
        }
    }
    println!("Exported {} assets to {}", rows.len(), out);
    Ok(())
}
