// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::{expenses, ledgers};
use crate::models::{Asset, EXPENSE_TYPE, Expense, NON_QUANTITY};
use crate::store::{self, paths};
use crate::utils::{parse_date, parse_decimal};
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use rusqlite::Connection;
use rust_decimal::Decimal;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("expenses", sub)) => import_expenses(conn, sub),
        Some(("assets", sub)) => import_assets(conn, sub),
        _ => Ok(()),
    }
}

/// Columns: date, item, amount, payment_method, category,
/// transactionType, merchant, notes, invoice_number. The whole file is
/// applied in one transaction and ids continue the ledger's sequence.
fn import_expenses(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let uid = sub.get_one::<String>("user").unwrap().trim().to_string();
    let kind = ledgers::parse_kind(sub)?;
    let ledger = sub.get_one::<String>("ledger").unwrap().trim().to_string();
    let path = sub.get_one::<String>("path").unwrap().trim();

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Open CSV {}", path))?;

    let collection = expenses::collection_path(&uid, kind, &ledger);
    let tx = conn.transaction()?;
    let mut next_id = store::next_record_id(&tx, &collection)?;
    let mut imported = 0usize;

    for result in rdr.records() {
        let rec = result?;
        let date_raw = rec.get(0).context("date missing")?.trim().to_string();
        let item = rec.get(1).context("item missing")?.trim().to_string();
        let amount_raw = rec.get(2).context("amount missing")?.trim().to_string();
        let payment_method = rec.get(3).unwrap_or("").trim().to_string();
        let category = rec.get(4).unwrap_or("").trim().to_string();
        let transaction_type = {
            let t = rec.get(5).unwrap_or("").trim();
            if t.is_empty() { EXPENSE_TYPE } else { t }.to_string()
        };
        let optional = |i: usize| {
            rec.get(i)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };

        parse_date(&date_raw).with_context(|| format!("Invalid expense date '{}'", date_raw))?;
        let amount: i64 = amount_raw
            .parse()
            .with_context(|| format!("Invalid amount '{}' for {}", amount_raw, item))?;

        let expense = Expense {
            id: next_id,
            date: date_raw,
            item,
            amount,
            payment_method,
            category,
            transaction_type,
            merchant: optional(6),
            notes: optional(7),
            invoice_number: optional(8),
            member: None,
        };
        store::add(
            &tx,
            &collection,
            &serde_json::to_value(&expense)?,
            Some(&next_id.to_string()),
        )?;
        next_id += 1;
        imported += 1;
    }
    tx.commit()?;
    println!("Imported {} expenses from {}", imported, path);
    Ok(())
}

/// Columns: item, asset_type, acquisition_date, acquisition_value,
/// current_amount, quantity, current_price, notes.
fn import_assets(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let uid = sub.get_one::<String>("user").unwrap().trim().to_string();
    let path = sub.get_one::<String>("path").unwrap().trim();

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Open CSV {}", path))?;

    let collection = paths::assets(&uid);
    let tx = conn.transaction()?;
    let mut next_id = store::next_record_id(&tx, &collection)?;
    let mut imported = 0usize;

    for result in rdr.records() {
        let rec = result?;
        let item = rec.get(0).context("item missing")?.trim().to_string();
        let asset_type = rec.get(1).context("asset_type missing")?.trim().to_string();
        let acquisition_date = rec
            .get(2)
            .context("acquisition_date missing")?
            .trim()
            .to_string();
        let acquisition_raw = rec
            .get(3)
            .context("acquisition_value missing")?
            .trim()
            .to_string();
        let current_raw = rec.get(4).unwrap_or("").trim().to_string();
        let quantity: i64 = match rec.get(5).map(str::trim).filter(|s| !s.is_empty()) {
            Some(q) => q
                .parse()
                .with_context(|| format!("Invalid quantity '{}' for {}", q, item))?,
            None => NON_QUANTITY,
        };
        let current_price: Option<Decimal> = match rec.get(6).map(str::trim) {
            Some(p) if !p.is_empty() => Some(
                parse_decimal(p).with_context(|| format!("Invalid price '{}' for {}", p, item))?,
            ),
            _ => None,
        };
        let notes = rec
            .get(7)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);

        parse_date(&acquisition_date)
            .with_context(|| format!("Invalid acquisition date '{}'", acquisition_date))?;
        let acquisition_value = parse_decimal(&acquisition_raw)
            .with_context(|| format!("Invalid acquisition value '{}' for {}", acquisition_raw, item))?;
        let current_amount = if current_raw.is_empty() {
            acquisition_value
        } else {
            parse_decimal(&current_raw)
                .with_context(|| format!("Invalid current amount '{}' for {}", current_raw, item))?
        };

        let asset = Asset {
            id: next_id,
            item,
            asset_type,
            acquisition_date,
            acquisition_value,
            current_price,
            current_amount,
            quantity,
            notes,
        };
        store::add(
            &tx,
            &collection,
            &serde_json::to_value(&asset)?,
            Some(&next_id.to_string()),
        )?;
        next_id += 1;
        imported += 1;
    }
    tx.commit()?;
    println!("Imported {} assets from {}", imported, path);
    Ok(())
}
