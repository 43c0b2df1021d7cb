// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{Expense, LedgerKind};
use crate::store::{self, Doc, paths};
use crate::utils::{coerce_i64, maybe_print_json, parse_date, pretty_table, str_field};
use anyhow::{Context, Result, bail};
use chrono::{Datelike, NaiveDate};
use rusqlite::Connection;
use serde_json::{Map, Value, json};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add_cmd(conn, sub)?,
        Some(("update", sub)) => update_cmd(conn, sub)?,
        Some(("rm", sub)) => {
            let uid = sub.get_one::<String>("user").unwrap();
            let kind = crate::commands::ledgers::parse_kind(sub)?;
            let ledger = sub.get_one::<String>("ledger").unwrap();
            let id = sub.get_one::<String>("id").unwrap();
            delete(conn, uid, kind, ledger, id)?;
            println!("Deleted record {} from '{}'", id, ledger);
        }
        Some(("list", sub)) => list_cmd(conn, sub)?,
        _ => {}
    }
    Ok(())
}

/// Records live under the owning user for personal ledgers and under
/// the shared ledger's own subcollection otherwise.
pub fn collection_path(uid: &str, kind: LedgerKind, ledger_id: &str) -> String {
    match kind {
        LedgerKind::Personal => paths::ledger(uid, ledger_id),
        LedgerKind::Shared => paths::shared_expenses(ledger_id),
    }
}

/// Insert with the ledger's next monotonic id; the id read and the
/// insert share one transaction so concurrent creators serialize.
pub fn add(
    conn: &mut Connection,
    uid: &str,
    kind: LedgerKind,
    ledger_id: &str,
    mut expense: Expense,
) -> Result<i64> {
    parse_date(&expense.date)?;
    if expense.amount < 0 {
        bail!("amount must not be negative");
    }
    let path = collection_path(uid, kind, ledger_id);
    let tx = conn.transaction()?;
    let id = store::next_record_id(&tx, &path)?;
    expense.id = id;
    store::add(
        &tx,
        &path,
        &serde_json::to_value(&expense)?,
        Some(&id.to_string()),
    )?;
    tx.commit()?;
    Ok(id)
}

/// Partial update; amount and date are validated before any write.
pub fn update(
    conn: &Connection,
    uid: &str,
    kind: LedgerKind,
    ledger_id: &str,
    expense_id: &str,
    mut patch: Map<String, Value>,
) -> Result<()> {
    if let Some(amount) = patch.get("amount") {
        let v = coerce_i64(amount).context("amount must be numeric")?;
        if v < 0 {
            bail!("amount must not be negative");
        }
        patch.insert("amount".to_string(), json!(v));
    }
    if let Some(date) = patch.get("date").and_then(Value::as_str) {
        parse_date(date)?;
    }
    if patch.is_empty() {
        bail!("no fields to update");
    }
    let path = collection_path(uid, kind, ledger_id);
    store::update(conn, &path, expense_id, &Value::Object(patch))?;
    Ok(())
}

pub fn delete(
    conn: &Connection,
    uid: &str,
    kind: LedgerKind,
    ledger_id: &str,
    expense_id: &str,
) -> Result<()> {
    let path = collection_path(uid, kind, ledger_id);
    store::delete(conn, &path, expense_id)?;
    Ok(())
}

pub fn get(
    conn: &Connection,
    uid: &str,
    kind: LedgerKind,
    ledger_id: &str,
    expense_id: &str,
) -> Result<Option<Doc>> {
    let path = collection_path(uid, kind, ledger_id);
    Ok(store::get(conn, &path, expense_id)?)
}

pub enum DateFilter {
    Month { year: i32, month: u32 },
    Range { start: NaiveDate, end: NaiveDate },
}

/// Date-filtered view of a record collection. A record whose date does
/// not parse is skipped with a warning rather than failing the batch.
pub fn records_by_filter(
    conn: &Connection,
    collection: &str,
    filter: &DateFilter,
) -> Result<Vec<Doc>> {
    let docs = store::list(conn, collection)?;
    let mut out = Vec::new();
    for doc in docs {
        let date_s = str_field(&doc.data, "date");
        let date = match parse_date(date_s) {
            Ok(d) => d,
            Err(_) => {
                eprintln!(
                    "warning: skipping record {} in '{}': bad date '{}'",
                    doc.id, collection, date_s
                );
                continue;
            }
        };
        let keep = match filter {
            DateFilter::Month { year, month } => date.year() == *year && date.month() == *month,
            DateFilter::Range { start, end } => *start <= date && date <= *end,
        };
        if keep {
            out.push(doc);
        }
    }
    Ok(out)
}

pub fn monthly_records(
    conn: &Connection,
    uid: &str,
    kind: LedgerKind,
    ledger_id: &str,
    year: i32,
    month: u32,
) -> Result<Vec<Doc>> {
    records_by_filter(
        conn,
        &collection_path(uid, kind, ledger_id),
        &DateFilter::Month { year, month },
    )
}

fn add_cmd(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let uid = sub.get_one::<String>("user").unwrap();
    let kind = crate::commands::ledgers::parse_kind(sub)?;
    let ledger = sub.get_one::<String>("ledger").unwrap();
    let expense = Expense {
        id: 0,
        date: sub.get_one::<String>("date").unwrap().trim().to_string(),
        item: sub.get_one::<String>("item").unwrap().trim().to_string(),
        amount: *sub.get_one::<i64>("amount").unwrap(),
        payment_method: sub.get_one::<String>("method").unwrap().trim().to_string(),
        category: sub.get_one::<String>("category").unwrap().trim().to_string(),
        transaction_type: sub.get_one::<String>("type").unwrap().to_string(),
        merchant: sub.get_one::<String>("merchant").cloned(),
        notes: sub.get_one::<String>("notes").cloned(),
        invoice_number: sub.get_one::<String>("invoice").cloned(),
        member: sub.get_one::<String>("member").cloned(),
    };
    let id = add(conn, uid, kind, ledger, expense)?;
    println!("Recorded expense {} in '{}'", id, ledger);
    Ok(())
}

fn update_cmd(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let uid = sub.get_one::<String>("user").unwrap();
    let kind = crate::commands::ledgers::parse_kind(sub)?;
    let ledger = sub.get_one::<String>("ledger").unwrap();
    let id = sub.get_one::<String>("id").unwrap();

    let mut patch = Map::new();
    for (arg, field) in [
        ("date", "date"),
        ("item", "item"),
        ("amount", "amount"),
        ("method", "payment_method"),
        ("category", "category"),
        ("notes", "notes"),
    ] {
        if let Some(v) = sub.get_one::<String>(arg) {
            patch.insert(field.to_string(), json!(v));
        }
    }
    update(conn, uid, kind, ledger, id, patch)?;
    println!("Updated record {} in '{}'", id, ledger);
    Ok(())
}

fn list_cmd(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let uid = sub.get_one::<String>("user").unwrap();
    let kind = crate::commands::ledgers::parse_kind(sub)?;
    let ledger = sub.get_one::<String>("ledger").unwrap();

    let filter = match (
        sub.get_one::<String>("from"),
        sub.get_one::<String>("to"),
    ) {
        (Some(from), Some(to)) => DateFilter::Range {
            start: parse_date(from)?,
            end: parse_date(to)?,
        },
        (None, None) => {
            let now = crate::utils::today();
            DateFilter::Month {
                year: *sub.get_one::<i32>("year").unwrap_or(&now.year()),
                month: *sub.get_one::<u32>("month").unwrap_or(&now.month()),
            }
        }
        _ => bail!("--from and --to must be given together"),
    };

    let docs = records_by_filter(conn, &collection_path(uid, kind, ledger), &filter)?;
    let data: Vec<Value> = docs.into_iter().map(|d| d.data).collect();
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .iter()
            .map(|v| {
                vec![
                    v.get("id").map(|i| i.to_string()).unwrap_or_default(),
                    str_field(v, "date").to_string(),
                    str_field(v, "item").to_string(),
                    v.get("amount").map(|a| a.to_string()).unwrap_or_default(),
                    str_field(v, "payment_method").to_string(),
                    str_field(v, "category").to_string(),
                    str_field(v, "transactionType").to_string(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["ID", "Date", "Item", "Amount", "Method", "Category", "Type"],
                rows
            )
        );
    }
    Ok(())
}
