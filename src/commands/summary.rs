// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Derived aggregates: per-ledger monthly totals, the cross-ledger
//! monthly summary, and the daily summary with category distributions.

use crate::commands::{expenses, ledgers};
use crate::models::{CASH_METHOD, EXPENSE_TYPE, LedgerKind, SharedLedgerRef};
use crate::options;
use crate::store::{self, paths};
use crate::utils::{
    coerce_decimal, coerce_i64, format_date, maybe_print_json, parse_date, pretty_table, round2,
    str_field, today,
};
use anyhow::Result;
use chrono::Datelike;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("totals", sub)) => totals_cmd(conn, sub)?,
        Some(("ledgers", sub)) => ledgers_cmd(conn, sub)?,
        Some(("daily", sub)) => daily_cmd(conn, sub)?,
        _ => {}
    }
    Ok(())
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct LedgerTotals {
    pub total_expense: i64,
    pub cash_total: i64,
    pub liabilities_total: i64,
}

/// Monthly totals over one ledger. Only expense-type records count;
/// cash and liabilities are informational sub-splits of the total, not
/// a partition. Non-coercible amounts are skipped with a warning.
pub fn monthly_ledger_totals(
    conn: &Connection,
    uid: &str,
    ledger_id: &str,
    kind: LedgerKind,
    year: i32,
    month: u32,
) -> Result<LedgerTotals> {
    let records = expenses::monthly_records(conn, uid, kind, ledger_id, year, month)?;
    let liabilities = options::load(conn, uid)
        .unwrap_or_default()
        .liabilities()
        .to_vec();

    let mut totals = LedgerTotals::default();
    for doc in &records {
        if str_field(&doc.data, "transactionType") != EXPENSE_TYPE {
            continue;
        }
        let Some(amount) = doc.data.get("amount").and_then(coerce_i64) else {
            eprintln!(
                "warning: record {} in ledger '{}' has a non-numeric amount; skipped",
                doc.id, ledger_id
            );
            continue;
        };
        let method = str_field(&doc.data, "payment_method");
        if method == CASH_METHOD {
            totals.cash_total += amount;
        } else if liabilities.iter().any(|l| l == method) {
            totals.liabilities_total += amount;
        }
        totals.total_expense += amount;
    }
    Ok(totals)
}

#[derive(Debug, Serialize)]
pub struct LedgerSummaryRow {
    pub ledger_name: String,
    pub ledger_type: String,
    pub total_expense: Decimal,
    pub total_cash: Decimal,
    pub total_liabilities: Decimal,
}

fn summary_row(name: &str, kind: LedgerKind, t: LedgerTotals) -> LedgerSummaryRow {
    LedgerSummaryRow {
        ledger_name: name.to_string(),
        ledger_type: kind.as_str().to_string(),
        total_expense: round2(Decimal::from(t.total_expense)),
        total_cash: round2(Decimal::from(t.cash_total)),
        total_liabilities: round2(Decimal::from(t.liabilities_total)),
    }
}

/// One summary row per ledger the user belongs to. Malformed shared
/// refs and failing ledgers are skipped with a warning; the batch
/// always completes.
pub fn all_ledgers_summary(
    conn: &Connection,
    uid: &str,
    year: i32,
    month: u32,
) -> Result<Vec<LedgerSummaryRow>> {
    let user_ledgers = ledgers::user_ledgers(conn, uid)?;
    let mut rows = Vec::new();

    for name in &user_ledgers.personal {
        match monthly_ledger_totals(conn, uid, name, LedgerKind::Personal, year, month) {
            Ok(t) => rows.push(summary_row(name, LedgerKind::Personal, t)),
            Err(e) => eprintln!("warning: summary for ledger '{}' failed: {}", name, e),
        }
    }
    for entry in &user_ledgers.shared {
        let Some(r) = SharedLedgerRef::from_value(entry) else {
            eprintln!("warning: malformed shared ledger entry {}; skipped", entry);
            continue;
        };
        match monthly_ledger_totals(conn, uid, &r.invite_code, LedgerKind::Shared, year, month) {
            Ok(t) => rows.push(summary_row(&r.name, LedgerKind::Shared, t)),
            Err(e) => eprintln!("warning: summary for ledger '{}' failed: {}", r.name, e),
        }
    }
    Ok(rows)
}

#[derive(Debug, Serialize)]
pub struct SummaryData {
    pub name: String,
    pub expense_distribution: BTreeMap<String, Decimal>,
    pub asset_distribution: BTreeMap<String, Decimal>,
    pub liabilities_distribution: BTreeMap<String, Decimal>,
    pub monthly_expenses: Vec<Value>,
    pub expenses: Vec<Value>,
    pub assets: Vec<Value>,
    pub total_asset_amount: Decimal,
    pub total_liabilities_amount: Decimal,
    pub total_cost: Decimal,
    pub total_income: Decimal,
    pub all_ledgers_monthly_amount: Vec<LedgerSummaryRow>,
}

fn seeded(keys: &[String]) -> BTreeMap<String, Decimal> {
    keys.iter().map(|k| (k.clone(), Decimal::ZERO)).collect()
}

/// Daily summary for one calendar day plus the surrounding month's
/// distributions. Distribution maps are seeded only with the user's
/// known category keys; unknown categories fall outside them. With no
/// usable options document all three maps degrade to empty.
pub fn summary_data(
    conn: &Connection,
    uid: &str,
    date_str: &str,
    ledger_id: &str,
    kind: LedgerKind,
) -> Result<SummaryData> {
    let date = match parse_date(date_str) {
        Ok(d) => d,
        Err(_) => {
            eprintln!("warning: invalid date '{}'; using today", date_str);
            today()
        }
    };
    let date_label = format_date(date);

    let (expense_types, asset_types, liabilities_types) = match options::load(conn, uid) {
        Some(o) => (
            o.expense_categories().to_vec(),
            o.known_asset_types(),
            o.liabilities().to_vec(),
        ),
        None => (Vec::new(), Vec::new(), Vec::new()),
    };
    let mut expense_distribution = seeded(&expense_types);
    let mut asset_distribution = seeded(&asset_types);
    let mut liabilities_distribution = seeded(&liabilities_types);

    let monthly =
        expenses::monthly_records(conn, uid, kind, ledger_id, date.year(), date.month())?;

    let mut daily = Vec::new();
    let mut total_cost = Decimal::ZERO;
    let mut total_income = Decimal::ZERO;
    let mut total_liabilities_amount = Decimal::ZERO;

    for doc in &monthly {
        let amount = doc
            .data
            .get("amount")
            .and_then(coerce_decimal)
            .unwrap_or(Decimal::ZERO);
        let is_expense = str_field(&doc.data, "transactionType") == EXPENSE_TYPE;

        if str_field(&doc.data, "date") == date_label {
            daily.push(doc.data.clone());
            if is_expense {
                total_cost += amount;
            } else {
                total_income += amount;
            }
        }

        let method = str_field(&doc.data, "payment_method");
        if let Some(slot) = liabilities_distribution.get_mut(method) {
            *slot += amount;
            total_liabilities_amount += amount;
        }

        let category = str_field(&doc.data, "category");
        if is_expense {
            if let Some(slot) = expense_distribution.get_mut(category) {
                *slot += amount;
            }
        }
    }

    let assets = store::list(conn, &paths::assets(uid))?;
    let mut total_asset_amount = Decimal::ZERO;
    for doc in &assets {
        let amount = doc
            .data
            .get("current_amount")
            .and_then(coerce_decimal)
            .unwrap_or(Decimal::ZERO);
        if let Some(slot) = asset_distribution.get_mut(str_field(&doc.data, "asset_type")) {
            *slot += amount;
            total_asset_amount += amount;
        }
    }

    let name = store::get(conn, paths::USERS, uid)?
        .map(|d| str_field(&d.data, "username").to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());

    let all_ledgers_monthly_amount = all_ledgers_summary(conn, uid, date.year(), date.month())?;

    Ok(SummaryData {
        name,
        expense_distribution,
        asset_distribution,
        liabilities_distribution,
        monthly_expenses: monthly.into_iter().map(|d| d.data).collect(),
        expenses: daily,
        assets: assets.into_iter().map(|d| d.data).collect(),
        total_asset_amount,
        total_liabilities_amount,
        total_cost,
        total_income,
        all_ledgers_monthly_amount,
    })
}

fn month_args(sub: &clap::ArgMatches) -> (i32, u32) {
    let now = today();
    (
        *sub.get_one::<i32>("year").unwrap_or(&now.year()),
        *sub.get_one::<u32>("month").unwrap_or(&now.month()),
    )
}

fn totals_cmd(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let uid = sub.get_one::<String>("user").unwrap();
    let kind = ledgers::parse_kind(sub)?;
    let ledger = sub.get_one::<String>("ledger").unwrap();
    let (year, month) = month_args(sub);
    let t = monthly_ledger_totals(conn, uid, ledger, kind, year, month)?;
    println!(
        "{}",
        pretty_table(
            &["Total Expense", "Cash", "Liabilities"],
            vec![vec![
                t.total_expense.to_string(),
                t.cash_total.to_string(),
                t.liabilities_total.to_string(),
            ]]
        )
    );
    Ok(())
}

fn ledgers_cmd(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let uid = sub.get_one::<String>("user").unwrap();
    let (year, month) = month_args(sub);
    let rows = all_ledgers_summary(conn, uid, year, month)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &rows)? {
        let data = rows
            .iter()
            .map(|r| {
                vec![
                    r.ledger_name.clone(),
                    r.ledger_type.clone(),
                    format!("{:.2}", r.total_expense),
                    format!("{:.2}", r.total_cash),
                    format!("{:.2}", r.total_liabilities),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Ledger", "Kind", "Expense", "Cash", "Liabilities"], data)
        );
    }
    Ok(())
}

fn daily_cmd(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let uid = sub.get_one::<String>("user").unwrap();
    let kind = ledgers::parse_kind(sub)?;
    let ledger = sub.get_one::<String>("ledger").unwrap();
    let date = sub
        .get_one::<String>("date")
        .cloned()
        .unwrap_or_else(|| format_date(today()));
    let data = summary_data(conn, uid, &date, ledger, kind)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        println!(
            "{} — {} records on {}, cost {} income {}",
            data.name,
            data.expenses.len(),
            date,
            data.total_cost,
            data.total_income
        );
        let dist = |map: &BTreeMap<String, Decimal>| -> Vec<Vec<String>> {
            map.iter()
                .map(|(k, v)| vec![k.clone(), format!("{:.2}", v)])
                .collect()
        };
        println!(
            "{}",
            pretty_table(&["Category", "Spent"], dist(&data.expense_distribution))
        );
        println!(
            "{}",
            pretty_table(&["Asset Type", "Value"], dist(&data.asset_distribution))
        );
        println!(
            "{}",
            pretty_table(
                &["Liability", "Amount"],
                dist(&data.liabilities_distribution)
            )
        );
    }
    Ok(())
}
