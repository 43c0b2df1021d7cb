// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use ledgerclip::commands::{expenses, ledgers, summary, users};
use ledgerclip::models::{EXPENSE_TYPE, Expense, INCOME_TYPE, LedgerKind};
use ledgerclip::options::OptionsDoc;
use ledgerclip::store::{self, paths};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde_json::json;

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

fn record(
    date: &str,
    amount: i64,
    category: &str,
    transaction_type: &str,
    method: &str,
) -> Expense {
    Expense {
        id: 0,
        date: date.to_string(),
        item: "item".to_string(),
        amount,
        payment_method: method.to_string(),
        category: category.to_string(),
        transaction_type: transaction_type.to_string(),
        merchant: None,
        notes: None,
        invoice_number: None,
        member: None,
    }
}

fn add(conn: &mut Connection, ledger: &str, e: Expense) {
    expenses::add(conn, "u1", LedgerKind::Personal, ledger, e).unwrap();
}

#[test]
fn monthly_totals_count_only_expense_records() {
    let mut conn = setup();
    users::register(&mut conn, "u1", "u1@example.com", None).unwrap();
    add(&mut conn, "expenses", record("2025/08/01", 500, "食", EXPENSE_TYPE, "現金"));
    add(&mut conn, "expenses", record("2025/08/02", 200, "行", INCOME_TYPE, ""));

    let t = summary::monthly_ledger_totals(&conn, "u1", "expenses", LedgerKind::Personal, 2025, 8)
        .unwrap();
    assert_eq!(t.total_expense, 500);
    assert_eq!(t.cash_total, 500);
    assert_eq!(t.liabilities_total, 0);
}

#[test]
fn total_is_cash_plus_liabilities_plus_other_methods() {
    let mut conn = setup();
    users::register(&mut conn, "u1", "u1@example.com", None).unwrap();
    add(&mut conn, "expenses", record("2025/08/01", 100, "食", EXPENSE_TYPE, "現金"));
    add(&mut conn, "expenses", record("2025/08/02", 200, "行", EXPENSE_TYPE, "信用卡"));
    add(&mut conn, "expenses", record("2025/08/03", 300, "住", EXPENSE_TYPE, "轉帳"));

    let t = summary::monthly_ledger_totals(&conn, "u1", "expenses", LedgerKind::Personal, 2025, 8)
        .unwrap();
    assert_eq!(t.cash_total, 100);
    assert_eq!(t.liabilities_total, 200);
    assert_eq!(t.total_expense, 600);
    let other = t.total_expense - t.cash_total - t.liabilities_total;
    assert_eq!(other, 300);
}

#[test]
fn non_numeric_amounts_are_skipped_not_fatal() {
    let mut conn = setup();
    users::register(&mut conn, "u1", "u1@example.com", None).unwrap();
    add(&mut conn, "expenses", record("2025/08/01", 100, "食", EXPENSE_TYPE, "現金"));

    let path = expenses::collection_path("u1", LedgerKind::Personal, "expenses");
    store::add(
        &conn,
        &path,
        &json!({"id": 9, "date": "2025/08/02", "amount": "many", "transactionType": EXPENSE_TYPE,
                "payment_method": "現金", "category": "食", "item": "x"}),
        Some("9"),
    )
    .unwrap();

    let t = summary::monthly_ledger_totals(&conn, "u1", "expenses", LedgerKind::Personal, 2025, 8)
        .unwrap();
    assert_eq!(t.total_expense, 100);
    assert_eq!(t.cash_total, 100);
}

#[test]
fn totals_use_the_users_configured_liabilities() {
    let mut conn = setup();
    users::register(&mut conn, "u1", "u1@example.com", None).unwrap();

    let mut opts = OptionsDoc::default();
    opts.asset_type.liabilities = vec!["分期".to_string()];
    store::update(
        &conn,
        &paths::options("u1"),
        "options",
        &serde_json::to_value(&opts).unwrap(),
    )
    .unwrap();

    add(&mut conn, "expenses", record("2025/08/01", 200, "食", EXPENSE_TYPE, "信用卡"));
    add(&mut conn, "expenses", record("2025/08/02", 300, "食", EXPENSE_TYPE, "分期"));

    let t = summary::monthly_ledger_totals(&conn, "u1", "expenses", LedgerKind::Personal, 2025, 8)
        .unwrap();
    assert_eq!(t.liabilities_total, 300);
    assert_eq!(t.total_expense, 500);
}

#[test]
fn cross_ledger_summary_covers_personal_and_shared() {
    let mut conn = setup();
    users::register(&mut conn, "u1", "u1@example.com", None).unwrap();
    ledgers::create_personal(&conn, "u1", "trip").unwrap();
    let created = ledgers::create_shared(&mut conn, "u1", "Flat").unwrap();

    add(&mut conn, "expenses", record("2025/08/01", 500, "食", EXPENSE_TYPE, "現金"));
    add(&mut conn, "trip", record("2025/08/02", 80, "行", EXPENSE_TYPE, "信用卡"));
    expenses::add(
        &mut conn,
        "u1",
        LedgerKind::Shared,
        &created.invite_code,
        record("2025/08/03", 40, "食", EXPENSE_TYPE, "現金"),
    )
    .unwrap();

    let rows = summary::all_ledgers_summary(&conn, "u1", 2025, 8).unwrap();
    assert_eq!(rows.len(), 3);

    let by_name = |name: &str| rows.iter().find(|r| r.ledger_name == name).unwrap();
    assert_eq!(by_name("expenses").total_expense, Decimal::from(500));
    assert_eq!(by_name("expenses").ledger_type, "personal");
    assert_eq!(by_name("trip").total_liabilities, Decimal::from(80));
    assert_eq!(by_name("Flat").total_cash, Decimal::from(40));
    assert_eq!(by_name("Flat").ledger_type, "shared");
}

#[test]
fn malformed_shared_refs_are_skipped_with_the_rest_proceeding() {
    let mut conn = setup();
    users::register(&mut conn, "u1", "u1@example.com", None).unwrap();
    add(&mut conn, "expenses", record("2025/08/01", 500, "食", EXPENSE_TYPE, "現金"));

    store::array_union(
        &conn,
        paths::USERS,
        "u1",
        "ledgers.shared",
        &[json!({"name": "no-code"}), json!({"invite_code": "ABC123"})],
    )
    .unwrap();

    let rows = summary::all_ledgers_summary(&conn, "u1", 2025, 8).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].ledger_name, "expenses");
}

#[test]
fn summary_data_builds_distributions_over_known_keys_only() {
    let mut conn = setup();
    users::register(&mut conn, "u1", "u1@example.com", None).unwrap();

    add(&mut conn, "expenses", record("2025/08/06", 300, "食", EXPENSE_TYPE, "現金"));
    add(&mut conn, "expenses", record("2025/08/06", 200, "行", INCOME_TYPE, ""));
    add(&mut conn, "expenses", record("2025/08/10", 150, "咖啡", EXPENSE_TYPE, "現金"));
    add(&mut conn, "expenses", record("2025/08/12", 90, "衣", EXPENSE_TYPE, "信用卡"));

    let assets_path = paths::assets("u1");
    store::add(
        &conn,
        &assets_path,
        &json!({"id": 1, "item": "2330", "asset_type": "股票", "quantity": 10,
                "acquisition_value": "5000", "current_amount": "6000", "acquisition_date": "2025/01/01"}),
        Some("1"),
    )
    .unwrap();
    store::add(
        &conn,
        &assets_path,
        &json!({"id": 2, "item": "活存", "asset_type": "活期存款", "quantity": -1,
                "acquisition_value": "1000", "current_amount": "1000", "acquisition_date": "2025/01/01"}),
        Some("2"),
    )
    .unwrap();

    let data = summary::summary_data(&conn, "u1", "2025/08/06", "expenses", LedgerKind::Personal)
        .unwrap();

    assert_eq!(data.name, "u1");
    assert_eq!(data.expenses.len(), 2);
    assert_eq!(data.total_cost, Decimal::from(300));
    assert_eq!(data.total_income, Decimal::from(200));
    assert_eq!(data.monthly_expenses.len(), 4);

    // category distribution: expense-type only, unknown categories excluded
    assert_eq!(data.expense_distribution["食"], Decimal::from(300));
    assert_eq!(data.expense_distribution["衣"], Decimal::from(90));
    assert_eq!(data.expense_distribution["行"], Decimal::ZERO);
    assert!(!data.expense_distribution.contains_key("咖啡"));

    assert_eq!(data.asset_distribution["股票"], Decimal::from(6000));
    assert_eq!(data.asset_distribution["活期存款"], Decimal::from(1000));
    assert_eq!(data.total_asset_amount, Decimal::from(7000));

    assert_eq!(data.liabilities_distribution["信用卡"], Decimal::from(90));
    assert_eq!(data.total_liabilities_amount, Decimal::from(90));

    assert_eq!(data.all_ledgers_monthly_amount.len(), 1);
    assert_eq!(
        data.all_ledgers_monthly_amount[0].total_expense,
        Decimal::from(540)
    );
}

#[test]
fn summary_data_degrades_to_empty_distributions_without_options() {
    let mut conn = setup();
    users::register(&mut conn, "u1", "u1@example.com", None).unwrap();
    store::delete(&conn, &paths::options("u1"), "options").unwrap();
    add(&mut conn, "expenses", record("2025/08/06", 300, "食", EXPENSE_TYPE, "現金"));

    let data = summary::summary_data(&conn, "u1", "2025/08/06", "expenses", LedgerKind::Personal)
        .unwrap();
    assert!(data.expense_distribution.is_empty());
    assert!(data.asset_distribution.is_empty());
    assert!(data.liabilities_distribution.is_empty());
    // the day's records and totals still come through
    assert_eq!(data.expenses.len(), 1);
    assert_eq!(data.total_cost, Decimal::from(300));
}

#[test]
fn summary_data_falls_back_to_today_on_a_bad_date() {
    let mut conn = setup();
    users::register(&mut conn, "u1", "u1@example.com", None).unwrap();

    let data = summary::summary_data(&conn, "u1", "not-a-date", "expenses", LedgerKind::Personal)
        .unwrap();
    assert!(data.expenses.is_empty());
    assert_eq!(data.all_ledgers_monthly_amount.len(), 1);
}
