// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::ledgers;
use crate::models::SharedLedgerRef;
use crate::store::{self, paths};
use crate::utils::{coerce_i64, parse_date, pretty_table, str_field};
use anyhow::Result;
use rusqlite::Connection;
use std::collections::HashSet;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let uid = m.get_one::<String>("user").unwrap();
    let mut rows = Vec::new();

    let user_ledgers = ledgers::user_ledgers(conn, uid)?;

    // 1) Duplicate record ids and unparseable dates per ledger
    for name in &user_ledgers.personal {
        check_records(conn, name, &paths::ledger(uid, name), &mut rows)?;
    }
    for entry in &user_ledgers.shared {
        let Some(r) = SharedLedgerRef::from_value(entry) else {
            rows.push(vec!["malformed_shared_ref".into(), entry.to_string()]);
            continue;
        };
        // 2) Shared refs must point at a live ledger document
        if !store::exists(conn, paths::SHARED_LEDGERS, &r.invite_code)? {
            rows.push(vec![
                "dangling_shared_ref".into(),
                format!("{} ({})", r.name, r.invite_code),
            ]);
            continue;
        }
        check_records(
            conn,
            &r.name,
            &paths::shared_expenses(&r.invite_code),
            &mut rows,
        )?;
    }

    // 3) Tradable positions should be priced through the catalog
    for doc in store::list(conn, &paths::assets(uid))? {
        let quantity = doc.data.get("quantity").and_then(coerce_i64).unwrap_or(-1);
        if quantity < 0 {
            continue;
        }
        let item = str_field(&doc.data, "item");
        if !store::exists(conn, paths::STOCK_CATALOG, item)? {
            rows.push(vec!["uncataloged_position".into(), item.to_string()]);
        }
    }

    if rows.is_empty() {
        println!("doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}

fn check_records(
    conn: &Connection,
    label: &str,
    collection: &str,
    rows: &mut Vec<Vec<String>>,
) -> Result<()> {
    let mut seen: HashSet<i64> = HashSet::new();
    for doc in store::list(conn, collection)? {
        match doc.data.get("id").and_then(coerce_i64) {
            Some(id) => {
                if !seen.insert(id) {
                    rows.push(vec![
                        "duplicate_record_id".into(),
                        format!("{} #{}", label, id),
                    ]);
                }
            }
            None => rows.push(vec![
                "missing_record_id".into(),
                format!("{} doc {}", label, doc.id),
            ]),
        }
        let date = str_field(&doc.data, "date");
        if parse_date(date).is_err() {
            rows.push(vec![
                "bad_record_date".into(),
                format!("{} doc {} '{}'", label, doc.id, date),
            ]);
        }
    }
    Ok(())
}
