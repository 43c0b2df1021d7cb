// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{DEFAULT_PERSONAL_LEDGER, Ledgers, UserProfile};
use crate::options::{OPTIONS_DOC_ID, OptionsDoc, RELATIONSHIP_DOC_ID};
use crate::store::{self, paths};
use crate::utils::pretty_table;
use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;
use serde_json::json;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("register", sub)) => {
            let uid = sub.get_one::<String>("uid").unwrap().trim().to_string();
            let email = sub.get_one::<String>("email").unwrap().trim().to_string();
            let username = sub.get_one::<String>("username").map(|s| s.trim());
            if register(conn, &uid, &email, username)? {
                println!("Registered user '{}'", uid);
            } else {
                println!("User '{}' already registered", uid);
            }
        }
        Some(("show", sub)) => show(conn, sub.get_one::<String>("uid").unwrap())?,
        Some(("list", _)) => list(conn)?,
        _ => {}
    }
    Ok(())
}

/// Onboarding: profile, default options and relationship docs are
/// written together so a failure leaves no partial user. Returns false
/// when the profile already exists (no change).
pub fn register(
    conn: &mut Connection,
    uid: &str,
    email: &str,
    username: Option<&str>,
) -> Result<bool> {
    if store::get(conn, paths::USERS, uid)?.is_some() {
        return Ok(false);
    }

    let username = match username {
        Some(u) if !u.is_empty() => u.to_string(),
        _ => email.split('@').next().unwrap_or(email).to_string(),
    };
    let profile = UserProfile {
        username,
        email: email.to_string(),
        created_at: Utc::now().to_rfc3339(),
        access: 0,
        ledgers: Ledgers {
            personal: vec![DEFAULT_PERSONAL_LEDGER.to_string()],
            shared: Vec::new(),
        },
    };

    // The expense and asset subcollections spring into existence on
    // their first write; nothing to pre-create here.
    let tx = conn.transaction()?;
    store::add(&tx, paths::USERS, &serde_json::to_value(&profile)?, Some(uid))?;
    store::add(
        &tx,
        &paths::options(uid),
        &serde_json::to_value(OptionsDoc::default())?,
        Some(OPTIONS_DOC_ID),
    )?;
    store::add(
        &tx,
        &paths::relationship(uid),
        &json!({"friends_uids": [], "group_invites": []}),
        Some(RELATIONSHIP_DOC_ID),
    )?;
    tx.commit()?;
    Ok(true)
}

fn show(conn: &Connection, uid: &str) -> Result<()> {
    let Some(doc) = store::get(conn, paths::USERS, uid)? else {
        println!("No profile for user '{}'", uid);
        return Ok(());
    };
    let rows = vec![
        vec!["uid".to_string(), uid.to_string()],
        vec![
            "username".to_string(),
            crate::utils::str_field(&doc.data, "username").to_string(),
        ],
        vec![
            "email".to_string(),
            crate::utils::str_field(&doc.data, "email").to_string(),
        ],
        vec![
            "created_at".to_string(),
            crate::utils::str_field(&doc.data, "created_at").to_string(),
        ],
        vec![
            "ledgers".to_string(),
            doc.data
                .get("ledgers")
                .map(|l| l.to_string())
                .unwrap_or_default(),
        ],
    ];
    println!("{}", pretty_table(&["Field", "Value"], rows));
    Ok(())
}

fn list(conn: &Connection) -> Result<()> {
    let docs = store::list(conn, paths::USERS)?;
    let rows = docs
        .into_iter()
        .map(|d| {
            vec![
                d.id,
                crate::utils::str_field(&d.data, "username").to_string(),
                crate::utils::str_field(&d.data, "email").to_string(),
            ]
        })
        .collect();
    println!("{}", pretty_table(&["UID", "Username", "Email"], rows));
    Ok(())
}
