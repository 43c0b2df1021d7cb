// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{LedgerKind, Ledgers, SharedLedgerRef};
use crate::store::{self, paths};
use crate::utils::{maybe_print_json, pretty_table};
use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use rand::Rng;
use regex::Regex;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::{Value, json};

pub const INVITE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const INVITE_LEN: usize = 6;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("create", sub)) => {
            let uid = sub.get_one::<String>("user").unwrap();
            let name = sub.get_one::<String>("name").unwrap().trim().to_string();
            create_personal(conn, uid, &name)?;
            println!("Created personal ledger '{}'", name);
        }
        Some(("create-shared", sub)) => {
            let uid = sub.get_one::<String>("user").unwrap();
            let name = sub.get_one::<String>("name").unwrap().trim().to_string();
            let created = create_shared(conn, uid, &name)?;
            println!(
                "Created shared ledger '{}' with invite code {}",
                created.name, created.invite_code
            );
        }
        Some(("join", sub)) => {
            let uid = sub.get_one::<String>("user").unwrap();
            let code = sub.get_one::<String>("code").unwrap().trim().to_string();
            let password = sub.get_one::<String>("password").map(String::as_str);
            let name = join(conn, uid, &code, password)?;
            println!("Joined shared ledger '{}' ({})", name, code);
        }
        Some(("leave", sub)) => {
            let uid = sub.get_one::<String>("user").unwrap();
            let kind = parse_kind(sub)?;
            let ledger = sub.get_one::<String>("ledger").unwrap();
            let name = sub.get_one::<String>("name").map(String::as_str);
            leave(conn, uid, kind, ledger, name)?;
            println!("Removed {} ledger '{}' from '{}'", kind, ledger, uid);
        }
        Some(("list", sub)) => {
            let uid = sub.get_one::<String>("user").unwrap();
            let ledgers = user_ledgers(conn, uid)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &ledgers)? {
                print_ledgers(&ledgers);
            }
        }
        Some(("members", sub)) => {
            let code = sub.get_one::<String>("code").unwrap();
            let info = members(conn, code)?;
            println!(
                "{}",
                pretty_table(
                    &["UID"],
                    info.users.into_iter().map(|u| vec![u]).collect()
                )
            );
            if !info.member_names.is_empty() {
                println!(
                    "{}",
                    pretty_table(
                        &["Member"],
                        info.member_names.into_iter().map(|n| vec![n]).collect()
                    )
                );
            }
        }
        _ => {}
    }
    Ok(())
}

pub fn parse_kind(sub: &clap::ArgMatches) -> Result<LedgerKind> {
    let raw = sub.get_one::<String>("kind").unwrap();
    LedgerKind::parse(raw).ok_or_else(|| anyhow!("ledger kind must be 'personal' or 'shared'"))
}

/// Rejection-sample a code not yet used as a shared-ledger id. Retries
/// are unbounded; the keyspace is 36^6 and the collection stays small.
/// Alphabet and length are parameters so the exhaustion behavior is
/// testable.
pub fn generate_invite_code(conn: &Connection, alphabet: &[u8], len: usize) -> Result<String> {
    let mut rng = rand::rng();
    loop {
        let code: String = (0..len)
            .map(|_| alphabet[rng.random_range(0..alphabet.len())] as char)
            .collect();
        if !store::exists(conn, paths::SHARED_LEDGERS, &code)? {
            return Ok(code);
        }
    }
}

fn require_user(conn: &Connection, uid: &str) -> Result<store::Doc> {
    store::get(conn, paths::USERS, uid)?
        .ok_or_else(|| anyhow!("user '{}' has no profile", uid))
}

/// Set-union append of the ledger name; duplicate creates are no-ops.
pub fn create_personal(conn: &Connection, uid: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("ledger name must not be empty");
    }
    require_user(conn, uid)?;
    store::array_union(conn, paths::USERS, uid, "ledgers.personal", &[json!(name)])?;
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct CreatedSharedLedger {
    pub group_id: String,
    pub name: String,
    pub invite_code: String,
}

/// The invite code is the shared ledger's identity: its document id,
/// its lookup key, and the reference stored on each member.
pub fn create_shared(conn: &mut Connection, uid: &str, name: &str) -> Result<CreatedSharedLedger> {
    if name.is_empty() {
        bail!("ledger name must not be empty");
    }
    require_user(conn, uid)?;
    let code = generate_invite_code(conn, INVITE_ALPHABET, INVITE_LEN)?;
    let doc = json!({
        "invite_code": code,
        "name": name,
        "create_at": Utc::now().to_rfc3339(),
        "password": "",
        "users": [uid],
        "members": {},
    });

    let tx = conn.transaction()?;
    store::array_union(
        &tx,
        paths::USERS,
        uid,
        "ledgers.shared",
        &[json!({"invite_code": code, "name": name})],
    )?;
    store::add(&tx, paths::SHARED_LEDGERS, &doc, Some(&code))?;
    tx.commit()?;

    Ok(CreatedSharedLedger {
        group_id: code.clone(),
        name: name.to_string(),
        invite_code: code,
    })
}

/// Join by invite code. The two membership appends are separate
/// commits: a failure after the first leaves the user's list updated
/// but not the ledger's, surfaced as an incomplete join (see DESIGN.md).
pub fn join(conn: &Connection, uid: &str, code: &str, password: Option<&str>) -> Result<String> {
    let shape = Regex::new("^[A-Z0-9]{6}$")?;
    if !shape.is_match(code) {
        bail!("invite code must be 6 characters of A-Z or 0-9");
    }
    let ledger = store::get(conn, paths::SHARED_LEDGERS, code)?
        .ok_or_else(|| anyhow!("no shared ledger with invite code '{}'", code))?;

    let stored = crate::utils::str_field(&ledger.data, "password");
    let supplied = password.unwrap_or("");
    if !stored.is_empty() && stored != supplied {
        bail!("wrong password for invite code '{}'", code);
    }

    let name = {
        let n = crate::utils::str_field(&ledger.data, "name");
        if n.is_empty() { code } else { n }.to_string()
    };

    store::array_union(
        conn,
        paths::USERS,
        uid,
        "ledgers.shared",
        &[json!({"invite_code": code, "name": name})],
    )
    .with_context(|| format!("user '{}' has no profile", uid))?;

    store::array_union(conn, paths::SHARED_LEDGERS, code, "users", &[json!(uid)]).with_context(
        || {
            format!(
                "incomplete join: '{}' holds a reference to '{}' but is missing from its user list",
                uid, code
            )
        },
    )?;
    Ok(name)
}

/// Detach only: the backing ledger data and other members are never
/// touched. Removing an entry that is not present is a no-op.
pub fn leave(
    conn: &Connection,
    uid: &str,
    kind: LedgerKind,
    ledger_id: &str,
    name: Option<&str>,
) -> Result<()> {
    require_user(conn, uid)?;
    match kind {
        LedgerKind::Personal => store::array_remove(
            conn,
            paths::USERS,
            uid,
            "ledgers.personal",
            &[json!(ledger_id)],
        )?,
        LedgerKind::Shared => {
            let name =
                name.ok_or_else(|| anyhow!("--name is required when leaving a shared ledger"))?;
            store::array_remove(
                conn,
                paths::USERS,
                uid,
                "ledgers.shared",
                &[json!({"invite_code": ledger_id, "name": name})],
            )?
        }
    }
    Ok(())
}

pub fn user_ledgers(conn: &Connection, uid: &str) -> Result<Ledgers> {
    let doc = require_user(conn, uid)?;
    let ledgers = doc.data.get("ledgers").cloned().unwrap_or_else(|| json!({}));
    Ok(serde_json::from_value(ledgers)?)
}

pub struct MemberInfo {
    pub users: Vec<String>,
    pub member_names: Vec<String>,
}

pub fn members(conn: &Connection, code: &str) -> Result<MemberInfo> {
    let ledger = store::get(conn, paths::SHARED_LEDGERS, code)?
        .ok_or_else(|| anyhow!("no shared ledger with invite code '{}'", code))?;
    let users = ledger
        .data
        .get("users")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();
    let member_names = ledger
        .data
        .get("members")
        .and_then(Value::as_object)
        .map(|m| m.keys().cloned().collect())
        .unwrap_or_default();
    Ok(MemberInfo {
        users,
        member_names,
    })
}

fn print_ledgers(ledgers: &Ledgers) {
    let mut rows: Vec<Vec<String>> = ledgers
        .personal
        .iter()
        .map(|name| vec![name.clone(), "personal".to_string(), String::new()])
        .collect();
    for entry in &ledgers.shared {
        match SharedLedgerRef::from_value(entry) {
            Some(r) => rows.push(vec![r.name, "shared".to_string(), r.invite_code]),
            None => eprintln!("warning: skipping malformed shared ledger entry {}", entry),
        }
    }
    println!("{}", pretty_table(&["Name", "Kind", "Invite Code"], rows));
}
