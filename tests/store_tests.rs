// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use ledgerclip::store::{self, StoreError};
use rusqlite::Connection;
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

#[test]
fn add_then_get_roundtrip() {
    let conn = setup();
    let id = store::add(&conn, "Users", &json!({"email": "a@b.c"}), Some("u1")).unwrap();
    assert_eq!(id, "u1");
    let doc = store::get(&conn, "Users", "u1").unwrap().unwrap();
    assert_eq!(doc.data["email"], json!("a@b.c"));
    assert!(store::get(&conn, "Users", "u2").unwrap().is_none());
}

#[test]
fn add_generates_an_id_when_absent() {
    let conn = setup();
    let id = store::add(&conn, "Users", &json!({"email": "x@y.z"}), None).unwrap();
    assert_eq!(id.len(), 20);
    assert!(store::get(&conn, "Users", &id).unwrap().is_some());
}

#[test]
fn duplicate_explicit_id_is_a_conflict() {
    let conn = setup();
    store::add(&conn, "Users", &json!({"n": 1}), Some("u1")).unwrap();
    let err = store::add(&conn, "Users", &json!({"n": 2}), Some("u1")).unwrap_err();
    assert!(matches!(err, StoreError::Duplicate { .. }));
    // original document untouched
    let doc = store::get(&conn, "Users", "u1").unwrap().unwrap();
    assert_eq!(doc.data["n"], json!(1));
}

#[test]
fn update_merges_top_level_fields() {
    let conn = setup();
    store::add(&conn, "Users", &json!({"a": 1, "b": 2}), Some("u1")).unwrap();
    store::update(&conn, "Users", "u1", &json!({"b": 3, "c": 4})).unwrap();
    let doc = store::get(&conn, "Users", "u1").unwrap().unwrap();
    assert_eq!(doc.data["a"], json!(1));
    assert_eq!(doc.data["b"], json!(3));
    assert_eq!(doc.data["c"], json!(4));
}

#[test]
fn update_and_delete_require_existing_document() {
    let conn = setup();
    assert!(matches!(
        store::update(&conn, "Users", "ghost", &json!({"a": 1})).unwrap_err(),
        StoreError::NotFound { .. }
    ));
    assert!(matches!(
        store::delete(&conn, "Users", "ghost").unwrap_err(),
        StoreError::NotFound { .. }
    ));

    store::add(&conn, "Users", &json!({}), Some("u1")).unwrap();
    store::delete(&conn, "Users", "u1").unwrap();
    assert!(store::get(&conn, "Users", "u1").unwrap().is_none());
}

#[test]
fn list_is_scoped_to_one_collection() {
    let conn = setup();
    store::add(&conn, "Users/u1/expenses", &json!({"id": 1}), Some("1")).unwrap();
    store::add(&conn, "Users/u1/expenses", &json!({"id": 2}), Some("2")).unwrap();
    store::add(&conn, "Users/u2/expenses", &json!({"id": 1}), Some("1")).unwrap();

    let docs = store::list(&conn, "Users/u1/expenses").unwrap();
    assert_eq!(docs.len(), 2);
    assert!(store::list(&conn, "Users/u3/expenses").unwrap().is_empty());
}

#[test]
fn next_record_id_is_max_plus_one_per_collection() {
    let conn = setup();
    assert_eq!(store::next_record_id(&conn, "Users/u1/expenses").unwrap(), 1);

    store::add(&conn, "Users/u1/expenses", &json!({"id": 1}), Some("1")).unwrap();
    store::add(&conn, "Users/u1/expenses", &json!({"id": 5}), Some("5")).unwrap();
    assert_eq!(store::next_record_id(&conn, "Users/u1/expenses").unwrap(), 6);

    // a different ledger reuses the same id values without collision
    store::add(&conn, "Users/u1/trip", &json!({"id": 1}), Some("1")).unwrap();
    assert_eq!(store::next_record_id(&conn, "Users/u1/trip").unwrap(), 2);
}

#[test]
fn array_union_and_remove_are_exact_value_ops() {
    let conn = setup();
    store::add(&conn, "Users", &json!({"ledgers": {"personal": []}}), Some("u1")).unwrap();

    store::array_union(&conn, "Users", "u1", "ledgers.personal", &[json!("a"), json!("b")])
        .unwrap();
    store::array_union(&conn, "Users", "u1", "ledgers.personal", &[json!("a")]).unwrap();
    let doc = store::get(&conn, "Users", "u1").unwrap().unwrap();
    assert_eq!(doc.data["ledgers"]["personal"], json!(["a", "b"]));

    // removing something absent is a no-op
    store::array_remove(&conn, "Users", "u1", "ledgers.personal", &[json!("zzz")]).unwrap();
    let doc = store::get(&conn, "Users", "u1").unwrap().unwrap();
    assert_eq!(doc.data["ledgers"]["personal"], json!(["a", "b"]));

    store::array_remove(&conn, "Users", "u1", "ledgers.personal", &[json!("a")]).unwrap();
    let doc = store::get(&conn, "Users", "u1").unwrap().unwrap();
    assert_eq!(doc.data["ledgers"]["personal"], json!(["b"]));
}

#[test]
fn array_ops_on_missing_document_fail() {
    let conn = setup();
    assert!(matches!(
        store::array_union(&conn, "Users", "ghost", "ledgers.personal", &[json!("a")])
            .unwrap_err(),
        StoreError::NotFound { .. }
    ));
}
