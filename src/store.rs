// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Generic document-store adapter: get/add/update/delete/list plus
//! exact-value array union/remove on a single document, keyed by
//! collection path + document id.

use rand::Rng;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document '{id}' not found in '{collection}'")]
    NotFound { collection: String, id: String },
    #[error("document '{id}' already exists in '{collection}'")]
    Duplicate { collection: String, id: String },
    #[error("document '{id}' in '{collection}' is not valid JSON: {source}")]
    Malformed {
        collection: String,
        id: String,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone)]
pub struct Doc {
    pub id: String,
    pub data: Value,
}

/// Logical collection paths; the hierarchy is encoded in the path string.
pub mod paths {
    pub const USERS: &str = "Users";
    pub const SHARED_LEDGERS: &str = "SharedLedgers";
    pub const STOCK_CATALOG: &str = "StockCatalog";

    pub fn ledger(uid: &str, ledger_id: &str) -> String {
        format!("{}/{}/{}", USERS, uid, ledger_id)
    }

    pub fn assets(uid: &str) -> String {
        format!("{}/{}/assets", USERS, uid)
    }

    pub fn options(uid: &str) -> String {
        format!("{}/{}/options", USERS, uid)
    }

    pub fn relationship(uid: &str) -> String {
        format!("{}/{}/relationship", USERS, uid)
    }

    pub fn shared_expenses(invite_code: &str) -> String {
        format!("{}/{}/expenses", SHARED_LEDGERS, invite_code)
    }
}

fn load(conn: &Connection, collection: &str, id: &str) -> StoreResult<Option<Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT data FROM documents WHERE collection=?1 AND id=?2",
            params![collection, id],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        None => Ok(None),
        Some(s) => {
            let data = serde_json::from_str(&s).map_err(|source| StoreError::Malformed {
                collection: collection.to_string(),
                id: id.to_string(),
                source,
            })?;
            Ok(Some(data))
        }
    }
}

fn persist(conn: &Connection, collection: &str, id: &str, data: &Value) -> StoreResult<()> {
    conn.execute(
        "UPDATE documents SET data=?3 WHERE collection=?1 AND id=?2",
        params![collection, id, data.to_string()],
    )?;
    Ok(())
}

/// Mirror the document id into the payload so callers see it as a field,
/// without clobbering a field the document already carries (expense and
/// asset records keep their own numeric `id`).
fn with_id(id: String, mut data: Value) -> Doc {
    if let Value::Object(obj) = &mut data {
        obj.entry("id".to_string())
            .or_insert_with(|| Value::String(id.clone()));
    }
    Doc { id, data }
}

pub fn get(conn: &Connection, collection: &str, id: &str) -> StoreResult<Option<Doc>> {
    Ok(load(conn, collection, id)?.map(|data| with_id(id.to_string(), data)))
}

pub fn exists(conn: &Connection, collection: &str, id: &str) -> StoreResult<bool> {
    let hit: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM documents WHERE collection=?1 AND id=?2",
            params![collection, id],
            |r| r.get(0),
        )
        .optional()?;
    Ok(hit.is_some())
}

fn auto_id() -> String {
    const ALPHABET: &[u8] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..20)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Insert a new document. An explicit id that is already taken is a
/// `Duplicate` error; with no id a random one is generated.
pub fn add(
    conn: &Connection,
    collection: &str,
    data: &Value,
    id: Option<&str>,
) -> StoreResult<String> {
    let id = match id {
        Some(s) => s.to_string(),
        None => auto_id(),
    };
    let inserted = conn.execute(
        "INSERT INTO documents(collection, id, data) VALUES (?1, ?2, ?3)",
        params![collection, id, data.to_string()],
    );
    match inserted {
        Ok(_) => Ok(id),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(StoreError::Duplicate {
                collection: collection.to_string(),
                id,
            })
        }
        Err(e) => Err(e.into()),
    }
}

/// Merge the top-level fields of `partial` into an existing document.
pub fn update(
    conn: &Connection,
    collection: &str,
    id: &str,
    partial: &Value,
) -> StoreResult<()> {
    let mut data = load(conn, collection, id)?.ok_or_else(|| StoreError::NotFound {
        collection: collection.to_string(),
        id: id.to_string(),
    })?;
    if let (Value::Object(obj), Value::Object(patch)) = (&mut data, partial) {
        for (k, v) in patch {
            obj.insert(k.clone(), v.clone());
        }
    }
    persist(conn, collection, id, &data)
}

pub fn delete(conn: &Connection, collection: &str, id: &str) -> StoreResult<()> {
    let n = conn.execute(
        "DELETE FROM documents WHERE collection=?1 AND id=?2",
        params![collection, id],
    )?;
    if n == 0 {
        return Err(StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn list(conn: &Connection, collection: &str) -> StoreResult<Vec<Doc>> {
    let mut stmt =
        conn.prepare("SELECT id, data FROM documents WHERE collection=?1 ORDER BY id")?;
    let rows = stmt.query_map(params![collection], |r| {
        Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
    })?;
    let mut docs = Vec::new();
    for row in rows {
        let (id, raw) = row?;
        let data = serde_json::from_str(&raw).map_err(|source| StoreError::Malformed {
            collection: collection.to_string(),
            id: id.clone(),
            source,
        })?;
        docs.push(with_id(id, data));
    }
    Ok(docs)
}

/// Next monotonic numeric record id for a collection: max(existing)+1,
/// 1 when empty. Ids are scoped to the collection; run inside the same
/// transaction as the insert so concurrent creators serialize.
pub fn next_record_id(conn: &Connection, collection: &str) -> StoreResult<i64> {
    let docs = list(conn, collection)?;
    let max = docs
        .iter()
        .filter_map(|d| d.data.get("id").and_then(crate::utils::coerce_i64))
        .max()
        .unwrap_or(0);
    Ok(max + 1)
}

/// Walk (and create) nested objects along a dotted field path, returning
/// the slot for the final segment.
fn field_entry<'a>(mut cur: &'a mut Value, path: &str) -> &'a mut Value {
    for seg in path.split('.') {
        if !cur.is_object() {
            *cur = Value::Object(Map::new());
        }
        cur = match cur {
            Value::Object(map) => map.entry(seg.to_string()).or_insert(Value::Null),
            _ => unreachable!("slot was just made an object"),
        };
    }
    cur
}

fn rmw_array<F>(
    conn: &Connection,
    collection: &str,
    id: &str,
    field: &str,
    apply: F,
) -> StoreResult<()>
where
    F: FnOnce(&mut Vec<Value>),
{
    let mut data = load(conn, collection, id)?.ok_or_else(|| StoreError::NotFound {
        collection: collection.to_string(),
        id: id.to_string(),
    })?;
    let slot = field_entry(&mut data, field);
    if !slot.is_array() {
        *slot = Value::Array(Vec::new());
    }
    if let Value::Array(arr) = slot {
        apply(arr);
    }
    persist(conn, collection, id, &data)
}

/// Set-union append: each value is added only if no element of the array
/// is exactly equal to it.
pub fn array_union(
    conn: &Connection,
    collection: &str,
    id: &str,
    field: &str,
    values: &[Value],
) -> StoreResult<()> {
    rmw_array(conn, collection, id, field, |arr| {
        for v in values {
            if !arr.contains(v) {
                arr.push(v.clone());
            }
        }
    })
}

/// Exact-value removal; removing an absent value is a no-op.
pub fn array_remove(
    conn: &Connection,
    collection: &str,
    id: &str,
    field: &str,
    values: &[Value],
) -> StoreResult<()> {
    rmw_array(conn, collection, id, field, |arr| {
        arr.retain(|x| !values.contains(x));
    })
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn union_creates_nested_field_and_dedups() {
        let conn = setup();
        add(&conn, "Users", &json!({"ledgers": {}}), Some("u1")).unwrap();
        array_union(&conn, "Users", "u1", "ledgers.personal", &[json!("trip")]).unwrap();
        array_union(&conn, "Users", "u1", "ledgers.personal", &[json!("trip")]).unwrap();
        let doc = get(&conn, "Users", "u1").unwrap().unwrap();
        assert_eq!(doc.data["ledgers"]["personal"], json!(["trip"]));
    }

    #[test]
    fn remove_matches_exact_objects_only() {
        let conn = setup();
        add(
            &conn,
            "Users",
            &json!({"ledgers": {"shared": [{"invite_code": "AAAAAA", "name": "Trip"}]}}),
            Some("u1"),
        )
        .unwrap();
        array_remove(
            &conn,
            "Users",
            "u1",
            "ledgers.shared",
            &[json!({"invite_code": "AAAAAA", "name": "Other"})],
        )
        .unwrap();
        let doc = get(&conn, "Users", "u1").unwrap().unwrap();
        assert_eq!(doc.data["ledgers"]["shared"].as_array().unwrap().len(), 1);

        array_remove(
            &conn,
            "Users",
            "u1",
            "ledgers.shared",
            &[json!({"invite_code": "AAAAAA", "name": "Trip"})],
        )
        .unwrap();
        let doc = get(&conn, "Users", "u1").unwrap().unwrap();
        assert!(doc.data["ledgers"]["shared"].as_array().unwrap().is_empty());
    }

    #[test]
    fn get_mirrors_id_without_clobbering() {
        let conn = setup();
        add(&conn, "Users/u1/expenses", &json!({"id": 7, "item": "x"}), Some("7")).unwrap();
        let doc = get(&conn, "Users/u1/expenses", "7").unwrap().unwrap();
        assert_eq!(doc.data["id"], json!(7));

        add(&conn, "Users", &json!({"email": "a@b.c"}), Some("u1")).unwrap();
        let doc = get(&conn, "Users", "u1").unwrap().unwrap();
        assert_eq!(doc.data["id"], json!("u1"));
    }
}
