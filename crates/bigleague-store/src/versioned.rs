//! Append-only, time-versioned table access
//!
//! Stateless functions over a borrowed `Connection`. The caller owns the
//! transaction; `Store` opens one per public operation and the expansion
//! engine reuses a single one for every nested read.
//!
//! Visibility rule: the current version of a logical key at instant T is
//! its row with the greatest `timestamp <= T`, ties broken by `rowid`
//! (later insert wins). With no T, the newest row is current.

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, integrity_error, json_error, Result};
use bigleague_core::errors::{ExError, ExErrorKind};
use bigleague_core::schema::{FieldKind, FieldSpec, TableSchema, TIMESTAMP_FIELD};
use bigleague_core::value::{Conditions, Row, Value};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, OptionalExtension};

/// Double-quote an identifier already checked by `TableSchema::validate`
fn quote(name: &str) -> String {
    format!("\"{}\"", name)
}

fn column_list(schema: &TableSchema, alias: Option<&str>) -> String {
    schema
        .field_names()
        .map(|f| match alias {
            Some(a) => format!("{}.{}", a, quote(f)),
            None => quote(f),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// `"a" IS ? AND "b" IS ?` in condition-key order
fn equality_clause(names: &[&str], alias: &str) -> String {
    if names.is_empty() {
        return "1".to_string();
    }
    names
        .iter()
        .map(|n| format!("{}.{} IS ?", alias, quote(n)))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Convert a value for binding against a column of `kind`
pub(crate) fn to_sql(kind: Option<FieldKind>, value: &Value) -> SqlValue {
    match (kind, value) {
        (_, Value::Null) => SqlValue::Null,
        (Some(FieldKind::Json), v) => SqlValue::Text(v.to_json().to_string()),
        (Some(FieldKind::Uuid), v) => match v.as_uuid() {
            Some(u) => SqlValue::Text(u.to_string()),
            None => SqlValue::Text(v.identity()),
        },
        (_, Value::Bool(b)) => SqlValue::Integer(i64::from(*b)),
        (_, Value::Int(i)) => SqlValue::Integer(*i),
        (_, Value::Float(f)) => SqlValue::Real(*f),
        (_, Value::Text(s)) => SqlValue::Text(s.clone()),
        (_, Value::Uuid(u)) => SqlValue::Text(u.to_string()),
        (_, Value::DateTime(dt)) => SqlValue::Integer(dt.timestamp_millis()),
        (_, v @ (Value::List(_) | Value::Tuple(_) | Value::Map(_))) => {
            SqlValue::Text(v.to_json().to_string())
        }
    }
}

fn from_sql(schema: &TableSchema, spec: &FieldSpec, raw: ValueRef<'_>) -> Result<Value> {
    let value = match raw {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            match spec.kind {
                FieldKind::Uuid => match uuid::Uuid::parse_str(&text) {
                    Ok(u) => Value::Uuid(u),
                    Err(_) => Value::Text(text.into_owned()),
                },
                FieldKind::Json => serde_json::from_str::<serde_json::Value>(&text)
                    .map(Value::from)
                    .map_err(|e| json_error(schema.table, spec.name, e))?,
                FieldKind::Text | FieldKind::Integer => Value::Text(text.into_owned()),
            }
        }
    };
    Ok(value)
}

fn read_row(schema: &TableSchema, row: &rusqlite::Row<'_>) -> Result<Row> {
    let mut out = Row::new();
    for (idx, spec) in schema.fields.iter().enumerate() {
        let raw = row.get_ref(idx).map_err(from_rusqlite)?;
        out.insert(spec.name.to_string(), from_sql(schema, spec, raw)?);
    }
    Ok(out)
}

fn condition_params(schema: &TableSchema, conditions: &Conditions) -> Vec<SqlValue> {
    conditions
        .iter()
        .map(|(k, v)| to_sql(schema.field(k).map(|f| f.kind), v))
        .collect()
}

/// The version of the matching entity visible at `timestamp`
///
/// `conditions` must already have been checked against the schema.
pub fn fetch_item(
    conn: &Connection,
    schema: &TableSchema,
    conditions: &Conditions,
    timestamp: Option<i64>,
) -> Result<Option<Row>> {
    let names: Vec<&str> = conditions.keys().map(String::as_str).collect();
    let mut params = condition_params(schema, conditions);

    let mut sql = format!(
        "SELECT {} FROM {} AS t WHERE {}",
        column_list(schema, Some("t")),
        quote(schema.table),
        equality_clause(&names, "t"),
    );
    if let Some(ts) = timestamp {
        sql.push_str(&format!(" AND t.{} <= ?", quote(TIMESTAMP_FIELD)));
        params.push(SqlValue::Integer(ts));
    }
    sql.push_str(&format!(
        " ORDER BY t.{} DESC, t.rowid DESC LIMIT 1",
        quote(TIMESTAMP_FIELD)
    ));

    let mut stmt = conn.prepare(&sql).map_err(from_rusqlite)?;
    let mut rows = stmt.query(params_from_iter(params)).map_err(from_rusqlite)?;
    match rows.next().map_err(from_rusqlite)? {
        Some(row) => read_row(schema, row).map(Some),
        None => Ok(None),
    }
}

/// Newest timestamp recorded for a logical key, if any
fn latest_timestamp(conn: &Connection, schema: &TableSchema, key: &Conditions) -> Result<Option<i64>> {
    let names: Vec<&str> = key.keys().map(String::as_str).collect();
    let sql = format!(
        "SELECT MAX(t.{}) FROM {} AS t WHERE {}",
        quote(TIMESTAMP_FIELD),
        quote(schema.table),
        equality_clause(&names, "t"),
    );
    conn.query_row(&sql, params_from_iter(condition_params(schema, key)), |row| {
        row.get::<_, Option<i64>>(0)
    })
    .optional()
    .map(Option::flatten)
    .map_err(from_rusqlite)
}

/// Insert one new version and return it as stored
///
/// `prepared` must come from `TableSchema::prepare_insert`. The version
/// timestamp is `now`, bumped to stay strictly above the key's previous
/// version so that the new row is always the current one.
pub fn insert_item(conn: &Connection, schema: &TableSchema, prepared: &Row, now: i64) -> Result<Row> {
    let key = schema.key_conditions(prepared)?;
    let timestamp = match latest_timestamp(conn, schema, &key)? {
        Some(prev) if prev >= now => prev + 1,
        _ => now,
    };

    let mut columns = Vec::new();
    let mut params = Vec::new();
    for spec in schema.insert_fields() {
        if let Some(value) = prepared.get(spec.name) {
            columns.push(quote(spec.name));
            params.push(to_sql(Some(spec.kind), value));
        }
    }
    columns.push(quote(TIMESTAMP_FIELD));
    params.push(SqlValue::Integer(timestamp));

    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote(schema.table),
        columns.join(", "),
        placeholders
    );
    conn.execute(&sql, params_from_iter(params))
        .map_err(|e| integrity_error(schema.table, e))?;

    fetch_item(conn, schema, &key, None)?.ok_or_else(|| {
        ExError::new(ExErrorKind::Internal)
            .with_table(schema.table)
            .with_message("inserted row could not be read back")
    })
}

/// Current version of every distinct logical key at `timestamp`, filtered
/// by `conditions` applied to that current version
///
/// Newest first; ties on timestamp fall back to insertion order.
pub fn fetch_latest(
    conn: &Connection,
    schema: &TableSchema,
    conditions: &Conditions,
    timestamp: Option<i64>,
) -> Result<Vec<Row>> {
    let correlation = schema
        .key_fields
        .iter()
        .map(|k| format!("t2.{q} IS t1.{q}", q = quote(k)))
        .collect::<Vec<_>>()
        .join(" AND ");

    let mut params = Vec::new();
    let mut time_clause = String::new();
    if let Some(ts) = timestamp {
        time_clause = format!(" AND t2.{} <= ?", quote(TIMESTAMP_FIELD));
        params.push(SqlValue::Integer(ts));
    }

    let mut sql = format!(
        "SELECT {cols} FROM {table} AS t1 \
         WHERE t1.rowid = (\
           SELECT t2.rowid FROM {table} AS t2 \
           WHERE {correlation}{time_clause} \
           ORDER BY t2.{ts} DESC, t2.rowid DESC LIMIT 1)",
        cols = column_list(schema, Some("t1")),
        table = quote(schema.table),
        correlation = correlation,
        time_clause = time_clause,
        ts = quote(TIMESTAMP_FIELD),
    );
    if !conditions.is_empty() {
        let names: Vec<&str> = conditions.keys().map(String::as_str).collect();
        sql.push_str(" AND ");
        sql.push_str(&equality_clause(&names, "t1"));
        params.extend(condition_params(schema, conditions));
    }
    sql.push_str(&format!(
        " ORDER BY t1.{} DESC, t1.rowid DESC",
        quote(TIMESTAMP_FIELD)
    ));

    let mut stmt = conn.prepare(&sql).map_err(from_rusqlite)?;
    let mut rows = stmt.query(params_from_iter(params)).map_err(from_rusqlite)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(from_rusqlite)? {
        out.push(read_row(schema, row)?);
    }
    Ok(out)
}

/// Remove every row of the given tables
pub fn truncate(conn: &Connection, tables: &[&str]) -> Result<()> {
    for table in tables {
        conn.execute(&format!("DELETE FROM {}", quote(table)), [])
            .map_err(|e| from_rusqlite(e).with_table(*table))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigleague_core::value::row;

    const THING: TableSchema = TableSchema {
        table: "thing",
        fields: &[
            FieldSpec::uuid("id"),
            FieldSpec::integer("timestamp"),
            FieldSpec::text("label"),
            FieldSpec::json("extra"),
        ],
        key_fields: &["id"],
        auto_fields: &["timestamp"],
    };

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE thing (id TEXT NOT NULL, timestamp INTEGER NOT NULL, \
             label TEXT, extra TEXT, PRIMARY KEY (id, timestamp));",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_uuid_written_as_text_reads_back_native() {
        let conn = conn();
        let id = uuid::Uuid::new_v4();
        let item = row([
            ("id", Value::Text(id.to_string().to_uppercase())),
            ("label", Value::from("a")),
            ("extra", Value::Null),
        ]);

        let stored = insert_item(&conn, &THING, &item, 10).unwrap();

        assert_eq!(stored.get("id"), Some(&Value::Uuid(id)));
        assert_eq!(stored.get("timestamp"), Some(&Value::Int(10)));
    }

    #[test]
    fn test_json_column_round_trips_nested_values() {
        let conn = conn();
        let id = uuid::Uuid::new_v4();
        let extra = Value::from(serde_json::json!({"periods": ["1st", "2nd"], "n": 2}));
        let item = row([
            ("id", Value::Uuid(id)),
            ("label", Value::from("a")),
            ("extra", extra.clone()),
        ]);

        let stored = insert_item(&conn, &THING, &item, 10).unwrap();

        assert_eq!(stored.get("extra"), Some(&extra));
    }

    #[test]
    fn test_timestamp_bumped_past_previous_version() {
        let conn = conn();
        let id = uuid::Uuid::new_v4();
        let item = row([
            ("id", Value::Uuid(id)),
            ("label", Value::from("a")),
            ("extra", Value::Null),
        ]);

        let first = insert_item(&conn, &THING, &item, 50).unwrap();
        let second = insert_item(&conn, &THING, &item, 50).unwrap();
        let third = insert_item(&conn, &THING, &item, 20).unwrap();

        assert_eq!(first.get("timestamp"), Some(&Value::Int(50)));
        assert_eq!(second.get("timestamp"), Some(&Value::Int(51)));
        assert_eq!(third.get("timestamp"), Some(&Value::Int(52)));
    }

    #[test]
    fn test_null_condition_matches_null_column() {
        let conn = conn();
        let id = uuid::Uuid::new_v4();
        let item = row([
            ("id", Value::Uuid(id)),
            ("label", Value::Null),
            ("extra", Value::Null),
        ]);
        insert_item(&conn, &THING, &item, 1).unwrap();

        let found = fetch_item(&conn, &THING, &row([("label", Value::Null)]), None).unwrap();
        assert!(found.is_some());
    }
}
