//! Transport-safe normalization of value trees
//!
//! Opaque identifiers become their canonical string form and date/time
//! values become integer epoch milliseconds. Containers keep their shape.
//! Nothing is looked up and nothing is dropped, so the function is safe to
//! apply anywhere a value leaves the process.

use crate::value::{Row, Value};

/// Normalize a value tree depth-first
///
/// Idempotent: `serialize(&serialize(v)) == serialize(v)`.
pub fn serialize(value: &Value) -> Value {
    match value {
        Value::Uuid(u) => Value::Text(u.to_string()),
        Value::DateTime(dt) => Value::Int(dt.timestamp_millis()),
        Value::List(items) => Value::List(items.iter().map(serialize).collect()),
        Value::Tuple(items) => Value::Tuple(items.iter().map(serialize).collect()),
        Value::Map(map) => Value::Map(serialize_row(map)),
        scalar => scalar.clone(),
    }
}

/// Normalize every value of a row
pub fn serialize_row(row: &Row) -> Row {
    row.iter().map(|(k, v)| (k.clone(), serialize(v))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::row;
    use chrono::DateTime;
    use uuid::Uuid;

    #[test]
    fn test_scalars_pass_through() {
        for v in [
            Value::Null,
            Value::Bool(true),
            Value::Int(-3),
            Value::Float(2.5),
            Value::Text("x".into()),
        ] {
            assert_eq!(serialize(&v), v);
        }
    }

    #[test]
    fn test_nested_shapes_preserved() {
        let id = Uuid::new_v4();
        let dt = DateTime::from_timestamp_millis(42).unwrap();
        let input = Value::Map(row([
            ("pair", Value::Tuple(vec![Value::Uuid(id), Value::DateTime(dt)])),
            ("list", Value::List(vec![Value::Map(row([("id", Value::Uuid(id))]))])),
        ]));

        let out = serialize(&input);

        assert_eq!(
            out.get("pair"),
            Some(&Value::Tuple(vec![Value::Text(id.to_string()), Value::Int(42)]))
        );
        assert_eq!(
            out.get("list").and_then(|l| l.as_list()).map(|l| l.len()),
            Some(1)
        );
        assert_eq!(serialize(&out), out);
    }
}
