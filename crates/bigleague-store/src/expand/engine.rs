//! Depth-first relation expansion
//!
//! Walks a value tree and replaces registered foreign keys with the rows
//! they point at, read as of one pinned instant. Every other scalar is
//! normalized with the serializer. Null map entries and paths outside the
//! whitelist are dropped.

#![allow(clippy::result_large_err)]

use super::registry::RelationRegistry;
use super::whitelist::Whitelist;
use crate::errors::Result;
use crate::versioned;
use bigleague_core::errors::{ExError, ExErrorKind, StoreError};
use bigleague_core::schema::{TableSchema, TIMESTAMP_FIELD};
use bigleague_core::serialize::serialize;
use bigleague_core::value::{Conditions, Row, Value};
use bigleague_core_types::schema::EVENT_FAILED_EXPANSION;
use rusqlite::Connection;
use std::collections::HashSet;

const ID_SUFFIX: &str = "_id";
const IDS_SUFFIX: &str = "_ids";

/// Where the engine reads referenced rows from
pub trait RecordSource {
    /// The version of the matching entity visible at `timestamp`
    fn fetch(
        &self,
        schema: &TableSchema,
        conditions: &Conditions,
        timestamp: Option<i64>,
    ) -> Result<Option<Row>>;
}

impl RecordSource for Connection {
    fn fetch(
        &self,
        schema: &TableSchema,
        conditions: &Conditions,
        timestamp: Option<i64>,
    ) -> Result<Option<Row>> {
        versioned::fetch_item(self, schema, conditions, timestamp)
    }
}

/// Source with nothing in it
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRecords;

impl RecordSource for NoRecords {
    fn fetch(&self, _: &TableSchema, _: &Conditions, _: Option<i64>) -> Result<Option<Row>> {
        Ok(None)
    }
}

/// Read instant for nested fetches
///
/// `Open` carries the caller's instant until the first map on a path
/// settles it; from then on every fetch below that map uses the same one.
/// A map that yields no instant leaves the pin open for the maps below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pin {
    Open(Option<i64>),
    Fixed(i64),
}

impl Pin {
    fn settle(self, map: &Row) -> Pin {
        match self {
            Pin::Open(caller) => match row_timestamp(map).or(caller) {
                Some(ts) => Pin::Fixed(ts),
                None => Pin::Open(None),
            },
            fixed => fixed,
        }
    }

    fn at(self) -> Option<i64> {
        match self {
            Pin::Open(ts) => ts,
            Pin::Fixed(ts) => Some(ts),
        }
    }
}

/// Version timestamp carried by a row, if any
pub fn row_timestamp(row: &Row) -> Option<i64> {
    match row.get(TIMESTAMP_FIELD)? {
        Value::Int(ts) => Some(*ts),
        Value::DateTime(dt) => Some(dt.timestamp_millis()),
        _ => None,
    }
}

fn path_join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn path_listify(path: &str) -> String {
    format!("{}[]", path)
}

enum RelationKey {
    /// `<stem>_id` becomes `<stem>`
    One(String),
    /// `<stem>_ids` becomes `<stem>s`
    Many(String),
}

impl RelationKey {
    fn output_key(&self) -> String {
        match self {
            RelationKey::One(stem) => stem.clone(),
            RelationKey::Many(stem) => format!("{}s", stem),
        }
    }
}

pub struct Expander<'a, S: RecordSource + ?Sized> {
    source: &'a S,
    registry: &'a RelationRegistry,
    whitelist: Option<&'a Whitelist>,
    /// Identifiers whose expansion is in progress on the current path
    seen: HashSet<String>,
}

impl<'a, S: RecordSource + ?Sized> Expander<'a, S> {
    pub fn new(
        source: &'a S,
        registry: &'a RelationRegistry,
        whitelist: Option<&'a Whitelist>,
    ) -> Self {
        Self {
            source,
            registry,
            whitelist,
            seen: HashSet::new(),
        }
    }

    /// Expand with the pin taken from the first map reached on each path,
    /// falling back to `timestamp`
    pub fn expand(&mut self, value: Value, timestamp: Option<i64>) -> Result<Value> {
        self.visit(value, Pin::Open(timestamp), "")
    }

    /// Expand with every fetch pinned to `timestamp`
    pub fn expand_at(&mut self, value: Value, timestamp: i64) -> Result<Value> {
        self.visit(value, Pin::Fixed(timestamp), "")
    }

    fn allowed(&self, path: &str) -> bool {
        self.whitelist.map_or(true, |wl| wl.allows(path))
    }

    fn relation_key(&self, key: &str) -> Option<RelationKey> {
        if let Some(stem) = key.strip_suffix(IDS_SUFFIX) {
            if self.registry.contains(stem) {
                return Some(RelationKey::Many(stem.to_string()));
            }
        }
        if let Some(stem) = key.strip_suffix(ID_SUFFIX) {
            if self.registry.contains(stem) {
                return Some(RelationKey::One(stem.to_string()));
            }
        }
        None
    }

    fn visit(&mut self, value: Value, pin: Pin, path: &str) -> Result<Value> {
        match value {
            Value::Map(map) => self.visit_map(map, pin, path).map(Value::Map),
            Value::List(items) => {
                let item_path = path_listify(path);
                items
                    .into_iter()
                    .map(|item| self.visit(item, pin, &item_path))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::List)
            }
            Value::Tuple(items) => {
                let item_path = path_join(path, "()");
                items
                    .into_iter()
                    .map(|item| self.visit(item, pin, &item_path))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Tuple)
            }
            scalar => Ok(serialize(&scalar)),
        }
    }

    fn visit_map(&mut self, map: Row, pin: Pin, path: &str) -> Result<Row> {
        let pin = pin.settle(&map);

        for (key, value) in &map {
            if value.is_null() || !self.allowed(&path_join(path, key)) {
                continue;
            }
            if let Some(relation) = self.relation_key(key) {
                let output = relation.output_key();
                if map.get(&output).is_some_and(|v| !v.is_null()) {
                    return Err(ExError::new(ExErrorKind::ExpansionFailed)
                        .with_path(path_join(path, &output))
                        .with_message(format!(
                            "cannot expand '{}': '{}' is already present",
                            key, output
                        )));
                }
            }
        }

        let mut out = Row::new();
        for (key, value) in map {
            let key_path = path_join(path, &key);
            if value.is_null() || !self.allowed(&key_path) {
                continue;
            }

            match self.relation_key(&key) {
                Some(RelationKey::One(stem)) => {
                    let relation_path = path_join(path, &stem);
                    let nested = self.resolve(&stem, &value, pin, &relation_path)?;
                    out.insert(stem, nested);
                }
                Some(RelationKey::Many(stem)) => {
                    let plural = format!("{}s", stem);
                    let relation_path = path_listify(&path_join(path, &plural));
                    let ids = match value {
                        Value::List(ids) | Value::Tuple(ids) => ids,
                        _ => {
                            return Err(ExError::new(ExErrorKind::InvalidInput)
                                .with_path(key_path)
                                .with_message(format!("'{}' must hold a list of identifiers", key)))
                        }
                    };
                    let mut expanded = Vec::with_capacity(ids.len());
                    for id in &ids {
                        expanded.push(self.resolve(&stem, id, pin, &relation_path)?);
                    }
                    out.insert(plural, Value::List(expanded));
                }
                None => {
                    let visited = self.visit(value, pin, &key_path)?;
                    out.insert(key, visited);
                }
            }
        }
        Ok(out)
    }

    fn resolve(&mut self, relation: &str, id: &Value, pin: Pin, path: &str) -> Result<Value> {
        let schema = self
            .registry
            .get(relation)
            .copied()
            .ok_or_else(|| unregistered(relation))?;
        let id_field = schema.id_field().ok_or_else(|| unregistered(relation))?;

        let identity = id.identity();
        if self.seen.contains(&identity) {
            return Err(ExError::from(StoreError::CircularReference { id: identity }).with_path(path));
        }

        let conditions = Conditions::from([(id_field.to_string(), id.clone())]);
        let Some(nested) = self.source.fetch(&schema, &conditions, pin.at())? else {
            tracing::warn!(
                component = module_path!(),
                event = EVENT_FAILED_EXPANSION,
                relation,
                path,
                id = %identity,
                pin = ?pin.at(),
            );
            return Err(StoreError::ExpansionFailed {
                relation: relation.to_string(),
                path: path.to_string(),
                id: identity,
            }
            .into());
        };

        self.seen.insert(identity.clone());
        let result = self.visit_map(nested, pin, path);
        self.seen.remove(&identity);
        result.map(Value::Map)
    }
}

fn unregistered(relation: &str) -> ExError {
    ExError::new(ExErrorKind::Internal)
        .with_message(format!("relation '{}' has no usable schema", relation))
}
