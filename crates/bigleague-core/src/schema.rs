//! Per-table schema descriptors
//!
//! A `TableSchema` names a table, its ordered field list, the fields that
//! make up the logical key, and the fields the server assigns on write. Every
//! store operation is checked against one of these before any SQL is built,
//! and field names only ever reach SQL through a schema.

use crate::errors::{ExError, ExErrorKind, Result, StoreError};
use crate::value::{Conditions, Row, Value};

/// Name of the version timestamp column carried by every table
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Storage kind of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Stored as canonical text, read back as a native identifier
    Uuid,
    Text,
    /// 64-bit integer; date/time values are stored as epoch milliseconds
    Integer,
    /// Arbitrary nested value stored as JSON text
    Json,
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Uuid => "uuid",
            FieldKind::Text => "text",
            FieldKind::Integer => "integer",
            FieldKind::Json => "json",
        }
    }

    /// Whether `value` can be stored in a field of this kind.
    ///
    /// Null is always accepted here; NOT NULL is enforced by the storage
    /// engine and surfaces as a constraint violation.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (FieldKind::Uuid, v) => v.as_uuid().is_some(),
            (FieldKind::Text, Value::Text(_)) => true,
            (FieldKind::Integer, Value::Int(_) | Value::DateTime(_)) => true,
            (FieldKind::Json, _) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn uuid(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Uuid,
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
        }
    }

    pub const fn integer(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Integer,
        }
    }

    pub const fn json(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Json,
        }
    }
}

/// Static description of one versioned table (or a projecting view of it)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub table: &'static str,
    /// Ordered field list; reads project exactly these columns
    pub fields: &'static [FieldSpec],
    /// Fields identifying one entity across all of its versions
    pub key_fields: &'static [&'static str],
    /// Server-assigned fields, stripped from caller input on write
    pub auto_fields: &'static [&'static str],
}

impl TableSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    pub fn is_auto(&self, name: &str) -> bool {
        self.auto_fields.iter().any(|a| *a == name)
    }

    /// Fields a write must supply, in schema order
    pub fn insert_fields(&self) -> impl Iterator<Item = &FieldSpec> + '_ {
        self.fields.iter().filter(|f| !self.is_auto(f.name))
    }

    /// The single field used to look an entity up by identifier, when the
    /// logical key is not composite
    pub fn id_field(&self) -> Option<&'static str> {
        match self.key_fields {
            [only] => Some(*only),
            _ => None,
        }
    }

    /// Check that the descriptor is internally consistent and that every
    /// name is safe to splice into SQL
    ///
    /// # Errors
    ///
    /// Returns `ExErrorKind::Config` naming the first inconsistency.
    pub fn validate(&self) -> Result<()> {
        let fail = |message: String| {
            Err(ExError::new(ExErrorKind::Config)
                .with_op("validate_schema")
                .with_table(self.table)
                .with_message(message))
        };

        if !is_identifier(self.table) {
            return fail(format!("invalid table name '{}'", self.table));
        }
        if let Some(bad) = self.field_names().find(|f| !is_identifier(f)) {
            return fail(format!("invalid field name '{}'", bad));
        }
        if self.key_fields.is_empty() {
            return fail("logical key must name at least one field".to_string());
        }
        if let Some(k) = self.key_fields.iter().find(|k| !self.has_field(k)) {
            return fail(format!("key field '{}' is not a field", k));
        }
        if let Some(k) = self.key_fields.iter().find(|k| self.is_auto(k)) {
            return fail(format!("key field '{}' cannot be auto-assigned", k));
        }
        if let Some(a) = self.auto_fields.iter().find(|a| !self.has_field(a)) {
            return fail(format!("auto field '{}' is not a field", a));
        }
        if !self.has_field(TIMESTAMP_FIELD) || !self.is_auto(TIMESTAMP_FIELD) {
            return fail(format!(
                "'{}' must be a field and auto-assigned",
                TIMESTAMP_FIELD
            ));
        }
        Ok(())
    }

    /// Reject empty condition sets and conditions on unknown fields
    ///
    /// # Errors
    ///
    /// Returns `ExErrorKind::InvalidQuery`.
    pub fn check_conditions(&self, conditions: &Conditions) -> Result<()> {
        if conditions.is_empty() {
            return Err(StoreError::InvalidQuery {
                table: self.table.to_string(),
                reason: "conditions must not be empty".to_string(),
            }
            .into());
        }
        self.check_condition_fields(conditions)
    }

    /// Reject conditions on unknown fields; an empty set is allowed
    ///
    /// # Errors
    ///
    /// Returns `ExErrorKind::InvalidQuery`.
    pub fn check_condition_fields(&self, conditions: &Conditions) -> Result<()> {
        let unknown: Vec<String> = conditions
            .keys()
            .filter(|k| !self.has_field(k))
            .cloned()
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(ExError::from(StoreError::InvalidQuery {
                table: self.table.to_string(),
                reason: format!("unknown condition fields: {}", unknown.join(", ")),
            })
            .with_fields(unknown))
        }
    }

    /// Turn caller input into the exact set of columns to insert
    ///
    /// Unknown fields are dropped, key fields must be present, auto fields
    /// are stripped, every remaining field must be present and must fit its
    /// declared kind.
    ///
    /// # Errors
    ///
    /// `MissingKey`, `MissingField` or `InvalidInput`.
    pub fn prepare_insert(&self, item: &Row) -> Result<Row> {
        let mut prepared: Row = item
            .iter()
            .filter(|(k, _)| self.has_field(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let missing_keys: Vec<String> = self
            .key_fields
            .iter()
            .filter(|k| !prepared.contains_key(**k))
            .map(|k| k.to_string())
            .collect();
        if !missing_keys.is_empty() {
            return Err(StoreError::MissingKey {
                table: self.table.to_string(),
                keys: missing_keys,
            }
            .into());
        }

        prepared.retain(|k, _| !self.is_auto(k));

        let missing_fields: Vec<String> = self
            .insert_fields()
            .filter(|f| !prepared.contains_key(f.name))
            .map(|f| f.name.to_string())
            .collect();
        if !missing_fields.is_empty() {
            return Err(StoreError::MissingField {
                table: self.table.to_string(),
                fields: missing_fields,
            }
            .into());
        }

        for spec in self.insert_fields() {
            if let Some(value) = prepared.get(spec.name) {
                if !spec.kind.accepts(value) {
                    return Err(StoreError::InvalidFieldValue {
                        table: self.table.to_string(),
                        field: spec.name.to_string(),
                        expected: spec.kind.name().to_string(),
                    }
                    .into());
                }
            }
        }

        Ok(prepared)
    }

    /// Extract the logical key of a row as equality conditions
    ///
    /// # Errors
    ///
    /// `MissingKey` when the row lacks any key field.
    pub fn key_conditions(&self, row: &Row) -> Result<Conditions> {
        let mut conditions = Conditions::new();
        let mut missing = Vec::new();
        for key in self.key_fields {
            match row.get(*key) {
                Some(v) => {
                    conditions.insert(key.to_string(), v.clone());
                }
                None => missing.push(key.to_string()),
            }
        }
        if missing.is_empty() {
            Ok(conditions)
        } else {
            Err(StoreError::MissingKey {
                table: self.table.to_string(),
                keys: missing,
            }
            .into())
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
