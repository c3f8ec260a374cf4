//! Relation registry: relation name to table schema

use crate::errors::Result;
use bigleague_core::errors::{ExError, ExErrorKind};
use bigleague_core::schema::TableSchema;
use std::collections::BTreeMap;

/// Relations the expansion engine may follow
///
/// A key `<name>_id` (or `<name>_ids`) in an expanded tree is resolved
/// against the schema registered under `<name>`, looked up by that
/// schema's single logical-key field.
#[derive(Debug, Clone, Default)]
pub struct RelationRegistry {
    relations: BTreeMap<String, TableSchema>,
}

impl RelationRegistry {
    /// An empty registry expands nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `schema` under `name`
    ///
    /// # Errors
    ///
    /// `ExErrorKind::Config` if the schema is inconsistent or its logical
    /// key is composite.
    pub fn register(&mut self, name: impl Into<String>, schema: TableSchema) -> Result<()> {
        let name = name.into();
        schema.validate()?;
        if schema.id_field().is_none() {
            return Err(ExError::new(ExErrorKind::Config)
                .with_op("register_relation")
                .with_table(schema.table)
                .with_message(format!(
                    "relation '{}' needs a single-field logical key",
                    name
                )));
        }
        self.relations.insert(name, schema);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TableSchema> {
        self.relations.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.relations.keys().map(String::as_str)
    }
}
