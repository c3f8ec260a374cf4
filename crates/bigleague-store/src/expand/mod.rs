//! Relation expansion
//!
//! Turns rows holding foreign keys into nested response bodies. Use
//! `Store::expand` for reads against the database; `serialize_filtered`
//! runs the same traversal with nothing to expand.

mod engine;
mod registry;
mod whitelist;

pub use engine::{row_timestamp, Expander, NoRecords, RecordSource};
pub use registry::RelationRegistry;
pub use whitelist::Whitelist;

use crate::errors::Result;
use bigleague_core::value::Value;

/// How `Store::expand` pins its reads and prunes its output
#[derive(Debug, Clone, Default)]
pub struct ExpandOptions {
    /// Read instant used when the root carries no `timestamp` of its own
    pub timestamp: Option<i64>,
    /// Pin to `max(root timestamp, now)` instead
    pub latest: bool,
    pub whitelist: Option<Whitelist>,
}

impl ExpandOptions {
    pub fn at(timestamp: i64) -> Self {
        Self {
            timestamp: Some(timestamp),
            ..Self::default()
        }
    }

    pub fn latest() -> Self {
        Self {
            latest: true,
            ..Self::default()
        }
    }

    pub fn with_whitelist(mut self, whitelist: Whitelist) -> Self {
        self.whitelist = Some(whitelist);
        self
    }
}

/// Normalize a tree, drop null map entries and prune it to `whitelist`
/// without following any relation
pub fn serialize_filtered(value: Value, whitelist: Option<&Whitelist>) -> Result<Value> {
    let registry = RelationRegistry::new();
    Expander::new(&NoRecords, &registry, whitelist).expand(value, None)
}
