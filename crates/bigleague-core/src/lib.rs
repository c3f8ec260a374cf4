//! BigLeague Core - values, schemas and facilities shared by the store
//!
//! This crate provides:
//! - The `Value` tree used for rows, conditions and expansion roots
//! - `TableSchema` descriptors for versioned tables
//! - The serializer that makes value trees transport-safe
//! - The structured error facility (`ExError`, `ExErrorKind`, `StoreError`)
//! - The structured logging facility and its macros

pub mod errors;
pub mod logging_facility;
pub mod schema;
pub mod serialize;
pub mod value;

// Re-export commonly used types
pub use errors::{ExError, ExErrorKind, Result, StoreError};
pub use schema::{FieldKind, FieldSpec, TableSchema, TIMESTAMP_FIELD};
pub use serialize::{serialize, serialize_row};
pub use value::{row, Conditions, Row, Value};
