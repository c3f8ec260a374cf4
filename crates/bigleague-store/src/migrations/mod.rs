//! Migration framework
//!
//! Provides:
//! - Migration runner with checksum verification
//! - Idempotent application recorded in `schema_version`
//! - Embedded SQL migrations

mod embedded;
mod runner;

pub use runner::{applied_migrations, apply_migrations};
