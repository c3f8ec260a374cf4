//! BigLeague Store - versioned persistence and relation expansion over SQLite
//!
//! Provides:
//! - Pooled SQLite connections and embedded, checksummed migrations
//! - `Store`: point-in-time reads and append-only writes over any
//!   `TableSchema`
//! - The expansion engine that nests referenced rows into responses
//! - The BigLeague table catalog and entity helpers

pub mod clock;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod expand;
pub mod migrations;
pub mod store;
pub mod tables;
pub mod versioned;

// Re-export key types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::StoreConfig;
pub use errors::Result;
pub use expand::{serialize_filtered, ExpandOptions, RelationRegistry, Whitelist};
pub use store::Store;
