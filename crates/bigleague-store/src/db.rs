//! Database connection management
//!
//! Every connection handed out by the pool has foreign keys enabled and a
//! busy timeout set; file databases also run in WAL mode.

#![allow(clippy::result_large_err)]

use crate::config::StoreConfig;
use crate::errors::{from_pool, Result};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::time::Duration;

pub type Pool = r2d2::Pool<SqliteConnectionManager>;
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

fn configure(conn: &mut Connection, busy_timeout: Duration, wal: bool) -> rusqlite::Result<()> {
    conn.busy_timeout(busy_timeout)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    if wal {
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    }
    Ok(())
}

/// Build a pool over the database file named by the config
pub fn open_pool(config: &StoreConfig) -> Result<Pool> {
    let busy_timeout = config.busy_timeout();
    let manager = SqliteConnectionManager::file(&config.database_path)
        .with_init(move |conn| configure(conn, busy_timeout, true));

    r2d2::Pool::builder()
        .max_size(config.pool_size.max(1))
        .connection_timeout(config.connection_timeout())
        .build(manager)
        .map_err(from_pool)
}

/// Build a pool over a private in-memory database
///
/// Each in-memory SQLite connection is its own database, so the pool holds
/// exactly one connection and never recycles it.
pub fn open_in_memory_pool() -> Result<Pool> {
    let defaults = StoreConfig::default();
    let busy_timeout = defaults.busy_timeout();
    let manager =
        SqliteConnectionManager::memory().with_init(move |conn| configure(conn, busy_timeout, false));

    r2d2::Pool::builder()
        .max_size(1)
        .min_idle(Some(1))
        .idle_timeout(None)
        .max_lifetime(None)
        .connection_timeout(defaults.connection_timeout())
        .build(manager)
        .map_err(from_pool)
}
