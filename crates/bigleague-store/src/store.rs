//! Store handle
//!
//! `Store` owns the connection pool and the clock. Each public operation
//! checks out one connection, runs inside one transaction, and logs a
//! start/end pair through the logging facility. Build it once and pass it
//! to callers; cloning shares the pool.

#![allow(clippy::result_large_err)]

use crate::config::StoreConfig;
use crate::db::{self, Pool};
use crate::errors::{from_pool, from_rusqlite, Result};
use crate::clock::{Clock, SystemClock};
use crate::expand::{row_timestamp, ExpandOptions, Expander, RelationRegistry};
use crate::migrations;
use crate::versioned;
use bigleague_core::schema::TableSchema;
use bigleague_core::value::{Conditions, Row, Value};
use bigleague_core::{log_op_end, log_op_error, log_op_start};
use rusqlite::{Transaction, TransactionBehavior};
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct Store {
    pool: Pool,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("pool_size", &self.pool.max_size())
            .finish_non_exhaustive()
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

impl Store {
    /// Wrap an existing pool; the schema is not touched
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            clock: Arc::new(SystemClock),
        }
    }

    /// Open the configured database file and apply pending migrations
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let store = Self::new(db::open_pool(config)?);
        store.migrate()?;
        Ok(store)
    }

    /// Private in-memory database with the schema applied
    pub fn open_in_memory() -> Result<Self> {
        let store = Self::new(db::open_in_memory_pool()?);
        store.migrate()?;
        Ok(store)
    }

    /// Replace the time source used to stamp new versions
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Apply every embedded migration not yet recorded
    pub fn migrate(&self) -> Result<()> {
        log_op_start!("migrate");
        let start = Instant::now();

        let result = self
            .pool
            .get()
            .map_err(from_pool)
            .and_then(|mut conn| migrations::apply_migrations(&mut conn))
            .map_err(|e| {
                log_op_error!("migrate", &e, duration_ms = elapsed_ms(start));
                e
            });

        if result.is_ok() {
            log_op_end!("migrate", duration_ms = elapsed_ms(start));
        }
        result
    }

    /// Run `f` inside one pooled connection and one transaction
    fn with_transaction<T>(
        &self,
        behavior: TransactionBehavior,
        f: impl FnOnce(&Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut conn = self.pool.get().map_err(from_pool)?;
        let tx = conn
            .transaction_with_behavior(behavior)
            .map_err(from_rusqlite)?;
        let value = f(&tx)?;
        tx.commit().map_err(from_rusqlite)?;
        Ok(value)
    }

    /// Wrap an operation in the start/end/error log events
    fn logged<T>(
        &self,
        op: &'static str,
        schema: &TableSchema,
        f: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        log_op_start!(op, table = schema.table);
        let start = Instant::now();

        let result = f().map_err(|e| {
            let e = e.with_op(op);
            log_op_error!(op, &e, duration_ms = elapsed_ms(start), table = schema.table);
            e
        })?;

        log_op_end!(op, duration_ms = elapsed_ms(start), table = schema.table);
        Ok(result)
    }

    /// The version of the matching entity visible at `timestamp`, or the
    /// newest version when no instant is given
    ///
    /// Absence is `Ok(None)`, not an error.
    ///
    /// # Errors
    ///
    /// `InvalidQuery` when `conditions` is empty or names an unknown field.
    pub fn get_item(
        &self,
        schema: &TableSchema,
        conditions: &Conditions,
        timestamp: Option<i64>,
    ) -> Result<Option<Row>> {
        self.logged("get_item", schema, || {
            schema.check_conditions(conditions)?;
            self.with_transaction(TransactionBehavior::Deferred, |tx| {
                versioned::fetch_item(tx, schema, conditions, timestamp)
            })
        })
    }

    /// Append a new version of an entity and return it as stored
    ///
    /// Unknown fields are dropped and auto-assigned fields are replaced.
    ///
    /// # Errors
    ///
    /// `MissingKey`, `MissingField`, `InvalidInput` for bad input;
    /// `ConstraintViolation` when the database rejects the row.
    pub fn put_item(&self, schema: &TableSchema, item: &Row) -> Result<Row> {
        self.logged("put_item", schema, || {
            let prepared = schema.prepare_insert(item)?;
            self.with_transaction(TransactionBehavior::Immediate, |tx| {
                versioned::insert_item(tx, schema, &prepared, self.clock.now_millis())
            })
        })
    }

    /// Current version of every entity at `timestamp`, keeping those whose
    /// current version matches `conditions`
    ///
    /// # Errors
    ///
    /// `InvalidQuery` when `conditions` names an unknown field.
    pub fn get_latest_items(
        &self,
        schema: &TableSchema,
        conditions: &Conditions,
        timestamp: Option<i64>,
    ) -> Result<Vec<Row>> {
        self.logged("get_latest_items", schema, || {
            schema.check_condition_fields(conditions)?;
            let rows = self.with_transaction(TransactionBehavior::Deferred, |tx| {
                versioned::fetch_latest(tx, schema, conditions, timestamp)
            })?;
            tracing::debug!(table = schema.table, row_count = rows.len(), "latest items");
            Ok(rows)
        })
    }

    /// Delete every row of the given tables
    pub fn clean(&self, tables: &[TableSchema]) -> Result<()> {
        let names: Vec<&str> = tables.iter().map(|t| t.table).collect();
        log_op_start!("clean", tables = ?names);
        let start = Instant::now();

        self.with_transaction(TransactionBehavior::Immediate, |tx| {
            versioned::truncate(tx, &names)
        })
        .map_err(|e| {
            let e = e.with_op("clean");
            log_op_error!("clean", &e, duration_ms = elapsed_ms(start));
            e
        })?;

        log_op_end!("clean", duration_ms = elapsed_ms(start));
        Ok(())
    }

    /// Replace registered foreign keys in `value` with the rows they name
    ///
    /// Every read happens in one transaction on one connection. The read
    /// instant is the root's own `timestamp`, else `options.timestamp`,
    /// else the newest version. In latest mode it is the later of the
    /// root's `timestamp` and now.
    ///
    /// # Errors
    ///
    /// `ExpansionFailed` when a referenced entity does not exist at the
    /// read instant; `CircularReference` when the references loop.
    pub fn expand(
        &self,
        registry: &RelationRegistry,
        value: Value,
        options: &ExpandOptions,
    ) -> Result<Value> {
        log_op_start!("expand", latest = options.latest);
        let start = Instant::now();

        let result = self
            .with_transaction(TransactionBehavior::Deferred, |tx| {
                let conn: &rusqlite::Connection = tx;
                let mut expander = Expander::new(conn, registry, options.whitelist.as_ref());
                if options.latest {
                    let root_ts = value.as_map().and_then(row_timestamp).unwrap_or(0);
                    let pin = root_ts.max(self.clock.now_millis());
                    expander.expand_at(value, pin)
                } else {
                    expander.expand(value, options.timestamp)
                }
            })
            .map_err(|e| {
                let e = e.with_op("expand");
                log_op_error!("expand", &e, duration_ms = elapsed_ms(start));
                e
            })?;

        log_op_end!("expand", duration_ms = elapsed_ms(start));
        Ok(result)
    }
}
