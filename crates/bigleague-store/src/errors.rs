//! Error handling for bigleague-store
//!
//! Wraps bigleague-core ExError with store-specific helpers

use bigleague_core::errors::{ExError, ExErrorKind, StoreError};
use rusqlite::ErrorCode;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// Create a checksum mismatch error
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: expected {}, got {}",
            migration_id, expected, actual
        ))
}

/// Whether SQLite rejected a statement on integrity grounds
/// (UNIQUE, CHECK, NOT NULL, PRIMARY KEY, FOREIGN KEY)
pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    let kind = match &err {
        e if is_constraint_violation(e) => ExErrorKind::ConstraintViolation,
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(
                e.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::CannotOpen
            ) =>
        {
            ExErrorKind::Unavailable
        }
        _ => ExErrorKind::Persistence,
    };
    ExError::new(kind)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Translate a failed write against `table`
///
/// Integrity rejections become `ConstraintViolation` with the table named;
/// everything else goes through `from_rusqlite`.
pub fn integrity_error(table: &str, err: rusqlite::Error) -> ExError {
    if is_constraint_violation(&err) {
        StoreError::ConstraintViolation {
            table: table.to_string(),
            message: err.to_string(),
        }
        .into()
    } else {
        from_rusqlite(err).with_table(table)
    }
}

/// Create an error from a failed pool checkout
pub fn from_pool(err: r2d2::Error) -> ExError {
    ExError::new(ExErrorKind::Unavailable)
        .with_op("pool_checkout")
        .with_message(err.to_string())
}

/// Create a configuration error
pub fn config_error(err: config::ConfigError) -> ExError {
    ExError::new(ExErrorKind::Config)
        .with_op("load_config")
        .with_message(err.to_string())
}

/// Create a serialization error for a stored JSON column
pub fn json_error(table: &str, field: &str, err: serde_json::Error) -> ExError {
    ExError::new(ExErrorKind::Serialization)
        .with_table(table)
        .with_fields(vec![field.to_string()])
        .with_message(err.to_string())
}
