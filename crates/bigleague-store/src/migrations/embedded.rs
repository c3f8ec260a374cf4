//! Embedded SQL migrations
//!
//! Migrations are embedded at compile time using include_str!

use sha2::{Digest, Sha256};

/// Migration metadata
pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

impl Migration {
    /// Hex SHA-256 of the migration SQL, recorded when it is applied
    pub fn checksum(&self) -> String {
        hex::encode(Sha256::digest(self.sql.as_bytes()))
    }
}

/// Get all embedded migrations in order
pub fn get_migrations() -> Vec<Migration> {
    vec![Migration {
        id: "001_initial_schema",
        sql: include_str!("../../migrations/001_initial_schema.sql"),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_is_stable_sha256_hex() {
        let m = &get_migrations()[0];
        assert_eq!(m.checksum().len(), 64);
        assert_eq!(m.checksum(), m.checksum());
    }

    #[test]
    fn test_migration_ids_are_ordered() {
        let ids: Vec<_> = get_migrations().iter().map(|m| m.id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }
}
