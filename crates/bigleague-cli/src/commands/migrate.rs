//! Migrate command
//!
//! Usage: bigleague migrate [--database <PATH>]

use super::StoreTarget;
use bigleague_store::db;
use bigleague_store::migrations::applied_migrations;

pub fn execute(target: &StoreTarget) -> Result<(), Box<dyn std::error::Error>> {
    let config = target.load_config()?;
    bigleague_store::Store::open(&config)?;

    let pool = db::open_pool(&config)?;
    let conn = pool.get()?;
    for id in applied_migrations(&conn)? {
        println!("✓ {}", id);
    }
    println!("Database ready: {}", config.database_path.display());
    Ok(())
}
