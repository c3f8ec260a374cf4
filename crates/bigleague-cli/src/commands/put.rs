//! Put command
//!
//! Usage: bigleague put <TABLE> <ITEM>
//!
//! Known tables go through the entity helpers so new entities get their
//! defaults (generated ids, opening states).

use super::{print_json, row_arg, table, StoreTarget};
use bigleague_core::value::Value;
use bigleague_store::entities;
use clap::Args;

#[derive(Debug, Args)]
pub struct PutArgs {
    pub table: String,

    /// JSON object holding the new version, or `-` for stdin
    pub item: String,
}

pub fn execute(target: &StoreTarget, args: PutArgs) -> Result<(), Box<dyn std::error::Error>> {
    let schema = table(&args.table)?;
    let item = row_arg(&args.item)?;
    let store = target.open()?;

    let stored = match args.table.as_str() {
        "team" => entities::put_team(&store, &item)?,
        "player" => entities::put_player(&store, &item)?,
        "game" => entities::put_game(&store, &item)?,
        "cell" => entities::put_cell(&store, &item)?,
        "offer" => entities::put_offer(&store, &item)?,
        _ => store.put_item(&schema, &item)?,
    };
    tracing::debug!(table = schema.table, "stored new version");

    print_json(&Value::Map(stored))
}
