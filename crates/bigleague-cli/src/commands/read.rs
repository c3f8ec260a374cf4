//! Read commands
//!
//! Usage:
//!   bigleague get <TABLE> <CONDITIONS> [--timestamp <MS>]
//!   bigleague latest <TABLE> [CONDITIONS] [--timestamp <MS>]

use super::{print_json, row_arg, table, StoreTarget};
use bigleague_core::value::{Conditions, Value};
use clap::Args;

#[derive(Debug, Args)]
pub struct GetArgs {
    /// Table name (`player_public` hides auth tokens)
    pub table: String,

    /// JSON object of field equalities, or `-` for stdin
    pub conditions: String,

    /// Epoch milliseconds; newest version when omitted
    #[arg(long)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Args)]
pub struct LatestArgs {
    pub table: String,

    /// JSON object of field equalities
    pub conditions: Option<String>,

    #[arg(long)]
    pub timestamp: Option<i64>,
}

pub fn execute_get(target: &StoreTarget, args: GetArgs) -> Result<(), Box<dyn std::error::Error>> {
    let schema = table(&args.table)?;
    let conditions = row_arg(&args.conditions)?;
    let store = target.open()?;

    match store.get_item(&schema, &conditions, args.timestamp)? {
        Some(row) => print_json(&Value::Map(row)),
        None => {
            println!("null");
            Ok(())
        }
    }
}

pub fn execute_latest(
    target: &StoreTarget,
    args: LatestArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let schema = table(&args.table)?;
    let conditions = match &args.conditions {
        Some(raw) => row_arg(raw)?,
        None => Conditions::new(),
    };
    let store = target.open()?;

    let rows = store.get_latest_items(&schema, &conditions, args.timestamp)?;
    print_json(&Value::from(rows))
}
