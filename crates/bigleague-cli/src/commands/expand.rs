//! Expand and serialize commands
//!
//! Usage:
//!   bigleague expand <DOCUMENT> [--latest | --timestamp <MS>] [--whitelist <RE>]...
//!   bigleague serialize <DOCUMENT> [--whitelist <RE>]...

use super::{json_arg, print_json, StoreTarget};
use bigleague_store::tables::default_registry;
use bigleague_store::{serialize_filtered, ExpandOptions, Whitelist};
use clap::Args;

#[derive(Debug, Args)]
pub struct ExpandArgs {
    /// JSON document (object or array), or `-` for stdin
    pub document: String,

    /// Read referenced rows as of now instead of the document's own version
    #[arg(long, conflicts_with = "timestamp")]
    pub latest: bool,

    /// Read instant for a document without a `timestamp` of its own
    #[arg(long)]
    pub timestamp: Option<i64>,

    /// Keep only paths matching one of these patterns
    #[arg(long)]
    pub whitelist: Vec<String>,
}

#[derive(Debug, Args)]
pub struct SerializeArgs {
    pub document: String,

    #[arg(long)]
    pub whitelist: Vec<String>,
}

fn whitelist(patterns: &[String]) -> Result<Option<Whitelist>, Box<dyn std::error::Error>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    Ok(Some(Whitelist::new(patterns)?))
}

pub fn execute_expand(
    target: &StoreTarget,
    args: ExpandArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let document = json_arg(&args.document)?;
    let options = ExpandOptions {
        timestamp: args.timestamp,
        latest: args.latest,
        whitelist: whitelist(&args.whitelist)?,
    };
    let registry = default_registry()?;
    let store = target.open()?;

    let expanded = store.expand(&registry, document, &options)?;
    print_json(&expanded)
}

pub fn execute_serialize(args: SerializeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let document = json_arg(&args.document)?;
    let whitelist = whitelist(&args.whitelist)?;

    print_json(&serialize_filtered(document, whitelist.as_ref())?)
}
