//! BigLeague CLI
//!
//! Command-line access to the versioned store

use bigleague_core::logging_facility::{self, Profile};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "bigleague")]
#[command(about = "BigLeague - versioned store for squares betting", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./bigleague.{toml,json,...} if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overriding the configured one
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Logging profile: development or production
    #[arg(long, global = true, default_value = "development")]
    log_profile: Profile,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending schema migrations
    Migrate,
    /// Read one entity as of an instant
    Get(commands::read::GetArgs),
    /// Read the current version of every matching entity
    Latest(commands::read::LatestArgs),
    /// Append a new version of an entity
    Put(commands::put::PutArgs),
    /// Expand foreign keys in a JSON document
    Expand(commands::expand::ExpandArgs),
    /// Normalize a JSON document without touching the database
    Serialize(commands::expand::SerializeArgs),
}

fn main() {
    let cli = Cli::parse();
    logging_facility::init(cli.log_profile);

    let target = commands::StoreTarget {
        config: cli.config,
        database: cli.database,
    };

    let result = match cli.command {
        Commands::Migrate => commands::migrate::execute(&target),
        Commands::Get(args) => commands::read::execute_get(&target, args),
        Commands::Latest(args) => commands::read::execute_latest(&target, args),
        Commands::Put(args) => commands::put::execute(&target, args),
        Commands::Expand(args) => commands::expand::execute_expand(&target, args),
        Commands::Serialize(args) => commands::expand::execute_serialize(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
