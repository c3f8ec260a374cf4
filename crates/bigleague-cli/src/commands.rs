//! Subcommands and the helpers they share

pub mod expand;
pub mod migrate;
pub mod put;
pub mod read;

use bigleague_core::schema::TableSchema;
use bigleague_core::value::{Row, Value};
use bigleague_store::{tables, Store, StoreConfig};
use std::io::Read;
use std::path::PathBuf;

/// Where to find the database
#[derive(Debug, Clone, Default)]
pub struct StoreTarget {
    pub config: Option<PathBuf>,
    pub database: Option<PathBuf>,
}

impl StoreTarget {
    pub fn load_config(&self) -> Result<StoreConfig, Box<dyn std::error::Error>> {
        let mut config = StoreConfig::load(self.config.as_deref())?;
        if let Some(path) = &self.database {
            config.database_path = path.clone();
        }
        Ok(config)
    }

    /// Open the store, applying pending migrations
    pub fn open(&self) -> Result<Store, Box<dyn std::error::Error>> {
        Ok(Store::open(&self.load_config()?)?)
    }
}

pub fn table(name: &str) -> Result<TableSchema, Box<dyn std::error::Error>> {
    tables::by_name(name).ok_or_else(|| format!("unknown table '{}'", name).into())
}

/// Parse a JSON argument; `-` reads it from stdin
pub fn json_arg(raw: &str) -> Result<Value, Box<dyn std::error::Error>> {
    let text = if raw == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        raw.to_string()
    };
    let json: serde_json::Value = serde_json::from_str(&text)?;
    Ok(Value::from(json))
}

/// Parse a JSON object argument into a row
pub fn row_arg(raw: &str) -> Result<Row, Box<dyn std::error::Error>> {
    match json_arg(raw)? {
        Value::Map(row) => Ok(row),
        _ => Err("expected a JSON object".into()),
    }
}

pub fn print_json(value: &Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(&value.to_json())?);
    Ok(())
}
