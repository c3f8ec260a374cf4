//! BigLeague table catalog
//!
//! Static schemas for the versioned tables created by the embedded
//! migrations, plus the relation registry used to expand responses.

use crate::expand::RelationRegistry;
use crate::errors::Result;
use bigleague_core::schema::{FieldSpec, TableSchema};
use std::fmt;
use std::str::FromStr;

pub const TEAM: TableSchema = TableSchema {
    table: "team",
    fields: &[
        FieldSpec::uuid("id"),
        FieldSpec::text("name"),
        FieldSpec::text("sport"),
        FieldSpec::integer("timestamp"),
    ],
    key_fields: &["id"],
    auto_fields: &["timestamp"],
};

pub const PLAYER: TableSchema = TableSchema {
    table: "player",
    fields: &[
        FieldSpec::uuid("id"),
        FieldSpec::text("handle"),
        FieldSpec::uuid("auth_token"),
        FieldSpec::integer("timestamp"),
    ],
    key_fields: &["id"],
    auto_fields: &["timestamp"],
};

/// Player projection safe to hand to other players; hides `auth_token`
pub const PLAYER_PUBLIC: TableSchema = TableSchema {
    table: "player",
    fields: &[
        FieldSpec::uuid("id"),
        FieldSpec::text("handle"),
        FieldSpec::integer("timestamp"),
    ],
    key_fields: &["id"],
    auto_fields: &["timestamp"],
};

pub const GAME: TableSchema = TableSchema {
    table: "game",
    fields: &[
        FieldSpec::uuid("id"),
        FieldSpec::integer("timestamp"),
        FieldSpec::text("event_name"),
        FieldSpec::text("sport"),
        FieldSpec::text("state"),
        FieldSpec::uuid("home_team_id"),
        FieldSpec::uuid("away_team_id"),
        FieldSpec::integer("home_score"),
        FieldSpec::integer("away_score"),
    ],
    key_fields: &["id"],
    auto_fields: &["timestamp"],
};

pub const CELL: TableSchema = TableSchema {
    table: "cell",
    fields: &[
        FieldSpec::uuid("game_id"),
        FieldSpec::integer("home_index"),
        FieldSpec::integer("away_index"),
        FieldSpec::integer("timestamp"),
        FieldSpec::integer("home_digit"),
        FieldSpec::integer("away_digit"),
        FieldSpec::uuid("player_id"),
    ],
    key_fields: &["game_id", "home_index", "away_index"],
    auto_fields: &["timestamp"],
};

pub const OFFER: TableSchema = TableSchema {
    table: "offer",
    fields: &[
        FieldSpec::uuid("game_id"),
        FieldSpec::integer("home_index"),
        FieldSpec::integer("away_index"),
        FieldSpec::uuid("player_id"),
        FieldSpec::integer("timestamp"),
        FieldSpec::text("type"),
        FieldSpec::integer("price"),
        FieldSpec::uuid("counterparty_player_id"),
        FieldSpec::integer("timestamp_filled"),
        FieldSpec::integer("counterparty_price"),
        FieldSpec::text("state"),
    ],
    key_fields: &["game_id", "home_index", "away_index", "player_id"],
    // Fill metadata is never caller-supplied
    auto_fields: &[
        "timestamp",
        "counterparty_player_id",
        "timestamp_filled",
        "counterparty_price",
    ],
};

/// Every stored table, in creation order
pub const ALL_TABLES: [TableSchema; 5] = [TEAM, PLAYER, GAME, CELL, OFFER];

/// Look a table up by name
pub fn by_name(name: &str) -> Option<TableSchema> {
    match name {
        "player_public" => Some(PLAYER_PUBLIC),
        _ => ALL_TABLES.iter().copied().find(|t| t.table == name),
    }
}

/// Relations expanded in responses
///
/// `team_id`, `home_team_id` and `away_team_id` expand to teams; `player_id`
/// and `counterparty_player_id` expand through the public player projection
/// so auth tokens never leak into another entity's response; `game_id`
/// expands to the game.
pub fn default_registry() -> Result<RelationRegistry> {
    let mut registry = RelationRegistry::new();
    registry.register("team", TEAM)?;
    registry.register("home_team", TEAM)?;
    registry.register("away_team", TEAM)?;
    registry.register("player", PLAYER_PUBLIC)?;
    registry.register("counterparty_player", PLAYER_PUBLIC)?;
    registry.register("game", GAME)?;
    Ok(registry)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Pregame,
    Playing,
    Canceled,
    Complete,
}

impl GameState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameState::Pregame => "pregame",
            GameState::Playing => "playing",
            GameState::Canceled => "canceled",
            GameState::Complete => "complete",
        }
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pregame" => Ok(GameState::Pregame),
            "playing" => Ok(GameState::Playing),
            "canceled" => Ok(GameState::Canceled),
            "complete" => Ok(GameState::Complete),
            other => Err(format!("unknown game state '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferState {
    Open,
    Closed,
    Canceled,
}

impl OfferState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferState::Open => "open",
            OfferState::Closed => "closed",
            OfferState::Canceled => "canceled",
        }
    }
}

impl fmt::Display for OfferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferType {
    Buy,
    Sell,
}

impl OfferType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferType::Buy => "buy",
            OfferType::Sell => "sell",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_schema_is_valid() {
        for schema in ALL_TABLES.iter().chain([&PLAYER_PUBLIC]) {
            assert!(schema.validate().is_ok(), "{} is invalid", schema.table);
        }
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(by_name("cell"), Some(CELL));
        assert_eq!(by_name("player_public"), Some(PLAYER_PUBLIC));
        assert_eq!(by_name("nope"), None);
    }

    #[test]
    fn test_default_registry_relations() {
        let registry = default_registry().unwrap();
        assert_eq!(registry.get("team"), Some(&TEAM));
        assert_eq!(registry.get("home_team"), Some(&TEAM));
        assert!(!registry.get("player").unwrap().has_field("auth_token"));
        assert!(registry.get("cell").is_none());
    }

    #[test]
    fn test_game_state_round_trip() {
        for state in [
            GameState::Pregame,
            GameState::Playing,
            GameState::Canceled,
            GameState::Complete,
        ] {
            assert_eq!(state.as_str().parse::<GameState>(), Ok(state));
        }
        assert!("halftime".parse::<GameState>().is_err());
    }
}
