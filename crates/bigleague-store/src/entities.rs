//! Typed access to the BigLeague tables
//!
//! Thin wrappers over `Store` that fill in the defaults each entity gets
//! on creation and name the common lookups.

#![allow(clippy::result_large_err)]

use crate::errors::Result;
use crate::store::Store;
use crate::tables::{GameState, OfferState, CELL, GAME, OFFER, PLAYER, PLAYER_PUBLIC, TEAM};
use bigleague_core::value::{Conditions, Row, Value};
use uuid::Uuid;

fn set_default(row: &mut Row, field: &str, value: impl FnOnce() -> Value) {
    row.entry(field.to_string()).or_insert_with(value);
}

fn by_id(id: Uuid) -> Conditions {
    Conditions::from([("id".to_string(), Value::Uuid(id))])
}

// ---------- team ----------

/// Create or version a team; a missing `id` is generated
pub fn put_team(store: &Store, team: &Row) -> Result<Row> {
    let mut team = team.clone();
    set_default(&mut team, "id", || Value::Uuid(Uuid::new_v4()));
    store.put_item(&TEAM, &team)
}

pub fn get_team(store: &Store, id: Uuid, timestamp: Option<i64>) -> Result<Option<Row>> {
    store.get_item(&TEAM, &by_id(id), timestamp)
}

pub fn get_teams_by_sport(store: &Store, sport: &str) -> Result<Vec<Row>> {
    let conditions = Conditions::from([("sport".to_string(), Value::from(sport))]);
    store.get_latest_items(&TEAM, &conditions, None)
}

// ---------- player ----------

/// Register a player; `id` and `auth_token` are generated when absent
pub fn put_player(store: &Store, player: &Row) -> Result<Row> {
    let mut player = player.clone();
    set_default(&mut player, "id", || Value::Uuid(Uuid::new_v4()));
    set_default(&mut player, "auth_token", || Value::Uuid(Uuid::new_v4()));
    store.put_item(&PLAYER, &player)
}

/// Look a player up by any of `id`, `handle` or `auth_token`
///
/// Other condition keys are ignored.
pub fn get_player(store: &Store, conditions: &Conditions) -> Result<Option<Row>> {
    let conditions: Conditions = conditions
        .iter()
        .filter(|(k, _)| matches!(k.as_str(), "id" | "handle" | "auth_token"))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    store.get_item(&PLAYER, &conditions, None)
}

/// Every player, without auth tokens
pub fn get_players(store: &Store) -> Result<Vec<Row>> {
    store.get_latest_items(&PLAYER_PUBLIC, &Conditions::new(), None)
}

// ---------- game ----------

/// Create or version a game
///
/// New games get a generated `id`, zero scores and the `pregame` state.
pub fn put_game(store: &Store, game: &Row) -> Result<Row> {
    let mut game = game.clone();
    set_default(&mut game, "id", || Value::Uuid(Uuid::new_v4()));
    set_default(&mut game, "home_score", || Value::Int(0));
    set_default(&mut game, "away_score", || Value::Int(0));
    set_default(&mut game, "state", || Value::from(GameState::Pregame.as_str()));
    store.put_item(&GAME, &game)
}

pub fn get_game(store: &Store, id: Uuid, timestamp: Option<i64>) -> Result<Option<Row>> {
    store.get_item(&GAME, &by_id(id), timestamp)
}

/// Current games matching `conditions` (e.g. `sport`)
pub fn get_games(
    store: &Store,
    conditions: &Conditions,
    timestamp: Option<i64>,
) -> Result<Vec<Row>> {
    store.get_latest_items(&GAME, conditions, timestamp)
}

// ---------- cell ----------

/// Version a cell; digits default to unassigned
pub fn put_cell(store: &Store, cell: &Row) -> Result<Row> {
    let mut cell = cell.clone();
    set_default(&mut cell, "home_digit", || Value::Null);
    set_default(&mut cell, "away_digit", || Value::Null);
    store.put_item(&CELL, &cell)
}

pub fn get_cell(
    store: &Store,
    game_id: Uuid,
    home_index: i64,
    away_index: i64,
    timestamp: Option<i64>,
) -> Result<Option<Row>> {
    let conditions = Conditions::from([
        ("game_id".to_string(), Value::Uuid(game_id)),
        ("home_index".to_string(), Value::Int(home_index)),
        ("away_index".to_string(), Value::Int(away_index)),
    ]);
    store.get_item(&CELL, &conditions, timestamp)
}

pub fn get_cells(
    store: &Store,
    conditions: &Conditions,
    timestamp: Option<i64>,
) -> Result<Vec<Row>> {
    store.get_latest_items(&CELL, conditions, timestamp)
}

// ---------- offer ----------

/// Version an offer
///
/// New offers are `open`. Counterparty and fill fields are auto-assigned
/// and stay null whatever the caller passes.
pub fn put_offer(store: &Store, offer: &Row) -> Result<Row> {
    let mut offer = offer.clone();
    set_default(&mut offer, "state", || Value::from(OfferState::Open.as_str()));
    store.put_item(&OFFER, &offer)
}

pub fn get_offer(
    store: &Store,
    conditions: &Conditions,
    timestamp: Option<i64>,
) -> Result<Option<Row>> {
    store.get_item(&OFFER, conditions, timestamp)
}

pub fn get_offers(
    store: &Store,
    conditions: &Conditions,
    timestamp: Option<i64>,
) -> Result<Vec<Row>> {
    store.get_latest_items(&OFFER, conditions, timestamp)
}
