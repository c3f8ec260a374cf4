#![allow(clippy::unwrap_used, clippy::expect_used)]

// Relation expansion against a real database

use bigleague_core::errors::ExErrorKind;
use bigleague_core::logging_facility::test_capture::init_test_capture;
use bigleague_core::schema::{FieldSpec, TableSchema};
use bigleague_core::value::{row, Row, Value};
use bigleague_core_types::schema::EVENT_FAILED_EXPANSION;
use bigleague_store::entities::{put_game, put_team};
use bigleague_store::tables::default_registry;
use bigleague_store::{db, ExpandOptions, ManualClock, RelationRegistry, Store, Whitelist};
use std::sync::Arc;
use uuid::Uuid;

fn setup_store() -> (Store, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_000));
    let store = Store::open_in_memory()
        .expect("Failed to open in-memory store")
        .with_clock(clock.clone());
    (store, clock)
}

fn team(store: &Store, id: Uuid, name: &str) -> Row {
    put_team(
        store,
        &row([
            ("id", Value::Uuid(id)),
            ("name", Value::from(name)),
            ("sport", Value::from("football")),
        ]),
    )
    .unwrap()
}

fn game(store: &Store, home: Uuid, away: Uuid) -> Row {
    put_game(
        store,
        &row([
            ("event_name", Value::from("Opener")),
            ("sport", Value::from("football")),
            ("home_team_id", Value::Uuid(home)),
            ("away_team_id", Value::Uuid(away)),
        ]),
    )
    .unwrap()
}

fn name_at(value: &Value, relation: &str) -> Option<Value> {
    value.get(relation).and_then(|t| t.get("name")).cloned()
}

#[test]
fn test_dangling_reference_fails_until_target_exists() {
    let (store, clock) = setup_store();
    let registry = default_registry().unwrap();
    let home = Uuid::new_v4();
    let away = Uuid::new_v4();
    team(&store, away, "Lions");
    clock.advance(100);
    let g = game(&store, home, away);

    let err = store
        .expand(&registry, Value::Map(g.clone()), &ExpandOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::ExpansionFailed);
    assert_eq!(err.path(), Some("home_team"));
    assert_eq!(err.entity_id(), Some(home.to_string().as_str()));
    assert_eq!(err.op(), Some("expand"));

    clock.advance(100);
    team(&store, home, "Bears");

    let out = store
        .expand(&registry, Value::Map(g), &ExpandOptions::latest())
        .unwrap();
    assert_eq!(name_at(&out, "home_team"), Some(Value::from("Bears")));
    assert_eq!(name_at(&out, "away_team"), Some(Value::from("Lions")));
    assert!(out.get("home_team_id").is_none());
    assert_eq!(out.get("id").and_then(Value::as_str).map(str::len), Some(36));
}

const NODE: TableSchema = TableSchema {
    table: "node",
    fields: &[
        FieldSpec::uuid("id"),
        FieldSpec::integer("timestamp"),
        FieldSpec::uuid("next_id"),
    ],
    key_fields: &["id"],
    auto_fields: &["timestamp"],
};

#[test]
fn test_reference_loop_is_circular_reference() {
    let pool = db::open_in_memory_pool().unwrap();
    pool.get()
        .unwrap()
        .execute_batch(
            "CREATE TABLE node (id TEXT NOT NULL, timestamp INTEGER NOT NULL, \
             next_id TEXT, PRIMARY KEY (id, timestamp));",
        )
        .unwrap();
    let store = Store::new(pool);
    let mut registry = RelationRegistry::new();
    registry.register("next", NODE).unwrap();

    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let node_a = store
        .put_item(&NODE, &row([("id", Value::Uuid(a)), ("next_id", Value::Uuid(b))]))
        .unwrap();
    store
        .put_item(&NODE, &row([("id", Value::Uuid(b)), ("next_id", Value::Uuid(a))]))
        .unwrap();

    let err = store
        .expand(&registry, Value::Map(node_a), &ExpandOptions::latest())
        .unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::CircularReference);
    assert!(err.path().is_some_and(|p| p.starts_with("next.next")));
}

#[test]
fn test_chain_without_loop_expands_fully() {
    let pool = db::open_in_memory_pool().unwrap();
    pool.get()
        .unwrap()
        .execute_batch(
            "CREATE TABLE node (id TEXT NOT NULL, timestamp INTEGER NOT NULL, \
             next_id TEXT, PRIMARY KEY (id, timestamp));",
        )
        .unwrap();
    let store = Store::new(pool);
    let mut registry = RelationRegistry::new();
    registry.register("next", NODE).unwrap();

    let tail = Uuid::new_v4();
    let head = Uuid::new_v4();
    store
        .put_item(&NODE, &row([("id", Value::Uuid(tail)), ("next_id", Value::Null)]))
        .unwrap();
    let head_row = store
        .put_item(&NODE, &row([("id", Value::Uuid(head)), ("next_id", Value::Uuid(tail))]))
        .unwrap();

    let out = store
        .expand(&registry, Value::Map(head_row), &ExpandOptions::latest())
        .unwrap();

    let next = out.get("next").unwrap();
    assert_eq!(next.get("id"), Some(&Value::Text(tail.to_string())));
    assert!(next.get("next").is_none());
    assert!(next.get("next_id").is_none(), "null entries are dropped");
}

#[test]
fn test_reads_pinned_to_root_version() {
    let (store, clock) = setup_store();
    let registry = default_registry().unwrap();
    let home = Uuid::new_v4();
    let away = Uuid::new_v4();
    team(&store, home, "Bears");
    team(&store, away, "Lions");
    clock.set(1_100);
    let g = game(&store, home, away);
    clock.set(2_000);
    team(&store, home, "Cubs");

    let pinned = store
        .expand(&registry, Value::Map(g.clone()), &ExpandOptions::at(5_000))
        .unwrap();
    let latest = store
        .expand(&registry, Value::Map(g), &ExpandOptions::latest())
        .unwrap();

    assert_eq!(name_at(&pinned, "home_team"), Some(Value::from("Bears")));
    assert_eq!(name_at(&latest, "home_team"), Some(Value::from("Cubs")));
}

#[test]
fn test_caller_instant_used_when_root_has_none() {
    let (store, clock) = setup_store();
    let registry = default_registry().unwrap();
    let id = Uuid::new_v4();
    team(&store, id, "Bears");
    clock.set(2_000);
    team(&store, id, "Cubs");
    let reference = Value::Map(row([("team_id", Value::Uuid(id))]));

    let early = store
        .expand(&registry, reference.clone(), &ExpandOptions::at(1_500))
        .unwrap();
    let newest = store
        .expand(&registry, reference, &ExpandOptions::default())
        .unwrap();

    assert_eq!(name_at(&early, "team"), Some(Value::from("Bears")));
    assert_eq!(name_at(&newest, "team"), Some(Value::from("Cubs")));
}

#[test]
fn test_list_root_pins_each_element() {
    let (store, clock) = setup_store();
    let registry = default_registry().unwrap();
    let home = Uuid::new_v4();
    let away = Uuid::new_v4();
    team(&store, home, "Bears");
    team(&store, away, "Lions");
    clock.set(1_100);
    let early = game(&store, home, away);
    clock.set(2_000);
    team(&store, home, "Cubs");
    clock.set(2_100);
    let late = game(&store, home, away);

    let out = store
        .expand(
            &registry,
            Value::List(vec![Value::Map(early), Value::Map(late)]),
            &ExpandOptions::default(),
        )
        .unwrap();

    let games = out.as_list().unwrap();
    assert_eq!(games.len(), 2);
    assert_eq!(name_at(&games[0], "home_team"), Some(Value::from("Bears")));
    assert_eq!(name_at(&games[1], "home_team"), Some(Value::from("Cubs")));
}

#[test]
fn test_wrapped_listing_pins_each_row() {
    let (store, clock) = setup_store();
    let registry = default_registry().unwrap();
    let home = Uuid::new_v4();
    let away = Uuid::new_v4();
    team(&store, home, "Bears");
    team(&store, away, "Lions");
    clock.set(1_100);
    let early = game(&store, home, away);
    clock.set(2_000);
    team(&store, home, "Cubs");

    let wrapped = Value::Map(row([("games", Value::List(vec![Value::Map(early.clone())]))]));
    let out = store
        .expand(&registry, wrapped, &ExpandOptions::default())
        .unwrap();
    let bare = store
        .expand(
            &registry,
            Value::List(vec![Value::Map(early)]),
            &ExpandOptions::default(),
        )
        .unwrap();

    let games = out.get("games").and_then(Value::as_list).unwrap();
    assert_eq!(name_at(&games[0], "home_team"), Some(Value::from("Bears")));
    assert_eq!(out.get("games"), Some(&bare));
}

#[test]
fn test_whitelist_prunes_output() {
    let (store, clock) = setup_store();
    let registry = default_registry().unwrap();
    let home = Uuid::new_v4();
    let away = Uuid::new_v4();
    team(&store, home, "Bears");
    team(&store, away, "Lions");
    clock.advance(10);
    let g = game(&store, home, away);
    // Relation keys are matched under their input name
    let whitelist = Whitelist::new(["id", r"home_team(_id|\.name)"]).unwrap();

    let out = store
        .expand(
            &registry,
            Value::Map(g),
            &ExpandOptions::default().with_whitelist(whitelist),
        )
        .unwrap();

    let map = out.as_map().unwrap();
    let keys: Vec<&str> = map.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["home_team", "id"]);
    let home_team = map.get("home_team").and_then(Value::as_map).unwrap();
    assert_eq!(home_team.len(), 1);
    assert_eq!(home_team.get("name"), Some(&Value::from("Bears")));
}

#[test]
fn test_expanding_expanded_output_changes_nothing() {
    let (store, clock) = setup_store();
    let registry = default_registry().unwrap();
    let home = Uuid::new_v4();
    let away = Uuid::new_v4();
    team(&store, home, "Bears");
    team(&store, away, "Lions");
    clock.advance(10);
    let g = game(&store, home, away);

    let once = store
        .expand(&registry, Value::Map(g), &ExpandOptions::default())
        .unwrap();
    let twice = store
        .expand(&registry, once.clone(), &ExpandOptions::default())
        .unwrap();

    assert_eq!(once, twice);
}

#[test]
fn test_failed_expansion_is_logged() {
    let capture = init_test_capture();
    let (store, _clock) = setup_store();
    let registry = default_registry().unwrap();
    let missing = Uuid::new_v4();

    let _ = store.expand(
        &registry,
        Value::Map(row([("team_id", Value::Uuid(missing))])),
        &ExpandOptions::default(),
    );

    let id = missing.to_string();
    let warnings = capture.count_events(|e| {
        e.event.as_deref() == Some(EVENT_FAILED_EXPANSION)
            && e.fields.get("id") == Some(&id)
            && e.fields.get("path").map(String::as_str) == Some("team")
    });
    assert_eq!(warnings, 1);
}
