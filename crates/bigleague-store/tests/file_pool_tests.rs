#![allow(clippy::unwrap_used, clippy::expect_used)]

// File-backed stores opened from configuration

use bigleague_core::value::{row, Value};
use bigleague_store::entities::{get_team, put_team};
use bigleague_store::migrations::applied_migrations;
use bigleague_store::{db, Store, StoreConfig};
use tempfile::TempDir;

fn config_in(dir: &TempDir) -> StoreConfig {
    StoreConfig {
        database_path: dir.path().join("league.db"),
        pool_size: 4,
        ..StoreConfig::default()
    }
}

#[test]
fn test_data_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);

    let id = {
        let store = Store::open(&config).unwrap();
        let team = put_team(
            &store,
            &row([("name", Value::from("Bears")), ("sport", Value::from("football"))]),
        )
        .unwrap();
        team.get("id").and_then(Value::as_uuid).unwrap()
    };

    let reopened = Store::open(&config).unwrap();
    let team = get_team(&reopened, id, None).unwrap().expect("team persisted");
    assert_eq!(team.get("name"), Some(&Value::from("Bears")));
}

#[test]
fn test_migrations_recorded_once_across_opens() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);

    Store::open(&config).unwrap();
    Store::open(&config).unwrap();

    let pool = db::open_pool(&config).unwrap();
    let conn = pool.get().unwrap();
    let applied = applied_migrations(&conn).unwrap();
    assert_eq!(applied.len(), 1);
}

#[test]
fn test_pooled_connections_share_the_file() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(&config_in(&dir)).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let store = store.clone();
            std::thread::spawn(move || {
                put_team(
                    &store,
                    &row([
                        ("name", Value::from(format!("Team {}", i))),
                        ("sport", Value::from("football")),
                    ]),
                )
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    let teams = bigleague_store::entities::get_teams_by_sport(&store, "football").unwrap();
    assert_eq!(teams.len(), 4);
}

#[test]
fn test_config_file_sets_database_path() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("from-file.db");
    let config_path = dir.path().join("bigleague.toml");
    std::fs::write(
        &config_path,
        format!("database_path = {:?}\npool_size = 2\n", db_path.display().to_string()),
    )
    .unwrap();

    let config = StoreConfig::load(Some(&config_path)).unwrap();
    Store::open(&config).unwrap();

    assert_eq!(config.database_path, db_path);
    assert!(db_path.exists());
}
