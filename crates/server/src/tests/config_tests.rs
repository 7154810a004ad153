use super::{normalize_database_url, settings_from_sources, Settings};

use std::{
    collections::HashMap,
    env, fs,
    time::{SystemTime, UNIX_EPOCH},
};

fn env_of(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn defaults_apply_without_sources() {
    let settings = settings_from_sources(None, &HashMap::new()).expect("settings");
    assert_eq!(settings, Settings::default());
}

#[test]
fn settings_file_overrides_defaults() {
    let settings = settings_from_sources(
        Some("bind_addr = \"0.0.0.0:8080\"\ndatabase_url = \"sqlite://./catalog.db\"\n"),
        &HashMap::new(),
    )
    .expect("settings");
    assert_eq!(settings.bind_addr, "0.0.0.0:8080");
    assert_eq!(settings.database_url, "sqlite://./catalog.db");
}

#[test]
fn plain_database_url_overrides_file() {
    let settings = settings_from_sources(
        Some("database_url = \"sqlite://./file.db\"\n"),
        &env_of(&[("DATABASE_URL", "sqlite://./env.db"), ("SERVER_BIND", "[::]:9000")]),
    )
    .expect("settings");
    assert_eq!(settings.database_url, "sqlite://./env.db");
    assert_eq!(settings.bind_addr, "[::]:9000");
}

#[test]
fn app_prefixed_variables_win_over_plain_ones() {
    let settings = settings_from_sources(
        None,
        &env_of(&[
            ("DATABASE_URL", "sqlite://./plain.db"),
            ("APP__DATABASE_URL", "sqlite://./app.db"),
        ]),
    )
    .expect("settings");
    assert_eq!(settings.database_url, "sqlite://./app.db");
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
    assert_eq!(normalize_database_url("  "), Settings::default().database_url);
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
}

#[test]
fn keeps_windows_absolute_path_with_single_sqlite_colon() {
    assert_eq!(
        normalize_database_url("sqlite:C:\\Users\\alice\\test.db"),
        "sqlite:C:/Users/alice/test.db"
    );
    assert_eq!(
        normalize_database_url("C:\\Users\\alice\\test.db"),
        "sqlite:C:/Users/alice/test.db"
    );
    assert_eq!(
        normalize_database_url("sqlite://C:/Users/alice/test.db"),
        "sqlite:C:/Users/alice/test.db"
    );
}

#[tokio::test]
async fn normalized_plain_path_opens_in_a_new_directory() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();

    let temp_root = env::temp_dir().join(format!("perfume_server_open_test_{suffix}"));
    let db_path = temp_root.join("nested").join("perfumes.db");

    let database_url = normalize_database_url(db_path.to_string_lossy().as_ref());
    let storage = storage::Storage::new(&database_url).await.expect("open sqlite");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should be created: {}",
        db_path.display()
    );

    fs::remove_dir_all(temp_root).expect("cleanup");
}
