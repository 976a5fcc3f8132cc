use super::{
    apply_env_overrides, apply_file_settings, normalize_database_url, prepare_database_url,
    Settings,
};

use std::{
    collections::HashMap,
    env, fs,
    time::{SystemTime, UNIX_EPOCH},
};

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
    assert_eq!(
        normalize_database_url("  "),
        Settings::default().database_url
    );
}

#[test]
fn creates_parent_dir_for_relative_sqlite_url() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();

    let temp_root = env::temp_dir().join(format!("snippets_server_test_{suffix}"));
    let db_path = temp_root.join("data").join("test.db");

    prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare db url");
    assert!(temp_root.join("data").exists());

    fs::remove_dir_all(temp_root).expect("cleanup");
}

#[test]
fn file_settings_override_defaults() {
    let mut settings = Settings::default();
    apply_file_settings(
        &mut settings,
        r#"
bind_addr = "0.0.0.0:9000"
database_url = "sqlite://./tmp/x.db"
render_timeout_ms = 750
login_path = "/login"
"#,
    );
    assert_eq!(settings.server_bind, "0.0.0.0:9000");
    assert_eq!(settings.database_url, "sqlite://./tmp/x.db");
    assert_eq!(settings.render_timeout_ms, 750);
    assert_eq!(settings.login_path, "/login");
    assert_eq!(settings.server_public_url, None);
}

#[test]
fn login_url_is_absolute_only_with_a_public_url() {
    let mut settings = Settings::default();
    assert_eq!(settings.login_url(), settings.login_path);

    settings.server_public_url = Some("https://snippets.example/".to_string());
    settings.login_path = "/auth/login".to_string();
    assert_eq!(settings.login_url(), "https://snippets.example/auth/login");

    settings.server_public_url = Some("  ".to_string());
    assert_eq!(settings.login_url(), "/auth/login");
}

#[test]
fn unparsable_file_leaves_defaults() {
    let mut settings = Settings::default();
    apply_file_settings(&mut settings, "this is = = not toml");
    assert_eq!(settings, Settings::default());
}

#[test]
fn prefixed_env_vars_win_over_plain_ones() {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("SERVER_BIND", "127.0.0.1:1"),
        ("APP__BIND_ADDR", "127.0.0.1:2"),
        ("DATABASE_URL", "sqlite://a.db"),
        ("SERVER_PUBLIC_URL", "https://snippets.example"),
        ("APP__RENDER_TIMEOUT_MS", "not-a-number"),
        ("APP__LOGIN_PATH", "/sso/start"),
    ]);
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings, |key| vars.get(key).map(|v| v.to_string()));

    assert_eq!(settings.server_bind, "127.0.0.1:2");
    assert_eq!(settings.database_url, "sqlite://a.db");
    assert_eq!(
        settings.server_public_url.as_deref(),
        Some("https://snippets.example")
    );
    assert_eq!(
        settings.render_timeout_ms,
        Settings::default().render_timeout_ms
    );
    assert_eq!(settings.login_path, "/sso/start");
}

#[tokio::test]
async fn prepared_database_url_creates_openable_sqlite_file() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();

    let temp_root = env::temp_dir().join(format!("snippets_server_open_test_{suffix}"));
    let db_path = temp_root.join("nested").join("server.db");

    let prepared = prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare");
    let storage = storage::Storage::new(&prepared).await.expect("open sqlite");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should be created: {}",
        db_path.display()
    );

    fs::remove_dir_all(temp_root).expect("cleanup");
}
