use serial_test::serial;
use tempfile::tempdir;

use super::*;

/// Clears every `REAPER_*` env var this module touches so tests don't leak
/// state into each other. Tests in this file are `#[serial]` because they
/// share the process environment.
fn clear_env() {
    for key in [
        "REAPER_DOWNLOAD_DIR",
        "REAPER_TEMP_DIR",
        "REAPER_SERVER_HOST",
        "REAPER_SERVER_PORT",
        "REAPER_LOG_LEVEL",
        "REAPER_USER_TIMEZONE",
        "REAPER_PUBLIC_USER",
    ] {
        std::env::remove_var(key);
    }
}

#[tokio::test]
#[serial]
async fn loads_defaults_when_config_file_is_absent() {
    clear_env();
    let dir = tempdir().unwrap();

    let config = load(dir.path()).await.unwrap();

    assert_eq!(config, Config::default());
}

#[tokio::test]
#[serial]
async fn partial_toml_falls_back_to_defaults_for_missing_fields() {
    clear_env();
    let dir = tempdir().unwrap();
    tokio::fs::write(dir.path().join("config.toml"), "server_port = 9999\n").await.unwrap();

    let config = load(dir.path()).await.unwrap();

    assert_eq!(config.server_port, 9999);
    assert_eq!(config.download_dir, Config::default().download_dir);
    assert_eq!(config.user_timezone, Config::default().user_timezone);
}

#[tokio::test]
#[serial]
async fn env_override_takes_precedence_over_the_toml_file() {
    clear_env();
    let dir = tempdir().unwrap();
    tokio::fs::write(dir.path().join("config.toml"), "server_port = 9999\n").await.unwrap();
    std::env::set_var("REAPER_SERVER_PORT", "7000");

    let config = load(dir.path()).await.unwrap();

    assert_eq!(config.server_port, 7000);
    clear_env();
}

#[tokio::test]
#[serial]
async fn env_override_sets_user_timezone_and_public_user() {
    clear_env();
    let dir = tempdir().unwrap();
    std::env::set_var("REAPER_USER_TIMEZONE", "America/Chicago");
    std::env::set_var("REAPER_PUBLIC_USER", "guest");

    let config = load(dir.path()).await.unwrap();

    assert_eq!(config.user_timezone, "America/Chicago");
    assert_eq!(config.public_user.as_deref(), Some("guest"));
    clear_env();
}

#[tokio::test]
#[serial]
async fn rejects_port_zero() {
    clear_env();
    let dir = tempdir().unwrap();
    tokio::fs::write(dir.path().join("config.toml"), "server_port = 0\n").await.unwrap();

    let err = load(dir.path()).await.unwrap_err();

    assert!(matches!(err, DaemonError::Config(_)));
}

#[tokio::test]
#[serial]
async fn rejects_an_unrecognized_timezone() {
    clear_env();
    let dir = tempdir().unwrap();
    std::env::set_var("REAPER_USER_TIMEZONE", "Not/A_Zone");

    let err = load(dir.path()).await.unwrap_err();

    assert!(matches!(err, DaemonError::Config(_)));
    clear_env();
}

#[tokio::test]
#[serial]
async fn rejects_an_unparseable_port_env_var() {
    clear_env();
    let dir = tempdir().unwrap();
    std::env::set_var("REAPER_SERVER_PORT", "not-a-port");

    let err = load(dir.path()).await.unwrap_err();

    assert!(matches!(err, DaemonError::Config(_)));
    clear_env();
}
