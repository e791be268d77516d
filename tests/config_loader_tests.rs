//! Integration tests for layered configuration loading.

use std::fs;
use std::path::PathBuf;

use reports::config::ConfigLoader;

fn write_env(dir: &PathBuf, name: &str, content: &str) {
    fs::write(dir.join(name), content).expect("write env file");
}

#[test]
fn base_env_file_is_loaded() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = dir.path().to_path_buf();
    write_env(
        &base,
        ".env",
        "REPORTS_DATABASE_URL=postgres://db/reports\nREPORTS_HISTORY_RETENTION_DAYS=30\n",
    );

    let config = ConfigLoader::with_base_dir(base).load().expect("load");
    assert_eq!(config.database_url, "postgres://db/reports");
    assert_eq!(config.history.retention_days, 30);
}

#[test]
fn profile_layer_overrides_base() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = dir.path().to_path_buf();
    write_env(
        &base,
        ".env",
        "REPORTS_PROFILE=staging\nREPORTS_LOG_LEVEL=info\nREPORTS_FETCH_TIMEOUT_SECONDS=30\n",
    );
    write_env(&base, ".env.staging", "REPORTS_LOG_LEVEL=debug\n");

    let config = ConfigLoader::with_base_dir(base).load().expect("load");
    assert_eq!(config.profile, "staging");
    assert_eq!(config.log_level, "debug");
    // untouched by the profile layer
    assert_eq!(config.fetch.timeout_seconds, 30);
}

#[test]
fn local_layer_wins_over_profile_layer() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = dir.path().to_path_buf();
    write_env(&base, ".env", "REPORTS_PROFILE=staging\n");
    write_env(&base, ".env.staging", "REPORTS_DISPATCH_CONCURRENCY=8\n");
    write_env(&base, ".env.local", "REPORTS_DISPATCH_CONCURRENCY=2\n");

    let config = ConfigLoader::with_base_dir(base).load().expect("load");
    assert_eq!(config.dispatch.concurrency, 2);
}

#[test]
fn missing_files_fall_back_to_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = ConfigLoader::with_base_dir(dir.path().to_path_buf())
        .load()
        .expect("load");

    assert_eq!(config.scheduler.tick_interval_seconds, 60);
    assert_eq!(config.dispatch.budget_seconds, 55);
    assert_eq!(config.history.retention_days, 90);
    assert!(config.narrative.api_key.is_none());
}

#[test]
fn unparseable_values_fall_back_to_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = dir.path().to_path_buf();
    write_env(&base, ".env", "REPORTS_DB_MAX_CONNECTIONS=not-a-number\n");

    let config = ConfigLoader::with_base_dir(base).load().expect("load");
    assert_eq!(config.db_max_connections, 10);
}
