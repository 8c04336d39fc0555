//! Configuration loading from files and the environment.

#![allow(clippy::unwrap_used, clippy::panic)]

use carbonlens::config::{Config, GRID_API_KEY_ENV, REASONING_API_KEY_ENV};
use carbonlens_core::CarbonError;
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

fn write_config(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

fn clear_env() {
    // SAFETY: Tests run sequentially under ENV_TEST_MUTEX, so no concurrent env access.
    unsafe {
        std::env::remove_var(REASONING_API_KEY_ENV);
        std::env::remove_var(GRID_API_KEY_ENV);
    }
}

#[test]
fn loads_explicit_file() {
    let _guard = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();

    let file = write_config(
        r#"
        [server]
        host = "0.0.0.0"
        port = 3001

        [reasoning]
        base_url = "http://localhost:11434/v1"
        model = "llama3.2"
        timeout_secs = 4

        [grid]
        timeout_secs = 7
        "#,
    );

    let config = Config::load(Some(file.path())).unwrap();

    assert_eq!(config.bind_addr(), "0.0.0.0:3001");
    assert_eq!(config.reasoning.model, "llama3.2");
    assert!(config.reasoning.api_key.is_none());
    assert_eq!(config.service_timeout(), Duration::from_secs(7));
}

#[test]
fn missing_explicit_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = Config::load(Some(&dir.path().join("absent.toml")));
    assert!(matches!(outcome, Err(CarbonError::IoError(_))));
}

#[test]
fn invalid_policy_in_file_is_rejected() {
    let file = write_config("[aggregation]\nreference_grid_factor = 0.0\n");
    let outcome = Config::load(Some(file.path()));
    assert!(matches!(outcome, Err(CarbonError::ConfigError(_))));
}

#[test]
fn environment_fills_unset_keys_only() {
    let _guard = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    // SAFETY: Tests run sequentially under ENV_TEST_MUTEX, so no concurrent env access.
    unsafe {
        std::env::set_var(REASONING_API_KEY_ENV, "from-env");
        std::env::set_var(GRID_API_KEY_ENV, "  ");
    }

    let file = write_config("[grid]\napi_key = \"from-file\"\n");
    let config = Config::load(Some(file.path()));
    clear_env();
    let config = config.unwrap();

    assert_eq!(config.reasoning.api_key.as_deref(), Some("from-env"));
    assert_eq!(config.grid.api_key.as_deref(), Some("from-file"));
}
