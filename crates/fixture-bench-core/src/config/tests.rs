// crates/fixture-bench-core/src/config/tests.rs
// ============================================================================
// Module: Harness Configuration Tests
// Description: Unit coverage for config parsing, overrides, and validation.
// Purpose: Ensure configuration fails closed on invalid inputs.
// Dependencies: fixture-bench-core, tempfile
// ============================================================================

//! ## Overview
//! Invariants:
//! - Defaults target a local mock S3 service.
//! - Environment overrides win over file values.
//! - Tests restore environment state after each run.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use std::sync::Mutex;
use std::sync::OnceLock;

use tempfile::TempDir;

use super::*;

mod env_mut {
    #![allow(unsafe_code, reason = "Tests mutate process env vars in a controlled scope.")]

    /// Sets an environment variable for the current process.
    pub fn set_var(key: &str, value: &str) {
        // SAFETY: Tests serialize environment mutation via a global lock.
        unsafe {
            std::env::set_var(key, value);
        }
    }

    /// Removes an environment variable from the current process.
    pub fn remove_var(key: &str) {
        // SAFETY: Tests serialize environment mutation via a global lock.
        unsafe {
            std::env::remove_var(key);
        }
    }
}

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(())).lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

struct EnvGuard {
    entries: Vec<(&'static str, Option<String>)>,
}

impl EnvGuard {
    fn cleared() -> Self {
        let names = [
            HarnessEnv::Endpoint.as_str(),
            HarnessEnv::ConfigPath.as_str(),
            HarnessEnv::FixtureRoot.as_str(),
            HarnessEnv::Bucket.as_str(),
            HarnessEnv::Region.as_str(),
        ];
        let entries = names.iter().map(|name| (*name, std::env::var(*name).ok())).collect();
        for name in names {
            env_mut::remove_var(name);
        }
        Self {
            entries,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (name, value) in self.entries.drain(..) {
            match value {
                Some(value) => env_mut::set_var(name, &value),
                None => env_mut::remove_var(name),
            }
        }
    }
}

#[test]
fn defaults_target_local_mock_service() {
    let config = HarnessConfig::default();
    assert_eq!(config.storage.endpoint, "http://127.0.0.1:4566");
    assert_eq!(config.storage.region, "eu-west-1");
    assert_eq!(config.storage.bucket, "test-dev-databricks-bucket");
    assert_eq!(config.storage.ownership, BucketOwnership::BucketOwnerPreferred);
    assert!(config.storage.force_path_style);
    assert!(config.validate().is_ok());
}

#[test]
fn empty_toml_uses_defaults() {
    let config = HarnessConfig::from_toml_str("").expect("config");
    assert_eq!(config, HarnessConfig::default());
}

#[test]
fn toml_sections_override_defaults() {
    let config = HarnessConfig::from_toml_str(
        r#"
        [storage]
        endpoint = "http://localhost:9000"
        region = "us-east-1"
        bucket = "other-bucket"
        ownership = "bucket_owner_enforced"
        list_page_size = 2

        [fixtures]
        root = "fixtures/s3"

        [session]
        app_name = "count-session"

        [events]
        sink = "file"
        path = "events.jsonl"
        "#,
    )
    .expect("config");
    assert_eq!(config.storage.endpoint, "http://localhost:9000");
    assert_eq!(config.storage.bucket_spec().location_constraint(), None);
    assert_eq!(config.storage.ownership, BucketOwnership::BucketOwnerEnforced);
    assert_eq!(config.storage.list_page_size, 2);
    assert_eq!(config.fixtures.root, PathBuf::from("fixtures/s3"));
    assert_eq!(config.session.app_name, "count-session");
    assert_eq!(config.events.sink, EventSinkKind::File);
}

#[test]
fn padded_endpoint_is_validated_and_used_trimmed() {
    let config =
        HarnessConfig::from_toml_str("[storage]\nendpoint = \" http://localhost:9000 \"\n")
            .expect("config");
    assert_eq!(config.storage.endpoint_url(), "http://localhost:9000");
}

#[test]
fn unknown_fields_are_rejected() {
    let err = HarnessConfig::from_toml_str("[storage]\nbukket = \"typo\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn invalid_values_fail_closed() {
    for content in [
        "[storage]\nbucket = \"\"\n",
        "[storage]\nbucket = \"Invalid_Bucket\"\n",
        "[storage]\nendpoint = \"localhost:4566\"\n",
        "[storage]\nallow_http = false\n",
        "[storage]\nlist_page_size = 0\n",
        "[session]\nmax_object_bytes = 0\n",
        "[events]\nsink = \"file\"\n",
    ] {
        let result = HarnessConfig::from_toml_str(content);
        assert!(matches!(result, Err(ConfigError::Invalid(_))), "{content} should be invalid");
    }
}

#[test]
fn env_overrides_apply_after_file() {
    let _lock = env_lock();
    let _guard = EnvGuard::cleared();
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("fixture-bench.toml");
    fs::write(&path, "[storage]\nendpoint = \"http://file:1\"\nbucket = \"file-bucket\"\n")
        .expect("write");

    env_mut::set_var(HarnessEnv::Endpoint.as_str(), "http://127.0.0.1:9999");
    env_mut::set_var(HarnessEnv::FixtureRoot.as_str(), "/tmp/fixtures");
    let config = HarnessConfig::load(Some(&path)).expect("config");
    assert_eq!(config.storage.endpoint, "http://127.0.0.1:9999");
    assert_eq!(config.storage.bucket, "file-bucket");
    assert_eq!(config.fixtures.root, PathBuf::from("/tmp/fixtures"));
}

#[test]
fn empty_env_values_fail_closed() {
    let _lock = env_lock();
    let _guard = EnvGuard::cleared();
    env_mut::set_var(HarnessEnv::Endpoint.as_str(), "   ");
    assert!(matches!(HarnessConfig::load(None), Err(ConfigError::Invalid(_))));
}

#[test]
fn explicit_missing_path_is_an_error() {
    let _lock = env_lock();
    let _guard = EnvGuard::cleared();
    let dir = TempDir::new().expect("tempdir");
    let missing = dir.path().join("absent.toml");
    assert!(matches!(HarnessConfig::load(Some(&missing)), Err(ConfigError::Io(_))));

    env_mut::set_var(HarnessEnv::ConfigPath.as_str(), &missing.to_string_lossy());
    assert!(matches!(HarnessConfig::load(None), Err(ConfigError::Io(_))));
}

#[test]
fn oversized_config_file_is_rejected() {
    let _lock = env_lock();
    let _guard = EnvGuard::cleared();
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("big.toml");
    fs::write(&path, "#".repeat(MAX_CONFIG_FILE_SIZE + 1)).expect("write");
    assert!(matches!(HarnessConfig::load(Some(&path)), Err(ConfigError::Invalid(_))));
}
