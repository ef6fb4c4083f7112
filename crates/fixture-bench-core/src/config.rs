// crates/fixture-bench-core/src/config.rs
// ============================================================================
// Module: Harness Configuration
// Description: Configuration loading and validation for Fixture Bench.
// Purpose: Provide fail-closed TOML config with environment overrides.
// Dependencies: serde, toml, thiserror
// ============================================================================

//! ## Overview
//! Configuration is loaded from `fixture-bench.toml` (or the path given by
//! `FIXTURE_BENCH_CONFIG`), then environment overrides are applied, then the
//! result is validated. When no path is given and the default file is absent,
//! built-in defaults targeting a local mock S3 service are used.
//!
//! Environment values must be valid UTF-8 and non-empty; anything else fails
//! closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::store::BucketOwnership;
use crate::store::BucketSpec;
use crate::store::DEFAULT_LIST_PAGE_SIZE;
use crate::store::validate_bucket_name;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "fixture-bench.toml";
/// Default mock object-storage endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:4566";
/// Default bucket region.
pub const DEFAULT_REGION: &str = "eu-west-1";
/// Default test bucket name.
pub const DEFAULT_BUCKET: &str = "test-dev-databricks-bucket";
/// Placeholder credential accepted by local mock services.
pub const DEFAULT_CREDENTIAL: &str = "dummy";
/// Default fixture root, relative to the working directory.
pub const DEFAULT_FIXTURE_ROOT: &str = "tests/resources/s3";
/// Default processing session name.
pub const DEFAULT_APP_NAME: &str = "fixture-bench-session";
/// Default maximum object size read by the session.
pub const DEFAULT_MAX_OBJECT_BYTES: usize = 64 * 1024 * 1024;
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;

// ============================================================================
// SECTION: Environment Keys
// ============================================================================

/// Environment keys read by the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessEnv {
    /// Mock object-storage endpoint override.
    Endpoint,
    /// Config file path override.
    ConfigPath,
    /// Fixture root override.
    FixtureRoot,
    /// Bucket name override.
    Bucket,
    /// Region override.
    Region,
}

impl HarnessEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Endpoint => "S3_ENDPOINT",
            Self::ConfigPath => "FIXTURE_BENCH_CONFIG",
            Self::FixtureRoot => "FIXTURE_BENCH_FIXTURE_ROOT",
            Self::Bucket => "FIXTURE_BENCH_BUCKET",
            Self::Region => "FIXTURE_BENCH_REGION",
        }
    }
}

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Fixture Bench configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    /// Mock object-storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Fixture tree settings.
    #[serde(default)]
    pub fixtures: FixturesConfig,
    /// Processing session settings.
    #[serde(default)]
    pub session: SessionSettings,
    /// Structured event output.
    #[serde(default)]
    pub events: EventsConfig,
}

impl HarnessConfig {
    /// Loads configuration using the default resolution rules.
    ///
    /// An explicit `path` or `FIXTURE_BENCH_CONFIG` must exist. Otherwise the
    /// default file is read when present and built-in defaults apply when not.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when reading, parsing, overrides, or validation
    /// fail.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = match path {
            Some(path) => Some(path.to_path_buf()),
            None => read_env_nonempty(HarnessEnv::ConfigPath.as_str())?.map(PathBuf::from),
        };
        let mut config = match explicit {
            Some(path) => Self::read_file(&path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_NAME);
                if default_path.exists() { Self::read_file(default_path)? } else { Self::default() }
            }
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from TOML text without env overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a config file.
    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let bytes = fs::read(path)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies environment overrides on top of file values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an override is not UTF-8 or is empty.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(endpoint) = read_env_nonempty(HarnessEnv::Endpoint.as_str())? {
            self.storage.endpoint = endpoint;
        }
        if let Some(root) = read_env_nonempty(HarnessEnv::FixtureRoot.as_str())? {
            self.fixtures.root = PathBuf::from(root);
        }
        if let Some(bucket) = read_env_nonempty(HarnessEnv::Bucket.as_str())? {
            self.storage.bucket = bucket;
        }
        if let Some(region) = read_env_nonempty(HarnessEnv::Region.as_str())? {
            self.storage.region = region;
        }
        Ok(())
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.storage.validate()?;
        self.fixtures.validate()?;
        self.session.validate()?;
        self.events.validate()?;
        Ok(())
    }
}

/// Mock object-storage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Endpoint URL of the S3-compatible service.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Bucket region (sent as the location constraint).
    #[serde(default = "default_region")]
    pub region: String,
    /// Test bucket name.
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Access key id.
    #[serde(default = "default_credential")]
    pub access_key: String,
    /// Secret access key.
    #[serde(default = "default_credential")]
    pub secret_key: String,
    /// Force path-style addressing.
    #[serde(default = "default_true")]
    pub force_path_style: bool,
    /// Allow non-TLS endpoints.
    #[serde(default = "default_true")]
    pub allow_http: bool,
    /// Object-ownership preference applied at bucket creation.
    #[serde(default)]
    pub ownership: BucketOwnership,
    /// Keys requested per listing page.
    #[serde(default = "default_list_page_size")]
    pub list_page_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            region: default_region(),
            bucket: default_bucket(),
            access_key: default_credential(),
            secret_key: default_credential(),
            force_path_style: true,
            allow_http: true,
            ownership: BucketOwnership::default(),
            list_page_size: DEFAULT_LIST_PAGE_SIZE,
        }
    }
}

impl StorageConfig {
    /// Returns the bucket creation parameters.
    #[must_use]
    pub fn bucket_spec(&self) -> BucketSpec {
        BucketSpec {
            name: self.bucket.clone(),
            region: self.region.clone(),
            ownership: self.ownership,
        }
    }

    /// Returns the endpoint with surrounding whitespace removed.
    #[must_use]
    pub fn endpoint_url(&self) -> &str {
        self.endpoint.trim()
    }

    /// Validates storage settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when any storage field is rejected.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::Invalid("storage.bucket must be set".to_string()));
        }
        validate_bucket_name(&self.bucket)
            .map_err(|err| ConfigError::Invalid(format!("storage.bucket: {err}")))?;
        if self.region.trim().is_empty() {
            return Err(ConfigError::Invalid("storage.region must be set".to_string()));
        }
        let endpoint = self.endpoint_url();
        if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
            return Err(ConfigError::Invalid(
                "storage.endpoint must include http:// or https://".to_string(),
            ));
        }
        if endpoint.starts_with("http://") && !self.allow_http {
            return Err(ConfigError::Invalid(
                "storage.endpoint uses http:// without allow_http".to_string(),
            ));
        }
        if self.access_key.is_empty() || self.secret_key.is_empty() {
            return Err(ConfigError::Invalid(
                "storage.access_key and storage.secret_key must be set".to_string(),
            ));
        }
        if self.list_page_size == 0 {
            return Err(ConfigError::Invalid(
                "storage.list_page_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fixture tree configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixturesConfig {
    /// Directory holding one subdirectory per test.
    #[serde(default = "default_fixture_root")]
    pub root: PathBuf,
}

impl Default for FixturesConfig {
    fn default() -> Self {
        Self {
            root: default_fixture_root(),
        }
    }
}

impl FixturesConfig {
    /// Validates fixture settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("fixtures.root must be set".to_string()));
        }
        Ok(())
    }
}

/// Processing session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionSettings {
    /// Session name reported in events.
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// Maximum size of a single object read.
    #[serde(default = "default_max_object_bytes")]
    pub max_object_bytes: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            max_object_bytes: DEFAULT_MAX_OBJECT_BYTES,
        }
    }
}

impl SessionSettings {
    /// Validates session settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.app_name.trim().is_empty() {
            return Err(ConfigError::Invalid("session.app_name must be set".to_string()));
        }
        if self.max_object_bytes == 0 {
            return Err(ConfigError::Invalid(
                "session.max_object_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Event sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSinkKind {
    /// Discard events.
    #[default]
    None,
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to a file.
    File,
}

/// Structured event output configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventsConfig {
    /// Sink selection.
    #[serde(default)]
    pub sink: EventSinkKind,
    /// Output path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl EventsConfig {
    /// Validates event settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.sink == EventSinkKind::File && self.path.is_none() {
            return Err(ConfigError::Invalid("events.path is required for file sink".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads an environment variable and enforces UTF-8 validity.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the variable contains invalid UTF-8.
pub fn read_env_strict(name: &str) -> Result<Option<String>, ConfigError> {
    std::env::var_os(name).map_or(Ok(None), |raw| {
        raw.into_string()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(format!("{name} must be valid UTF-8")))
    })
}

/// Reads an environment variable and rejects empty values.
fn read_env_nonempty(name: &str) -> Result<Option<String>, ConfigError> {
    match read_env_strict(name)? {
        Some(value) if value.trim().is_empty() => {
            Err(ConfigError::Invalid(format!("{name} must not be empty")))
        }
        Some(value) => Ok(Some(value)),
        None => Ok(None),
    }
}

/// Default endpoint.
fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

/// Default region.
fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

/// Default bucket.
fn default_bucket() -> String {
    DEFAULT_BUCKET.to_string()
}

/// Default credential.
fn default_credential() -> String {
    DEFAULT_CREDENTIAL.to_string()
}

/// Serde default for boolean flags that start enabled.
const fn default_true() -> bool {
    true
}

/// Default listing page size.
const fn default_list_page_size() -> usize {
    DEFAULT_LIST_PAGE_SIZE
}

/// Default fixture root.
fn default_fixture_root() -> PathBuf {
    PathBuf::from(DEFAULT_FIXTURE_ROOT)
}

/// Default session name.
fn default_app_name() -> String {
    DEFAULT_APP_NAME.to_string()
}

/// Default object read limit.
const fn default_max_object_bytes() -> usize {
    DEFAULT_MAX_OBJECT_BYTES
}

#[cfg(test)]
mod tests;
