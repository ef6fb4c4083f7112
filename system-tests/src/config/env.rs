// system-tests/src/config/env.rs
// ============================================================================
// Module: System Test Environment
// Description: Environment-backed configuration for system tests.
// Purpose: Choose between an external S3 endpoint and a LocalStack container.
// Dependencies: std
// ============================================================================

//! ## Overview
//! When `S3_ENDPOINT` is set the system tests talk to that service directly;
//! otherwise they start a LocalStack container. Values are parsed with strict
//! UTF-8 enforcement and invalid input fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// LocalStack image tag used when no override is configured.
pub const DEFAULT_LOCALSTACK_TAG: &str = "3.8";

// ============================================================================
// SECTION: Environment Constants
// ============================================================================

/// Environment keys for system test configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemTestEnv {
    /// External S3-compatible endpoint; disables the container.
    Endpoint,
    /// LocalStack image tag override.
    LocalStackTag,
    /// Container startup timeout in seconds (positive integer).
    StartupTimeoutSeconds,
    /// Fail instead of skipping when Docker is unavailable.
    RequireDocker,
}

impl SystemTestEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Endpoint => "S3_ENDPOINT",
            Self::LocalStackTag => "FIXTURE_BENCH_SYSTEM_LOCALSTACK_TAG",
            Self::StartupTimeoutSeconds => "FIXTURE_BENCH_SYSTEM_TIMEOUT_SEC",
            Self::RequireDocker => "FIXTURE_BENCH_SYSTEM_REQUIRE_DOCKER",
        }
    }
}

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Typed system test configuration derived from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemTestConfig {
    /// External endpoint, when one is configured.
    pub endpoint: Option<String>,
    /// LocalStack image tag.
    pub localstack_tag: String,
    /// Optional container startup timeout.
    pub startup_timeout: Option<Duration>,
    /// Fail instead of skipping when Docker is unavailable.
    pub require_docker: bool,
}

impl Default for SystemTestConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            localstack_tag: DEFAULT_LOCALSTACK_TAG.to_string(),
            startup_timeout: None,
            require_docker: false,
        }
    }
}

impl SystemTestConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error when an environment value is not valid UTF-8, is empty,
    /// or fails validation (for example, an endpoint without an HTTP scheme).
    pub fn load() -> Result<Self, String> {
        let endpoint = read_env_nonempty(SystemTestEnv::Endpoint.as_str())?
            .map(|value| parse_endpoint(SystemTestEnv::Endpoint.as_str(), &value))
            .transpose()?;
        let localstack_tag = read_env_nonempty(SystemTestEnv::LocalStackTag.as_str())?
            .map_or_else(|| DEFAULT_LOCALSTACK_TAG.to_string(), |tag| tag.trim().to_string());
        let startup_timeout = read_env_nonempty(SystemTestEnv::StartupTimeoutSeconds.as_str())?
            .map(|value| {
                parse_timeout_seconds(SystemTestEnv::StartupTimeoutSeconds.as_str(), &value)
            })
            .transpose()?;
        let require_docker = parse_bool_env(
            SystemTestEnv::RequireDocker.as_str(),
            read_env_nonempty(SystemTestEnv::RequireDocker.as_str())?,
        )?;
        Ok(Self {
            endpoint,
            localstack_tag,
            startup_timeout,
            require_docker,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads an environment variable and enforces UTF-8 validity.
///
/// # Errors
///
/// Returns an error when the environment variable contains invalid UTF-8.
pub fn read_env_strict(name: &str) -> Result<Option<String>, String> {
    std::env::var_os(name).map_or(Ok(None), |raw| {
        raw.into_string().map(Some).map_err(|_| format!("{name} must be valid UTF-8"))
    })
}

/// Reads an environment variable and rejects empty values.
///
/// # Errors
///
/// Returns an error when the variable is set but empty or whitespace.
fn read_env_nonempty(name: &str) -> Result<Option<String>, String> {
    match read_env_strict(name)? {
        Some(value) if value.trim().is_empty() => Err(format!("{name} must not be empty")),
        Some(value) => Ok(Some(value)),
        None => Ok(None),
    }
}

/// Accepts `http://` and `https://` endpoints, trimming a trailing slash.
///
/// # Errors
///
/// Returns an error when the scheme is missing or nothing follows it.
fn parse_endpoint(name: &str, raw: &str) -> Result<String, String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let host = trimmed.strip_prefix("http://").or_else(|| trimmed.strip_prefix("https://"));
    match host {
        Some(host) if !host.is_empty() => Ok(trimmed.to_string()),
        _ => Err(format!("{name} must be an http:// or https:// URL")),
    }
}

/// Parses a positive timeout value from an environment variable string.
///
/// # Errors
///
/// Returns an error when the value is non-numeric or zero.
fn parse_timeout_seconds(name: &str, raw: &str) -> Result<Duration, String> {
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("{name} must be a positive integer number of seconds"))?;
    if secs == 0 {
        return Err(format!("{name} must be greater than zero"));
    }
    Ok(Duration::from_secs(secs))
}

/// Parses a boolean environment variable, defaulting to `false` when unset.
///
/// # Errors
///
/// Returns an error when the value is not a recognized boolean literal.
fn parse_bool_env(name: &str, raw: Option<String>) -> Result<bool, String> {
    let Some(value) = raw else {
        return Ok(false);
    };
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("true") || trimmed == "1" {
        return Ok(true);
    }
    if trimmed.eq_ignore_ascii_case("false") || trimmed == "0" {
        return Ok(false);
    }
    Err(format!("{name} must be 1, 0, true, or false"))
}
