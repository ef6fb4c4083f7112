// crates/fixture-bench-core/src/uri.rs
// ============================================================================
// Module: Object URIs
// Description: Parsing and formatting of `<scheme>://<bucket>/<key>` paths.
// Purpose: Address objects and prefixes in the mock bucket.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! An [`ObjectUri`] names either a single object or, when its key is empty or
//! ends in `/`, every object under a prefix. The Hadoop-style `s3a` and `s3n`
//! schemes are accepted alongside `s3` so paths written for a JVM engine read
//! unchanged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::store::ObjectKey;
use crate::store::ObjectStoreError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Object URI parse failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UriError {
    /// No `://` separator.
    #[error("object uri is missing a scheme: {0}")]
    MissingScheme(String),
    /// Scheme is not an object-store scheme.
    #[error("unsupported object uri scheme: {0}")]
    UnsupportedScheme(String),
    /// Bucket segment is empty.
    #[error("object uri is missing a bucket: {0}")]
    MissingBucket(String),
    /// Key segment failed validation.
    #[error("object uri key is invalid: {0}")]
    InvalidKey(String),
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Supported URI schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectScheme {
    /// `s3://`
    S3,
    /// `s3a://` (Hadoop S3A connector).
    S3a,
    /// `s3n://` (legacy Hadoop connector).
    S3n,
    /// `memory://` (in-process store).
    Memory,
}

impl ObjectScheme {
    /// Returns the scheme label without `://`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::S3 => "s3",
            Self::S3a => "s3a",
            Self::S3n => "s3n",
            Self::Memory => "memory",
        }
    }

    /// Parses a scheme label (case-insensitive).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "s3" => Some(Self::S3),
            "s3a" => Some(Self::S3a),
            "s3n" => Some(Self::S3n),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Parsed object or prefix URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectUri {
    /// URI scheme.
    scheme: ObjectScheme,
    /// Bucket name.
    bucket: String,
    /// Object key or prefix; empty for the bucket root.
    key: String,
}

impl ObjectUri {
    /// Builds a URI from parts.
    ///
    /// # Errors
    ///
    /// Returns [`UriError`] when the bucket is empty or the key is invalid.
    pub fn new(scheme: ObjectScheme, bucket: &str, key: &str) -> Result<Self, UriError> {
        let raw = format!("{}://{bucket}/{key}", scheme.as_str());
        if bucket.is_empty() {
            return Err(UriError::MissingBucket(raw));
        }
        let trimmed = key.strip_suffix('/').unwrap_or(key);
        if !trimmed.is_empty() {
            ObjectKey::new(trimmed).map_err(|err| UriError::InvalidKey(err.to_string()))?;
        }
        Ok(Self {
            scheme,
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    /// Parses `<scheme>://<bucket>/<key>`.
    ///
    /// # Errors
    ///
    /// Returns [`UriError`] when the scheme is missing or unsupported, the
    /// bucket is empty, or the key is invalid.
    pub fn parse(raw: &str) -> Result<Self, UriError> {
        let (scheme, rest) =
            raw.split_once("://").ok_or_else(|| UriError::MissingScheme(raw.to_string()))?;
        let scheme =
            ObjectScheme::parse(scheme).ok_or_else(|| UriError::UnsupportedScheme(raw.to_string()))?;
        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(UriError::MissingBucket(raw.to_string()));
        }
        Self::new(scheme, bucket, key)
    }

    /// Returns the scheme.
    #[must_use]
    pub const fn scheme(&self) -> ObjectScheme {
        self.scheme
    }

    /// Returns the bucket name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Returns the raw key or prefix.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns true when the URI names a prefix rather than one object.
    #[must_use]
    pub fn is_prefix(&self) -> bool {
        self.key.is_empty() || self.key.ends_with('/')
    }

    /// Returns the validated object key for a single-object URI.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError::Invalid`] when the URI names a prefix.
    pub fn object_key(&self) -> Result<ObjectKey, ObjectStoreError> {
        if self.is_prefix() {
            return Err(ObjectStoreError::Invalid(format!("uri names a prefix: {self}")));
        }
        ObjectKey::new(self.key.clone())
    }
}

impl fmt::Display for ObjectUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme.as_str(), self.bucket, self.key)
    }
}

impl FromStr for ObjectUri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
