// crates/fixture-bench-core/src/store.rs
// ============================================================================
// Module: Object Store Interface
// Description: Storage-client seam shared by fixtures, cleanup, and reads.
// Purpose: Let the same harness logic run against in-memory and S3 backends.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! [`ObjectStoreClient`] is the only path the harness uses to touch object
//! storage. Every call is blocking and maps backend failures into
//! [`ObjectStoreError`]. Object keys are validated up front through
//! [`ObjectKey`] so backends never see traversal segments or absolute paths.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::path::Component;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum length of a single key segment.
pub const MAX_KEY_SEGMENT_LENGTH: usize = 255;
/// Maximum total key length (S3 limit).
pub const MAX_KEY_LENGTH: usize = 1024;
/// Default number of keys returned per listing page.
pub const DEFAULT_LIST_PAGE_SIZE: usize = 1000;
/// Region that S3 rejects as an explicit location constraint.
const US_EAST_1: &str = "us-east-1";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Object-store errors surfaced by storage backends.
#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreError {
    /// Invalid key, bucket name, or request input.
    #[error("object store invalid: {0}")]
    Invalid(String),
    /// Bucket does not exist.
    #[error("bucket not found: {0}")]
    NoSuchBucket(String),
    /// Object does not exist.
    #[error("object not found: {bucket}/{key}")]
    NoSuchKey {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
    },
    /// Bucket still holds objects.
    #[error("bucket not empty: {0}")]
    BucketNotEmpty(String),
    /// Bucket name is taken by another owner.
    #[error("bucket already exists: {0}")]
    BucketAlreadyExists(String),
    /// Object exceeds the caller's size limit.
    #[error("object too large: {key} ({actual_bytes} > {max_bytes})")]
    TooLarge {
        /// Object key.
        key: String,
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual size in bytes.
        actual_bytes: usize,
    },
    /// Backend returned an error.
    #[error("object store backend error: {0}")]
    Backend(String),
    /// Local I/O or runtime failure.
    #[error("object store io error: {0}")]
    Io(String),
}

// ============================================================================
// SECTION: Object Keys
// ============================================================================

/// Validated, `/`-separated relative object key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Validates and wraps a raw key string.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError::Invalid`] when the key is empty, absolute,
    /// too long, or contains backslashes or traversal segments.
    pub fn new(raw: impl Into<String>) -> Result<Self, ObjectStoreError> {
        let raw = raw.into();
        validate_key(&raw)?;
        Ok(Self(raw))
    }

    /// Wraps a key exactly as a backend listed it.
    ///
    /// No validation is applied. Listings may hold keys such as folder
    /// markers (`data/`) or `a//b` that [`ObjectKey::new`] rejects, and those
    /// objects must still be addressable for reads and deletes.
    #[must_use]
    pub fn from_listing(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Builds a key from a path relative to a fixture root.
    ///
    /// Platform separators are normalized to `/`.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError::Invalid`] when the path is absolute, has
    /// traversal components, or any segment is not valid UTF-8.
    pub fn from_relative_path(path: &Path) -> Result<Self, ObjectStoreError> {
        let mut segments = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(value) => {
                    let segment = value.to_str().ok_or_else(|| {
                        ObjectStoreError::Invalid(format!(
                            "path segment is not utf-8: {}",
                            path.display()
                        ))
                    })?;
                    segments.push(segment);
                }
                _ => {
                    return Err(ObjectStoreError::Invalid(format!(
                        "path must be relative without traversal: {}",
                        path.display()
                    )));
                }
            }
        }
        Self::new(segments.join("/"))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the key and returns the owned string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// SECTION: Bucket Types
// ============================================================================

/// Bucket object-ownership preference applied at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketOwnership {
    /// Bucket owner takes ownership of objects written with the
    /// `bucket-owner-full-control` ACL.
    #[default]
    BucketOwnerPreferred,
    /// The uploading account owns the object.
    ObjectWriter,
    /// ACLs are disabled and the bucket owner owns every object.
    BucketOwnerEnforced,
}

impl BucketOwnership {
    /// Returns the S3 wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BucketOwnerPreferred => "BucketOwnerPreferred",
            Self::ObjectWriter => "ObjectWriter",
            Self::BucketOwnerEnforced => "BucketOwnerEnforced",
        }
    }
}

/// Bucket creation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketSpec {
    /// Bucket name.
    pub name: String,
    /// Region the bucket is created in.
    pub region: String,
    /// Object-ownership preference.
    pub ownership: BucketOwnership,
}

impl BucketSpec {
    /// Returns the location constraint to send, if any.
    ///
    /// `us-east-1` is the implicit default and must be omitted.
    #[must_use]
    pub fn location_constraint(&self) -> Option<&str> {
        let region = self.region.trim();
        if region.is_empty() || region == US_EAST_1 { None } else { Some(region) }
    }
}

/// Summary of a single listed object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectSummary {
    /// Object key.
    pub key: String,
    /// Object size in bytes.
    pub size: u64,
}

/// One page of a bucket listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectListing {
    /// Objects on this page, sorted by key.
    pub objects: Vec<ObjectSummary>,
    /// Token for the next page when the listing is truncated.
    pub next_continuation: Option<String>,
}

// ============================================================================
// SECTION: Client Trait
// ============================================================================

/// Blocking object-store client abstraction.
pub trait ObjectStoreClient: Send + Sync {
    /// Creates a bucket. Re-creating a bucket this client already owns succeeds.
    fn create_bucket(&self, spec: &BucketSpec) -> Result<(), ObjectStoreError>;
    /// Deletes an empty bucket.
    fn delete_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError>;
    /// Writes a single object.
    fn put_object(
        &self,
        bucket: &str,
        key: &ObjectKey,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), ObjectStoreError>;
    /// Reads a single object with a size limit.
    fn get_object(
        &self,
        bucket: &str,
        key: &ObjectKey,
        max_bytes: usize,
    ) -> Result<Vec<u8>, ObjectStoreError>;
    /// Lists one page of objects, optionally under a prefix.
    ///
    /// An empty bucket yields an empty page, never an error.
    fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        continuation: Option<&str>,
    ) -> Result<ObjectListing, ObjectStoreError>;
    /// Deletes a single object. Deleting a missing key succeeds.
    fn delete_object(&self, bucket: &str, key: &ObjectKey) -> Result<(), ObjectStoreError>;
}

/// Lists every object under `prefix`, following continuation tokens.
///
/// # Errors
///
/// Returns [`ObjectStoreError`] when a page fails or the backend repeats a
/// continuation token.
pub fn list_all_objects(
    client: &dyn ObjectStoreClient,
    bucket: &str,
    prefix: Option<&str>,
) -> Result<Vec<ObjectSummary>, ObjectStoreError> {
    let mut objects = Vec::new();
    let mut continuation: Option<String> = None;
    loop {
        let page = client.list_objects(bucket, prefix, continuation.as_deref())?;
        objects.extend(page.objects);
        match page.next_continuation {
            Some(next) if continuation.as_deref() == Some(next.as_str()) => {
                return Err(ObjectStoreError::Backend(format!(
                    "listing for {bucket} repeated continuation token"
                )));
            }
            Some(next) => continuation = Some(next),
            None => return Ok(objects),
        }
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates an S3 bucket name (3-63 chars, lowercase, digits, `-`, `.`).
///
/// # Errors
///
/// Returns [`ObjectStoreError::Invalid`] when the name is not a valid bucket
/// name.
pub fn validate_bucket_name(name: &str) -> Result<(), ObjectStoreError> {
    if !(3 ..= 63).contains(&name.len()) {
        return Err(ObjectStoreError::Invalid(format!(
            "bucket name must be 3-63 characters: {name}"
        )));
    }
    if !name.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'.')
    {
        return Err(ObjectStoreError::Invalid(format!(
            "bucket name has invalid characters: {name}"
        )));
    }
    let edge_ok = |b: Option<u8>| b.is_some_and(|b| b.is_ascii_lowercase() || b.is_ascii_digit());
    if !edge_ok(name.bytes().next()) || !edge_ok(name.bytes().last()) {
        return Err(ObjectStoreError::Invalid(format!(
            "bucket name must start and end with a letter or digit: {name}"
        )));
    }
    if name.contains("..") {
        return Err(ObjectStoreError::Invalid(format!(
            "bucket name must not contain consecutive dots: {name}"
        )));
    }
    Ok(())
}

/// Validates a relative object key.
fn validate_key(key: &str) -> Result<(), ObjectStoreError> {
    if key.is_empty() {
        return Err(ObjectStoreError::Invalid("key must be set".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(ObjectStoreError::Invalid("key exceeds length limit".to_string()));
    }
    if key.starts_with('/') {
        return Err(ObjectStoreError::Invalid("key must be relative".to_string()));
    }
    if key.contains('\\') {
        return Err(ObjectStoreError::Invalid("key must not contain backslashes".to_string()));
    }
    for segment in key.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(ObjectStoreError::Invalid(format!("key segment is invalid: {key}")));
        }
        if segment.len() > MAX_KEY_SEGMENT_LENGTH {
            return Err(ObjectStoreError::Invalid("key segment exceeds length limit".to_string()));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
