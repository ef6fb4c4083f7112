// crates/fixture-bench-core/src/fixtures.rs
// ============================================================================
// Module: Fixture Loader
// Description: Uploads a test's fixture directory into the mock bucket.
// Purpose: Map `<root>/<test_name>/**` onto object keys by relative path.
// Dependencies: walkdir, serde
// ============================================================================

//! ## Overview
//! Each test owns a directory under the fixture root named after the test
//! function. [`FixtureLoader::upload`] walks that directory (without following
//! symlinks), and writes every regular file to the bucket under its
//! `/`-separated relative path. Files are uploaded in sorted key order.
//!
//! A missing fixture directory is a test-authoring error and fails loudly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;
use walkdir::WalkDir;

use crate::store::ObjectKey;
use crate::store::ObjectStoreClient;
use crate::store::ObjectStoreError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fixture loading errors.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    /// Test name cannot be used as a single directory name.
    #[error("invalid test name for fixture lookup: {0:?}")]
    InvalidTestName(String),
    /// Fixture directory does not exist.
    #[error("fixture directory not found: {}", path.display())]
    MissingDirectory {
        /// Expected directory path.
        path: PathBuf,
    },
    /// Fixture path exists but is not a directory.
    #[error("fixture path is not a directory: {}", path.display())]
    NotADirectory {
        /// Offending path.
        path: PathBuf,
    },
    /// Directory traversal failed.
    #[error("failed to walk fixture directory {}: {message}", path.display())]
    Walk {
        /// Directory being walked.
        path: PathBuf,
        /// Underlying error message.
        message: String,
    },
    /// Reading a fixture file failed.
    #[error("failed to read fixture file {}: {message}", path.display())]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying error message.
        message: String,
    },
    /// Object store rejected the key or upload.
    #[error(transparent)]
    Store(#[from] ObjectStoreError),
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// A single fixture file and the key it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureFile {
    /// Absolute or root-relative local path.
    pub path: PathBuf,
    /// Object key derived from the path relative to the fixture directory.
    pub key: ObjectKey,
    /// File size in bytes.
    pub size: u64,
}

/// Result of uploading one test's fixtures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadReport {
    /// Test name the fixtures belong to.
    pub test_name: String,
    /// Uploaded keys, in upload order.
    pub keys: Vec<String>,
    /// Total bytes uploaded.
    pub total_bytes: u64,
}

/// Locates and uploads per-test fixture directories.
#[derive(Debug, Clone)]
pub struct FixtureLoader {
    /// Directory holding one subdirectory per test.
    root: PathBuf,
}

impl FixtureLoader {
    /// Creates a loader rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// Returns the fixture root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the fixture directory path for a test.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::InvalidTestName`] when the name is empty, a
    /// dot segment, or contains path separators.
    pub fn fixture_dir(&self, test_name: &str) -> Result<PathBuf, FixtureError> {
        validate_test_name(test_name)?;
        Ok(self.root.join(test_name))
    }

    /// Enumerates the fixture files for a test, sorted by key.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError`] when the directory is missing, not a
    /// directory, cannot be walked, or contains a path that is not a valid key.
    pub fn collect(&self, test_name: &str) -> Result<Vec<FixtureFile>, FixtureError> {
        let dir = self.fixture_dir(test_name)?;
        let metadata = fs::metadata(&dir).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => FixtureError::MissingDirectory {
                path: dir.clone(),
            },
            _ => FixtureError::Read {
                path: dir.clone(),
                message: err.to_string(),
            },
        })?;
        if !metadata.is_dir() {
            return Err(FixtureError::NotADirectory {
                path: dir,
            });
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(&dir).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(|err| FixtureError::Walk {
                path: dir.clone(),
                message: err.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(&dir).map_err(|err| FixtureError::Walk {
                path: entry.path().to_path_buf(),
                message: err.to_string(),
            })?;
            let key = ObjectKey::from_relative_path(relative)?;
            let size = entry
                .metadata()
                .map_err(|err| FixtureError::Read {
                    path: entry.path().to_path_buf(),
                    message: err.to_string(),
                })?
                .len();
            files.push(FixtureFile {
                path: entry.into_path(),
                key,
                size,
            });
        }
        files.sort_by(|left, right| left.key.cmp(&right.key));
        Ok(files)
    }

    /// Uploads every fixture file for `test_name` into `bucket`.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError`] when enumeration, reading, or upload fails.
    pub fn upload(
        &self,
        test_name: &str,
        client: &dyn ObjectStoreClient,
        bucket: &str,
    ) -> Result<UploadReport, FixtureError> {
        let files = self.collect(test_name)?;
        let mut report = UploadReport {
            test_name: test_name.to_string(),
            ..UploadReport::default()
        };
        for file in files {
            let bytes = fs::read(&file.path).map_err(|err| FixtureError::Read {
                path: file.path.clone(),
                message: err.to_string(),
            })?;
            let size = bytes.len() as u64;
            client.put_object(bucket, &file.key, bytes, content_type_for(&file.key))?;
            report.total_bytes = report.total_bytes.saturating_add(size);
            report.keys.push(file.key.into_string());
        }
        Ok(report)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rejects test names that would escape or nest under the fixture root.
fn validate_test_name(test_name: &str) -> Result<(), FixtureError> {
    let trimmed = test_name.trim();
    if trimmed.is_empty()
        || trimmed != test_name
        || test_name == "."
        || test_name == ".."
        || test_name.contains(['/', '\\'])
    {
        return Err(FixtureError::InvalidTestName(test_name.to_string()));
    }
    Ok(())
}

/// Guesses a content type from the key extension.
fn content_type_for(key: &ObjectKey) -> Option<&'static str> {
    let (_, extension) = key.as_str().rsplit_once('.')?;
    match extension.to_ascii_lowercase().as_str() {
        "csv" => Some("text/csv"),
        "tsv" => Some("text/tab-separated-values"),
        "json" => Some("application/json"),
        "txt" => Some("text/plain"),
        _ => None,
    }
}
