// crates/fixture-bench-core/src/cleaner.rs
// ============================================================================
// Module: Bucket Cleaner
// Description: Removes every object from the test bucket.
// Purpose: Reset bucket state between tests.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The cleaner lists the whole bucket (following continuation tokens) and
//! deletes each object. A listing with no entries is zero objects, so
//! cleaning an already-empty bucket succeeds and cleaning is idempotent.
//! Listed keys are deleted as-is, including keys the fixture loader would
//! never produce.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::store::ObjectKey;
use crate::store::ObjectStoreClient;
use crate::store::ObjectStoreError;
use crate::store::list_all_objects;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Result of a cleanup pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    /// Bucket that was cleaned.
    pub bucket: String,
    /// Number of objects deleted.
    pub deleted: usize,
}

/// Deletes all objects from one bucket.
#[derive(Debug, Clone)]
pub struct BucketCleaner {
    /// Bucket name.
    bucket: String,
}

impl BucketCleaner {
    /// Creates a cleaner for `bucket`.
    #[must_use]
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
        }
    }

    /// Returns the bucket name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Deletes every object currently in the bucket.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when listing or any delete fails. Objects
    /// deleted before the failure stay deleted.
    pub fn clean(&self, client: &dyn ObjectStoreClient) -> Result<CleanReport, ObjectStoreError> {
        let objects = list_all_objects(client, &self.bucket, None)?;
        let mut deleted = 0usize;
        for object in objects {
            client.delete_object(&self.bucket, &ObjectKey::from_listing(object.key))?;
            deleted += 1;
        }
        Ok(CleanReport {
            bucket: self.bucket.clone(),
            deleted,
        })
    }
}
