// crates/fixture-bench-core/src/memory_store.rs
// ============================================================================
// Module: In-Memory Object Store
// Description: Process-local fake for the object-store client seam.
// Purpose: Run harness logic in fast unit tests without a mock service.
// Dependencies: std
// ============================================================================

//! ## Overview
//! [`InMemoryObjectStore`] mirrors the S3 behaviours the harness relies on:
//! bucket existence checks, paginated sorted listings with opaque
//! continuation tokens, idempotent object deletes, and refusal to delete a
//! non-empty bucket.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::store::BucketSpec;
use crate::store::DEFAULT_LIST_PAGE_SIZE;
use crate::store::ObjectKey;
use crate::store::ObjectListing;
use crate::store::ObjectStoreClient;
use crate::store::ObjectStoreError;
use crate::store::ObjectSummary;
use crate::store::validate_bucket_name;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Contents of one in-memory bucket.
#[derive(Debug)]
struct BucketState {
    /// Creation parameters.
    spec: BucketSpec,
    /// Objects keyed by object key.
    objects: BTreeMap<String, StoredObject>,
}

/// Stored object payload.
#[derive(Debug, Clone)]
struct StoredObject {
    /// Object bytes.
    bytes: Vec<u8>,
    /// Content type recorded at upload.
    content_type: Option<String>,
}

/// In-memory object store.
#[derive(Debug)]
pub struct InMemoryObjectStore {
    /// Buckets keyed by name.
    buckets: Mutex<BTreeMap<String, BucketState>>,
    /// Maximum objects per listing page.
    page_size: usize,
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryObjectStore {
    /// Creates an empty store with the default listing page size.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_page_size(DEFAULT_LIST_PAGE_SIZE)
    }

    /// Creates an empty store that returns at most `page_size` keys per page.
    #[must_use]
    pub const fn with_page_size(page_size: usize) -> Self {
        Self {
            buckets: Mutex::new(BTreeMap::new()),
            page_size: if page_size == 0 { 1 } else { page_size },
        }
    }

    /// Returns whether a bucket exists.
    #[must_use]
    pub fn bucket_exists(&self, bucket: &str) -> bool {
        self.lock().is_ok_and(|buckets| buckets.contains_key(bucket))
    }

    /// Returns the creation parameters of a bucket.
    #[must_use]
    pub fn bucket_spec(&self, bucket: &str) -> Option<BucketSpec> {
        self.lock().ok()?.get(bucket).map(|state| state.spec.clone())
    }

    /// Returns all object keys in a bucket, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError::NoSuchBucket`] when the bucket is missing.
    pub fn object_keys(&self, bucket: &str) -> Result<Vec<String>, ObjectStoreError> {
        let buckets = self.lock()?;
        let state =
            buckets.get(bucket).ok_or_else(|| ObjectStoreError::NoSuchBucket(bucket.to_string()))?;
        Ok(state.objects.keys().cloned().collect())
    }

    /// Returns the content type recorded for an object.
    #[must_use]
    pub fn content_type(&self, bucket: &str, key: &str) -> Option<String> {
        let buckets = self.lock().ok()?;
        buckets.get(bucket)?.objects.get(key)?.content_type.clone()
    }

    /// Locks the bucket map.
    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, BucketState>>, ObjectStoreError> {
        self.buckets
            .lock()
            .map_err(|_| ObjectStoreError::Io("object store lock poisoned".to_string()))
    }
}

// ============================================================================
// SECTION: Client Implementation
// ============================================================================

impl ObjectStoreClient for InMemoryObjectStore {
    fn create_bucket(&self, spec: &BucketSpec) -> Result<(), ObjectStoreError> {
        validate_bucket_name(&spec.name)?;
        let mut buckets = self.lock()?;
        buckets.entry(spec.name.clone()).or_insert_with(|| BucketState {
            spec: spec.clone(),
            objects: BTreeMap::new(),
        });
        Ok(())
    }

    fn delete_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError> {
        let mut buckets = self.lock()?;
        let state =
            buckets.get(bucket).ok_or_else(|| ObjectStoreError::NoSuchBucket(bucket.to_string()))?;
        if !state.objects.is_empty() {
            return Err(ObjectStoreError::BucketNotEmpty(bucket.to_string()));
        }
        buckets.remove(bucket);
        Ok(())
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &ObjectKey,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), ObjectStoreError> {
        let mut buckets = self.lock()?;
        let state = buckets
            .get_mut(bucket)
            .ok_or_else(|| ObjectStoreError::NoSuchBucket(bucket.to_string()))?;
        state.objects.insert(
            key.as_str().to_string(),
            StoredObject {
                bytes,
                content_type: content_type.map(str::to_string),
            },
        );
        Ok(())
    }

    fn get_object(
        &self,
        bucket: &str,
        key: &ObjectKey,
        max_bytes: usize,
    ) -> Result<Vec<u8>, ObjectStoreError> {
        let buckets = self.lock()?;
        let state =
            buckets.get(bucket).ok_or_else(|| ObjectStoreError::NoSuchBucket(bucket.to_string()))?;
        let object = state.objects.get(key.as_str()).ok_or_else(|| ObjectStoreError::NoSuchKey {
            bucket: bucket.to_string(),
            key: key.as_str().to_string(),
        })?;
        if object.bytes.len() > max_bytes {
            return Err(ObjectStoreError::TooLarge {
                key: key.as_str().to_string(),
                max_bytes,
                actual_bytes: object.bytes.len(),
            });
        }
        Ok(object.bytes.clone())
    }

    fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        continuation: Option<&str>,
    ) -> Result<ObjectListing, ObjectStoreError> {
        let buckets = self.lock()?;
        let state =
            buckets.get(bucket).ok_or_else(|| ObjectStoreError::NoSuchBucket(bucket.to_string()))?;
        let lower = continuation.map_or(Bound::Unbounded, |token| Bound::Excluded(token.to_string()));
        let prefix = prefix.unwrap_or("");
        let mut matching = state
            .objects
            .range((lower, Bound::Unbounded))
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| ObjectSummary {
                key: key.clone(),
                size: object.bytes.len() as u64,
            });
        let objects: Vec<ObjectSummary> = matching.by_ref().take(self.page_size).collect();
        let next_continuation = if matching.next().is_some() {
            objects.last().map(|object| object.key.clone())
        } else {
            None
        };
        Ok(ObjectListing {
            objects,
            next_continuation,
        })
    }

    fn delete_object(&self, bucket: &str, key: &ObjectKey) -> Result<(), ObjectStoreError> {
        let mut buckets = self.lock()?;
        let state = buckets
            .get_mut(bucket)
            .ok_or_else(|| ObjectStoreError::NoSuchBucket(bucket.to_string()))?;
        state.objects.remove(key.as_str());
        Ok(())
    }
}
