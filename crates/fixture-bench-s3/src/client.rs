// crates/fixture-bench-s3/src/client.rs
// ============================================================================
// Module: S3 Object Store Client
// Description: Blocking S3-compatible implementation of the storage seam.
// Purpose: Drive a local mock S3 service (LocalStack, MinIO) from sync code.
// Dependencies: fixture-bench-core, aws-config, aws-sdk-s3, tokio
// ============================================================================

//! ## Overview
//! [`S3ObjectStoreClient`] implements [`ObjectStoreClient`] over `aws-sdk-s3`.
//! It is configured from [`StorageConfig`] with static credentials, an
//! endpoint override, and optional path-style addressing. Each call blocks on
//! an owned Tokio runtime; when invoked from inside a multi-thread runtime the
//! call moves onto that runtime with `block_in_place` instead.
//!
//! Service error codes are mapped onto [`ObjectStoreError`] variants so the
//! harness sees the same failures it sees from the in-memory store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::sync::Arc;

use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::BucketLocationConstraint;
use aws_sdk_s3::types::CreateBucketConfiguration;
use aws_sdk_s3::types::ObjectOwnership;
use fixture_bench_core::BucketSpec;
use fixture_bench_core::ObjectKey;
use fixture_bench_core::ObjectListing;
use fixture_bench_core::ObjectStoreClient;
use fixture_bench_core::ObjectStoreError;
use fixture_bench_core::ObjectSummary;
use fixture_bench_core::StorageConfig;
use tokio::io::AsyncReadExt;
use tokio::runtime::Handle;
use tokio::runtime::Runtime;
use tokio::runtime::RuntimeFlavor;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Provider name attached to the static credentials.
const CREDENTIALS_PROVIDER: &str = "fixture-bench-static";
/// Read buffer size for object bodies.
const READ_CHUNK_BYTES: usize = 8192;
/// Error code returned when the caller already owns the bucket.
const BUCKET_ALREADY_OWNED: &str = "BucketAlreadyOwnedByYou";

// ============================================================================
// SECTION: Runtime Helpers
// ============================================================================

/// Blocks on an object-store future using a compatible runtime.
fn block_on_with_runtime<F, T>(runtime: &Runtime, future: F) -> Result<T, ObjectStoreError>
where
    F: Future<Output = Result<T, ObjectStoreError>> + Send + 'static,
    T: Send + 'static,
{
    if let Ok(handle) = Handle::try_current() {
        if matches!(handle.runtime_flavor(), RuntimeFlavor::MultiThread) {
            return tokio::task::block_in_place(|| handle.block_on(future));
        }
        let (tx, rx) = std::sync::mpsc::sync_channel(1);
        std::thread::spawn(move || {
            let result = Runtime::new()
                .map_err(|err| ObjectStoreError::Io(err.to_string()))
                .and_then(|runtime| runtime.block_on(future));
            let _ = tx.send(result);
        });
        return rx.recv().unwrap_or_else(|_| {
            Err(ObjectStoreError::Io("object store thread join failed".to_string()))
        });
    }

    runtime.block_on(future)
}

// ============================================================================
// SECTION: Error Mapping
// ============================================================================

/// Maps a service error code onto a storage error.
///
/// `key` is set for object-level calls so a missing object is reported as
/// [`ObjectStoreError::NoSuchKey`].
#[must_use]
pub fn classify_error_code(
    code: Option<&str>,
    bucket: &str,
    key: Option<&str>,
    message: String,
) -> ObjectStoreError {
    match (code, key) {
        (Some("NoSuchBucket"), _) => ObjectStoreError::NoSuchBucket(bucket.to_string()),
        (Some("NoSuchKey" | "NotFound"), Some(key)) => ObjectStoreError::NoSuchKey {
            bucket: bucket.to_string(),
            key: key.to_string(),
        },
        (Some("BucketNotEmpty"), _) => ObjectStoreError::BucketNotEmpty(bucket.to_string()),
        (Some("BucketAlreadyExists"), _) => {
            ObjectStoreError::BucketAlreadyExists(bucket.to_string())
        }
        _ => ObjectStoreError::Backend(message),
    }
}

/// Converts an SDK error into a storage error.
fn map_sdk_error<E, R>(err: &SdkError<E, R>, bucket: &str, key: Option<&str>) -> ObjectStoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    classify_error_code(err.code(), bucket, key, DisplayErrorContext(err).to_string())
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// S3-compatible object-store client.
pub struct S3ObjectStoreClient {
    /// Underlying S3 client.
    client: Client,
    /// Endpoint the client talks to.
    endpoint: String,
    /// Maximum keys requested per listing page.
    list_page_size: i32,
    /// Tokio runtime for blocking S3 operations.
    runtime: Option<Arc<Runtime>>,
}

impl Drop for S3ObjectStoreClient {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            let _ = std::thread::spawn(move || drop(runtime));
        }
    }
}

impl S3ObjectStoreClient {
    /// Builds a client for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError::Invalid`] when the storage config is
    /// rejected, or [`ObjectStoreError::Io`] when the runtime cannot start.
    pub fn new(config: &StorageConfig) -> Result<Self, ObjectStoreError> {
        config.validate().map_err(|err| ObjectStoreError::Invalid(err.to_string()))?;
        let runtime = Runtime::new().map_err(|err| ObjectStoreError::Io(err.to_string()))?;
        let region = config.region.clone();
        let endpoint = config.endpoint_url().to_string();
        let sdk_endpoint = endpoint.clone();
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            CREDENTIALS_PROVIDER,
        );
        let shared_config = block_on_with_runtime(&runtime, async move {
            let loader = aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(region))
                .endpoint_url(sdk_endpoint)
                .credentials_provider(credentials);
            Ok(loader.load().await)
        })?;
        let mut s3_builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if config.force_path_style {
            s3_builder = s3_builder.force_path_style(true);
        }
        let client = Client::from_conf(s3_builder.build());
        Ok(Self {
            client,
            endpoint,
            list_page_size: i32::try_from(config.list_page_size).unwrap_or(i32::MAX),
            runtime: Some(Arc::new(runtime)),
        })
    }

    /// Returns the endpoint the client talks to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the runtime or an error if shutdown.
    fn runtime(&self) -> Result<&Runtime, ObjectStoreError> {
        self.runtime
            .as_ref()
            .map(AsRef::as_ref)
            .ok_or_else(|| ObjectStoreError::Io("object store runtime closed".to_string()))
    }
}

impl ObjectStoreClient for S3ObjectStoreClient {
    fn create_bucket(&self, spec: &BucketSpec) -> Result<(), ObjectStoreError> {
        let client = self.client.clone();
        let bucket = spec.name.clone();
        let ownership = ObjectOwnership::from(spec.ownership.as_str());
        let location = spec.location_constraint().map(BucketLocationConstraint::from);
        block_on_with_runtime(self.runtime()?, async move {
            let mut request =
                client.create_bucket().bucket(bucket.clone()).object_ownership(ownership);
            if let Some(location) = location {
                request = request.create_bucket_configuration(
                    CreateBucketConfiguration::builder().location_constraint(location).build(),
                );
            }
            match request.send().await {
                Ok(_) => Ok(()),
                Err(err) if err.code() == Some(BUCKET_ALREADY_OWNED) => Ok(()),
                Err(err) => Err(map_sdk_error(&err, &bucket, None)),
            }
        })
    }

    fn delete_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError> {
        let client = self.client.clone();
        let bucket = bucket.to_string();
        block_on_with_runtime(self.runtime()?, async move {
            client
                .delete_bucket()
                .bucket(bucket.clone())
                .send()
                .await
                .map_err(|err| map_sdk_error(&err, &bucket, None))?;
            Ok(())
        })
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &ObjectKey,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), ObjectStoreError> {
        let client = self.client.clone();
        let bucket = bucket.to_string();
        let key = key.as_str().to_string();
        let content_type = content_type.map(str::to_string);
        block_on_with_runtime(self.runtime()?, async move {
            let body = ByteStream::from(bytes);
            let mut request = client.put_object().bucket(bucket.clone()).key(key.clone()).body(body);
            if let Some(content_type) = content_type {
                request = request.content_type(content_type);
            }
            request.send().await.map_err(|err| map_sdk_error(&err, &bucket, Some(&key)))?;
            Ok(())
        })
    }

    fn get_object(
        &self,
        bucket: &str,
        key: &ObjectKey,
        max_bytes: usize,
    ) -> Result<Vec<u8>, ObjectStoreError> {
        let client = self.client.clone();
        let bucket = bucket.to_string();
        let key = key.as_str().to_string();
        block_on_with_runtime(self.runtime()?, async move {
            let output = client
                .get_object()
                .bucket(bucket.clone())
                .key(key.clone())
                .send()
                .await
                .map_err(|err| map_sdk_error(&err, &bucket, Some(&key)))?;
            if let Some(length) = output.content_length() {
                let actual_bytes = usize::try_from(length).unwrap_or(usize::MAX);
                if actual_bytes > max_bytes {
                    return Err(ObjectStoreError::TooLarge {
                        key,
                        max_bytes,
                        actual_bytes,
                    });
                }
            }
            let mut reader = output.body.into_async_read();
            let mut buffer = Vec::new();
            let mut total_bytes = 0usize;
            let mut chunk = [0u8; READ_CHUNK_BYTES];
            loop {
                let read = reader
                    .read(&mut chunk)
                    .await
                    .map_err(|err| ObjectStoreError::Io(err.to_string()))?;
                if read == 0 {
                    break;
                }
                total_bytes = total_bytes
                    .checked_add(read)
                    .ok_or_else(|| ObjectStoreError::Io("object size overflow".to_string()))?;
                if total_bytes > max_bytes {
                    return Err(ObjectStoreError::TooLarge {
                        key,
                        max_bytes,
                        actual_bytes: total_bytes,
                    });
                }
                buffer.extend_from_slice(&chunk[.. read]);
            }
            Ok(buffer)
        })
    }

    fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        continuation: Option<&str>,
    ) -> Result<ObjectListing, ObjectStoreError> {
        let client = self.client.clone();
        let bucket = bucket.to_string();
        let prefix = prefix.map(str::to_string);
        let continuation = continuation.map(str::to_string);
        let page_size = self.list_page_size;
        block_on_with_runtime(self.runtime()?, async move {
            let output = client
                .list_objects_v2()
                .bucket(bucket.clone())
                .set_prefix(prefix)
                .set_continuation_token(continuation)
                .max_keys(page_size)
                .send()
                .await
                .map_err(|err| map_sdk_error(&err, &bucket, None))?;
            // An empty bucket omits the contents field; the accessor yields an empty slice.
            let objects = output
                .contents()
                .iter()
                .filter_map(|object| {
                    object.key().map(|key| ObjectSummary {
                        key: key.to_string(),
                        size: object.size().and_then(|size| u64::try_from(size).ok()).unwrap_or(0),
                    })
                })
                .collect();
            let next_continuation = if output.is_truncated().unwrap_or(false) {
                let token = output.next_continuation_token().ok_or_else(|| {
                    ObjectStoreError::Backend(format!(
                        "truncated listing for {bucket} without continuation token"
                    ))
                })?;
                Some(token.to_string())
            } else {
                None
            };
            Ok(ObjectListing {
                objects,
                next_continuation,
            })
        })
    }

    fn delete_object(&self, bucket: &str, key: &ObjectKey) -> Result<(), ObjectStoreError> {
        let client = self.client.clone();
        let bucket = bucket.to_string();
        let key = key.as_str().to_string();
        block_on_with_runtime(self.runtime()?, async move {
            client
                .delete_object()
                .bucket(bucket.clone())
                .key(key.clone())
                .send()
                .await
                .map_err(|err| map_sdk_error(&err, &bucket, Some(&key)))?;
            Ok(())
        })
    }
}
