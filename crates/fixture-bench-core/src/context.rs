// crates/fixture-bench-core/src/context.rs
// ============================================================================
// Module: Test Context
// Description: Batch lifecycle for fixture-backed integration tests.
// Purpose: Create the bucket once, seed and clean it per test, tear it down.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! A [`TestContext`] owns the shared state of one test batch: the storage
//! client, the bucket, and the processing session. Each test runs through
//! [`TestContext::run`], which uploads that test's fixture directory, hands
//! the body a [`TestCase`], and empties the bucket afterwards whether the
//! body succeeded, returned an error, or panicked on a failed assertion.
//!
//! Invariants:
//! - The bucket is empty between tests.
//! - [`TestContext::teardown`] consumes the context.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::fmt;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use thiserror::Error;

use crate::cleaner::BucketCleaner;
use crate::cleaner::CleanReport;
use crate::config::ConfigError;
use crate::config::HarnessConfig;
use crate::engine::CsvReadOptions;
use crate::engine::EngineError;
use crate::engine::Frame;
use crate::engine::LocalSession;
use crate::events::HarnessEvent;
use crate::events::HarnessEventKind;
use crate::events::HarnessEventSink;
use crate::events::TestOutcome;
use crate::fixtures::FixtureError;
use crate::fixtures::FixtureLoader;
use crate::fixtures::UploadReport;
use crate::store::ObjectStoreClient;
use crate::store::ObjectStoreError;
use crate::uri::ObjectScheme;
use crate::uri::ObjectUri;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Test lifecycle errors.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Configuration rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Bucket creation or deletion failed.
    #[error(transparent)]
    Store(#[from] ObjectStoreError),
    /// Fixture upload failed.
    #[error(transparent)]
    Fixture(#[from] FixtureError),
    /// Session operation failed.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// Fixture upload failed inside a test run.
    #[error(
        "fixture upload for {test_name} failed: {source}{}",
        cleanup_suffix(.cleanup.as_deref())
    )]
    Upload {
        /// Test name.
        test_name: String,
        /// Underlying fixture error.
        #[source]
        source: FixtureError,
        /// Cleanup error message when cleanup also failed.
        cleanup: Option<String>,
    },
    /// Test body failed.
    #[error("test {test_name} failed: {message}{}", cleanup_suffix(.cleanup.as_deref()))]
    Body {
        /// Test name.
        test_name: String,
        /// Body error message.
        message: String,
        /// Cleanup error message when cleanup also failed.
        cleanup: Option<String>,
    },
    /// Post-test cleanup failed after the body succeeded.
    #[error("cleanup after {test_name} failed: {source}")]
    Cleanup {
        /// Test name.
        test_name: String,
        /// Underlying store error.
        #[source]
        source: ObjectStoreError,
    },
}

/// Formats the trailing cleanup note for body failures.
fn cleanup_suffix(cleanup: Option<&str>) -> String {
    cleanup.map(|message| format!(" (cleanup also failed: {message})")).unwrap_or_default()
}

/// Extracts the message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

// ============================================================================
// SECTION: Context
// ============================================================================

/// Shared state for one batch of fixture-backed tests.
pub struct TestContext {
    /// Storage client shared with the session.
    client: Arc<dyn ObjectStoreClient>,
    /// Processing session.
    session: LocalSession,
    /// Fixture directory loader.
    loader: FixtureLoader,
    /// Bucket cleaner.
    cleaner: BucketCleaner,
    /// Lifecycle event sink.
    sink: Arc<dyn HarnessEventSink>,
}

impl fmt::Debug for TestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestContext")
            .field("session", &self.session)
            .field("loader", &self.loader)
            .finish_non_exhaustive()
    }
}

impl TestContext {
    /// Creates the bucket and starts the processing session.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] when the config is invalid or the bucket
    /// cannot be created.
    pub fn setup(
        config: &HarnessConfig,
        client: Arc<dyn ObjectStoreClient>,
        sink: Arc<dyn HarnessEventSink>,
    ) -> Result<Self, HarnessError> {
        config.validate()?;
        let spec = config.storage.bucket_spec();
        client.create_bucket(&spec)?;
        sink.record(&HarnessEvent::new(HarnessEventKind::BucketCreated, &spec.name));
        let session = LocalSession::start(&config.session, &spec.name, Arc::clone(&client));
        Ok(Self {
            client,
            session,
            loader: FixtureLoader::new(&config.fixtures.root),
            cleaner: BucketCleaner::new(&spec.name),
            sink,
        })
    }

    /// Returns the bucket name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        self.session.bucket()
    }

    /// Returns the processing session.
    #[must_use]
    pub const fn session(&self) -> &LocalSession {
        &self.session
    }

    /// Returns the storage client.
    #[must_use]
    pub fn client(&self) -> &dyn ObjectStoreClient {
        self.client.as_ref()
    }

    /// Returns the fixture loader.
    #[must_use]
    pub const fn loader(&self) -> &FixtureLoader {
        &self.loader
    }

    /// Uploads the fixture directory for `test_name`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Fixture`] when the upload fails.
    pub fn upload_fixtures(&self, test_name: &str) -> Result<UploadReport, HarnessError> {
        Ok(self.upload_and_record(test_name)?)
    }

    /// Uploads fixtures and records the upload event.
    fn upload_and_record(&self, test_name: &str) -> Result<UploadReport, FixtureError> {
        let report = self.loader.upload(test_name, self.client.as_ref(), self.bucket())?;
        self.sink.record(
            &HarnessEvent::new(HarnessEventKind::FixturesUploaded, self.bucket())
                .with_test(test_name)
                .with_objects(report.keys.len())
                .with_bytes(report.total_bytes),
        );
        Ok(report)
    }

    /// Deletes every object in the bucket.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when listing or deleting fails.
    pub fn clean(&self, test_name: Option<&str>) -> Result<CleanReport, ObjectStoreError> {
        let result = self.cleaner.clean(self.client.as_ref());
        let mut event = HarnessEvent::new(HarnessEventKind::BucketCleaned, self.bucket());
        if let Some(test_name) = test_name {
            event = event.with_test(test_name);
        }
        event = match &result {
            Ok(report) => event.with_objects(report.deleted),
            Err(err) => event.with_message(err.to_string()),
        };
        self.sink.record(&event);
        result
    }

    /// Runs one test: upload fixtures, run `body`, then clean the bucket.
    ///
    /// Cleanup runs even when the upload fails or the body fails or panics.
    /// An upload or body failure is reported ahead of a cleanup failure,
    /// with both messages kept. A panicking body is resumed after cleanup.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Upload`] when the upload fails,
    /// [`HarnessError::Body`] when the body fails, and
    /// [`HarnessError::Cleanup`] when only cleanup fails.
    pub fn run<T, E, F>(&self, test_name: &str, body: F) -> Result<T, HarnessError>
    where
        E: fmt::Display,
        F: FnOnce(&TestCase<'_>) -> Result<T, E>,
    {
        let upload = match self.upload_and_record(test_name) {
            Ok(upload) => upload,
            Err(source) => {
                let cleanup = self.clean(Some(test_name)).err().map(|err| err.to_string());
                self.finish(test_name, TestOutcome::Failed, Some(source.to_string()));
                return Err(HarnessError::Upload {
                    test_name: test_name.to_string(),
                    source,
                    cleanup,
                });
            }
        };
        let case = TestCase {
            context: self,
            test_name,
            upload,
        };
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(&case)));
        let cleanup = self.clean(Some(test_name));
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(payload) => {
                let cleanup_error = cleanup.as_ref().err().map(ToString::to_string);
                let message = format!(
                    "test body panicked: {}{}",
                    panic_message(payload.as_ref()),
                    cleanup_suffix(cleanup_error.as_deref())
                );
                self.finish(test_name, TestOutcome::Failed, Some(message));
                panic::resume_unwind(payload);
            }
        };
        match (outcome, cleanup) {
            (Ok(value), Ok(_)) => {
                self.finish(test_name, TestOutcome::Passed, None);
                Ok(value)
            }
            (Ok(_), Err(source)) => {
                self.finish(test_name, TestOutcome::Failed, Some(source.to_string()));
                Err(HarnessError::Cleanup {
                    test_name: test_name.to_string(),
                    source,
                })
            }
            (Err(err), cleanup) => {
                let message = err.to_string();
                self.finish(test_name, TestOutcome::Failed, Some(message.clone()));
                Err(HarnessError::Body {
                    test_name: test_name.to_string(),
                    message,
                    cleanup: cleanup.err().map(|err| err.to_string()),
                })
            }
        }
    }

    /// Stops the session, empties the bucket, and deletes it.
    ///
    /// Every step is attempted; the first failure is returned.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] when the session stop, sweep, or bucket
    /// deletion fails.
    pub fn teardown(mut self) -> Result<(), HarnessError> {
        let stopped = self.session.stop().map_err(HarnessError::from);
        if stopped.is_ok() {
            self.sink.record(&HarnessEvent::new(HarnessEventKind::SessionStopped, self.bucket()));
        }
        let swept = self.clean(None).map(|_| ()).map_err(HarnessError::from);
        let deleted = self.client.delete_bucket(self.bucket()).map_err(HarnessError::from);
        let mut event = HarnessEvent::new(HarnessEventKind::BucketDeleted, self.bucket());
        if let Err(err) = &deleted {
            event = event.with_message(err.to_string());
        }
        self.sink.record(&event);
        stopped.and(swept).and(deleted)
    }

    /// Records the end of a test.
    fn finish(&self, test_name: &str, outcome: TestOutcome, message: Option<String>) {
        let mut event = HarnessEvent::new(HarnessEventKind::TestFinished, self.bucket())
            .with_test(test_name)
            .with_outcome(outcome);
        if let Some(message) = message {
            event = event.with_message(message);
        }
        self.sink.record(&event);
    }
}

// ============================================================================
// SECTION: Test Case
// ============================================================================

/// Handle passed to a test body while its fixtures are in the bucket.
pub struct TestCase<'a> {
    /// Owning context.
    context: &'a TestContext,
    /// Test name.
    test_name: &'a str,
    /// Fixture upload result.
    upload: UploadReport,
}

impl fmt::Debug for TestCase<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("test_name", &self.test_name)
            .field("upload", &self.upload)
            .finish_non_exhaustive()
    }
}

impl TestCase<'_> {
    /// Returns the test name.
    #[must_use]
    pub const fn test_name(&self) -> &str {
        self.test_name
    }

    /// Returns what was uploaded for this test.
    #[must_use]
    pub const fn upload(&self) -> &UploadReport {
        &self.upload
    }

    /// Returns the processing session.
    #[must_use]
    pub const fn session(&self) -> &LocalSession {
        &self.context.session
    }

    /// Returns the storage client.
    #[must_use]
    pub fn client(&self) -> &dyn ObjectStoreClient {
        self.context.client()
    }

    /// Builds an `s3a://` URI for `key` in the test bucket.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidUri`] when the key is invalid.
    pub fn uri(&self, key: &str) -> Result<ObjectUri, EngineError> {
        Ok(ObjectUri::new(ObjectScheme::S3a, self.context.bucket(), key)?)
    }

    /// Reads `uri` as CSV with default options.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the read fails.
    pub fn read_csv(&self, uri: &ObjectUri) -> Result<Frame, EngineError> {
        self.read_csv_with(uri, CsvReadOptions::default())
    }

    /// Reads `uri` as CSV with explicit options.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the read fails.
    pub fn read_csv_with(
        &self,
        uri: &ObjectUri,
        options: CsvReadOptions,
    ) -> Result<Frame, EngineError> {
        let frame = self.context.session.read_csv_with(uri, options)?;
        self.context.sink.record(
            &HarnessEvent::new(HarnessEventKind::DatasetRead, self.context.bucket())
                .with_test(self.test_name)
                .with_read(uri.to_string(), frame.count()),
        );
        Ok(frame)
    }

    /// Asserts the CSV row count at `uri`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::RowCountMismatch`] when the count differs, or
    /// any read error.
    pub fn assert_row_count(&self, uri: &ObjectUri, expected: usize) -> Result<(), EngineError> {
        let actual = self.read_csv(uri)?.count();
        if actual != expected {
            return Err(EngineError::RowCountMismatch {
                uri: uri.to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
