// crates/fixture-bench-core/src/context/tests.rs
// ============================================================================
// Module: Test Context Tests
// Description: Lifecycle coverage for setup, per-test runs, and teardown.
// Purpose: Ensure the bucket is reset around every test body.
// Dependencies: fixture-bench-core, tempfile
// ============================================================================

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use std::fs;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use tempfile::TempDir;

use super::*;
use crate::events::MemoryEventSink;
use crate::memory_store::InMemoryObjectStore;
use crate::store::BucketSpec;
use crate::store::ObjectKey;
use crate::store::ObjectListing;

struct Harness {
    _fixtures: TempDir,
    store: Arc<InMemoryObjectStore>,
    sink: Arc<MemoryEventSink>,
    context: TestContext,
}

fn harness() -> Harness {
    let fixtures = TempDir::new().expect("tempdir");
    let seeded = fixtures.path().join("seeded");
    fs::create_dir_all(seeded.join("nested")).expect("mkdir");
    fs::write(seeded.join("cars.csv"), "a\nb\nc\n").expect("write");
    fs::write(seeded.join("nested/part.csv"), "d\n").expect("write");
    fs::create_dir_all(fixtures.path().join("empty")).expect("mkdir");

    let mut config = HarnessConfig::default();
    config.storage.bucket = "context-tests".to_string();
    config.fixtures.root = fixtures.path().to_path_buf();
    let store = Arc::new(InMemoryObjectStore::with_page_size(1));
    let sink = Arc::new(MemoryEventSink::new());
    let context = TestContext::setup(&config, store.clone(), sink.clone()).expect("setup");
    Harness {
        _fixtures: fixtures,
        store,
        sink,
        context,
    }
}

#[test]
fn setup_creates_bucket_with_configured_spec() {
    let harness = harness();
    let spec = harness.store.bucket_spec("context-tests").expect("bucket");
    assert_eq!(spec.region, "eu-west-1");
    assert_eq!(spec.location_constraint(), Some("eu-west-1"));
    assert!(harness.context.session().is_active());
    assert_eq!(harness.sink.kinds(), vec![HarnessEventKind::BucketCreated]);
}

#[test]
fn setup_rejects_invalid_config() {
    let mut config = HarnessConfig::default();
    config.storage.bucket = String::new();
    let store = Arc::new(InMemoryObjectStore::new());
    let err =
        TestContext::setup(&config, store.clone(), Arc::new(MemoryEventSink::new())).unwrap_err();
    assert!(matches!(err, HarnessError::Config(_)));
    assert!(!store.bucket_exists(""));
}

#[test]
fn run_uploads_fixtures_then_empties_bucket() {
    let harness = harness();
    let rows = harness
        .context
        .run("seeded", |case| {
            assert_eq!(case.upload().keys, vec!["cars.csv", "nested/part.csv"]);
            assert_eq!(
                harness.store.object_keys("context-tests").expect("keys"),
                vec!["cars.csv", "nested/part.csv"]
            );
            let uri = case.uri("cars.csv")?;
            case.assert_row_count(&uri, 3)?;
            Ok::<_, EngineError>(case.read_csv(&case.uri("")?)?.count())
        })
        .expect("run");
    assert_eq!(rows, 4);
    assert!(harness.store.object_keys("context-tests").expect("keys").is_empty());
    let events = harness.sink.events();
    let finished = events.last().expect("event");
    assert_eq!(finished.event, HarnessEventKind::TestFinished);
    assert_eq!(finished.outcome, Some(TestOutcome::Passed));
}

#[test]
fn empty_fixture_directory_leaves_bucket_empty() {
    let harness = harness();
    harness
        .context
        .run("empty", |case| {
            assert!(case.upload().keys.is_empty());
            assert!(case.client().list_objects("context-tests", None, None)?.objects.is_empty());
            Ok::<_, ObjectStoreError>(())
        })
        .expect("run");
}

#[test]
fn body_failure_still_cleans_bucket() {
    let harness = harness();
    let err = harness
        .context
        .run("seeded", |case| {
            let uri = case.uri("cars.csv")?;
            case.assert_row_count(&uri, 408)
        })
        .unwrap_err();
    match err {
        HarnessError::Body {
            test_name,
            message,
            cleanup,
        } => {
            assert_eq!(test_name, "seeded");
            assert!(message.contains("expected 408, got 3"));
            assert!(cleanup.is_none());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(harness.store.object_keys("context-tests").expect("keys").is_empty());
}

#[test]
fn missing_fixture_directory_fails_loudly() {
    let harness = harness();
    let err = harness.context.run("absent", |_case| Ok::<_, EngineError>(())).unwrap_err();
    assert!(matches!(
        err,
        HarnessError::Upload {
            source: FixtureError::MissingDirectory { .. },
            cleanup: None,
            ..
        }
    ));
    assert!(err.to_string().contains("absent"));
}

#[test]
fn panicking_body_still_cleans_bucket_before_resuming() {
    let harness = harness();
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        harness.context.run("seeded", |case| -> Result<(), EngineError> {
            assert_eq!(case.upload().keys.len(), 99, "row count assertion");
            Ok(())
        })
    }));
    assert!(result.is_err());
    assert!(harness.store.object_keys("context-tests").expect("keys").is_empty());

    let finished = harness
        .sink
        .events()
        .into_iter()
        .rev()
        .find(|event| event.event == HarnessEventKind::TestFinished)
        .expect("finished event");
    assert_eq!(finished.outcome, Some(TestOutcome::Failed));
    assert!(finished.message.as_deref().unwrap().contains("row count assertion"));

    harness
        .context
        .run("empty", |case| {
            assert!(case.client().list_objects("context-tests", None, None)?.objects.is_empty());
            Ok::<_, ObjectStoreError>(())
        })
        .expect("next test starts from an empty bucket");
}

#[test]
fn consecutive_tests_see_only_their_own_fixtures() {
    let harness = harness();
    harness.context.run("seeded", |_case| Ok::<_, EngineError>(())).expect("first");
    harness
        .context
        .run("empty", |case| {
            let err = case.read_csv(&case.uri("cars.csv")?).unwrap_err();
            assert!(matches!(err, EngineError::ObjectNotFound { .. }));
            Ok::<_, EngineError>(())
        })
        .expect("second");
}

#[test]
fn teardown_stops_session_and_deletes_bucket() {
    let harness = harness();
    let store = harness.store.clone();
    let sink = harness.sink.clone();
    harness.context.teardown().expect("teardown");
    assert!(!store.bucket_exists("context-tests"));
    let kinds = sink.kinds();
    assert!(kinds.contains(&HarnessEventKind::SessionStopped));
    assert_eq!(kinds.last(), Some(&HarnessEventKind::BucketDeleted));
}

#[test]
fn teardown_sweeps_objects_left_outside_run() {
    let harness = harness();
    harness.context.upload_fixtures("seeded").expect("upload");
    let store = harness.store.clone();
    harness.context.teardown().expect("teardown");
    assert!(!store.bucket_exists("context-tests"));
}

/// Store whose deletes can be switched off and whose puts can be capped.
struct FlakyDeletes {
    inner: InMemoryObjectStore,
    fail_deletes: AtomicBool,
    puts_allowed: AtomicUsize,
}

impl ObjectStoreClient for FlakyDeletes {
    fn create_bucket(&self, spec: &BucketSpec) -> Result<(), ObjectStoreError> {
        self.inner.create_bucket(spec)
    }

    fn delete_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError> {
        self.inner.delete_bucket(bucket)
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &ObjectKey,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), ObjectStoreError> {
        let allowed = self.puts_allowed.load(Ordering::SeqCst);
        if allowed == 0 {
            return Err(ObjectStoreError::Backend("put refused".to_string()));
        }
        self.puts_allowed.store(allowed - 1, Ordering::SeqCst);
        self.inner.put_object(bucket, key, bytes, content_type)
    }

    fn get_object(
        &self,
        bucket: &str,
        key: &ObjectKey,
        max_bytes: usize,
    ) -> Result<Vec<u8>, ObjectStoreError> {
        self.inner.get_object(bucket, key, max_bytes)
    }

    fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        continuation: Option<&str>,
    ) -> Result<ObjectListing, ObjectStoreError> {
        self.inner.list_objects(bucket, prefix, continuation)
    }

    fn delete_object(&self, bucket: &str, key: &ObjectKey) -> Result<(), ObjectStoreError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Backend("delete refused".to_string()));
        }
        self.inner.delete_object(bucket, key)
    }
}

fn flaky_context(fixtures: &TempDir) -> (Arc<FlakyDeletes>, TestContext) {
    fs::create_dir_all(fixtures.path().join("seeded")).expect("mkdir");
    fs::write(fixtures.path().join("seeded/cars.csv"), "1\n").expect("write");
    let mut config = HarnessConfig::default();
    config.fixtures.root = fixtures.path().to_path_buf();
    let store = Arc::new(FlakyDeletes {
        inner: InMemoryObjectStore::new(),
        fail_deletes: AtomicBool::new(true),
        puts_allowed: AtomicUsize::new(usize::MAX),
    });
    let context =
        TestContext::setup(&config, store.clone(), Arc::new(MemoryEventSink::new())).expect("setup");
    (store, context)
}

#[test]
fn cleanup_failure_after_passing_body_is_reported() {
    let fixtures = TempDir::new().expect("tempdir");
    let (_store, context) = flaky_context(&fixtures);
    let err = context.run("seeded", |_case| Ok::<_, EngineError>(())).unwrap_err();
    assert!(matches!(err, HarnessError::Cleanup { ref test_name, .. } if test_name == "seeded"));
}

#[test]
fn body_failure_takes_precedence_over_cleanup_failure() {
    let fixtures = TempDir::new().expect("tempdir");
    let (store, context) = flaky_context(&fixtures);
    let err = context.run("seeded", |_case| Err::<(), _>("body broke")).unwrap_err();
    match &err {
        HarnessError::Body {
            message,
            cleanup,
            ..
        } => {
            assert_eq!(message, "body broke");
            assert!(cleanup.as_deref().unwrap().contains("delete refused"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("cleanup also failed"));

    store.fail_deletes.store(false, Ordering::SeqCst);
    context.teardown().expect("teardown");
}

#[test]
fn teardown_reports_bucket_that_cannot_be_emptied() {
    let fixtures = TempDir::new().expect("tempdir");
    let (store, context) = flaky_context(&fixtures);
    context.upload_fixtures("seeded").expect("upload");
    let err = context.teardown().unwrap_err();
    assert!(matches!(err, HarnessError::Store(ObjectStoreError::Backend(_))));
    assert!(store.inner.bucket_exists(crate::config::DEFAULT_BUCKET));
}

#[test]
fn partial_upload_failure_reports_cleanup_failure_too() {
    let fixtures = TempDir::new().expect("tempdir");
    let (store, context) = flaky_context(&fixtures);
    fs::write(fixtures.path().join("seeded/extra.csv"), "2\n").expect("write");
    store.puts_allowed.store(1, Ordering::SeqCst);

    let err = context.run("seeded", |_case| Ok::<_, EngineError>(())).unwrap_err();
    match &err {
        HarnessError::Upload {
            test_name,
            source,
            cleanup,
        } => {
            assert_eq!(test_name, "seeded");
            assert!(source.to_string().contains("put refused"));
            assert!(cleanup.as_deref().unwrap().contains("delete refused"));
        }
        other => panic!("unexpected error: {other}"),
    }
    let message = err.to_string();
    assert!(message.contains("put refused"));
    assert!(message.contains("cleanup also failed: object store backend error: delete refused"));
    assert_eq!(
        store.inner.object_keys(crate::config::DEFAULT_BUCKET).expect("keys"),
        vec!["cars.csv"]
    );

    store.fail_deletes.store(false, Ordering::SeqCst);
    context.teardown().expect("teardown");
}

#[test]
fn partial_upload_is_removed_when_cleanup_works() {
    let fixtures = TempDir::new().expect("tempdir");
    let (store, context) = flaky_context(&fixtures);
    fs::write(fixtures.path().join("seeded/extra.csv"), "2\n").expect("write");
    store.fail_deletes.store(false, Ordering::SeqCst);
    store.puts_allowed.store(1, Ordering::SeqCst);

    let err = context.run("seeded", |_case| Ok::<_, EngineError>(())).unwrap_err();
    assert!(matches!(err, HarnessError::Upload { cleanup: None, .. }));
    assert!(store.inner.object_keys(crate::config::DEFAULT_BUCKET).expect("keys").is_empty());
    context.teardown().expect("teardown");
}
