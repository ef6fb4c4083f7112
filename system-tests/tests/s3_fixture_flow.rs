// system-tests/tests/s3_fixture_flow.rs
// ============================================================================
// Module: S3 Fixture Flow Tests
// Description: Harness lifecycle against a real S3-compatible service.
// Purpose: Prove upload, read, cleanup, and teardown over the network client.
// Dependencies: system-tests helpers, fixture-bench-core, fixture-bench-s3
// ============================================================================

//! S3 fixture flow tests for fixture bench system-tests.
//!
//! Each test starts (or connects to) the mock service, runs one harness
//! lifecycle, and leaves no bucket behind. Tests skip with a note when Docker
//! is unavailable and `S3_ENDPOINT` is unset.

#![allow(
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

mod helpers;

use std::error::Error;
use std::io::Write;
use std::sync::Arc;
use std::sync::LazyLock;

use fixture_bench_core::EngineError;
use fixture_bench_core::HarnessError;
use fixture_bench_core::HarnessEventKind;
use fixture_bench_core::MemoryEventSink;
use fixture_bench_core::ObjectUri;
use fixture_bench_core::list_all_objects;
use helpers::infra::S3Fixture;
use system_tests::config::SystemTestConfig;
use tokio::sync::Mutex;

static S3_TEST_MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

const CARS_URI: &str = "s3a://test-dev-databricks-bucket/cars.csv";

/// Starts the service fixture, or returns `None` when the test should skip.
async fn start_or_skip(test_name: &str) -> Result<Option<S3Fixture>, Box<dyn Error>> {
    let config = SystemTestConfig::load()?;
    match S3Fixture::start(&config).await {
        Ok(fixture) => Ok(Some(fixture)),
        Err(err) if err.contains("docker info failed") && !config.require_docker => {
            let _ = writeln!(
                std::io::stderr(),
                "skipping {test_name}: object store fixture unavailable: {err}"
            );
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn cars_csv_counts_408_rows() -> Result<(), Box<dyn Error>> {
    let _guard = S3_TEST_MUTEX.lock().await;
    let Some(s3) = start_or_skip("cars_csv_counts_408_rows").await? else {
        return Ok(());
    };
    let config = s3.harness_config("test-dev-databricks-bucket");
    let sink = Arc::new(MemoryEventSink::new());
    let context = s3.context(&config, sink.clone())?;

    context.run("test_df_count_test_1", |case| {
        assert_eq!(case.upload().keys, vec!["cars.csv"]);
        case.assert_row_count(&ObjectUri::parse(CARS_URI)?, 408)
    })?;
    assert!(list_all_objects(context.client(), context.bucket(), None)?.is_empty());
    context.teardown()?;

    let read = sink
        .events()
        .into_iter()
        .find(|event| event.event == HarnessEventKind::DatasetRead)
        .expect("read event");
    assert_eq!(read.rows, Some(408));
    assert_eq!(sink.kinds().last(), Some(&HarnessEventKind::BucketDeleted));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn cleaning_an_empty_bucket_deletes_nothing() -> Result<(), Box<dyn Error>> {
    let _guard = S3_TEST_MUTEX.lock().await;
    let Some(s3) = start_or_skip("cleaning_an_empty_bucket_deletes_nothing").await? else {
        return Ok(());
    };
    let config = s3.harness_config("fixture-bench-empty");
    let context = s3.context(&config, Arc::new(MemoryEventSink::new()))?;

    let listing = context.client().list_objects(context.bucket(), None, None)?;
    assert!(listing.objects.is_empty());
    assert!(listing.next_continuation.is_none());
    assert_eq!(context.clean(None)?.deleted, 0);
    assert_eq!(context.clean(None)?.deleted, 0);
    context.teardown()?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn cleanup_pages_through_truncated_listings() -> Result<(), Box<dyn Error>> {
    let _guard = S3_TEST_MUTEX.lock().await;
    let Some(s3) = start_or_skip("cleanup_pages_through_truncated_listings").await? else {
        return Ok(());
    };
    let mut config = s3.harness_config("fixture-bench-paging");
    config.storage.list_page_size = 1;
    let sink = Arc::new(MemoryEventSink::new());
    let context = s3.context(&config, sink.clone())?;

    let rows = context.run("nested_layout", |case| {
        assert_eq!(case.upload().keys.len(), 3);
        let first = case.client().list_objects(case.session().bucket(), None, None)?;
        assert_eq!(first.objects.len(), 1);
        assert!(first.next_continuation.is_some());
        let partitions = case.read_csv(&case.uri("partitions/")?)?;
        assert_eq!(partitions.sources().len(), 2);
        Ok::<_, EngineError>(partitions.count())
    })?;
    assert_eq!(rows, 4);

    let cleaned = sink
        .events()
        .into_iter()
        .find(|event| event.event == HarnessEventKind::BucketCleaned)
        .expect("clean event");
    assert_eq!(cleaned.objects, Some(3));
    assert!(list_all_objects(context.client(), context.bucket(), None)?.is_empty());
    context.teardown()?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_object_fails_the_body_and_still_cleans() -> Result<(), Box<dyn Error>> {
    let _guard = S3_TEST_MUTEX.lock().await;
    let Some(s3) = start_or_skip("missing_object_fails_the_body_and_still_cleans").await? else {
        return Ok(());
    };
    let config = s3.harness_config("fixture-bench-missing");
    let context = s3.context(&config, Arc::new(MemoryEventSink::new()))?;

    let result = context.run("test_df_count_test_1", |case| {
        let err = case.read_csv(&case.uri("missing.csv")?).unwrap_err();
        assert!(matches!(err, EngineError::ObjectNotFound { .. }), "unexpected error: {err}");
        Err::<(), _>(err)
    });
    let Err(HarnessError::Body {
        test_name,
        cleanup,
        ..
    }) = result
    else {
        panic!("expected body failure");
    };
    assert_eq!(test_name, "test_df_count_test_1");
    assert!(cleanup.is_none());
    assert!(list_all_objects(context.client(), context.bucket(), None)?.is_empty());
    context.teardown()?;
    Ok(())
}
