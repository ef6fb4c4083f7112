// crates/fixture-bench-core/src/lib.rs
// ============================================================================
// Module: Fixture Bench Core Library
// Description: Fixture-backed test lifecycle over an object-store seam.
// Purpose: Seed a bucket per test, read CSV through a local session, reset.
// Dependencies: csv, serde, serde_json, thiserror, toml, walkdir
// ============================================================================

//! ## Overview
//! Fixture Bench sets up a mock S3 bucket once per batch, uploads each test's
//! fixture directory before the test runs, and empties the bucket afterwards.
//! Tests read CSV objects through a [`LocalSession`] and assert row counts.
//! Storage access goes through [`ObjectStoreClient`], so the same tests run
//! against [`InMemoryObjectStore`] or a real S3-compatible service.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod cleaner;
pub mod config;
pub mod context;
pub mod engine;
pub mod events;
pub mod fixtures;
pub mod memory_store;
pub mod store;
pub mod uri;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cleaner::BucketCleaner;
pub use cleaner::CleanReport;
pub use config::ConfigError;
pub use config::EventSinkKind;
pub use config::EventsConfig;
pub use config::FixturesConfig;
pub use config::HarnessConfig;
pub use config::HarnessEnv;
pub use config::SessionSettings;
pub use config::StorageConfig;
pub use context::HarnessError;
pub use context::TestCase;
pub use context::TestContext;
pub use engine::CsvReadOptions;
pub use engine::EngineError;
pub use engine::Frame;
pub use engine::LocalSession;
pub use events::FileEventSink;
pub use events::HarnessEvent;
pub use events::HarnessEventKind;
pub use events::HarnessEventSink;
pub use events::MemoryEventSink;
pub use events::NoopEventSink;
pub use events::StderrEventSink;
pub use events::TestOutcome;
pub use events::sink_from_config;
pub use fixtures::FixtureError;
pub use fixtures::FixtureFile;
pub use fixtures::FixtureLoader;
pub use fixtures::UploadReport;
pub use memory_store::InMemoryObjectStore;
pub use store::BucketOwnership;
pub use store::BucketSpec;
pub use store::ObjectKey;
pub use store::ObjectListing;
pub use store::ObjectStoreClient;
pub use store::ObjectStoreError;
pub use store::ObjectSummary;
pub use store::list_all_objects;
pub use uri::ObjectScheme;
pub use uri::ObjectUri;
pub use uri::UriError;
