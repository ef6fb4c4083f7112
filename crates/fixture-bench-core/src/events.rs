// crates/fixture-bench-core/src/events.rs
// ============================================================================
// Module: Harness Events
// Description: Structured lifecycle events for fixture setup and teardown.
// Purpose: Emit JSON-line records without a hard logging dependency.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every lifecycle step of a [`crate::TestContext`] is reported as a
//! [`HarnessEvent`]. Sinks serialize events as one JSON object per line.
//! Sink failures are swallowed; a broken log never fails a test.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::config::EventSinkKind;
use crate::config::EventsConfig;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Lifecycle step an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HarnessEventKind {
    /// Bucket created (or already owned).
    BucketCreated,
    /// Fixture directory uploaded.
    FixturesUploaded,
    /// All objects deleted after a test.
    BucketCleaned,
    /// CSV dataset read by the session.
    DatasetRead,
    /// Test body returned.
    TestFinished,
    /// Bucket removed at teardown.
    BucketDeleted,
    /// Processing session stopped.
    SessionStopped,
}

/// Outcome label attached to finished tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestOutcome {
    /// Body and cleanup succeeded.
    Passed,
    /// Body or cleanup failed.
    Failed,
}

/// Harness event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarnessEvent {
    /// Event identifier.
    pub event: HarnessEventKind,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Bucket the event concerns.
    pub bucket: String,
    /// Test name when the event is scoped to one test.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_name: Option<String>,
    /// Objects uploaded or deleted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objects: Option<usize>,
    /// Bytes uploaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    /// Dataset URI for reads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Rows read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
    /// Test outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<TestOutcome>,
    /// Error message when a step failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HarnessEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(event: HarnessEventKind, bucket: impl Into<String>) -> Self {
        Self {
            event,
            timestamp_ms: now_millis(),
            bucket: bucket.into(),
            test_name: None,
            objects: None,
            bytes: None,
            uri: None,
            rows: None,
            outcome: None,
            message: None,
        }
    }

    /// Scopes the event to a test.
    #[must_use]
    pub fn with_test(mut self, test_name: impl Into<String>) -> Self {
        self.test_name = Some(test_name.into());
        self
    }

    /// Attaches an object count.
    #[must_use]
    pub const fn with_objects(mut self, objects: usize) -> Self {
        self.objects = Some(objects);
        self
    }

    /// Attaches a byte count.
    #[must_use]
    pub const fn with_bytes(mut self, bytes: u64) -> Self {
        self.bytes = Some(bytes);
        self
    }

    /// Attaches a dataset URI and row count.
    #[must_use]
    pub fn with_read(mut self, uri: impl Into<String>, rows: usize) -> Self {
        self.uri = Some(uri.into());
        self.rows = Some(rows);
        self
    }

    /// Attaches an outcome.
    #[must_use]
    pub const fn with_outcome(mut self, outcome: TestOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Attaches an error message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Event sink for harness lifecycle records.
pub trait HarnessEventSink: Send + Sync {
    /// Record an event.
    fn record(&self, event: &HarnessEvent);
}

/// Sink that logs JSON lines to stderr.
pub struct StderrEventSink;

impl HarnessEventSink for StderrEventSink {
    fn record(&self, event: &HarnessEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Sink that appends JSON lines to a file.
pub struct FileEventSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileEventSink {
    /// Opens the event log in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl HarnessEventSink for FileEventSink {
    fn record(&self, event: &HarnessEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op sink.
pub struct NoopEventSink;

impl HarnessEventSink for NoopEventSink {
    fn record(&self, _event: &HarnessEvent) {}
}

/// Sink that keeps events in memory for assertions.
#[derive(Default)]
pub struct MemoryEventSink {
    /// Recorded events in arrival order.
    events: Mutex<Vec<HarnessEvent>>,
}

impl MemoryEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HarnessEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns the recorded event kinds.
    #[must_use]
    pub fn kinds(&self) -> Vec<HarnessEventKind> {
        self.events().iter().map(|event| event.event).collect()
    }
}

impl HarnessEventSink for MemoryEventSink {
    fn record(&self, event: &HarnessEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Builds the sink selected by configuration.
///
/// # Errors
///
/// Returns an error when the file sink cannot open its path.
pub fn sink_from_config(config: &EventsConfig) -> io::Result<Arc<dyn HarnessEventSink>> {
    match (config.sink, config.path.as_deref()) {
        (EventSinkKind::None, _) => Ok(Arc::new(NoopEventSink)),
        (EventSinkKind::Stderr, _) => Ok(Arc::new(StderrEventSink)),
        (EventSinkKind::File, Some(path)) => Ok(Arc::new(FileEventSink::new(path)?)),
        (EventSinkKind::File, None) => {
            Err(io::Error::new(io::ErrorKind::InvalidInput, "file event sink requires a path"))
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Milliseconds since the Unix epoch; zero if the clock is before it.
fn now_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|elapsed| elapsed.as_millis()).unwrap_or(0)
}
