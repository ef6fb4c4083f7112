// crates/fixture-bench-core/src/engine.rs
// ============================================================================
// Module: Local Processing Session
// Description: In-process tabular reader over the object-store seam.
// Purpose: Read CSV objects from the mock bucket and count rows.
// Dependencies: csv, serde, thiserror
// ============================================================================

//! ## Overview
//! [`LocalSession`] is the shared compute handle for a batch of tests. It is
//! bound to one bucket and reads through the injected
//! [`ObjectStoreClient`]. CSV defaults follow the usual engine defaults: no
//! header row, `,` delimiter, ragged rows accepted, blank lines skipped.
//!
//! A URI naming a prefix reads every object under it in key order and
//! concatenates the rows. Keys ending in `/` are folder markers and are
//! skipped.
//!
//! Invariants:
//! - Once stopped, a session rejects every read.
//! - A session never reads from a bucket other than its own.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use csv::ReaderBuilder;
use serde::Serialize;

use crate::config::SessionSettings;
use crate::store::ObjectKey;
use crate::store::ObjectStoreClient;
use crate::store::ObjectStoreError;
use crate::store::list_all_objects;
use crate::uri::ObjectUri;
use crate::uri::UriError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Processing session errors.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Session has been stopped.
    #[error("session {app_name} is stopped")]
    SessionStopped {
        /// Session name.
        app_name: String,
    },
    /// Path could not be parsed.
    #[error(transparent)]
    InvalidUri(#[from] UriError),
    /// URI points at a different bucket.
    #[error("session is bound to bucket {expected}, uri names {actual}")]
    BucketMismatch {
        /// Session bucket.
        expected: String,
        /// Bucket named by the URI.
        actual: String,
    },
    /// No object exists at the path.
    #[error("path does not exist: {uri}")]
    ObjectNotFound {
        /// Requested URI.
        uri: String,
    },
    /// CSV decoding failed.
    #[error("failed to read csv {uri}: {message}")]
    Csv {
        /// Object URI being decoded.
        uri: String,
        /// Decoder message.
        message: String,
    },
    /// Object store failure.
    #[error(transparent)]
    Store(#[from] ObjectStoreError),
    /// Row count assertion failed.
    #[error("row count mismatch for {uri}: expected {expected}, got {actual}")]
    RowCountMismatch {
        /// URI that was counted.
        uri: String,
        /// Expected count.
        expected: usize,
        /// Observed count.
        actual: usize,
    },
}

// ============================================================================
// SECTION: Read Options
// ============================================================================

/// CSV read options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvReadOptions {
    /// Treat the first line of each object as a header.
    pub has_header: bool,
    /// Field delimiter.
    pub delimiter: u8,
}

impl Default for CsvReadOptions {
    fn default() -> Self {
        Self {
            has_header: false,
            delimiter: b',',
        }
    }
}

// ============================================================================
// SECTION: Frame
// ============================================================================

/// Materialized result of a read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Frame {
    /// Header of the first object when headers are enabled.
    header: Option<Vec<String>>,
    /// Data rows.
    rows: Vec<Vec<String>>,
    /// Object keys the rows came from, in read order.
    sources: Vec<String>,
}

impl Frame {
    /// Returns the number of data rows.
    #[must_use]
    pub fn count(&self) -> usize {
        self.rows.len()
    }

    /// Returns the data rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Returns the header row, when read with headers.
    #[must_use]
    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    /// Returns the object keys that were read.
    #[must_use]
    pub fn sources(&self) -> &[String] {
        &self.sources
    }
}

// ============================================================================
// SECTION: Session
// ============================================================================

/// Local processing session bound to one bucket.
pub struct LocalSession {
    /// Session name.
    app_name: String,
    /// Bucket the session reads from.
    bucket: String,
    /// Storage client.
    client: Arc<dyn ObjectStoreClient>,
    /// Maximum size of one object read.
    max_object_bytes: usize,
    /// Whether the session is still live.
    active: bool,
}

impl std::fmt::Debug for LocalSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSession")
            .field("app_name", &self.app_name)
            .field("bucket", &self.bucket)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl LocalSession {
    /// Starts a session reading `bucket` through `client`.
    #[must_use]
    pub fn start(
        settings: &SessionSettings,
        bucket: impl Into<String>,
        client: Arc<dyn ObjectStoreClient>,
    ) -> Self {
        Self {
            app_name: settings.app_name.clone(),
            bucket: bucket.into(),
            client,
            max_object_bytes: settings.max_object_bytes,
            active: true,
        }
    }

    /// Returns the session name.
    #[must_use]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Returns the bound bucket.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Returns true until [`LocalSession::stop`] succeeds.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Stops the session.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionStopped`] when already stopped.
    pub fn stop(&mut self) -> Result<(), EngineError> {
        self.ensure_active()?;
        self.active = false;
        Ok(())
    }

    /// Reads CSV with default options.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the session is stopped, the URI is for
    /// another bucket, nothing exists at the path, or decoding fails.
    pub fn read_csv(&self, uri: &ObjectUri) -> Result<Frame, EngineError> {
        self.read_csv_with(uri, CsvReadOptions::default())
    }

    /// Reads CSV with explicit options.
    ///
    /// # Errors
    ///
    /// See [`LocalSession::read_csv`].
    pub fn read_csv_with(
        &self,
        uri: &ObjectUri,
        options: CsvReadOptions,
    ) -> Result<Frame, EngineError> {
        self.ensure_active()?;
        if uri.bucket() != self.bucket {
            return Err(EngineError::BucketMismatch {
                expected: self.bucket.clone(),
                actual: uri.bucket().to_string(),
            });
        }
        let keys = self.resolve_keys(uri)?;
        let mut frame = Frame::default();
        for key in keys {
            let bytes = match self.client.get_object(&self.bucket, &key, self.max_object_bytes) {
                Ok(bytes) => bytes,
                Err(ObjectStoreError::NoSuchKey {
                    ..
                }) => {
                    return Err(EngineError::ObjectNotFound {
                        uri: uri.to_string(),
                    });
                }
                Err(err) => return Err(err.into()),
            };
            append_csv(&mut frame, &bytes, options, uri)?;
            frame.sources.push(key.into_string());
        }
        Ok(frame)
    }

    /// Counts CSV rows at `uri` with default options.
    ///
    /// # Errors
    ///
    /// See [`LocalSession::read_csv`].
    pub fn count(&self, uri: &ObjectUri) -> Result<usize, EngineError> {
        Ok(self.read_csv(uri)?.count())
    }

    /// Asserts the CSV row count at `uri`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::RowCountMismatch`] when the count differs, or
    /// any read error.
    pub fn assert_row_count(&self, uri: &ObjectUri, expected: usize) -> Result<(), EngineError> {
        let actual = self.count(uri)?;
        if actual != expected {
            return Err(EngineError::RowCountMismatch {
                uri: uri.to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Fails when the session has been stopped.
    fn ensure_active(&self) -> Result<(), EngineError> {
        if self.active {
            Ok(())
        } else {
            Err(EngineError::SessionStopped {
                app_name: self.app_name.clone(),
            })
        }
    }

    /// Resolves a URI into the object keys to read. Folder markers are skipped.
    fn resolve_keys(&self, uri: &ObjectUri) -> Result<Vec<ObjectKey>, EngineError> {
        if !uri.is_prefix() {
            return Ok(vec![uri.object_key()?]);
        }
        let prefix = (!uri.key().is_empty()).then(|| uri.key());
        let keys: Vec<ObjectKey> = list_all_objects(self.client.as_ref(), &self.bucket, prefix)?
            .into_iter()
            .filter(|object| !object.key.ends_with('/'))
            .map(|object| ObjectKey::from_listing(object.key))
            .collect();
        if keys.is_empty() {
            return Err(EngineError::ObjectNotFound {
                uri: uri.to_string(),
            });
        }
        Ok(keys)
    }
}

// ============================================================================
// SECTION: CSV Decoding
// ============================================================================

/// Decodes one object's CSV payload into the frame.
fn append_csv(
    frame: &mut Frame,
    bytes: &[u8],
    options: CsvReadOptions,
    uri: &ObjectUri,
) -> Result<(), EngineError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(options.has_header)
        .delimiter(options.delimiter)
        .flexible(true)
        .from_reader(bytes);
    let csv_error = |err: csv::Error| EngineError::Csv {
        uri: uri.to_string(),
        message: err.to_string(),
    };
    if options.has_header && frame.header.is_none() {
        let header = reader.byte_headers().map_err(csv_error)?;
        frame.header = Some(decode_record(header));
    }
    for record in reader.byte_records() {
        let record = record.map_err(csv_error)?;
        frame.rows.push(decode_record(&record));
    }
    Ok(())
}

/// Converts a byte record into lossy UTF-8 fields.
fn decode_record(record: &csv::ByteRecord) -> Vec<String> {
    record.iter().map(|field| String::from_utf8_lossy(field).into_owned()).collect()
}
