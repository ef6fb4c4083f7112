// crates/fixture-bench-s3/src/lib.rs
// ============================================================================
// Module: Fixture Bench S3 Library
// Description: S3-compatible storage client for the fixture bench harness.
// Purpose: Run fixture-backed tests against a local mock S3 service.
// Dependencies: fixture-bench-core, aws-config, aws-sdk-s3, tokio
// ============================================================================

//! ## Overview
//! Provides [`S3ObjectStoreClient`], the `aws-sdk-s3` implementation of
//! [`fixture_bench_core::ObjectStoreClient`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod client;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use client::S3ObjectStoreClient;
pub use client::classify_error_code;
