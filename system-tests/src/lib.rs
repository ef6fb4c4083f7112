// system-tests/src/lib.rs
// ============================================================================
// Module: Fixture Bench System Tests Library
// Description: Shared configuration for system test scenarios.
// Purpose: Decide how the system tests reach an S3-compatible service.
// Dependencies: std
// ============================================================================

//! ## Overview
//! This crate hosts the environment configuration used by the feature-gated
//! tests in `system-tests/tests`, which run the fixture harness against a real
//! S3-compatible service instead of the in-memory store.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
