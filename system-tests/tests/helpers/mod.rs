// system-tests/tests/helpers/mod.rs
// ============================================================================
// Module: System Test Helpers
// Description: Shared helpers for fixture bench system-tests.
// Purpose: Provide the S3 service fixture and harness wiring.
// Dependencies: system-tests, fixture-bench-core, fixture-bench-s3
// ============================================================================

//! ## Overview
//! Shared helpers for fixture bench system-tests.

#![allow(dead_code, reason = "Shared helpers are reused across multiple test suites.")]

pub mod infra;
