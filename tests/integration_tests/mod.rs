//! Integration tests module
//!
//! End-to-end tests for the dalbit publishing system, including:
//! - Complete allocate -> generate -> validate -> publish -> record runs
//! - Failure handling (fallback, exhaustion, persistence errors)
//! - HTTP clients against wiremock

pub mod fixtures;
pub mod http_test;
pub mod ledger_test;
pub mod weekly_test;
