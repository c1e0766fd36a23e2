//! Integration tests for Sumi-Harvest
//!
//! These tests use wiremock to create mock HTTP servers and exercise the
//! fetch client and complete harvest runs end-to-end.

mod fetch_tests;
mod harvest_tests;
