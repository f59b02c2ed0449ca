//! Integration tests for docrules.
//!
//! These tests drive the public API end to end, with the network replaced
//! by a scripted fetcher.

pub mod metadata_tests;
pub mod output_tests;
pub mod resolver_tests;
pub mod rules_tests;
