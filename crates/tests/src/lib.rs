//! Integration tests for the relay cache pipeline.
//!
//! - `pipeline_ordering_tests`: stage sequence, validation short-circuit, request ids
//! - `batch_tests`: full and partial batch hits, positional reassembly, mixed policies
//! - `finality_tests`: LIB tracking from upstream responses and irreversible block caching
//! - `failure_tests`: upstream errors, timeouts, and responses that are never cached
//! - `expiry_tests`: TTL expiry under a paused clock
//! - `mock_infrastructure`: scripted upstream and pipeline builders
//!
//! ```bash
//! cargo test --package tests
//! ```

#[cfg(test)]
mod pipeline_ordering_tests;

#[cfg(test)]
mod batch_tests;


#[cfg(test)]
mod failure_tests;


/// Mock infrastructure for testing
pub mod mock_infrastructure;
