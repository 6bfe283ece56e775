//! Utility functions shared by the cache components.
//!
//! ## Canonical JSON (`canonical_json`)
//! - Sorted-key, whitespace-free rendering used for the params segment of URNs
//! - Thread-local scratch buffer to keep the hot path allocation-light

pub mod canonical_json;

pub use canonical_json::{to_canonical_string, write_canonical};
