//! Last-irreversible-block tracking.

use crate::types::JsonRpcResponse;
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::trace;

/// Method suffix whose responses carry `last_irreversible_block_num`.
pub const DYNAMIC_GLOBAL_PROPERTIES: &str = "get_dynamic_global_properties";

/// Shared view of the chain's last irreversible block (LIB).
///
/// The value only ever moves forward: [`FinalityTracker::advance`] ignores anything at or
/// below the current value. Zero means "unknown", which disables irreversibility-based
/// caching.
///
/// # Thread Safety
///
/// Cloning is cheap and all clones share the same counters. Reads are a single atomic
/// load; writes are a `fetch_max`.
///
/// # Example
///
/// ```
/// use relay_core::chain::FinalityTracker;
///
/// let tracker = FinalityTracker::new();
/// assert_eq!(tracker.last_irreversible_block_num(), 0);
///
/// assert!(tracker.advance(1000));
/// assert!(!tracker.advance(999));
/// assert_eq!(tracker.last_irreversible_block_num(), 1000);
/// ```
#[derive(Clone, Debug)]
pub struct FinalityTracker {
    last_irreversible: Arc<AtomicU64>,

    /// Unix timestamp (seconds) of the last successful advance.
    last_update: Arc<AtomicU64>,
}

/// Returns the current unix timestamp in seconds.
fn current_unix_timestamp() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

impl FinalityTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Creates a tracker with a known LIB, e.g. restored at startup.
    #[must_use]
    pub fn starting_at(block: u64) -> Self {
        Self {
            last_irreversible: Arc::new(AtomicU64::new(block)),
            last_update: Arc::new(AtomicU64::new(current_unix_timestamp())),
        }
    }

    #[inline]
    #[must_use]
    pub fn last_irreversible_block_num(&self) -> u64 {
        self.last_irreversible.load(Ordering::Acquire)
    }

    /// Moves the LIB forward to `block`.
    ///
    /// Returns `true` if the value changed.
    pub fn advance(&self, block: u64) -> bool {
        let previous = self.last_irreversible.fetch_max(block, Ordering::AcqRel);
        if block <= previous {
            return false;
        }

        self.last_update.store(current_unix_timestamp(), Ordering::Release);
        crate::metrics::record_last_irreversible_block(block);
        trace!(block, previous, "last irreversible block advanced");
        true
    }

    /// Seconds since the LIB last moved.
    #[inline]
    #[must_use]
    pub fn age_seconds(&self) -> u64 {
        let last_update = self.last_update.load(Ordering::Acquire);
        current_unix_timestamp().saturating_sub(last_update)
    }

    /// Advances the tracker from a `get_dynamic_global_properties` response.
    ///
    /// Returns the new LIB when it moved. Other methods and responses without a numeric
    /// `last_irreversible_block_num` are ignored.
    pub fn observe(&self, method: &str, response: &JsonRpcResponse) -> Option<u64> {
        if !method.ends_with(DYNAMIC_GLOBAL_PROPERTIES) {
            return None;
        }
        let block = last_irreversible_from_response(response)?;
        self.advance(block).then_some(block)
    }
}

impl Default for FinalityTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads `result.last_irreversible_block_num` from a successful response.
#[must_use]
pub fn last_irreversible_from_response(response: &JsonRpcResponse) -> Option<u64> {
    if response.is_error() {
        return None;
    }
    response.non_null_result()?.get("last_irreversible_block_num")?.as_u64()
}
