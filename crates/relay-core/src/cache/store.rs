//! Cache backend abstraction.

use crate::{cache::policy::Expiry, types::CachedResponse};
use async_trait::async_trait;
use futures::future::join_all;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("cache is full ({capacity} entries)")]
    Full { capacity: usize },

    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

/// A key/value store for cached results, keyed by URN.
///
/// Implementations must be safe to share between request tasks. A miss is `Ok(None)`,
/// never an error.
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    /// Looks up a single key.
    async fn get(&self, key: &str) -> Result<Option<CachedResponse>, CacheError>;

    /// Stores `value` under `key` until `expiry`.
    async fn set(&self, key: &str, value: CachedResponse, expiry: Expiry)
        -> Result<(), CacheError>;

    /// Looks up several keys concurrently, preserving order.
    async fn get_many(&self, keys: &[&str]) -> Vec<Result<Option<CachedResponse>, CacheError>> {
        join_all(keys.iter().map(|key| self.get(key))).await
    }
}
