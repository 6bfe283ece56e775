//! Ordered stack of cache tiers, e.g. an in-process cache in front of a shared one.

use crate::{
    cache::{
        policy::Expiry,
        store::{CacheError, CacheStore},
    },
    types::CachedResponse,
};
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tracing::warn;

/// A [`CacheStore`] that reads through its tiers in order and writes to all of them.
///
/// A tier that fails on read is logged and skipped; the next tier is consulted. Hits in
/// a later tier are not copied back into earlier ones.
#[derive(Clone, Default)]
pub struct CacheGroup {
    tiers: Vec<Arc<dyn CacheStore>>,
}

impl CacheGroup {
    #[must_use]
    pub fn new(tiers: Vec<Arc<dyn CacheStore>>) -> Self {
        Self { tiers }
    }

    /// Appends a tier, consulted after the existing ones.
    #[must_use]
    pub fn with_tier(mut self, tier: Arc<dyn CacheStore>) -> Self {
        self.tiers.push(tier);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

impl std::fmt::Debug for CacheGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheGroup").field("tiers", &self.tiers.len()).finish()
    }
}

#[async_trait]
impl CacheStore for CacheGroup {
    async fn get(&self, key: &str) -> Result<Option<CachedResponse>, CacheError> {
        for (tier, store) in self.tiers.iter().enumerate() {
            match store.get(key).await {
                Ok(Some(value)) => return Ok(Some(value)),
                Ok(None) => {}
                Err(error) => warn!(tier, key, %error, "cache tier read failed"),
            }
        }
        Ok(None)
    }

    async fn set(
        &self,
        key: &str,
        value: CachedResponse,
        expiry: Expiry,
    ) -> Result<(), CacheError> {
        let writes = self.tiers.iter().map(|store| store.set(key, value.clone(), expiry));
        let results = join_all(writes).await;

        let mut first_error = None;
        for (tier, result) in results.into_iter().enumerate() {
            if let Err(error) = result {
                warn!(tier, key, %error, "cache tier write failed");
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
