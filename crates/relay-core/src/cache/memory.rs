//! In-process cache backend.
//!
//! Entries live in a sharded [`DashMap`] with an optional deadline each. Expired entries
//! are invisible to readers immediately and removed lazily on read or by the periodic
//! purge task started with [`MemoryCache::start_purge_task`].
//!
//! The capacity bound is hard: a slot is reserved on an atomic counter before a new key is
//! inserted, so concurrent writers cannot push the map past `capacity`.

use crate::{
    cache::{
        policy::Expiry,
        store::{CacheError, CacheStore},
    },
    types::CachedResponse,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{sync::broadcast, task::JoinHandle, time::Instant};
use tracing::{debug, info, trace};

#[derive(Debug, Clone)]
struct Entry {
    value: CachedResponse,
    deadline: Option<Instant>,
}

impl Entry {
    #[inline]
    fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| deadline <= now)
    }
}

/// Bounded in-memory [`CacheStore`].
#[derive(Debug)]
pub struct MemoryCache {
    entries: DashMap<String, Entry>,
    /// Reserved slots; always `>= entries.len()` and never above `capacity`.
    occupied: AtomicUsize,
    capacity: usize,
}

impl MemoryCache {
    /// Creates a cache holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::with_capacity(capacity.min(1024)),
            occupied: AtomicUsize::new(0),
            capacity,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Removes every expired entry and returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut purged = 0;
        self.entries.retain(|_, entry| {
            let keep = !entry.is_expired(now);
            if !keep {
                purged += 1;
            }
            keep
        });
        self.release(purged);
        purged
    }

    fn try_reserve(&self) -> bool {
        self.occupied
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.capacity).then_some(n + 1)
            })
            .is_ok()
    }

    fn release(&self, slots: usize) {
        if slots > 0 {
            self.occupied.fetch_sub(slots, Ordering::AcqRel);
        }
    }

    /// Spawns the periodic purge loop. It exits when `shutdown_rx` fires or its sender is
    /// dropped.
    pub fn start_purge_task(
        cache: Arc<Self>,
        interval: Duration,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    biased;

                    _ = shutdown_rx.recv() => {
                        debug!("memory cache purge task shutting down");
                        break;
                    }

                    _ = ticker.tick() => {
                        let purged = cache.purge_expired();
                        if purged > 0 {
                            debug!(purged, remaining = cache.len(), "purged expired cache entries");
                        }
                    }
                }
            }

            info!("memory cache purge task stopped");
        })
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<CachedResponse>, CacheError> {
        let now = Instant::now();
        match self.entries.get(key) {
            None => return Ok(None),
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
            Some(_) => {}
        }

        // Re-check under the write lock; a concurrent `set` may have refreshed it
        if self.entries.remove_if(key, |_, entry| entry.is_expired(now)).is_some() {
            self.release(1);
            trace!(key, "dropped expired entry on read");
        }
        Ok(None)
    }

    async fn set(
        &self,
        key: &str,
        value: CachedResponse,
        expiry: Expiry,
    ) -> Result<(), CacheError> {
        // A deadline past the clock's range never arrives
        let deadline = match expiry {
            Expiry::Never => None,
            Expiry::After(ttl) => Instant::now().checked_add(ttl),
        };
        let entry = Entry { value, deadline };

        if let Some(mut existing) = self.entries.get_mut(key) {
            *existing = entry;
            return Ok(());
        }

        if !self.try_reserve() {
            self.purge_expired();
            if !self.try_reserve() {
                return Err(CacheError::Full { capacity: self.capacity });
            }
        }

        // Another writer inserted the same key after our lookup
        if self.entries.insert(key.to_string(), entry).is_some() {
            self.release(1);
        }
        Ok(())
    }
}
