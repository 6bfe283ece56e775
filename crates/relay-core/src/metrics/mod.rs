//! # Metrics
//!
//! Counters are emitted through the `metrics` facade on every call; installing a recorder
//! (Prometheus or otherwise) is the embedding process's job. Without one the macros are
//! no-ops.
//!
//! [`MetricsCollector`] additionally keeps plain atomic totals so the pipeline's behavior
//! can be inspected without a recorder, e.g. from tests or a CLI.
//!
//! | Metric | Labels |
//! |--------|--------|
//! | `relay_cache_lookups_total` | `result` = `hit` / `miss` / `skip` |
//! | `relay_cache_writes_total` | `outcome` = `stored` / `skipped` / `failed` |
//! | `relay_upstream_dispatch_total` | `outcome` = `ok` / `error` / `timeout` |
//! | `relay_validation_failures_total` | `error_type` |
//! | `relay_request_duration_seconds` | `batch` = `true` / `false` |
//! | `relay_last_irreversible_block` | gauge |

use crate::{
    middleware::validation::ValidationError, types::CacheStatus, upstream::UpstreamError,
};
use metrics::{counter, gauge, histogram};
use serde::{Deserialize, Serialize};
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

pub trait MetricsState {
    fn as_metric_str(&self) -> &'static str;
}

impl MetricsState for CacheStatus {
    fn as_metric_str(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Skip => "skip",
        }
    }
}

impl MetricsState for UpstreamError {
    fn as_metric_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Transport(_) => "transport",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Unavailable => "unavailable",
        }
    }
}

impl MetricsState for ValidationError {
    fn as_metric_str(&self) -> &'static str {
        match self {
            Self::InvalidVersion(_) => "invalid_version",
            Self::EmptyMethod => "empty_method",
            Self::InvalidParams(_) => "invalid_params",
            Self::InvalidId(_) => "invalid_id",
            Self::EmptyBatch => "empty_batch",
            Self::BatchTooLarge { .. } => "batch_too_large",
        }
    }
}

/// Result of the cache-store stage for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Stored,
    /// Not cacheable: policy said no, result was null or an error, or irreversibility
    /// could not be established.
    Skipped,
    Failed,
}

impl MetricsState for WriteOutcome {
    fn as_metric_str(&self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

/// Records the chain's last irreversible block.
#[allow(clippy::cast_precision_loss)]
pub fn record_last_irreversible_block(block: u64) {
    gauge!("relay_last_irreversible_block").set(block as f64);
}

/// Point-in-time totals recorded by a [`MetricsCollector`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_skips: u64,
    pub cache_writes: u64,
    pub cache_write_skips: u64,
    pub cache_write_failures: u64,
    pub upstream_calls: u64,
    pub upstream_errors: u64,
    pub upstream_timeouts: u64,
    pub validation_failures: u64,
}

impl MetricsSummary {
    /// Fraction of looked-up calls served from cache.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.cache_hits + self.cache_misses;
        if lookups == 0 {
            0.0
        } else {
            self.cache_hits as f64 / lookups as f64
        }
    }
}

#[derive(Debug, Default)]
pub struct MetricsCollector {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    cache_skips: AtomicU64,
    cache_writes: AtomicU64,
    cache_write_skips: AtomicU64,
    cache_write_failures: AtomicU64,
    upstream_calls: AtomicU64,
    upstream_errors: AtomicU64,
    upstream_timeouts: AtomicU64,
    validation_failures: AtomicU64,
}

impl MetricsCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_lookup(&self, status: CacheStatus) {
        counter!("relay_cache_lookups_total", "result" => status.as_metric_str()).increment(1);
        let total = match status {
            CacheStatus::Hit => &self.cache_hits,
            CacheStatus::Miss => &self.cache_misses,
            CacheStatus::Skip => &self.cache_skips,
        };
        total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write(&self, outcome: WriteOutcome) {
        counter!("relay_cache_writes_total", "outcome" => outcome.as_metric_str()).increment(1);
        let total = match outcome {
            WriteOutcome::Stored => &self.cache_writes,
            WriteOutcome::Skipped => &self.cache_write_skips,
            WriteOutcome::Failed => &self.cache_write_failures,
        };
        total.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one upstream dispatch and its outcome.
    pub fn record_dispatch(&self, error: Option<&UpstreamError>) {
        self.upstream_calls.fetch_add(1, Ordering::Relaxed);
        let outcome = match error {
            None => "ok",
            Some(UpstreamError::Timeout) => {
                self.upstream_timeouts.fetch_add(1, Ordering::Relaxed);
                "timeout"
            }
            Some(err) => {
                self.upstream_errors.fetch_add(1, Ordering::Relaxed);
                counter!("relay_upstream_errors_total", "error_type" => err.as_metric_str())
                    .increment(1);
                "error"
            }
        };
        counter!("relay_upstream_dispatch_total", "outcome" => outcome).increment(1);
    }

    pub fn record_validation_failure(&self, error: &ValidationError) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
        counter!("relay_validation_failures_total", "error_type" => error.as_metric_str())
            .increment(1);
    }

    pub fn record_request_duration(&self, is_batch: bool, elapsed: Duration) {
        let batch = if is_batch { "true" } else { "false" };
        histogram!("relay_request_duration_seconds", "batch" => batch)
            .record(elapsed.as_secs_f64());
    }

    #[must_use]
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_skips: self.cache_skips.load(Ordering::Relaxed),
            cache_writes: self.cache_writes.load(Ordering::Relaxed),
            cache_write_skips: self.cache_write_skips.load(Ordering::Relaxed),
            cache_write_failures: self.cache_write_failures.load(Ordering::Relaxed),
            upstream_calls: self.upstream_calls.load(Ordering::Relaxed),
            upstream_errors: self.upstream_errors.load(Ordering::Relaxed),
            upstream_timeouts: self.upstream_timeouts.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
        }
    }
}
