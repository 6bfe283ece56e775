//! Per-payload bookkeeping carried through the pipeline stages.

use crate::{middleware::request_id::RequestId, types::CacheStatus};
use std::{fmt, time::Duration};
use tokio::time::Instant;
use tracing::trace;

/// Pipeline stages in execution order.
///
/// Request phase: [`Stage::AssignRequestId`], [`Stage::ValidateEnvelope`],
/// [`Stage::CacheLookup`]. [`Stage::Dispatch`] runs only when something missed the
/// cache. Response phase: [`Stage::FinalizeResponse`], [`Stage::CacheStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    AssignRequestId,
    ValidateEnvelope,
    CacheLookup,
    Dispatch,
    FinalizeResponse,
    CacheStore,
}

impl Stage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Stage::AssignRequestId => "assign_request_id",
            Stage::ValidateEnvelope => "validate_envelope",
            Stage::CacheLookup => "cache_lookup",
            Stage::Dispatch => "dispatch",
            Stage::FinalizeResponse => "finalize_response",
            Stage::CacheStore => "cache_store",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the pipeline did for one inbound payload.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: RequestId,
    started_at: Instant,
    stages: Vec<Stage>,
    statuses: Vec<CacheStatus>,
}

impl RequestContext {
    #[must_use]
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            started_at: Instant::now(),
            stages: Vec::with_capacity(6),
            statuses: Vec::new(),
        }
    }

    #[must_use]
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Records that `stage` is starting.
    pub(crate) fn enter(&mut self, stage: Stage) {
        trace!(request_id = %self.request_id, stage = %stage, "entering stage");
        self.stages.push(stage);
    }

    pub(crate) fn set_statuses(&mut self, statuses: Vec<CacheStatus>) {
        self.statuses = statuses;
    }

    /// Stages that ran, in order.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// How each call of the payload was served, by position.
    #[must_use]
    pub fn statuses(&self) -> &[CacheStatus] {
        &self.statuses
    }

    #[must_use]
    pub fn hits(&self) -> usize {
        self.statuses.iter().filter(|status| **status == CacheStatus::Hit).count()
    }

    /// True when every call was answered from cache.
    #[must_use]
    pub fn is_full_hit(&self) -> bool {
        !self.statuses.is_empty() && self.hits() == self.statuses.len()
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}
