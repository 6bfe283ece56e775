//! The cache middleware pipeline.
//!
//! One [`CachePipeline`] is built at startup and shared by all request tasks. Each inbound
//! payload runs through the fixed [`Stage`] sequence:
//!
//! ```text
//!  AssignRequestId ─► ValidateEnvelope ─► CacheLookup ─┬─► (all hit) ──────────────┐
//!                                                      └─► Dispatch (misses only) ─┤
//!                                                                                  ▼
//!                                          CacheStore ◄─ FinalizeResponse ◄────────┘
//! ```
//!
//! Batches are looked up, dispatched and stored concurrently and reassembled by position.
//! A failure on one call of a batch produces an error entry for that call only.

use crate::{
    cache::{
        merge::{merge_cached_responses, MergeError},
        policy::{CacheDecision, Ttl},
        store::CacheStore,
        ttl::TtlResolver,
        urn::{urn, Urn},
    },
    chain::FinalityTracker,
    metrics::{MetricsCollector, WriteOutcome},
    middleware::{
        context::{RequestContext, Stage},
        request_id::RequestId,
        validation::ValidationError,
    },
    types::{
        CacheStatus, CachedResponse, JsonRpcError, JsonRpcPayload, JsonRpcRequest,
        JsonRpcResponse, JsonRpcResponsePayload, INTERNAL_ERROR, INVALID_REQUEST,
        JSONRPC_VERSION_COW,
    },
    upstream::{Upstream, UpstreamError},
};
use futures::future::join_all;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info_span, warn, Instrument};

/// Default limit on calls per batch.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 50;

/// Default upper bound on a single upstream dispatch.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Runtime knobs of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub max_batch_size: usize,
    pub upstream_timeout: Duration,
    /// When false every call is dispatched and nothing is stored.
    pub cache_enabled: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            cache_enabled: true,
        }
    }
}

/// Payload-level failures. Per-call failures never surface here; they become error
/// entries in the response.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Internal error: {0}")]
    Merge(#[from] MergeError),
}

impl PipelineError {
    #[must_use]
    pub fn json_rpc_code(&self) -> i32 {
        match self {
            Self::Validation(_) => INVALID_REQUEST,
            Self::Merge(_) => INTERNAL_ERROR,
        }
    }

    /// The error response sent to the client in place of the whole payload.
    #[must_use]
    pub fn to_response(&self) -> JsonRpcResponse {
        let message = match self {
            Self::Validation(_) => "Invalid Request",
            Self::Merge(_) => "Internal error",
        };
        JsonRpcResponse {
            jsonrpc: JSONRPC_VERSION_COW,
            result: None,
            error: Some(JsonRpcError {
                code: self.json_rpc_code(),
                message: message.to_string(),
                data: Some(serde_json::Value::String(self.to_string())),
            }),
            id: Some(serde_json::Value::Null),
        }
    }
}

/// The answer to one payload plus the record of how it was produced.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub response: JsonRpcResponsePayload,
    pub context: RequestContext,
}

/// Per-call state shared between stages.
struct Call {
    request: JsonRpcRequest,
    urn: Urn,
    ttl: Ttl,
    status: CacheStatus,
    response: Option<JsonRpcResponse>,
    /// Response came from the upstream in this pass and may be stored.
    fresh: bool,
}

/// Caching front-end for a single upstream.
pub struct CachePipeline {
    resolver: TtlResolver,
    store: Arc<dyn CacheStore>,
    upstream: Arc<dyn Upstream>,
    finality: FinalityTracker,
    metrics: Arc<MetricsCollector>,
    config: PipelineConfig,
}

impl CachePipeline {
    #[must_use]
    pub fn new(
        resolver: TtlResolver,
        store: Arc<dyn CacheStore>,
        upstream: Arc<dyn Upstream>,
        finality: FinalityTracker,
        config: PipelineConfig,
    ) -> Self {
        Self {
            resolver,
            store,
            upstream,
            finality,
            metrics: Arc::new(MetricsCollector::new()),
            config,
        }
    }

    /// Replaces the metrics collector, e.g. to share one between pipelines.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    #[must_use]
    pub fn resolver(&self) -> &TtlResolver {
        &self.resolver
    }

    #[must_use]
    pub fn finality(&self) -> &FinalityTracker {
        &self.finality
    }

    #[must_use]
    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Serves one inbound payload.
    ///
    /// `request_id` is used for log correlation when the caller already has one (e.g. an
    /// `x-request-id` header); otherwise a UUID v4 is generated.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Validation`] when the envelope is invalid; the whole payload is
    /// rejected and nothing is dispatched. Use [`PipelineError::to_response`] to answer.
    pub async fn handle(
        &self,
        payload: JsonRpcPayload,
        request_id: Option<RequestId>,
    ) -> Result<PipelineOutput, PipelineError> {
        let mut context = RequestContext::new(request_id.unwrap_or_else(RequestId::generate));
        context.enter(Stage::AssignRequestId);

        let span = info_span!(
            "relay_request",
            request_id = %context.request_id(),
            batch = payload.is_batch(),
            calls = payload.len()
        );
        self.run(payload, context).instrument(span).await
    }

    async fn run(
        &self,
        payload: JsonRpcPayload,
        mut context: RequestContext,
    ) -> Result<PipelineOutput, PipelineError> {
        context.enter(Stage::ValidateEnvelope);
        if let Err(error) = payload.validate(self.config.max_batch_size) {
            self.metrics.record_validation_failure(&error);
            debug!(%error, "rejecting invalid payload");
            return Err(error.into());
        }

        let (requests, is_batch) = payload.into_requests();
        let lib = self.finality.last_irreversible_block_num();
        let mut calls: Vec<Call> = requests
            .into_iter()
            .map(|request| {
                let urn = urn(&request);
                let ttl = self.resolver.ttl_for(&urn, lib, None);
                Call {
                    request,
                    urn,
                    ttl,
                    status: CacheStatus::Skip,
                    response: None,
                    fresh: false,
                }
            })
            .collect();

        context.enter(Stage::CacheLookup);
        self.lookup(&mut calls).await?;
        context.set_statuses(calls.iter().map(|call| call.status).collect());

        if calls.iter().any(|call| call.response.is_none()) {
            context.enter(Stage::Dispatch);
            self.dispatch_misses(&mut calls).await;
        }

        context.enter(Stage::FinalizeResponse);
        self.finalize(&mut calls);

        context.enter(Stage::CacheStore);
        if self.config.cache_enabled {
            self.store_fresh(&calls).await;
        }

        let mut responses: Vec<JsonRpcResponse> = calls
            .into_iter()
            .map(|call| {
                call.response.unwrap_or_else(|| {
                    JsonRpcResponse::error(INTERNAL_ERROR, "Internal error", call.request.id)
                })
            })
            .collect();

        let response = if is_batch {
            JsonRpcResponsePayload::Batch(responses)
        } else {
            JsonRpcResponsePayload::Single(responses.pop().unwrap_or_else(|| {
                JsonRpcResponse::error(INTERNAL_ERROR, "Internal error", None)
            }))
        };

        self.metrics.record_request_duration(is_batch, context.elapsed());
        debug!(
            hits = context.hits(),
            calls = context.statuses().len(),
            elapsed_ms = context.elapsed().as_millis(),
            "request complete"
        );

        Ok(PipelineOutput { response, context })
    }

    /// Looks up every cacheable call concurrently and fills in hits.
    async fn lookup(&self, calls: &mut [Call]) -> Result<(), PipelineError> {
        let lookup_positions: Vec<usize> = calls
            .iter()
            .enumerate()
            .filter(|(_, call)| self.config.cache_enabled && call.ttl.is_cacheable())
            .map(|(idx, _)| idx)
            .collect();

        let keys: Vec<&str> =
            lookup_positions.iter().map(|&idx| calls[idx].urn.as_str()).collect();
        let results = self.store.get_many(&keys).await;

        let mut cached: Vec<Option<CachedResponse>> = vec![None; calls.len()];
        for (&idx, result) in lookup_positions.iter().zip(results) {
            let call = &mut calls[idx];
            match result {
                Ok(Some(entry)) => {
                    call.status = CacheStatus::Hit;
                    cached[idx] = Some(entry);
                }
                Ok(None) => call.status = CacheStatus::Miss,
                Err(error) => {
                    warn!(urn = %call.urn, %error, "cache lookup failed, treating as miss");
                    call.status = CacheStatus::Miss;
                }
            }
        }

        let requests: Vec<JsonRpcRequest> = calls.iter().map(|call| call.request.clone()).collect();
        let merged = merge_cached_responses(&requests, &cached)?;
        for (call, response) in calls.iter_mut().zip(merged) {
            self.metrics.record_lookup(call.status);
            debug!(urn = %call.urn, status = %call.status, ttl = %call.ttl, "cache lookup");
            call.response = response;
        }
        Ok(())
    }

    /// Dispatches every call still lacking a response, concurrently.
    async fn dispatch_misses(&self, calls: &mut [Call]) {
        let pending: Vec<usize> = calls
            .iter()
            .enumerate()
            .filter(|(_, call)| call.response.is_none())
            .map(|(idx, _)| idx)
            .collect();

        let dispatches = pending.iter().map(|&idx| self.dispatch(&calls[idx].request));
        let results = join_all(dispatches).await;

        for (&idx, result) in pending.iter().zip(results) {
            let call = &mut calls[idx];
            match result {
                Ok(response) => {
                    self.metrics.record_dispatch(None);
                    call.response = Some(response);
                    call.fresh = true;
                }
                Err(error) => {
                    self.metrics.record_dispatch(Some(&error));
                    warn!(urn = %call.urn, %error, "upstream dispatch failed");
                    call.response = Some(JsonRpcResponse::error(
                        error.json_rpc_code(),
                        error.to_string(),
                        call.request.id.clone(),
                    ));
                }
            }
        }
    }

    async fn dispatch(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, UpstreamError> {
        match tokio::time::timeout(self.config.upstream_timeout, self.upstream.dispatch(request))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(UpstreamError::Timeout),
        }
    }

    /// Normalizes envelopes and feeds finality data to the tracker.
    fn finalize(&self, calls: &mut [Call]) {
        for call in calls.iter_mut() {
            let Some(response) = call.response.as_mut() else {
                continue;
            };
            response.jsonrpc = JSONRPC_VERSION_COW;
            response.id.clone_from(&call.request.id);

            if call.fresh {
                if let Some(block) = self.finality.observe(call.urn.method(), response) {
                    debug!(block, "last irreversible block advanced from response");
                }
            }
        }
    }

    /// Stores every fresh, successful, cacheable response.
    async fn store_fresh(&self, calls: &[Call]) {
        let lib = self.finality.last_irreversible_block_num();
        let mut writes = Vec::new();

        for call in calls.iter().filter(|call| call.fresh) {
            let Some(response) = call.response.as_ref() else {
                continue;
            };
            let result = match response.non_null_result() {
                Some(result) if !response.is_error() => result,
                _ => {
                    self.metrics.record_write(WriteOutcome::Skipped);
                    continue;
                }
            };

            let ttl = self.resolver.ttl_for(&call.urn, lib, Some(response));
            match ttl.cache_decision() {
                CacheDecision::Store(expiry) => {
                    let key = call.urn.as_str();
                    let value = CachedResponse::new(result.clone());
                    writes.push(async move { (key, self.store.set(key, value, expiry).await) });
                }
                CacheDecision::Skip => self.metrics.record_write(WriteOutcome::Skipped),
                CacheDecision::Deferred => {
                    debug!(urn = %call.urn, "ttl still deferred after response, not caching");
                    self.metrics.record_write(WriteOutcome::Skipped);
                }
            }
        }

        for (key, result) in join_all(writes).await {
            match result {
                Ok(()) => self.metrics.record_write(WriteOutcome::Stored),
                Err(error) => {
                    warn!(urn = key, %error, "cache write failed");
                    self.metrics.record_write(WriteOutcome::Failed);
                }
            }
        }
    }
}

impl std::fmt::Debug for CachePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachePipeline")
            .field("config", &self.config)
            .field("lib", &self.finality.last_irreversible_block_num())
            .finish_non_exhaustive()
    }
}
