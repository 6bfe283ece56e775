//! Stage ordering and short-circuit behavior of the cache pipeline.

use crate::mock_infrastructure::{batch, request, single, steem_pipeline, MockUpstream};
use relay_core::{
    middleware::{PipelineError, RequestId, Stage, ValidationError},
    types::{CacheStatus, JsonRpcPayload, JsonRpcRequest, INVALID_REQUEST},
};
use serde_json::json;
use std::sync::Arc;

const MISS_STAGES: [Stage; 6] = [
    Stage::AssignRequestId,
    Stage::ValidateEnvelope,
    Stage::CacheLookup,
    Stage::Dispatch,
    Stage::FinalizeResponse,
    Stage::CacheStore,
];

const HIT_STAGES: [Stage; 5] = [
    Stage::AssignRequestId,
    Stage::ValidateEnvelope,
    Stage::CacheLookup,
    Stage::FinalizeResponse,
    Stage::CacheStore,
];

#[tokio::test]
async fn test_miss_runs_every_stage_in_order() {
    let upstream = Arc::new(MockUpstream::new());
    let pipeline = steem_pipeline(upstream.clone());

    let output = pipeline.handle(single("get_accounts", json!([["alice"]]), 1), None).await;
    let output = output.unwrap();

    assert_eq!(output.context.stages(), &MISS_STAGES);
    assert_eq!(output.context.statuses(), &[CacheStatus::Miss]);
    assert_eq!(upstream.calls(), 1);
}

#[tokio::test]
async fn test_hit_skips_dispatch() {
    let upstream = Arc::new(MockUpstream::new());
    let pipeline = steem_pipeline(upstream.clone());

    pipeline.handle(single("get_accounts", json!([["alice"]]), 1), None).await.unwrap();
    let output =
        pipeline.handle(single("get_accounts", json!([["alice"]]), 2), None).await.unwrap();

    assert_eq!(output.context.stages(), &HIT_STAGES);
    assert!(output.context.is_full_hit());
    assert_eq!(upstream.calls(), 1);
}

#[tokio::test]
async fn test_invalid_envelope_stops_before_lookup() {
    let upstream = Arc::new(MockUpstream::new());
    let pipeline = steem_pipeline(upstream.clone());

    let mut bad = JsonRpcRequest::new("get_block", Some(json!([1])), Some(json!(1)));
    bad.jsonrpc = "1.0".into();

    let err = pipeline.handle(JsonRpcPayload::Single(bad), None).await.unwrap_err();
    assert!(matches!(err, PipelineError::Validation(ValidationError::InvalidVersion(_))));

    let response = err.to_response();
    assert_eq!(response.error.unwrap().code, INVALID_REQUEST);
    assert_eq!(response.id, Some(serde_json::Value::Null));
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn test_one_invalid_call_rejects_the_whole_batch() {
    let upstream = Arc::new(MockUpstream::new());
    let pipeline = steem_pipeline(upstream.clone());

    let payload = batch(vec![
        request("get_config", json!([]), 1),
        JsonRpcRequest::new("  ", None, Some(json!(2))),
    ]);

    let err = pipeline.handle(payload, None).await.unwrap_err();
    assert!(matches!(err, PipelineError::Validation(ValidationError::EmptyMethod)));
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn test_oversized_batch_is_rejected() {
    let upstream = Arc::new(MockUpstream::new());
    let pipeline = steem_pipeline(upstream.clone());
    let max = pipeline.config().max_batch_size;

    let requests = (0..=max as u64).map(|i| request("get_block", json!([i]), i)).collect();
    let err = pipeline.handle(batch(requests), None).await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Validation(ValidationError::BatchTooLarge { size, max: limit })
            if size == max + 1 && limit == max
    ));
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn test_request_ids_are_generated_or_kept() {
    let pipeline = steem_pipeline(Arc::new(MockUpstream::new()));

    let first = pipeline.handle(single("get_config", json!([]), 1), None).await.unwrap();
    let second = pipeline.handle(single("get_config", json!([]), 2), None).await.unwrap();
    assert_ne!(first.context.request_id(), second.context.request_id());

    let given = RequestId::new("from-header");
    let third = pipeline.handle(single("get_config", json!([]), 3), Some(given)).await.unwrap();
    assert_eq!(third.context.request_id().as_str(), "from-header");
}

#[tokio::test]
async fn test_upstream_envelope_is_normalized() {
    let pipeline = steem_pipeline(Arc::new(MockUpstream::new()));

    let output = pipeline.handle(single("get_accounts", json!([["bob"]]), 42), None).await;
    let response = output.unwrap().response;
    let response = response.as_single().unwrap();

    assert_eq!(response.id, Some(json!(42)));
    assert_eq!(response.jsonrpc, "2.0");
}
