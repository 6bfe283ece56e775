//! Upstream failures, timeouts and responses that must never reach the cache.

use crate::mock_infrastructure::{
    batch, pipeline_with, request, single, steem_pipeline, MockUpstream,
};
use relay_core::{
    cache::policy::PolicyTable,
    middleware::PipelineConfig,
    types::{CacheStatus, UPSTREAM_ERROR, UPSTREAM_TIMEOUT},
    upstream::UpstreamError,
};
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};

#[tokio::test]
async fn test_transport_failure_becomes_error_entry() {
    let upstream = Arc::new(
        MockUpstream::new()
            .fail("get_accounts", UpstreamError::Transport("connection reset".to_string())),
    );
    let pipeline = steem_pipeline(upstream);

    let output = pipeline.handle(single("get_accounts", json!([["a"]]), 9), None).await.unwrap();
    let response = output.response.as_single().unwrap();
    let error = response.error.as_ref().unwrap();

    assert_eq!(error.code, UPSTREAM_ERROR);
    assert!(error.message.contains("connection reset"));
    assert_eq!(response.id, Some(json!(9)));
    assert!(response.result.is_none());
    assert_eq!(pipeline.metrics().summary().upstream_errors, 1);
}

#[tokio::test]
async fn test_failure_in_batch_affects_only_that_call() {
    let upstream =
        Arc::new(MockUpstream::new().fail("get_block", UpstreamError::Unavailable));
    let pipeline = steem_pipeline(upstream);

    let payload = batch(vec![
        request("get_accounts", json!([["a"]]), 1),
        request("get_block", json!([5]), 2),
        request("get_config", json!([]), 3),
    ]);
    let output = pipeline.handle(payload, None).await.unwrap();
    let responses = output.response.as_batch().unwrap();

    assert_eq!(responses.len(), 3);
    assert!(responses[0].result.is_some());
    assert_eq!(responses[1].error.as_ref().unwrap().code, UPSTREAM_ERROR);
    assert_eq!(responses[1].id, Some(json!(2)));
    assert!(responses[2].result.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_slow_upstream_times_out() {
    let upstream =
        Arc::new(MockUpstream::new().delay("get_accounts", Duration::from_secs(120)));
    let config =
        PipelineConfig { upstream_timeout: Duration::from_secs(5), ..PipelineConfig::default() };
    let pipeline = pipeline_with(upstream, PolicyTable::default(), config);

    let output = pipeline.handle(single("get_accounts", json!([["a"]]), 1), None).await.unwrap();
    let response = output.response.as_single().unwrap();

    assert_eq!(response.error.as_ref().unwrap().code, UPSTREAM_TIMEOUT);
    assert_eq!(pipeline.metrics().summary().upstream_timeouts, 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_in_batch_does_not_hold_back_fast_calls() {
    let upstream = Arc::new(MockUpstream::new().delay("get_block", Duration::from_secs(120)));
    let config =
        PipelineConfig { upstream_timeout: Duration::from_secs(5), ..PipelineConfig::default() };
    let pipeline = pipeline_with(upstream, PolicyTable::default(), config);

    let payload =
        batch(vec![request("get_block", json!([1]), 1), request("get_config", json!([]), 2)]);
    let output = pipeline.handle(payload, None).await.unwrap();
    let responses = output.response.as_batch().unwrap();

    assert_eq!(responses[0].error.as_ref().unwrap().code, UPSTREAM_TIMEOUT);
    assert!(responses[1].result.is_some());
}

#[tokio::test]
async fn test_failed_calls_are_retried_not_cached() {
    let upstream = Arc::new(MockUpstream::new().fail("get_config", UpstreamError::Unavailable));
    let pipeline = steem_pipeline(upstream.clone());

    for id in 0..3 {
        let output = pipeline.handle(single("get_config", json!([]), id), None).await.unwrap();
        assert_eq!(output.context.statuses(), &[CacheStatus::Miss]);
    }
    assert_eq!(upstream.calls(), 3);
}

#[tokio::test]
async fn test_node_error_responses_are_not_cached() {
    let upstream =
        Arc::new(MockUpstream::new().respond_error("get_config", -32003, "assert exception"));
    let pipeline = steem_pipeline(upstream.clone());

    for id in 0..2 {
        let output = pipeline.handle(single("get_config", json!([]), id), None).await.unwrap();
        let response = output.response.as_single().unwrap();
        assert_eq!(response.error.as_ref().unwrap().code, -32003);
        assert_eq!(response.id, Some(json!(id)));
    }
    assert_eq!(upstream.calls(), 2);
    assert_eq!(pipeline.metrics().summary().cache_writes, 0);
}

#[tokio::test]
async fn test_null_results_are_not_cached() {
    let upstream = Arc::new(MockUpstream::new().respond("get_config", Value::Null));
    let pipeline = steem_pipeline(upstream.clone());

    for id in 0..2 {
        let output = pipeline.handle(single("get_config", json!([]), id), None).await.unwrap();
        assert_eq!(output.response.as_single().unwrap().result, Some(Value::Null));
    }
    assert_eq!(upstream.calls(), 2);
}

#[tokio::test]
async fn test_disabled_cache_passes_everything_through() {
    let upstream = Arc::new(MockUpstream::new());
    let config = PipelineConfig { cache_enabled: false, ..PipelineConfig::default() };
    let pipeline = pipeline_with(upstream.clone(), PolicyTable::default(), config);

    for id in 0..3 {
        let output = pipeline.handle(single("get_config", json!([]), id), None).await.unwrap();
        assert_eq!(output.context.statuses(), &[CacheStatus::Skip]);
    }
    assert_eq!(upstream.calls(), 3);
}
