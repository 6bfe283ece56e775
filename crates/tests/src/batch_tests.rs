//! Batch handling: positional reassembly, partial hits and mixed policies.

use crate::mock_infrastructure::{batch, request, single, steem_pipeline, MockUpstream};
use futures::future::join_all;
use relay_core::{
    middleware::Stage,
    types::{CacheStatus, JsonRpcRequest},
};
use serde_json::{json, Value};
use std::sync::Arc;

fn ids(response: &[relay_core::types::JsonRpcResponse]) -> Vec<Option<Value>> {
    response.iter().map(|r| r.id.clone()).collect()
}

#[tokio::test]
async fn test_batch_order_and_ids_are_preserved() {
    let upstream = Arc::new(MockUpstream::new());
    let pipeline = steem_pipeline(upstream.clone());

    let payload = batch(vec![
        request("get_accounts", json!([["a"]]), 10),
        request("get_accounts", json!([["b"]]), 11),
        request("get_accounts", json!([["c"]]), 12),
    ]);
    let output = pipeline.handle(payload, None).await.unwrap();
    let responses = output.response.as_batch().unwrap();

    assert_eq!(ids(responses), vec![Some(json!(10)), Some(json!(11)), Some(json!(12))]);
    for (response, name) in responses.iter().zip(["a", "b", "c"]) {
        assert_eq!(response.result.as_ref().unwrap()["params"], json!([[name]]));
    }
}

#[tokio::test]
async fn test_full_batch_hit_never_dispatches() {
    let upstream = Arc::new(MockUpstream::new());
    let pipeline = steem_pipeline(upstream.clone());

    let calls =
        || vec![request("get_accounts", json!([["a"]]), 1), request("get_config", json!([]), 2)];

    pipeline.handle(batch(calls()), None).await.unwrap();
    assert_eq!(upstream.calls(), 2);

    let output = pipeline.handle(batch(calls()), None).await.unwrap();
    assert_eq!(output.context.statuses(), &[CacheStatus::Hit, CacheStatus::Hit]);
    assert!(!output.context.stages().contains(&Stage::Dispatch));
    assert_eq!(upstream.calls(), 2);
    assert_eq!(output.response.as_batch().unwrap().len(), 2);
}

#[tokio::test]
async fn test_partial_hit_dispatches_only_misses() {
    let upstream = Arc::new(MockUpstream::new());
    let pipeline = steem_pipeline(upstream.clone());

    pipeline.handle(single("get_accounts", json!([["cached"]]), 1), None).await.unwrap();
    assert_eq!(upstream.calls(), 1);

    let payload = batch(vec![
        request("get_accounts", json!([["fresh-1"]]), 1),
        request("get_accounts", json!([["cached"]]), 2),
        request("get_accounts", json!([["fresh-2"]]), 3),
    ]);
    let output = pipeline.handle(payload, None).await.unwrap();

    assert_eq!(
        output.context.statuses(),
        &[CacheStatus::Miss, CacheStatus::Hit, CacheStatus::Miss]
    );
    assert_eq!(upstream.calls(), 3);

    let dispatched: Vec<Value> =
        upstream.seen().await.into_iter().skip(1).filter_map(|r| r.params).collect();
    assert!(dispatched.contains(&json!([["fresh-1"]])));
    assert!(dispatched.contains(&json!([["fresh-2"]])));
    assert!(!dispatched.contains(&json!([["cached"]])));

    let responses = output.response.as_batch().unwrap();
    assert_eq!(ids(responses), vec![Some(json!(1)), Some(json!(2)), Some(json!(3))]);
    assert_eq!(responses[1].result.as_ref().unwrap()["params"], json!([["cached"]]));
}

#[tokio::test]
async fn test_mixed_policies_in_one_batch() {
    let upstream = Arc::new(MockUpstream::new());
    let pipeline = steem_pipeline(upstream.clone());

    let calls = || {
        vec![
            request("get_config", json!([]), 1),
            request("network_broadcast_api.broadcast_transaction", json!([{}]), 2),
        ]
    };

    pipeline.handle(batch(calls()), None).await.unwrap();
    let output = pipeline.handle(batch(calls()), None).await.unwrap();

    assert_eq!(output.context.statuses(), &[CacheStatus::Hit, CacheStatus::Skip]);
    assert_eq!(upstream.calls_for("get_config").await, 1);
    assert_eq!(upstream.calls_for("network_broadcast_api.broadcast_transaction").await, 2);
}

#[tokio::test]
async fn test_single_element_batch_stays_a_batch() {
    let pipeline = steem_pipeline(Arc::new(MockUpstream::new()));

    let output = pipeline.handle(batch(vec![request("get_config", json!([]), 1)]), None).await;
    let output = output.unwrap();
    assert!(output.response.as_single().is_none());
    assert_eq!(output.response.as_batch().unwrap().len(), 1);
}

#[tokio::test]
async fn test_cached_notification_has_no_id() {
    let upstream = Arc::new(MockUpstream::new());
    let pipeline = steem_pipeline(upstream.clone());

    pipeline.handle(single("get_config", json!([]), 1), None).await.unwrap();

    let notification = JsonRpcRequest::new("get_config", Some(json!([])), None);
    let output = pipeline.handle(batch(vec![notification]), None).await.unwrap();

    let response = &output.response.as_batch().unwrap()[0];
    assert_eq!(output.context.statuses(), &[CacheStatus::Hit]);
    assert!(response.id.is_none());
    assert_eq!(upstream.calls(), 1);
}

#[tokio::test]
async fn test_duplicate_calls_in_one_batch_are_all_answered() {
    let upstream = Arc::new(MockUpstream::new());
    let pipeline = steem_pipeline(upstream.clone());

    let payload = batch(vec![
        request("get_accounts", json!([["dup"]]), 1),
        request("get_accounts", json!([["dup"]]), 2),
    ]);
    let output = pipeline.handle(payload, None).await.unwrap();
    let responses = output.response.as_batch().unwrap();

    assert_eq!(ids(responses), vec![Some(json!(1)), Some(json!(2))]);
    assert_eq!(responses[0].result, responses[1].result);

    let again = pipeline.handle(single("get_accounts", json!([["dup"]]), 3), None).await;
    assert_eq!(again.unwrap().context.statuses(), &[CacheStatus::Hit]);
}

#[tokio::test]
async fn test_concurrent_payloads_get_their_own_responses() {
    let upstream = Arc::new(MockUpstream::new());
    let pipeline = steem_pipeline(upstream.clone());

    let payloads = (0..8u64).map(|n| {
        batch(vec![
            request("get_accounts", json!([[format!("user-{n}")]]), n),
            request("get_config", json!([]), 100 + n),
        ])
    });
    let outputs = join_all(payloads.map(|payload| pipeline.handle(payload, None))).await;

    for (n, output) in outputs.into_iter().enumerate() {
        let output = output.unwrap();
        let responses = output.response.as_batch().unwrap();
        let n = n as u64;
        assert_eq!(ids(responses), vec![Some(json!(n)), Some(json!(100 + n))]);
        assert_eq!(
            responses[0].result.as_ref().unwrap()["params"],
            json!([[format!("user-{n}")]])
        );
    }
    assert_eq!(upstream.calls_for("get_accounts").await, 8);
}
