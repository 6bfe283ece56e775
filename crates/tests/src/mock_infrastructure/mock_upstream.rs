//! Scripted [`Upstream`] with call counters.

use async_trait::async_trait;
use relay_core::{
    types::{JsonRpcRequest, JsonRpcResponse},
    upstream::{Upstream, UpstreamError},
};
use serde_json::{json, Value};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::Mutex;

type Responder =
    Arc<dyn Fn(&JsonRpcRequest) -> Result<JsonRpcResponse, UpstreamError> + Send + Sync>;

/// An upstream answering from per-method scripts.
///
/// Unscripted methods echo `{"method": ..., "params": ...}` back as the result. Responses
/// always carry the id `"upstream"` so tests can check the pipeline rewrites it.
#[derive(Default)]
pub struct MockUpstream {
    scripts: HashMap<String, Responder>,
    delays: HashMap<String, Duration>,
    calls: AtomicUsize,
    seen: Mutex<Vec<JsonRpcRequest>>,
}

impl MockUpstream {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `method` with a fixed result.
    #[must_use]
    pub fn respond(self, method: &str, result: Value) -> Self {
        self.respond_with(method, move |_| {
            Ok(JsonRpcResponse::success(result.clone(), upstream_id()))
        })
    }

    /// Answers `method` with a JSON-RPC error object from the node.
    #[must_use]
    pub fn respond_error(self, method: &str, code: i32, message: &str) -> Self {
        let message = message.to_string();
        self.respond_with(method, move |_| {
            Ok(JsonRpcResponse::error(code, message.clone(), upstream_id()))
        })
    }

    /// Fails every dispatch of `method` without producing a response.
    #[must_use]
    pub fn fail(self, method: &str, error: UpstreamError) -> Self {
        self.respond_with(method, move |_| Err(error.clone()))
    }

    /// Delays every dispatch of `method`, e.g. past the pipeline timeout.
    #[must_use]
    pub fn delay(mut self, method: &str, delay: Duration) -> Self {
        self.delays.insert(method.to_string(), delay);
        self
    }

    #[must_use]
    pub fn respond_with<F>(mut self, method: &str, responder: F) -> Self
    where
        F: Fn(&JsonRpcRequest) -> Result<JsonRpcResponse, UpstreamError> + Send + Sync + 'static,
    {
        self.scripts.insert(method.to_string(), Arc::new(responder));
        self
    }

    /// Total dispatches so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Dispatches of one method so far.
    pub async fn calls_for(&self, method: &str) -> usize {
        self.seen.lock().await.iter().filter(|req| req.method == method).count()
    }

    /// Every request dispatched, in arrival order.
    pub async fn seen(&self) -> Vec<JsonRpcRequest> {
        self.seen.lock().await.clone()
    }
}

fn upstream_id() -> Option<Value> {
    Some(json!("upstream"))
}

#[async_trait]
impl Upstream for MockUpstream {
    async fn dispatch(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().await.push(request.clone());

        if let Some(delay) = self.delays.get(&request.method) {
            tokio::time::sleep(*delay).await;
        }

        match self.scripts.get(&request.method) {
            Some(responder) => responder(request),
            None => Ok(JsonRpcResponse::success(
                json!({"method": request.method, "params": request.params}),
                upstream_id(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_and_echo_responses() {
        let upstream = MockUpstream::new()
            .respond("get_config", json!({"STEEM_CHAIN_ID": "0000"}))
            .fail("get_block", UpstreamError::Unavailable);

        let config = JsonRpcRequest::new("get_config", None, Some(json!(1)));
        let response = upstream.dispatch(&config).await.unwrap();
        assert_eq!(response.result, Some(json!({"STEEM_CHAIN_ID": "0000"})));

        let block = JsonRpcRequest::new("get_block", Some(json!([1])), Some(json!(2)));
        assert_eq!(upstream.dispatch(&block).await.unwrap_err(), UpstreamError::Unavailable);

        let other = JsonRpcRequest::new("get_accounts", Some(json!([["a"]])), Some(json!(3)));
        let response = upstream.dispatch(&other).await.unwrap();
        assert_eq!(response.result.unwrap()["method"], "get_accounts");

        assert_eq!(upstream.calls(), 3);
        assert_eq!(upstream.calls_for("get_block").await, 1);
    }
}
