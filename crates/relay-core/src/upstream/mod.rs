//! The upstream node the cache sits in front of.
//!
//! Transport, routing and node selection live outside this crate. The pipeline only
//! needs something that turns one request into one response, expressed by [`Upstream`].

pub mod errors;

pub use errors::UpstreamError;

use crate::types::{JsonRpcRequest, JsonRpcResponse};
use async_trait::async_trait;

/// Dispatches single JSON-RPC calls to a node.
///
/// Batches are split by the pipeline; implementations only ever see single requests,
/// and only for calls that missed the cache.
#[async_trait]
pub trait Upstream: Send + Sync + 'static {
    /// Sends `request` and returns the node's response.
    ///
    /// A JSON-RPC error returned by the node is a successful dispatch (`Ok` with
    /// `error` set); `Err` is reserved for failures to obtain any response.
    async fn dispatch(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, UpstreamError>;
}
