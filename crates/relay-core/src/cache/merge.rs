//! Rebuilds live JSON-RPC responses from cached results.
//!
//! Cached entries never carry an id; the id of the request being answered is attached
//! here, and omitted entirely for notifications.

use crate::types::{CachedResponse, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION_COW};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("batch has {requests} requests but {cached} cache entries")]
    LengthMismatch { requests: usize, cached: usize },
}

/// Builds the response to `request` from a cached entry, or `None` on a miss.
///
/// ```
/// use relay_core::{
///     cache::merge::merge_cached_response,
///     types::{CachedResponse, JsonRpcRequest},
/// };
/// use serde_json::json;
///
/// let request = JsonRpcRequest::new("get_block", Some(json!([1])), Some(json!(7)));
/// let cached = CachedResponse::new(json!({"x": 1}));
/// let response = merge_cached_response(&request, Some(&cached)).unwrap();
/// assert_eq!(response.id, Some(json!(7)));
/// assert_eq!(response.result, Some(json!({"x": 1})));
/// ```
#[must_use]
pub fn merge_cached_response(
    request: &JsonRpcRequest,
    cached: Option<&CachedResponse>,
) -> Option<JsonRpcResponse> {
    let cached = cached?;
    Some(JsonRpcResponse {
        jsonrpc: JSONRPC_VERSION_COW,
        result: Some(cached.result.clone()),
        error: None,
        id: request.id.clone(),
    })
}

/// Positional version of [`merge_cached_response`] for batches.
///
/// # Errors
///
/// [`MergeError::LengthMismatch`] when the slices differ in length.
pub fn merge_cached_responses(
    requests: &[JsonRpcRequest],
    cached: &[Option<CachedResponse>],
) -> Result<Vec<Option<JsonRpcResponse>>, MergeError> {
    if requests.len() != cached.len() {
        return Err(MergeError::LengthMismatch { requests: requests.len(), cached: cached.len() });
    }

    Ok(requests
        .iter()
        .zip(cached)
        .map(|(request, entry)| merge_cached_response(request, entry.as_ref()))
        .collect())
}
