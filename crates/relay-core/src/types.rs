//! Core type definitions for JSON-RPC envelopes and cached payloads.
//!
//! # Type Categories
//!
//! ## JSON-RPC Protocol Types
//! - [`JsonRpcRequest`], [`JsonRpcResponse`], [`JsonRpcError`]: Protocol conformance
//! - [`JsonRpcPayload`], [`JsonRpcResponsePayload`]: Single call or ordered batch
//!
//! ## Cache Types
//! - [`CachedResponse`]: The stored form of a response (`result` only, never an `id`)
//! - [`CacheStatus`]: How a single call was served
//!
//! # Presence vs. `null`
//!
//! JSON-RPC distinguishes a request whose `id` is `null` from a notification that has no
//! `id` member at all. Both `id` and `result` are therefore `Option<Value>` where `None`
//! means "member absent" and `Some(Value::Null)` means "member present with `null`".

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::borrow::Cow;

/// JSON-RPC protocol version constant to avoid repeated allocations.
pub const JSONRPC_VERSION: &str = "2.0";

/// Pre-allocated `Cow` for the JSON-RPC version.
pub const JSONRPC_VERSION_COW: Cow<'static, str> = Cow::Borrowed(JSONRPC_VERSION);

/// Invalid request envelope.
pub const INVALID_REQUEST: i32 = -32600;

/// Internal error while serving the call.
pub const INTERNAL_ERROR: i32 = -32603;

/// Server-defined: upstream did not answer in time.
pub const UPSTREAM_TIMEOUT: i32 = -32000;

/// Server-defined: upstream could not be reached or answered garbage.
pub const UPSTREAM_ERROR: i32 = -32001;

fn default_version() -> Cow<'static, str> {
    JSONRPC_VERSION_COW
}

/// Deserializes a member that is present, keeping an explicit `null` as `Some(Value::Null)`.
///
/// Combined with `#[serde(default)]` an absent member stays `None`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// JSON-RPC 2.0 request structure.
///
/// # Fields
///
/// - `jsonrpc`: Protocol version (must be "2.0", checked by envelope validation)
/// - `method`: RPC method name, e.g. `get_block` or `condenser_api.get_block`
/// - `params`: Optional positional (array) or named (object) parameters
/// - `id`: Request identifier, absent for notifications
///
/// # Example
///
/// ```
/// use relay_core::types::JsonRpcRequest;
/// use serde_json::json;
///
/// let request = JsonRpcRequest::new("get_block", Some(json!([1000])), Some(json!(1)));
/// assert_eq!(request.method, "get_block");
/// assert!(!request.is_notification());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: Cow<'static, str>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

impl JsonRpcRequest {
    /// Creates a new JSON-RPC request with zero allocation for the version string.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Option<Value>, id: Option<Value>) -> Self {
        Self { jsonrpc: JSONRPC_VERSION_COW, method: method.into(), params, id }
    }

    /// Returns true when the request carries no `id` member.
    #[inline]
    #[must_use]
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// An inbound call: either one request or an ordered batch.
///
/// Batch order is significant; responses are returned in the same positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcPayload {
    Batch(Vec<JsonRpcRequest>),
    Single(JsonRpcRequest),
}

impl JsonRpcPayload {
    /// Parses a payload from an already decoded JSON value.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] when the value is neither a request
    /// object nor an array of request objects.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    #[must_use]
    pub fn is_batch(&self) -> bool {
        matches!(self, Self::Batch(_))
    }

    /// Number of calls carried by the payload.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Batch(requests) => requests.len(),
            Self::Single(_) => 1,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Splits the payload into its requests and a flag telling whether it was a batch.
    #[must_use]
    pub fn into_requests(self) -> (Vec<JsonRpcRequest>, bool) {
        match self {
            Self::Batch(requests) => (requests, true),
            Self::Single(request) => (vec![request], false),
        }
    }
}

/// JSON-RPC 2.0 response structure.
///
/// A response contains either a `result` (success) or an `error` (failure). `result` may be
/// present with a `null` value, which is a legitimate answer (e.g. an unknown block).
///
/// # Example
///
/// ```
/// use relay_core::types::JsonRpcResponse;
/// use serde_json::json;
///
/// let response = JsonRpcResponse::success(json!({"previous": "0000006e"}), Some(json!(7)));
/// assert!(response.result.is_some());
/// assert!(response.error.is_none());
///
/// let response = JsonRpcResponse::error(-32600, "Invalid Request", None);
/// assert!(response.is_error());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default = "default_version")]
    pub jsonrpc: Cow<'static, str>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

impl JsonRpcResponse {
    /// Creates a successful JSON-RPC response.
    #[must_use]
    pub fn success(result: Value, id: Option<Value>) -> Self {
        Self { jsonrpc: JSONRPC_VERSION_COW, result: Some(result), error: None, id }
    }

    /// Creates an error JSON-RPC response.
    #[must_use]
    pub fn error(code: i32, message: impl Into<String>, id: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION_COW,
            result: None,
            error: Some(JsonRpcError { code, message: message.into(), data: None }),
            id,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Returns the `result` member unless it is absent or `null`.
    #[inline]
    #[must_use]
    pub fn non_null_result(&self) -> Option<&Value> {
        self.result.as_ref().filter(|result| !result.is_null())
    }
}

/// JSON-RPC 2.0 error object.
///
/// Standard error codes:
///
/// - `-32700`: Parse error (invalid JSON)
/// - `-32600`: Invalid request (malformed JSON-RPC)
/// - `-32601`: Method not found
/// - `-32602`: Invalid params
/// - `-32603`: Internal error
/// - `-32000` to `-32099`: Server-defined errors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Response to a [`JsonRpcPayload`], mirroring its shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JsonRpcResponsePayload {
    Batch(Vec<JsonRpcResponse>),
    Single(JsonRpcResponse),
}

impl JsonRpcResponsePayload {
    /// Returns the single response, or `None` for a batch.
    #[must_use]
    pub fn as_single(&self) -> Option<&JsonRpcResponse> {
        match self {
            Self::Single(response) => Some(response),
            Self::Batch(_) => None,
        }
    }

    /// Returns the batch responses, or `None` for a single response.
    #[must_use]
    pub fn as_batch(&self) -> Option<&[JsonRpcResponse]> {
        match self {
            Self::Batch(responses) => Some(responses),
            Self::Single(_) => None,
        }
    }
}

/// The stored form of a previously computed response.
///
/// Only the `result` is kept: ids belong to a particular request, not to the cached value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub result: Value,
}

impl CachedResponse {
    #[must_use]
    pub fn new(result: Value) -> Self {
        Self { result }
    }
}

/// Describes how a single call was served.
///
/// ```
/// use relay_core::types::CacheStatus;
///
/// assert_eq!(CacheStatus::Hit.to_string(), "HIT");
/// assert_eq!(CacheStatus::Skip.to_string(), "SKIP");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum CacheStatus {
    /// Served from cache, upstream was not contacted.
    Hit,
    /// Looked up, not found, fetched from upstream.
    Miss,
    /// Not looked up because the policy never caches this call.
    Skip,
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheStatus::Hit => write!(f, "HIT"),
            CacheStatus::Miss => write!(f, "MISS"),
            CacheStatus::Skip => write!(f, "SKIP"),
        }
    }
}
