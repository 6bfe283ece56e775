use crate::types::{JsonRpcPayload, JsonRpcRequest, JSONRPC_VERSION};
use serde_json::Value;

impl JsonRpcRequest {
    /// Validates the JSON-RPC 2.0 envelope of a single request.
    ///
    /// Only the envelope is checked; method names are not restricted because unknown
    /// methods are the upstream's business.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::InvalidVersion`] if `jsonrpc` is not `"2.0"`
    /// - [`ValidationError::EmptyMethod`] if `method` is empty or blank
    /// - [`ValidationError::InvalidParams`] if `params` is present but not an array or object
    /// - [`ValidationError::InvalidId`] if `id` is present but not a string, number or null
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.jsonrpc != JSONRPC_VERSION {
            return Err(ValidationError::InvalidVersion(self.jsonrpc.to_string()));
        }

        if self.method.trim().is_empty() {
            return Err(ValidationError::EmptyMethod);
        }

        if let Some(params) = &self.params {
            if !matches!(params, Value::Array(_) | Value::Object(_)) {
                return Err(ValidationError::InvalidParams(json_type_name(params)));
            }
        }

        if let Some(id) = &self.id {
            if !matches!(id, Value::String(_) | Value::Number(_) | Value::Null) {
                return Err(ValidationError::InvalidId(json_type_name(id)));
            }
        }

        Ok(())
    }
}

impl JsonRpcPayload {
    /// Validates the payload shape and every request in it.
    ///
    /// The first failing request rejects the whole payload.
    ///
    /// # Errors
    ///
    /// [`ValidationError::EmptyBatch`], [`ValidationError::BatchTooLarge`] or the first
    /// per-request error.
    pub fn validate(&self, max_batch_size: usize) -> Result<(), ValidationError> {
        match self {
            Self::Single(request) => request.validate(),
            Self::Batch(requests) => {
                if requests.is_empty() {
                    return Err(ValidationError::EmptyBatch);
                }
                if requests.len() > max_batch_size {
                    return Err(ValidationError::BatchTooLarge {
                        size: requests.len(),
                        max: max_batch_size,
                    });
                }
                requests.iter().try_for_each(JsonRpcRequest::validate)
            }
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Errors that occur during JSON-RPC envelope validation.
///
/// All of them are reported to the client as `-32600 Invalid Request`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// JSON-RPC version is not "2.0".
    #[error("Invalid JSON-RPC version: {0}")]
    InvalidVersion(String),

    #[error("Method name is empty")]
    EmptyMethod,

    /// `params` must be an array or an object.
    #[error("Invalid params type: {0}")]
    InvalidParams(&'static str),

    /// `id` must be a string, a number or null.
    #[error("Invalid id type: {0}")]
    InvalidId(&'static str),

    #[error("Empty batch")]
    EmptyBatch,

    #[error("Batch too large: {size} requests, limit is {max}")]
    BatchTooLarge { size: usize, max: usize },
}
