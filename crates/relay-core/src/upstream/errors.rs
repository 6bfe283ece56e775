use crate::types::{INTERNAL_ERROR, UPSTREAM_ERROR, UPSTREAM_TIMEOUT};
use thiserror::Error;

/// Errors that can occur when dispatching a call to the upstream node.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UpstreamError {
    /// Dispatch exceeded the configured timeout.
    #[error("Request timeout")]
    Timeout,

    /// The node could not be reached.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The node answered with something that is not a JSON-RPC response.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// No node is configured or all are down.
    #[error("No upstream available")]
    Unavailable,
}

impl UpstreamError {
    /// JSON-RPC error code reported to the client for this failure.
    #[must_use]
    pub fn json_rpc_code(&self) -> i32 {
        match self {
            Self::Timeout => UPSTREAM_TIMEOUT,
            Self::Transport(_) | Self::Unavailable => UPSTREAM_ERROR,
            Self::InvalidResponse(_) => INTERNAL_ERROR,
        }
    }

    /// Returns `true` if retrying later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Transport(_) | Self::Unavailable)
    }
}
