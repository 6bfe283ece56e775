//! Request pipeline for JSON-RPC validation, cache lookup, dispatch and cache writes.
//!
//! # Architecture
//!
//! The pipeline processes each payload in a strict order:
//!
//! ```text
//!   Incoming Payload
//!        │
//!        ▼
//!   ┌─────────────────────────┐
//!   │  1. ASSIGN REQUEST ID   │  RequestId::generate() unless the caller supplied one
//!   └─────────────────────────┘
//!        │
//!        ▼
//!   ┌─────────────────────────┐
//!   │  2. VALIDATION          │  JsonRpcPayload::validate()
//!   │     - JSON-RPC 2.0      │  - Version check
//!   │     - Method present    │  - params array/object
//!   │     - Batch limits      │  - id string/number/null
//!   └─────────────────────────┘
//!        │ ValidationError?
//!        ├─> JSON-RPC -32600 (Invalid Request), whole payload rejected
//!        │
//!        ▼
//!   ┌─────────────────────────┐
//!   │  3. CACHE LOOKUP        │  URN per call, policy lookup, CacheStore::get_many()
//!   │     - NoCache: SKIP     │  - hits merged with the caller's ids
//!   └─────────────────────────┘
//!        │ all hit? ──────────────────────────┐
//!        ▼                                    │
//!   ┌─────────────────────────┐               │
//!   │  4. DISPATCH            │  misses only, concurrently, bounded by timeout
//!   └─────────────────────────┘               │
//!        │                                    │
//!        ▼                                    │
//!   ┌─────────────────────────┐ ◄─────────────┘
//!   │  5. FINALIZE RESPONSE   │  jsonrpc = "2.0", id restored, finality feed
//!   └─────────────────────────┘
//!        │
//!        ▼
//!   ┌─────────────────────────┐
//!   │  6. CACHE STORE         │  successful non-null results with a Store decision
//!   └─────────────────────────┘
//!        │
//!        ▼
//!   Response (single or batch, original order)
//! ```
//!
//! # Module Organization
//!
//! - **[`validation`]**: Envelope validation
//! - **[`request_id`]**: Correlation ids
//! - **[`context`]**: [`Stage`] and the per-payload [`RequestContext`]
//! - **[`pipeline`]**: [`CachePipeline`]

pub mod context;
pub mod pipeline;
pub mod request_id;
pub mod validation;

pub use context::{RequestContext, Stage};
pub use pipeline::{CachePipeline, PipelineConfig, PipelineError, PipelineOutput};
pub use request_id::RequestId;
pub use validation::ValidationError;
