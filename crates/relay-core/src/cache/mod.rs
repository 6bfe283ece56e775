//! Caching decisions for JSON-RPC calls.
//!
//! # Architecture
//!
//! ```text
//!  JsonRpcRequest ──► urn ──► PolicyTable (longest prefix) ──► Ttl
//!                                                               │
//!                     JsonRpcResponse ──► irreversible::classify┘ (NoExpireIfIrreversible only)
//!                                                               │
//!                                       Ttl::cache_decision ◄───┘
//!                                        Skip │ Store(Expiry) │ Deferred
//! ```
//!
//! - [`urn`]: canonical request identity, used both as cache key and policy lookup input
//! - [`policy`]: the [`Ttl`] classification, [`CacheDecision`] and the [`PolicyTable`]
//! - [`ttl`]: [`TtlResolver`], the hot-reloadable front-end over the policy table
//! - [`irreversible`]: block-number extraction and the last-irreversible-block check
//! - [`merge`]: rebuilding live responses from cached results
//! - [`store`], [`memory`], [`group`]: the [`CacheStore`] abstraction and its backends
//!
//! # Error Handling Conventions
//!
//! - **`Option<T>`**: cache miss (expected, not an error)
//! - **`Result<T, PolicyError>`**: configuration defects, surfaced at startup
//! - **`Result<u64, ExtractError>`**: block-number extraction; the caller downgrades any
//!   error to "do not cache" and never propagates it
//! - **`Result<_, CacheError>`**: backend failures; the pipeline logs them and treats
//!   reads as misses

pub mod group;
pub mod irreversible;
pub mod memory;
pub mod merge;
pub mod policy;
pub mod store;
pub mod ttl;
pub mod urn;

pub use group::CacheGroup;
pub use irreversible::{classify, BlockNumberSource, ExtractError};
pub use memory::MemoryCache;
pub use merge::{merge_cached_response, merge_cached_responses, MergeError};
pub use policy::{CacheDecision, Expiry, PolicyError, PolicyMatch, PolicyTable, Ttl, DEFAULT_TTL};
pub use store::{CacheError, CacheStore};
pub use ttl::TtlResolver;
pub use urn::{urn, Urn};
