//! # Relay Core
//!
//! Caching decision core for a JSON-RPC reverse proxy in front of Steem-style
//! blockchain nodes.
//!
//! - **[`cache`]**: request URNs, the prefix → TTL policy table, irreversibility checks,
//!   cached response merging, and the cache backends.
//!
//! - **[`middleware`]**: envelope validation and the [`CachePipeline`] that runs every
//!   payload through lookup, dispatch and store.
//!
//! - **[`chain`]**: last irreversible block tracking fed by upstream responses.
//!
//! - **[`upstream`]**: the [`Upstream`] seam the pipeline dispatches misses through.
//!
//! - **[`metrics`]**: counters and gauges via the `metrics` facade.
//!
//! - **[`config`]**: layered TOML + environment configuration.
//!
//! ## Request Flow
//!
//! ```text
//! Client Payload
//!       │
//!       ▼
//! ┌─────────────┐
//! │  Validation │ ─── Invalid ──► Error Response
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ URN + TTL   │ ─── no_cache ──► Skip lookup
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ Cache Check │ ─── All hit ──► Merged Response
//! └──────┬──────┘
//!        │ Misses
//!        ▼
//! ┌─────────────┐
//! │  Upstream   │
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │  Finalize   │ ─── get_dynamic_global_properties ──► FinalityTracker
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ Cache Store │ ─── null / error / no_cache ──► Not stored
//! └──────┬──────┘
//!        │
//!        ▼
//!   Response to Client
//! ```
//!
//! [`CachePipeline`]: middleware::CachePipeline
//! [`Upstream`]: upstream::Upstream

pub mod cache;
pub mod chain;
pub mod config;
pub mod metrics;
pub mod middleware;
pub mod types;
pub mod upstream;
pub mod utils;
