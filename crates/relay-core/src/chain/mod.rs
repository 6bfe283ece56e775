//! Chain finality state.
//!
//! Provides [`FinalityTracker`], the single shared source of the last irreversible block
//! number used by the irreversibility check.
//!
//! # Shared Ownership Pattern
//!
//! ```text
//!                 ┌──────────────────┐
//!                 │ FinalityTracker  │
//!                 │ (Arc<AtomicU64>) │
//!                 └────────┬─────────┘
//!           ┌──────────────┴──────────────┐
//!           ▼                             ▼
//!   ┌───────────────┐             ┌───────────────┐
//!   │ CachePipeline │             │ external feed │
//!   │ reads LIB,    │             │ (block stream,│
//!   │ advances from │             │  health check)│
//!   │ global props  │             │ advances LIB  │
//!   └───────────────┘             └───────────────┘
//! ```
//!
//! One tracker per upstream chain. Clones share state; do not create a second tracker for
//! the same chain or components will disagree on finality.

pub mod state;

pub use state::{last_irreversible_from_response, FinalityTracker};
