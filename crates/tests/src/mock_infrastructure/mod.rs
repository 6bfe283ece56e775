//! Reusable mocks for exercising the pipeline without a node.
//!
//! ```ignore
//! use tests::mock_infrastructure::{block_result, steem_pipeline, MockUpstream};
//!
//! let upstream = Arc::new(MockUpstream::new().respond("get_block", block_result(100)));
//! let pipeline = steem_pipeline(upstream.clone());
//! ```

pub mod mock_upstream;

pub use mock_upstream::MockUpstream;
pub use test_helpers::*;
