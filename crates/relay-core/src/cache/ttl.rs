//! Resolves the caching classification of a request, consulting the response when the
//! policy depends on block irreversibility.

use crate::{
    cache::{
        irreversible,
        policy::{PolicyTable, Ttl},
        urn::{urn, Urn},
    },
    types::{JsonRpcRequest, JsonRpcResponse},
};
use arc_swap::ArcSwap;
use std::sync::Arc;
use tracing::{debug, info};

/// Policy lookup front-end shared by all request tasks.
///
/// The table is held behind an [`ArcSwap`]; [`TtlResolver::reload`] swaps the whole table
/// atomically, so a lookup sees either the old or the new table, never a mix.
#[derive(Debug, Clone)]
pub struct TtlResolver {
    policies: Arc<ArcSwap<PolicyTable>>,
}

impl TtlResolver {
    #[must_use]
    pub fn new(table: PolicyTable) -> Self {
        Self { policies: Arc::new(ArcSwap::from_pointee(table)) }
    }

    /// Replaces the active policy table.
    pub fn reload(&self, table: PolicyTable) {
        info!(entries = table.len(), "reloading cache policy table");
        self.policies.store(Arc::new(table));
    }

    /// Snapshot of the active policy table.
    #[must_use]
    pub fn policies(&self) -> Arc<PolicyTable> {
        self.policies.load_full()
    }

    /// Policy classification of a URN, before any response is known.
    #[must_use]
    pub fn ttl_from_urn(&self, urn: &str) -> Ttl {
        self.policies.load().ttl_for(urn)
    }

    /// Classification of `request`.
    ///
    /// [`Ttl::NoExpireIfIrreversible`] is only resolved when `response` is given; without
    /// it the classification stays deferred.
    #[must_use]
    pub fn ttl_from_request(
        &self,
        request: &JsonRpcRequest,
        last_irreversible_block_num: u64,
        response: Option<&JsonRpcResponse>,
    ) -> Ttl {
        self.ttl_for(&urn(request), last_irreversible_block_num, response)
    }

    /// Same as [`TtlResolver::ttl_from_request`] for an already computed URN.
    #[must_use]
    pub fn ttl_for(
        &self,
        urn: &Urn,
        last_irreversible_block_num: u64,
        response: Option<&JsonRpcResponse>,
    ) -> Ttl {
        let table = self.policies.load();
        let matched = table.longest_prefix(urn.as_str());

        let ttl = match (matched.ttl, response) {
            (Ttl::NoExpireIfIrreversible, Some(response)) => {
                irreversible::classify(Some(response), last_irreversible_block_num)
            }
            (ttl, _) => ttl,
        };

        debug!(
            urn = %urn,
            prefix = matched.prefix,
            policy = %matched.ttl,
            ttl = %ttl,
            "resolved ttl"
        );
        ttl
    }
}

impl Default for TtlResolver {
    fn default() -> Self {
        Self::new(PolicyTable::default())
    }
}
