//! TTL classifications and the prefix-keyed policy table.
//!
//! # Classification vs. decision
//!
//! [`Ttl`] is what a policy says about a URN. It is a closed set: never cache, cache
//! forever, cache forever once the block is irreversible, or cache for N seconds.
//! [`Ttl::cache_decision`] is the single exhaustive conversion into what storage needs
//! ([`CacheDecision`]), so sentinel values are never compared as integers anywhere else.
//!
//! # Prefix matching
//!
//! A policy prefix matches a URN when it is equal to the URN or when the URN continues
//! with the `.` separator right after it. `"steemd.database_api.get_block"` therefore
//! matches `steemd.database_api.get_block.params=[1]` but not
//! `steemd.database_api.get_block_header`. The empty prefix is the mandatory catch-all.
//!
//! ```
//! use relay_core::cache::policy::{PolicyTable, Ttl};
//!
//! let table = PolicyTable::from_entries([
//!     ("", Ttl::Seconds(3)),
//!     ("a", Ttl::Seconds(10)),
//!     ("a.b", Ttl::Seconds(60)),
//! ])
//! .unwrap();
//!
//! assert_eq!(table.ttl_for("a.b.c"), Ttl::Seconds(60));
//! assert_eq!(table.ttl_for("a.x"), Ttl::Seconds(10));
//! assert_eq!(table.ttl_for("other"), Ttl::Seconds(3));
//! ```

use crate::cache::urn::SEPARATOR;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};
use thiserror::Error;

/// TTL applied when a policy table does not override the catch-all.
pub const DEFAULT_TTL: Ttl = Ttl::Seconds(3);

/// Caching classification for a URN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "TtlRepr", into = "TtlRepr")]
pub enum Ttl {
    /// Never store.
    NoCache,
    /// Store permanently.
    NoExpire,
    /// Decide once the response is known: permanent if it only references irreversible
    /// blocks, otherwise not stored.
    NoExpireIfIrreversible,
    /// Store for this many seconds.
    Seconds(u64),
}

/// What the storage layer should do with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    /// Do not store (and a lookup is pointless).
    Skip,
    /// Store with the given expiry.
    Store(Expiry),
    /// Cannot decide before the response is available.
    Deferred,
}

/// Lifetime of a stored entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    Never,
    After(Duration),
}

impl Ttl {
    /// Converts a classification into a storage decision.
    ///
    /// `Seconds(0)` means "expire immediately" and is treated as [`CacheDecision::Skip`].
    #[must_use]
    pub fn cache_decision(self) -> CacheDecision {
        match self {
            Ttl::NoCache | Ttl::Seconds(0) => CacheDecision::Skip,
            Ttl::NoExpire => CacheDecision::Store(Expiry::Never),
            Ttl::NoExpireIfIrreversible => CacheDecision::Deferred,
            Ttl::Seconds(secs) => CacheDecision::Store(Expiry::After(Duration::from_secs(secs))),
        }
    }

    /// Whether a cache lookup can ever succeed for this classification.
    #[inline]
    #[must_use]
    pub fn is_cacheable(self) -> bool {
        !matches!(self.cache_decision(), CacheDecision::Skip)
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ttl::NoCache => write!(f, "{NO_CACHE}"),
            Ttl::NoExpire => write!(f, "{NO_EXPIRE}"),
            Ttl::NoExpireIfIrreversible => write!(f, "{NO_EXPIRE_IF_IRREVERSIBLE}"),
            Ttl::Seconds(secs) => write!(f, "{secs}s"),
        }
    }
}

const NO_CACHE: &str = "no_cache";
const NO_EXPIRE: &str = "no_expire";
const NO_EXPIRE_IF_IRREVERSIBLE: &str = "no_expire_if_irreversible";

/// Config representation: a keyword or a number of seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum TtlRepr {
    Seconds(u64),
    Keyword(String),
}

impl TryFrom<TtlRepr> for Ttl {
    type Error = PolicyError;

    fn try_from(repr: TtlRepr) -> Result<Self, Self::Error> {
        match repr {
            TtlRepr::Seconds(secs) => Ok(Ttl::Seconds(secs)),
            TtlRepr::Keyword(keyword) => keyword.parse(),
        }
    }
}

impl From<Ttl> for TtlRepr {
    fn from(ttl: Ttl) -> Self {
        match ttl {
            Ttl::Seconds(secs) => TtlRepr::Seconds(secs),
            other => TtlRepr::Keyword(other.to_string()),
        }
    }
}

impl std::str::FromStr for Ttl {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            NO_CACHE => Ok(Ttl::NoCache),
            NO_EXPIRE => Ok(Ttl::NoExpire),
            NO_EXPIRE_IF_IRREVERSIBLE => Ok(Ttl::NoExpireIfIrreversible),
            other => other
                .strip_suffix('s')
                .unwrap_or(other)
                .parse::<u64>()
                .map(Ttl::Seconds)
                .map_err(|_| PolicyError::InvalidTtl(s.to_string())),
        }
    }
}

/// Errors raised while building a policy table. All of them are configuration defects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("policy table has no catch-all (empty) prefix")]
    MissingDefault,

    #[error("duplicate policy prefix: {0:?}")]
    DuplicatePrefix(String),

    #[error("invalid policy prefix {0:?}: must not start or end with '.'")]
    InvalidPrefix(String),

    #[error("invalid ttl {0:?}: expected a keyword or a number of seconds")]
    InvalidTtl(String),
}

/// Result of a policy lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyMatch<'a> {
    /// The winning prefix (empty for the catch-all).
    pub prefix: &'a str,
    pub ttl: Ttl,
}

/// Immutable prefix → [`Ttl`] table with longest-prefix lookup.
///
/// Construction guarantees a catch-all entry and unique prefixes, so a lookup always
/// yields exactly one answer.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    catch_all: Ttl,
    entries: AHashMap<String, Ttl>,
}

impl PolicyTable {
    /// Builds a table from `(prefix, ttl)` pairs.
    ///
    /// # Errors
    ///
    /// - [`PolicyError::MissingDefault`] if no entry has the empty prefix
    /// - [`PolicyError::DuplicatePrefix`] if a prefix appears twice
    /// - [`PolicyError::InvalidPrefix`] if a prefix starts or ends with the separator
    pub fn from_entries<I, S>(entries: I) -> Result<Self, PolicyError>
    where
        I: IntoIterator<Item = (S, Ttl)>,
        S: Into<String>,
    {
        let mut catch_all = None;
        let mut map = AHashMap::new();

        for (prefix, ttl) in entries {
            let prefix = prefix.into();
            if prefix.is_empty() {
                if catch_all.replace(ttl).is_some() {
                    return Err(PolicyError::DuplicatePrefix(prefix));
                }
                continue;
            }
            if prefix.starts_with(SEPARATOR) || prefix.ends_with(SEPARATOR) {
                return Err(PolicyError::InvalidPrefix(prefix));
            }
            if map.contains_key(&prefix) {
                return Err(PolicyError::DuplicatePrefix(prefix));
            }
            map.insert(prefix, ttl);
        }

        let catch_all = catch_all.ok_or(PolicyError::MissingDefault)?;
        Ok(Self { catch_all, entries: map })
    }

    /// Finds the most specific policy for `urn`.
    #[must_use]
    pub fn longest_prefix<'a>(&'a self, urn: &str) -> PolicyMatch<'a> {
        if let Some((prefix, ttl)) = self.entries.get_key_value(urn) {
            return PolicyMatch { prefix, ttl: *ttl };
        }

        for (idx, _) in urn.rmatch_indices(SEPARATOR) {
            if let Some((prefix, ttl)) = self.entries.get_key_value(&urn[..idx]) {
                return PolicyMatch { prefix, ttl: *ttl };
            }
        }

        PolicyMatch { prefix: "", ttl: self.catch_all }
    }

    /// Shorthand for `longest_prefix(urn).ttl`.
    #[inline]
    #[must_use]
    pub fn ttl_for(&self, urn: &str) -> Ttl {
        self.longest_prefix(urn).ttl
    }

    /// Number of entries including the catch-all.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len() + 1
    }

    /// Always false: the catch-all entry is mandatory.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// All entries sorted by prefix, catch-all first.
    #[must_use]
    pub fn entries(&self) -> Vec<(&str, Ttl)> {
        let mut entries: Vec<(&str, Ttl)> =
            self.entries.iter().map(|(prefix, ttl)| (prefix.as_str(), *ttl)).collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries.insert(0, ("", self.catch_all));
        entries
    }
}

impl Default for PolicyTable {
    /// The built-in policy set for Steem-style upstreams.
    fn default() -> Self {
        let entries = DEFAULT_POLICIES
            .iter()
            .filter(|(prefix, _)| !prefix.is_empty())
            .map(|(prefix, ttl)| ((*prefix).to_string(), *ttl))
            .collect();
        Self { catch_all: DEFAULT_TTL, entries }
    }
}

/// Built-in policies. Block lookups become permanent once irreversible; broadcast and
/// login calls are never cached; chain properties change every block (3 seconds).
pub const DEFAULT_POLICIES: &[(&str, Ttl)] = &[
    ("", DEFAULT_TTL),
    // steemd
    ("steemd", DEFAULT_TTL),
    ("steemd.database_api.get_block", Ttl::NoExpireIfIrreversible),
    ("steemd.database_api.get_block_header", Ttl::NoExpireIfIrreversible),
    ("steemd.database_api.get_config", Ttl::NoExpire),
    ("steemd.database_api.get_dynamic_global_properties", Ttl::Seconds(1)),
    ("steemd.login_api", Ttl::NoCache),
    ("steemd.network_broadcast_api", Ttl::NoCache),
    ("steemd.follow_api", Ttl::Seconds(10)),
    ("steemd.market_history_api", Ttl::Seconds(1)),
    // appbase
    ("appbase", DEFAULT_TTL),
    ("appbase.block_api.get_block", Ttl::NoExpireIfIrreversible),
    ("appbase.block_api.get_block_header", Ttl::NoExpireIfIrreversible),
    ("appbase.condenser_api.get_block", Ttl::NoExpireIfIrreversible),
    ("appbase.condenser_api.get_block_header", Ttl::NoExpireIfIrreversible),
    ("appbase.condenser_api.get_config", Ttl::NoExpire),
    ("appbase.database_api.get_config", Ttl::NoExpire),
    ("appbase.condenser_api.get_dynamic_global_properties", Ttl::Seconds(1)),
    ("appbase.database_api.get_dynamic_global_properties", Ttl::Seconds(1)),
    ("appbase.condenser_api.broadcast_block", Ttl::NoCache),
    ("appbase.condenser_api.broadcast_transaction", Ttl::NoCache),
    ("appbase.condenser_api.broadcast_transaction_synchronous", Ttl::NoCache),
    ("appbase.network_broadcast_api", Ttl::NoCache),
    ("appbase.condenser_api.get_followers", Ttl::Seconds(10)),
    ("appbase.condenser_api.get_following", Ttl::Seconds(10)),
    // misc
    ("jsonrpc", Ttl::NoCache),
];
