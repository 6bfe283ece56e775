//! Decides whether a block-referencing response may be cached forever.
//!
//! A block is irreversible once its number is at or below the chain's last irreversible
//! block (LIB). Responses that reference such a block can never change, so a
//! [`Ttl::NoExpireIfIrreversible`] policy resolves to [`Ttl::NoExpire`] for them and to
//! [`Ttl::NoCache`] for everything else, including responses whose block number cannot
//! be determined.
//!
//! The block number is recovered from the response with an ordered list of
//! [`BlockNumberSource`] strategies. Block ids encode the block number in their first
//! four bytes (eight hex characters, big-endian).

use crate::{cache::policy::Ttl, types::JsonRpcResponse};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Why a block number could not be recovered from a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("response has no result object")]
    MissingResult,

    #[error("result has no `{0}` field")]
    Missing(&'static str),

    #[error("`{0}` is not a string")]
    NotAString(&'static str),

    #[error("block id too short: {0} characters, need 8")]
    TooShort(usize),

    #[error("block id prefix is not hex: {0:?}")]
    InvalidHex(String),
}

/// Number of leading hex characters holding the block number.
const BLOCK_NUM_HEX_LEN: usize = 8;

/// A way to derive a block number from a response `result`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockNumberSource {
    /// `result.block_id` encodes the block's own number.
    BlockId,
    /// `result.previous` encodes the parent's number; the block is one higher.
    Previous,
}

impl BlockNumberSource {
    /// Strategies in the order they are tried.
    pub const ORDER: [BlockNumberSource; 2] =
        [BlockNumberSource::BlockId, BlockNumberSource::Previous];

    #[must_use]
    pub const fn field(self) -> &'static str {
        match self {
            BlockNumberSource::BlockId => "block_id",
            BlockNumberSource::Previous => "previous",
        }
    }

    /// Extracts a block number from a response `result` value.
    ///
    /// # Errors
    ///
    /// Returns an [`ExtractError`] when the field is absent, not a string, or does not
    /// start with eight hex characters.
    pub fn extract(self, result: &Value) -> Result<u64, ExtractError> {
        let field = self.field();
        let raw = result.get(field).ok_or(ExtractError::Missing(field))?;
        let id = raw.as_str().ok_or(ExtractError::NotAString(field))?;
        let num = block_num_from_id(id)?;
        Ok(match self {
            BlockNumberSource::BlockId => num,
            BlockNumberSource::Previous => num + 1,
        })
    }
}

/// Decodes the block number held in the first eight hex characters of a block id.
///
/// ```
/// use relay_core::cache::irreversible::block_num_from_id;
///
/// assert_eq!(block_num_from_id("0000006f3a9b1f0e2c").unwrap(), 111);
/// assert!(block_num_from_id("00006f").is_err());
/// ```
///
/// # Errors
///
/// [`ExtractError::TooShort`] or [`ExtractError::InvalidHex`].
pub fn block_num_from_id(id: &str) -> Result<u64, ExtractError> {
    let prefix = id.get(..BLOCK_NUM_HEX_LEN).ok_or_else(|| {
        // `get` also fails on a char boundary inside the first 8 bytes
        if id.len() < BLOCK_NUM_HEX_LEN {
            ExtractError::TooShort(id.chars().count())
        } else {
            ExtractError::InvalidHex(id.chars().take(BLOCK_NUM_HEX_LEN).collect())
        }
    })?;

    let mut bytes = [0u8; 4];
    hex::decode_to_slice(prefix, &mut bytes)
        .map_err(|_| ExtractError::InvalidHex(prefix.to_string()))?;
    Ok(u64::from(u32::from_be_bytes(bytes)))
}

/// Finds the block a response refers to, trying each [`BlockNumberSource`] in order.
///
/// # Errors
///
/// [`ExtractError::MissingResult`] when there is no result object, otherwise the error of
/// the last strategy tried.
pub fn block_num_from_response(response: &JsonRpcResponse) -> Result<u64, ExtractError> {
    let result = response.non_null_result().ok_or(ExtractError::MissingResult)?;
    if !result.is_object() {
        return Err(ExtractError::MissingResult);
    }

    let mut last_err = ExtractError::MissingResult;
    for source in BlockNumberSource::ORDER {
        match source.extract(result) {
            Ok(num) => return Ok(num),
            Err(err) => {
                debug!(source = source.field(), error = %err, "block number source failed");
                last_err = err;
            }
        }
    }
    Err(last_err)
}

/// Classifies a response for a [`Ttl::NoExpireIfIrreversible`] policy.
///
/// Returns [`Ttl::NoExpire`] when the referenced block is at or below
/// `last_irreversible_block_num`, otherwise [`Ttl::NoCache`]. A missing response, an
/// unknown LIB (0), or an unreadable block number all yield [`Ttl::NoCache`].
#[must_use]
pub fn classify(response: Option<&JsonRpcResponse>, last_irreversible_block_num: u64) -> Ttl {
    let Some(response) = response else {
        return Ttl::NoCache;
    };
    if last_irreversible_block_num == 0 {
        debug!("last irreversible block unknown, not caching");
        return Ttl::NoCache;
    }

    match block_num_from_response(response) {
        Ok(block_num) if block_num <= last_irreversible_block_num => {
            debug!(block_num, lib = last_irreversible_block_num, "block is irreversible");
            Ttl::NoExpire
        }
        Ok(block_num) => {
            debug!(block_num, lib = last_irreversible_block_num, "block is reversible");
            Ttl::NoCache
        }
        Err(error) => {
            debug!(%error, "could not determine block number, not caching");
            Ttl::NoCache
        }
    }
}
