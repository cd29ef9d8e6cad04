//! Signature share handling.
//!
//! This module contains:
//! - `types`: Share, scheme and result types
//! - `normalizer`: Canonical form for node-reported shares
//! - `ecdsa`: Threshold ECDSA combination (secp256k1)
//! - `frost`: FROST aggregation (secp256k1, ed25519)
//! - `combiner`: Quorum selection, drop-and-retry, executeJs assembly
//! - `response`: Inline `{r, s, v}` signatures in executeJs responses
//! - `strategy`: Response strategies for executeJs

pub mod combiner;
pub mod ecdsa;
pub mod frost;
pub(crate) mod macros;
pub mod normalizer;
pub mod response;
pub mod strategy;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use combiner::{ExecuteJsNodeValue, ExecuteJsOutcome, ShareCombiner};
pub use normalizer::{normalize, normalize_value};
pub use strategy::{ResponseStrategy, StrategyKind};
pub use types::{ClaimResult, CombinedSignature, EcdsaShare, FrostShare, NodeShare, SigType};

use crate::error::{QuorumError, QuorumResult};

/// Decode a canonical `0x` hex field.
pub(crate) fn decode_hex_field(field: &str, value: &str) -> QuorumResult<Vec<u8>> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(digits)
        .map_err(|e| QuorumError::Deserialization(format!("Invalid {field} hex: {e}")))
}
