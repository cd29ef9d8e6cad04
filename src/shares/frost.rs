//! FROST (Schnorr) share aggregation.
//!
//! Supported ciphersuites:
//! - `SchnorrK256Sha256` via `frost-secp256k1`
//! - `SchnorrEd25519Sha512` via `frost-ed25519`
//!
//! Other Schnorr variants are rejected with `UnsupportedScheme`.

use std::collections::BTreeMap;

use frost_ed25519 as frost_ed;
use frost_secp256k1 as frost_secp;

use crate::error::{QuorumError, QuorumResult};
use crate::shares::decode_hex_field;
use crate::shares::macros::{impl_aggregate_frost, impl_decode_frost_shares};
use crate::shares::types::{CombinedSignature, FrostShare, SigType};

impl_decode_frost_shares!(decode_secp_shares, frost_secp);
impl_decode_frost_shares!(decode_ed_shares, frost_ed);

impl_aggregate_frost!(aggregate_secp256k1, decode_secp_shares, frost_secp);
impl_aggregate_frost!(aggregate_ed25519, decode_ed_shares, frost_ed);

/// Aggregate FROST shares that already agree on key, scheme and message.
pub fn combine_frost(sig_type: SigType, shares: &[FrostShare]) -> QuorumResult<CombinedSignature> {
    match sig_type {
        SigType::SchnorrK256Sha256 => aggregate_secp256k1(shares),
        SigType::SchnorrEd25519Sha512 => aggregate_ed25519(shares),
        other => Err(QuorumError::UnsupportedScheme(other.to_string())),
    }
}
