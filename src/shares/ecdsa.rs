//! Threshold ECDSA share combination.
//!
//! Every node signs with the same nonce point `R` and contributes an additive
//! share `s_i` of the signature scalar. The combined signature is
//! `(r, s) = (x(R) mod n, sum(s_i))`, low-s normalized, verified against the
//! node-reported public key and tagged with its recovery id.
//!
//! Only secp256k1 (`EcdsaK256Sha256`) is supported.

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::elliptic_curve::PrimeField;
use k256::elliptic_curve::ops::Reduce;
use k256::elliptic_curve::point::AffineCoordinates;
use k256::{AffinePoint, FieldBytes, PublicKey, Scalar, U256};

use crate::error::{QuorumError, QuorumResult};
use crate::network::consensus;
use crate::shares::decode_hex_field;
use crate::shares::types::{CombinedSignature, EcdsaShare, SigType};

/// Combine ECDSA shares that already agree on key, scheme and digest.
pub fn combine_ecdsa(sig_type: SigType, shares: &[EcdsaShare]) -> QuorumResult<CombinedSignature> {
    match sig_type {
        SigType::EcdsaK256Sha256 => combine_k256(shares),
        other => Err(QuorumError::UnsupportedScheme(other.to_string())),
    }
}

fn combine_k256(shares: &[EcdsaShare]) -> QuorumResult<CombinedSignature> {
    let first = shares
        .first()
        .ok_or(QuorumError::NoValidShares { needed: 1, have: 0 })?;

    // All shares must commit to the same R; anything else is a bad share
    let agreed_r = consensus::most_common(shares.iter().map(|s| s.big_r.as_str()))
        .ok_or_else(|| QuorumError::CombineFailed("No nonce point".to_string()))?;
    let disagreeing: Vec<String> = shares
        .iter()
        .filter(|s| s.big_r != agreed_r)
        .map(|s| s.peer_id.clone())
        .collect();
    if !disagreeing.is_empty() {
        return Err(QuorumError::InvalidSignatureShare {
            peer_ids: disagreeing,
        });
    }

    let big_r = decode_point(agreed_r)?;
    let r = <Scalar as Reduce<U256>>::reduce_bytes(&big_r.x());

    let s = shares.iter().try_fold(Scalar::ZERO, |acc, share| {
        decode_scalar(share).map(|s_i| acc + s_i)
    })?;

    let signature = Signature::from_scalars(r.to_bytes(), s.to_bytes())
        .map_err(|e| QuorumError::CombineFailed(format!("Degenerate signature: {e}")))?;
    let signature = signature.normalize_s().unwrap_or(signature);

    let public_key_bytes = decode_hex_field("publicKey", &first.public_key)?;
    let verifying_key = VerifyingKey::from_sec1_bytes(&public_key_bytes)
        .map_err(|e| QuorumError::Deserialization(format!("Invalid public key: {e}")))?;

    let digest = decode_hex_field("digest", &first.data_signed)?;
    verifying_key
        .verify_prehash(&digest, &signature)
        .map_err(|e| QuorumError::InvalidSignature(format!("Verification failed: {e}")))?;

    let recovery_id = RecoveryId::trial_recovery_from_prehash(&verifying_key, &digest, &signature)
        .map_err(|e| QuorumError::CombineFailed(format!("Recovery id not found: {e}")))?;

    let uncompressed = verifying_key.to_encoded_point(false);

    Ok(CombinedSignature {
        signature: format!("0x{}", hex::encode(signature.to_bytes())),
        public_key: first.public_key.clone(),
        sig_type: first.sig_type.clone(),
        recovery_id: Some(recovery_id.to_byte()),
        verifying_key: Some(format!("0x{}", hex::encode(uncompressed.as_bytes()))),
        signed_data: first.data_signed.clone(),
    })
}

fn decode_point(hex_point: &str) -> QuorumResult<AffinePoint> {
    let bytes = decode_hex_field("bigR", hex_point)?;
    PublicKey::from_sec1_bytes(&bytes)
        .map(|point| *point.as_affine())
        .map_err(|e| QuorumError::Deserialization(format!("Invalid nonce point: {e}")))
}

fn decode_scalar(share: &EcdsaShare) -> QuorumResult<Scalar> {
    let culprit = || QuorumError::InvalidSignatureShare {
        peer_ids: vec![share.peer_id.clone()],
    };
    let bytes: [u8; 32] = decode_hex_field("signatureShare", &share.signature_share)?
        .try_into()
        .map_err(|_| culprit())?;
    Option::<Scalar>::from(Scalar::from_repr(FieldBytes::from(bytes))).ok_or_else(culprit)
}
