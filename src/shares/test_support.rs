//! Share fixtures for unit tests.

use frost_secp256k1::rand_core::OsRng;
use k256::ecdsa::{SigningKey, VerifyingKey};
use k256::elliptic_curve::Field;
use k256::elliptic_curve::ops::Reduce;
use k256::elliptic_curve::point::AffineCoordinates;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{FieldBytes, ProjectivePoint, Scalar, U256};
use sha2::{Digest, Sha256};

use crate::shares::types::EcdsaShare;

pub(crate) fn sha256(message: &[u8]) -> [u8; 32] {
    Sha256::digest(message).into()
}

/// Additively shared secp256k1 ECDSA signature over `digest`, one share per
/// peer `peer-0..peer-{parts-1}`.
pub(crate) fn ecdsa_shares(digest: &[u8; 32], parts: usize) -> (Vec<EcdsaShare>, VerifyingKey) {
    let signing_key = SigningKey::random(&mut OsRng);
    let x: Scalar = **signing_key.as_nonzero_scalar();
    let k = Scalar::random(&mut OsRng);
    let big_r = (ProjectivePoint::GENERATOR * k).to_affine();
    let r = <Scalar as Reduce<U256>>::reduce_bytes(&big_r.x());
    let z = <Scalar as Reduce<U256>>::reduce_bytes(&FieldBytes::from(*digest));
    let k_inv = Option::<Scalar>::from(k.invert()).unwrap();
    let s = k_inv * (z + r * x);

    let mut pieces: Vec<Scalar> = (1..parts).map(|_| Scalar::random(&mut OsRng)).collect();
    let partial_sum = pieces.iter().fold(Scalar::ZERO, |acc, p| acc + p);
    pieces.push(s - partial_sum);

    let verifying_key = *signing_key.verifying_key();
    let public_key = hex::encode(verifying_key.to_encoded_point(false).as_bytes());
    let big_r_hex = hex::encode(big_r.to_encoded_point(true).as_bytes());

    let shares = pieces
        .into_iter()
        .enumerate()
        .map(|(i, piece)| EcdsaShare {
            digest: format!("0x{}", hex::encode(digest)),
            share_id: format!("0x{:064x}", i + 1),
            peer_id: format!("peer-{i}"),
            signature_share: format!("0x{}", hex::encode(piece.to_bytes())),
            big_r: format!("0x{big_r_hex}"),
            compressed_public_key: String::new(),
            public_key: format!("0x{public_key}"),
            sig_type: "EcdsaK256Sha256".to_string(),
            data_signed: format!("0x{}", hex::encode(digest)),
            success: true,
        })
        .collect();
    (shares, verifying_key)
}

/// A well-formed share that does not belong to the signature.
pub(crate) fn rogue_share(template: &EcdsaShare, peer_id: &str) -> EcdsaShare {
    EcdsaShare {
        peer_id: peer_id.to_string(),
        signature_share: format!("0x{}", hex::encode(Scalar::random(&mut OsRng).to_bytes())),
        ..template.clone()
    }
}
