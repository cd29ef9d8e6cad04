//! Declarative macros for FROST ciphersuite abstraction.
//!
//! `frost_secp256k1` and `frost_ed25519` expose the same API over distinct,
//! unrelated types, so the aggregation code is written once and expanded per
//! ciphersuite.

/// Generate a share decoder for a specific ciphersuite.
///
/// The generated function decodes every share of a quorum into the maps that
/// `aggregate` needs, plus an identifier-to-peer map used to name culprits.
macro_rules! impl_decode_frost_shares {
    ($fn_name:ident, $frost:ident) => {
        #[allow(clippy::type_complexity)]
        fn $fn_name(
            shares: &[FrostShare],
        ) -> QuorumResult<(
            BTreeMap<$frost::Identifier, $frost::round1::SigningCommitments>,
            BTreeMap<$frost::Identifier, $frost::round2::SignatureShare>,
            BTreeMap<$frost::Identifier, $frost::keys::VerifyingShare>,
            BTreeMap<$frost::Identifier, String>,
        )> {
            let mut commitments = BTreeMap::new();
            let mut signature_shares = BTreeMap::new();
            let mut verifying_shares = BTreeMap::new();
            let mut peers = BTreeMap::new();

            for share in shares {
                let peer = share.peer_id.as_str();
                let identifier =
                    $frost::Identifier::deserialize(&decode_hex_field("shareId", &share.share_id)?)
                        .map_err(|e| {
                            QuorumError::Deserialization(format!(
                                "Invalid share identifier from {peer}: {e}"
                            ))
                        })?;
                let commitment = $frost::round1::SigningCommitments::deserialize(
                    &decode_hex_field("signingCommitments", &share.signing_commitments)?,
                )
                .map_err(|e| {
                    QuorumError::Deserialization(format!("Invalid commitment from {peer}: {e}"))
                })?;
                let signature_share = $frost::round2::SignatureShare::deserialize(
                    &decode_hex_field("signatureShare", &share.signature_share)?,
                )
                .map_err(|e| {
                    QuorumError::Deserialization(format!(
                        "Invalid signature share from {peer}: {e}"
                    ))
                })?;
                let verifying_share = $frost::keys::VerifyingShare::deserialize(
                    &decode_hex_field("verifyingShare", &share.verifying_share)?,
                )
                .map_err(|e| {
                    QuorumError::Deserialization(format!(
                        "Invalid verifying share from {peer}: {e}"
                    ))
                })?;

                if peers.insert(identifier, share.peer_id.clone()).is_some() {
                    return Err(QuorumError::CombineFailed(format!(
                        "Duplicate share identifier {}",
                        share.share_id
                    )));
                }
                commitments.insert(identifier, commitment);
                signature_shares.insert(identifier, signature_share);
                verifying_shares.insert(identifier, verifying_share);
            }

            Ok((commitments, signature_shares, verifying_shares, peers))
        }
    };
}

/// Generate an aggregator for a specific ciphersuite.
///
/// The generated function:
/// 1. Decodes every share (see [`impl_decode_frost_shares`])
/// 2. Aggregates, mapping a bad share back to the peer that sent it
/// 3. Verifies the aggregate against the group key
macro_rules! impl_aggregate_frost {
    ($fn_name:ident, $decode_fn:ident, $frost:ident) => {
        pub fn $fn_name(shares: &[FrostShare]) -> QuorumResult<CombinedSignature> {
            let first = shares
                .first()
                .ok_or(QuorumError::NoValidShares { needed: 1, have: 0 })?;

            let message = decode_hex_field("message", &first.message)?;
            let group_key_bytes = decode_hex_field("publicKey", &first.public_key)?;
            let verifying_key = $frost::VerifyingKey::deserialize(&group_key_bytes)
                .map_err(|e| QuorumError::Deserialization(format!("Invalid group key: {e}")))?;

            let (commitments, signature_shares, verifying_shares, peers) = $decode_fn(shares)?;

            let signing_package = $frost::SigningPackage::new(commitments, &message);
            let pubkey_package = $frost::keys::PublicKeyPackage::new(verifying_shares, verifying_key);

            let signature =
                $frost::aggregate(&signing_package, &signature_shares, &pubkey_package).map_err(
                    |e| match &e {
                        $frost::Error::InvalidSignatureShare { culprit } => {
                            let peer_id = peers
                                .get(culprit)
                                .cloned()
                                .unwrap_or_else(|| hex::encode(culprit.serialize()));
                            QuorumError::InvalidSignatureShare {
                                peer_ids: vec![peer_id],
                            }
                        }
                        _ => QuorumError::CombineFailed(format!("Aggregation failed: {e}")),
                    },
                )?;

            verifying_key.verify(&message, &signature).map_err(|e| {
                QuorumError::InvalidSignature(format!("Verification failed: {e}"))
            })?;

            let signature_bytes = signature.serialize().map_err(|e| {
                QuorumError::Serialization(format!("Failed to serialize signature: {e}"))
            })?;

            Ok(CombinedSignature {
                signature: format!("0x{}", hex::encode(signature_bytes)),
                public_key: first.public_key.clone(),
                sig_type: first.sig_type.clone(),
                recovery_id: None,
                verifying_key: Some(format!("0x{}", hex::encode(group_key_bytes))),
                signed_data: first.data_signed.clone(),
            })
        }
    };
}

pub(crate) use impl_aggregate_frost;
pub(crate) use impl_decode_frost_shares;
