//! Message hashing before PKP signing.
//!
//! ECDSA nodes sign a prehash, so the client hashes `to_sign` with the
//! chain's conventional digest first. Schnorr schemes hash internally and get
//! the raw bytes.

use sha2::{Digest, Sha256, Sha384};
use sha3::{Keccak256, Keccak384};

use crate::error::{QuorumError, QuorumResult};
use crate::shares::types::SigType;

/// Bytes to send as `toSign` for a PKP sign request.
pub fn pkp_sign_message_bytes(
    chain: &str,
    sig_type: SigType,
    to_sign: &[u8],
    bypass_auto_hashing: bool,
) -> QuorumResult<Vec<u8>> {
    if bypass_auto_hashing || !sig_type.is_ecdsa() {
        return Ok(to_sign.to_vec());
    }

    let chain = chain.trim().to_ascii_lowercase();
    let wide = matches!(sig_type, SigType::EcdsaP384Sha384);

    match (chain.as_str(), wide) {
        ("ethereum", false) => Ok(Keccak256::digest(to_sign).to_vec()),
        ("ethereum", true) => Ok(Keccak384::digest(to_sign).to_vec()),
        ("bitcoin" | "cosmos", false) => Ok(Sha256::digest(to_sign).to_vec()),
        ("bitcoin" | "cosmos", true) => Ok(Sha384::digest(to_sign).to_vec()),
        (other, _) => Err(QuorumError::InvalidInput(format!(
            "No message hashing defined for chain '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ethereum_uses_keccak256() {
        let hashed =
            pkp_sign_message_bytes("ethereum", SigType::EcdsaK256Sha256, b"", false).unwrap();
        assert_eq!(
            hex::encode(hashed),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_bitcoin_uses_sha256() {
        let hashed = pkp_sign_message_bytes("Bitcoin", SigType::EcdsaK256Sha256, b"abc", false)
            .unwrap();
        assert_eq!(
            hex::encode(hashed),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_p384_uses_384_bit_digests() {
        let eth = pkp_sign_message_bytes("ethereum", SigType::EcdsaP384Sha384, b"x", false)
            .unwrap();
        let cosmos = pkp_sign_message_bytes("cosmos", SigType::EcdsaP384Sha384, b"x", false)
            .unwrap();
        assert_eq!(eth.len(), 48);
        assert_eq!(cosmos.len(), 48);
        assert_ne!(eth, cosmos);
    }

    #[test]
    fn test_bypass_and_schnorr_pass_through() {
        let raw = [0xde, 0xad];
        assert_eq!(
            pkp_sign_message_bytes("ethereum", SigType::EcdsaK256Sha256, &raw, true).unwrap(),
            raw
        );
        assert_eq!(
            pkp_sign_message_bytes("solana", SigType::SchnorrEd25519Sha512, &raw, false).unwrap(),
            raw
        );
    }

    #[test]
    fn test_unknown_chain_is_rejected() {
        assert!(matches!(
            pkp_sign_message_bytes("solana", SigType::EcdsaK256Sha256, b"x", false),
            Err(QuorumError::InvalidInput(_))
        ));
    }
}
