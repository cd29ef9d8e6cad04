//! Share and signature types.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::QuorumError;

/// Signature scheme reported by nodes in `sigType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SigType {
    EcdsaK256Sha256,
    EcdsaP256Sha256,
    EcdsaP384Sha384,
    SchnorrEd25519Sha512,
    SchnorrK256Sha256,
    SchnorrP256Sha256,
    SchnorrP384Sha384,
    SchnorrRistretto25519Sha512,
    SchnorrEd448Shake256,
    SchnorrRedJubjubBlake2b512,
    SchnorrK256Taproot,
    SchnorrRedDecaf377Blake2b512,
    SchnorrkelSubstrate,
}

impl SigType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EcdsaK256Sha256 => "EcdsaK256Sha256",
            Self::EcdsaP256Sha256 => "EcdsaP256Sha256",
            Self::EcdsaP384Sha384 => "EcdsaP384Sha384",
            Self::SchnorrEd25519Sha512 => "SchnorrEd25519Sha512",
            Self::SchnorrK256Sha256 => "SchnorrK256Sha256",
            Self::SchnorrP256Sha256 => "SchnorrP256Sha256",
            Self::SchnorrP384Sha384 => "SchnorrP384Sha384",
            Self::SchnorrRistretto25519Sha512 => "SchnorrRistretto25519Sha512",
            Self::SchnorrEd448Shake256 => "SchnorrEd448Shake256",
            Self::SchnorrRedJubjubBlake2b512 => "SchnorrRedJubjubBlake2b512",
            Self::SchnorrK256Taproot => "SchnorrK256Taproot",
            Self::SchnorrRedDecaf377Blake2b512 => "SchnorrRedDecaf377Blake2b512",
            Self::SchnorrkelSubstrate => "SchnorrkelSubstrate",
        }
    }

    pub fn is_ecdsa(&self) -> bool {
        matches!(
            self,
            Self::EcdsaK256Sha256 | Self::EcdsaP256Sha256 | Self::EcdsaP384Sha384
        )
    }
}

impl FromStr for SigType {
    type Err = QuorumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            // Older nodes report the bare curve name for ECDSA shares
            "EcdsaK256Sha256" | "K256" => Ok(Self::EcdsaK256Sha256),
            "EcdsaP256Sha256" | "P256" => Ok(Self::EcdsaP256Sha256),
            "EcdsaP384Sha384" | "P384" => Ok(Self::EcdsaP384Sha384),
            "SchnorrEd25519Sha512" => Ok(Self::SchnorrEd25519Sha512),
            "SchnorrK256Sha256" => Ok(Self::SchnorrK256Sha256),
            "SchnorrP256Sha256" => Ok(Self::SchnorrP256Sha256),
            "SchnorrP384Sha384" => Ok(Self::SchnorrP384Sha384),
            "SchnorrRistretto25519Sha512" => Ok(Self::SchnorrRistretto25519Sha512),
            "SchnorrEd448Shake256" => Ok(Self::SchnorrEd448Shake256),
            "SchnorrRedJubjubBlake2b512" => Ok(Self::SchnorrRedJubjubBlake2b512),
            "SchnorrK256Taproot" => Ok(Self::SchnorrK256Taproot),
            "SchnorrRedDecaf377Blake2b512" => Ok(Self::SchnorrRedDecaf377Blake2b512),
            "SchnorrkelSubstrate" => Ok(Self::SchnorrkelSubstrate),
            other => Err(QuorumError::UnsupportedScheme(other.to_string())),
        }
    }
}

impl std::fmt::Display for SigType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One node's ECDSA signature share, in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcdsaShare {
    pub digest: String,
    #[serde(default)]
    pub share_id: String,
    #[serde(default)]
    pub peer_id: String,
    pub signature_share: String,
    pub big_r: String,
    #[serde(default)]
    pub compressed_public_key: String,
    pub public_key: String,
    pub sig_type: String,
    pub data_signed: String,
    #[serde(default)]
    pub success: bool,
}

/// One node's FROST signature share, in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrostShare {
    pub message: String,
    pub share_id: String,
    #[serde(default)]
    pub peer_id: String,
    pub signature_share: String,
    pub signing_commitments: String,
    pub verifying_share: String,
    pub public_key: String,
    pub sig_type: String,
    pub data_signed: String,
    #[serde(default)]
    pub success: bool,
}

/// A normalized share, tagged by scheme family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeShare {
    Ecdsa(EcdsaShare),
    Frost(FrostShare),
}

impl NodeShare {
    pub fn public_key(&self) -> &str {
        match self {
            Self::Ecdsa(share) => &share.public_key,
            Self::Frost(share) => &share.public_key,
        }
    }

    pub fn sig_type(&self) -> &str {
        match self {
            Self::Ecdsa(share) => &share.sig_type,
            Self::Frost(share) => &share.sig_type,
        }
    }

    pub fn peer_id(&self) -> &str {
        match self {
            Self::Ecdsa(share) => &share.peer_id,
            Self::Frost(share) => &share.peer_id,
        }
    }

    pub fn data_signed(&self) -> &str {
        match self {
            Self::Ecdsa(share) => &share.data_signed,
            Self::Frost(share) => &share.data_signed,
        }
    }

    pub fn success(&self) -> bool {
        match self {
            Self::Ecdsa(share) => share.success,
            Self::Frost(share) => share.success,
        }
    }

    /// Mark the share ineligible, e.g. when the enclosing node value failed.
    pub(crate) fn set_success(&mut self, success: bool) {
        match self {
            Self::Ecdsa(share) => share.success = success,
            Self::Frost(share) => share.success = success,
        }
    }

    pub fn is_ecdsa(&self) -> bool {
        matches!(self, Self::Ecdsa(_))
    }
}

/// Final signature produced from a quorum of shares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedSignature {
    pub signature: String,
    pub public_key: String,
    pub sig_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_id: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifying_key: Option<String>,
    pub signed_data: String,
}

/// Claim results gathered across nodes for one claim key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResult {
    pub signatures: Vec<serde_json::Value>,
    pub derived_key_id: String,
}
