//! Error types for the quorum client.
//!
//! Errors fall into three families that callers need to tell apart:
//! configuration problems (fatal, never retried), network-level quorum
//! failures (not enough nodes answered), and cryptographic failures (enough
//! nodes answered but their shares could not be combined).

use thiserror::Error;

/// Client error type with stable error codes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuorumError {
    // Configuration errors
    #[error("Client initialization failed: {0}")]
    Init(String),

    #[error("Invalid node URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Client is not connected")]
    NotConnected,

    // Quorum errors
    #[error("Quorum not reached: {successes} of {threshold} required responses; {error}")]
    QuorumNotReached {
        error: Box<QuorumError>,
        failed_node_urls: Vec<String>,
        successes: usize,
        threshold: usize,
    },

    #[error("No valid shares: need {needed}, have {have}")]
    NoValidShares { needed: usize, have: usize },

    // Share errors
    #[error("Invalid share shape: {0}")]
    InvalidShareShape(String),

    #[error("Unsupported signature scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Share combination failed: {0}")]
    CombineFailed(String),

    #[error("Invalid signature share from peer(s): {peer_ids:?}")]
    InvalidSignatureShare { peer_ids: Vec<String> },

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    // Node communication errors
    #[error("Node unreachable: {0}")]
    NodeUnreachable(String),

    #[error("Node error: {0}")]
    NodeError(String),

    #[error("Node request timed out after {0}ms")]
    NodeTimeout(u64),

    // Input validation errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // TLS errors
    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl QuorumError {
    /// Stable error code for logs and structured responses.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Init(_) => Some("INIT_ERROR"),
            Self::InvalidUrl { .. } => Some("INVALID_URL"),
            Self::Config(_) => Some("CONFIG_ERROR"),
            Self::NotConnected => Some("NOT_CONNECTED"),
            Self::QuorumNotReached { .. } => Some("QUORUM_NOT_REACHED"),
            Self::NoValidShares { .. } => Some("NO_VALID_SHARES"),
            Self::InvalidShareShape(_) => Some("INVALID_SHARE_SHAPE"),
            Self::UnsupportedScheme(_) => Some("UNSUPPORTED_SCHEME"),
            Self::CombineFailed(_) => Some("COMBINE_FAILED"),
            Self::InvalidSignatureShare { .. } => Some("INVALID_SIGNATURE_SHARE"),
            Self::InvalidSignature(_) => Some("INVALID_SIGNATURE"),
            Self::NodeUnreachable(_) => Some("NODE_UNREACHABLE"),
            Self::NodeError(_) => Some("NODE_ERROR"),
            Self::NodeTimeout(_) => Some("NODE_TIMEOUT"),
            Self::InvalidInput(_) => Some("INVALID_INPUT"),
            Self::Serialization(_) => Some("SERIALIZATION_ERROR"),
            Self::Deserialization(_) => Some("DESERIALIZATION_ERROR"),
            Self::TlsConfig(_) => Some("TLS_CONFIG_ERROR"),
            Self::Internal(_) => None,
        }
    }

    /// The network could not produce enough successful responses.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::QuorumNotReached { .. }
                | Self::NodeUnreachable(_)
                | Self::NodeError(_)
                | Self::NodeTimeout(_)
        )
    }

    /// Enough nodes answered, but their shares could not be turned into a
    /// valid artifact.
    pub fn is_cryptographic(&self) -> bool {
        matches!(
            self,
            Self::NoValidShares { .. }
                | Self::InvalidShareShape(_)
                | Self::UnsupportedScheme(_)
                | Self::CombineFailed(_)
                | Self::InvalidSignatureShare { .. }
                | Self::InvalidSignature(_)
        )
    }

    /// The client cannot proceed at all; retrying will not help.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Init(_) | Self::InvalidUrl { .. } | Self::Config(_) | Self::TlsConfig(_)
        )
    }
}

// Conversion from common error types

impl From<serde_json::Error> for QuorumError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            Self::Deserialization(err.to_string())
        } else {
            Self::Serialization(err.to_string())
        }
    }
}

impl From<reqwest::Error> for QuorumError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::NodeUnreachable(format!("Request timed out: {err}"))
        } else if err.is_connect() {
            Self::NodeUnreachable(format!("Connection failed: {err}"))
        } else if err.is_decode() {
            Self::Deserialization(err.to_string())
        } else {
            Self::NodeError(err.to_string())
        }
    }
}

/// Result type alias for quorum operations.
pub type QuorumResult<T> = Result<T, QuorumError>;
