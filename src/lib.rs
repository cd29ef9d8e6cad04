// Crate-level lint configuration
// Allow noisy pedantic/cargo lints that aren't worth fixing individually
#![allow(clippy::multiple_crate_versions)] // Transitive deps, can't easily fix
#![allow(clippy::missing_errors_doc)] // Would require extensive doc changes
#![allow(clippy::missing_panics_doc)] // Would require extensive doc changes
#![allow(clippy::must_use_candidate)] // Too many false positives for internal APIs
#![allow(clippy::module_name_repetitions)] // Acceptable for clarity (e.g., QuorumError in error mod)
#![allow(clippy::doc_markdown)] // Too strict about backticks in docs
#![allow(clippy::missing_const_for_fn)] // Often debatable, runtime doesn't benefit

//! Quorum Client
//!
//! Client-side coordination for a threshold-cryptography node network: a
//! rotating set of independent nodes that each hold a share of a key and must
//! be queried as a quorum to produce a usable signature.
//!
//! ## Architecture
//!
//! - **Network** (`network`): node set tracking and drift detection, epoch
//!   selection, handshake with plurality agreement, and fan-out dispatch with
//!   threshold classification.
//! - **Shares** (`shares`): normalization of heterogeneous node shares,
//!   ECDSA and FROST combination, executeJs grouping and response strategies.
//! - **Client** (`client`): the `QuorumClient` facade over both.
//!
//! ## Failure Model
//!
//! - Per-node failures are captured, never thrown mid-fan-out
//! - Too few node successes: `QuorumNotReached` (the network is down)
//! - Too few valid shares after normalization: `NoValidShares` (the nodes disagree)
//!
//! ## Schemes
//!
//! Threshold ECDSA over secp256k1, FROST over secp256k1 and ed25519.

pub mod client;
pub mod config;
pub mod error;
pub mod hashing;
pub mod network;
pub mod shares;
pub mod tls;

#[cfg(feature = "otel")]
pub mod telemetry;

#[cfg(not(feature = "otel"))]
pub mod telemetry {
    //! Console-only telemetry when OpenTelemetry is disabled.

    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    /// Initialize tracing with console output only.
    pub fn init_tracing() {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| crate::config::DEFAULT_LOG_FILTER.into());
        let json = crate::config::json_logs_requested();

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json.then(|| tracing_subscriber::fmt::layer().json()))
            .with((!json).then(tracing_subscriber::fmt::layer))
            .init();
    }

    /// No-op shutdown when OpenTelemetry is disabled.
    pub fn shutdown_tracing() {}
}

// Re-export commonly used types
pub use client::{ExecuteJsRequest, PkpSignRequest, QuorumClient};
pub use config::{ConsensusMode, Settings};
pub use error::{QuorumError, QuorumResult};
pub use network::{CoreNodeConfig, NodeSet, NodeTransport};
pub use shares::{CombinedSignature, ExecuteJsOutcome, ResponseStrategy, SigType};
