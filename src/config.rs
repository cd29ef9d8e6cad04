//! Client configuration derived from environment variables.
//!
//! Configuration is loaded once when the client is built and validated before
//! the first handshake.
//!
//! ## Environment Variables
//!
//! ### Network
//! - `QUORUM_BOOTSTRAP_URLS`: Comma-separated list of node base URLs (required)
//! - `QUORUM_MINIMUM_THRESHOLD`: Minimum handshake successes and signing threshold floor (default: 3)
//! - `QUORUM_CONNECT_TIMEOUT_MS`: Overall handshake deadline (default: 20000)
//! - `QUORUM_REQUEST_TIMEOUT_MS`: Per-node request timeout (default: 30000)
//! - `QUORUM_ENDPOINT_VERSION`: Version suffix appended to endpoint paths (default: /v2)
//! - `QUORUM_CLIENT_VERSION`: Value of the `X-Client-Version` header (default: crate version)
//!
//! ### Epoch
//! - `QUORUM_EPOCH_PROPAGATION_DELAY_SECS`: Grace window after an epoch transition (default: 45)
//! - `QUORUM_EPOCH_READY_THRESHOLD`: Lowest epoch number eligible for the grace window (default: 3)
//!
//! ### Agreement
//! - `QUORUM_CONSENSUS_MODE`: "plurality" or "strict_majority" (default: plurality)
//! - `QUORUM_RESPONSE_STRATEGY`: "leastCommon" or "mostCommon" (default: leastCommon)
//! - `QUORUM_CHECK_NODE_IDENTITY`: Validate node identity keys during handshake (default: true)
//!
//! ### TLS
//! - `QUORUM_MTLS_CA_PATH`: CA certificate for verifying nodes (alone: CA pinning)
//! - `QUORUM_MTLS_CERT_PATH`: Client certificate presented to nodes (needs CA and key)
//! - `QUORUM_MTLS_KEY_PATH`: Client private key
//!
//! ### Logging
//! - `RUST_LOG`: Standard tracing filter (default: quorum_client=info)
//! - `QUORUM_LOG_FORMAT`: "json" for structured output, anything else for text

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::network::epoch::{
    DEFAULT_PROPAGATION_DELAY_SECS, DEFAULT_READY_THRESHOLD, EpochPolicy,
};
use crate::shares::strategy::StrategyKind;

const DEFAULT_MINIMUM_THRESHOLD: usize = 3;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 20_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_ENDPOINT_VERSION: &str = "/v2";

/// Tracing filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "quorum_client=info";

/// Helper to get trimmed env var or empty string.
fn env_trim(name: &str) -> String {
    env::var(name).unwrap_or_default().trim().to_string()
}

/// Helper to get lowercase env var.
fn env_lower(name: &str) -> String {
    env_trim(name).to_lowercase()
}

/// Check if a string value is truthy.
fn is_truthy(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "yes")
}

fn optional_path(name: &str) -> Option<PathBuf> {
    env_trim(name)
        .parse::<PathBuf>()
        .ok()
        .filter(|p| !p.as_os_str().is_empty())
}

/// Whether `QUORUM_LOG_FORMAT` asks for JSON log lines.
pub fn json_logs_requested() -> bool {
    env_lower("QUORUM_LOG_FORMAT") == "json"
}

/// How agreement over node-reported values is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusMode {
    /// The most frequent value wins, however small its share of the votes.
    #[default]
    Plurality,
    /// The most frequent value must also hold more than half of the votes.
    StrictMajority,
}

impl FromStr for ConsensusMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "plurality" => Ok(Self::Plurality),
            "strict_majority" | "majority" => Ok(Self::StrictMajority),
            other => Err(format!(
                "Invalid consensus mode '{other}'. Must be 'plurality' or 'strict_majority'."
            )),
        }
    }
}

impl std::fmt::Display for ConsensusMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plurality => write!(f, "plurality"),
            Self::StrictMajority => write!(f, "strict_majority"),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    // Network
    bootstrap_urls: Vec<String>,
    minimum_threshold: usize,
    connect_timeout_ms: u64,
    request_timeout_ms: u64,
    endpoint_version: String,
    client_version: String,

    // Epoch
    epoch_propagation_delay_secs: u64,
    epoch_ready_threshold: u64,

    // Agreement
    consensus_mode: ConsensusMode,
    response_strategy: StrategyKind,
    check_node_identity: bool,

    // mTLS
    mtls_ca_path: Option<PathBuf>,
    mtls_cert_path: Option<PathBuf>,
    mtls_key_path: Option<PathBuf>,
}

impl Settings {
    /// Load settings from environment variables.
    ///
    /// Unparseable values fall back to their defaults; missing required values
    /// are reported by [`Settings::validate`].
    pub fn from_env() -> Self {
        let bootstrap_urls: Vec<String> = env_trim("QUORUM_BOOTSTRAP_URLS")
            .split(',')
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let minimum_threshold = env_trim("QUORUM_MINIMUM_THRESHOLD")
            .parse::<usize>()
            .unwrap_or(DEFAULT_MINIMUM_THRESHOLD);

        let connect_timeout_ms = env_trim("QUORUM_CONNECT_TIMEOUT_MS")
            .parse::<u64>()
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_MS);

        let request_timeout_ms = env_trim("QUORUM_REQUEST_TIMEOUT_MS")
            .parse::<u64>()
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);

        let endpoint_version = env_trim("QUORUM_ENDPOINT_VERSION");
        let endpoint_version = if endpoint_version.is_empty() {
            DEFAULT_ENDPOINT_VERSION.to_string()
        } else {
            endpoint_version
        };

        let client_version = env_trim("QUORUM_CLIENT_VERSION");
        let client_version = if client_version.is_empty() {
            env!("CARGO_PKG_VERSION").to_string()
        } else {
            client_version
        };

        let epoch_propagation_delay_secs = env_trim("QUORUM_EPOCH_PROPAGATION_DELAY_SECS")
            .parse::<u64>()
            .unwrap_or(DEFAULT_PROPAGATION_DELAY_SECS);

        let epoch_ready_threshold = env_trim("QUORUM_EPOCH_READY_THRESHOLD")
            .parse::<u64>()
            .unwrap_or(DEFAULT_READY_THRESHOLD);

        let consensus_mode = env_trim("QUORUM_CONSENSUS_MODE")
            .parse::<ConsensusMode>()
            .unwrap_or_default();

        let response_strategy = env_trim("QUORUM_RESPONSE_STRATEGY")
            .parse::<StrategyKind>()
            .unwrap_or_default();

        // Identity checks are on unless explicitly disabled
        let identity_flag = env_lower("QUORUM_CHECK_NODE_IDENTITY");
        let check_node_identity = identity_flag.is_empty() || is_truthy(&identity_flag);

        Self {
            bootstrap_urls,
            minimum_threshold,
            connect_timeout_ms,
            request_timeout_ms,
            endpoint_version,
            client_version,
            epoch_propagation_delay_secs,
            epoch_ready_threshold,
            consensus_mode,
            response_strategy,
            check_node_identity,
            mtls_ca_path: optional_path("QUORUM_MTLS_CA_PATH"),
            mtls_cert_path: optional_path("QUORUM_MTLS_CERT_PATH"),
            mtls_key_path: optional_path("QUORUM_MTLS_KEY_PATH"),
        }
    }

    /// Create settings for tests: three local nodes, short timeouts.
    pub fn for_tests() -> Self {
        Self {
            bootstrap_urls: vec![
                "http://127.0.0.1:7470".to_string(),
                "http://127.0.0.1:7471".to_string(),
                "http://127.0.0.1:7472".to_string(),
            ],
            minimum_threshold: 2,
            connect_timeout_ms: 2_000,
            request_timeout_ms: 1_000,
            endpoint_version: DEFAULT_ENDPOINT_VERSION.to_string(),
            client_version: "test".to_string(),
            epoch_propagation_delay_secs: DEFAULT_PROPAGATION_DELAY_SECS,
            epoch_ready_threshold: DEFAULT_READY_THRESHOLD,
            consensus_mode: ConsensusMode::Plurality,
            response_strategy: StrategyKind::LeastCommon,
            check_node_identity: false,
            mtls_ca_path: None,
            mtls_cert_path: None,
            mtls_key_path: None,
        }
    }

    /// Replace the bootstrap node list.
    #[must_use]
    pub fn with_bootstrap_urls(mut self, urls: Vec<String>) -> Self {
        self.bootstrap_urls = urls;
        self
    }

    /// Replace the minimum threshold.
    #[must_use]
    pub fn with_minimum_threshold(mut self, minimum_threshold: usize) -> Self {
        self.minimum_threshold = minimum_threshold;
        self
    }

    /// Replace the consensus mode.
    #[must_use]
    pub fn with_consensus_mode(mut self, mode: ConsensusMode) -> Self {
        self.consensus_mode = mode;
        self
    }

    /// Validate settings.
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.bootstrap_urls.is_empty() {
            return Err("QUORUM_BOOTSTRAP_URLS is required. \
                 Provide comma-separated list of node URLs."
                .to_string());
        }

        if self.minimum_threshold == 0 {
            return Err("QUORUM_MINIMUM_THRESHOLD must be at least 1".to_string());
        }

        if self.minimum_threshold > self.bootstrap_urls.len() {
            return Err(format!(
                "QUORUM_MINIMUM_THRESHOLD ({}) exceeds the number of bootstrap nodes ({})",
                self.minimum_threshold,
                self.bootstrap_urls.len()
            ));
        }

        if self.request_timeout_ms == 0 || self.connect_timeout_ms == 0 {
            return Err("Timeouts must be greater than zero".to_string());
        }

        // A client identity needs both halves and a CA; a CA alone pins the node certificates
        if self.mtls_cert_path.is_some() != self.mtls_key_path.is_some()
            || (self.mtls_cert_path.is_some() && self.mtls_ca_path.is_none())
        {
            return Err("Incomplete mTLS configuration. Set all of: \
                 QUORUM_MTLS_CA_PATH, QUORUM_MTLS_CERT_PATH, QUORUM_MTLS_KEY_PATH"
                .to_string());
        }

        Ok(())
    }

    // Getters

    pub fn bootstrap_urls(&self) -> &[String] {
        &self.bootstrap_urls
    }

    pub fn minimum_threshold(&self) -> usize {
        self.minimum_threshold
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn endpoint_version(&self) -> &str {
        &self.endpoint_version
    }

    pub fn client_version(&self) -> &str {
        &self.client_version
    }

    pub fn epoch_policy(&self) -> EpochPolicy {
        EpochPolicy {
            propagation_delay_secs: self.epoch_propagation_delay_secs,
            ready_threshold: self.epoch_ready_threshold,
        }
    }

    pub fn consensus_mode(&self) -> ConsensusMode {
        self.consensus_mode
    }

    pub fn response_strategy(&self) -> StrategyKind {
        self.response_strategy
    }

    pub fn check_node_identity(&self) -> bool {
        self.check_node_identity
    }

    pub fn mtls_ca_path(&self) -> Option<&PathBuf> {
        self.mtls_ca_path.as_ref()
    }

    pub fn mtls_cert_path(&self) -> Option<&PathBuf> {
        self.mtls_cert_path.as_ref()
    }

    pub fn mtls_key_path(&self) -> Option<&PathBuf> {
        self.mtls_key_path.as_ref()
    }

    /// Check if mTLS is configured.
    /// CA configured without a client identity.
    pub fn ca_pinning_enabled(&self) -> bool {
        self.mtls_ca_path.is_some() && !self.mtls_enabled()
    }

    pub fn mtls_enabled(&self) -> bool {
        self.mtls_ca_path.is_some() && self.mtls_cert_path.is_some() && self.mtls_key_path.is_some()
    }
}
