//! Handshake orchestration.
//!
//! A handshake asks every node for its view of the network (epoch, public key
//! material, latest blockhash), requires enough nodes to answer, and publishes
//! the values the responders agree on. It is the only writer of the shared
//! [`NetworkState`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{ConsensusMode, Settings};
use crate::error::{QuorumError, QuorumResult};
use crate::network::consensus;
use crate::network::dispatcher::{BatchResult, NodeTarget, RequestDispatcher};
use crate::network::endpoint::Endpoint;
use crate::network::epoch::EpochCache;
use crate::network::node_set::NodeSet;
use crate::network::state::NetworkState;
use crate::network::transport::{NodeRequest, NodeTransport, decode_node_response};

/// Length of a node identity key in bytes.
const NODE_IDENTITY_KEY_LEN: usize = 32;

/// Handshake request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeRequest {
    pub client_public_key: String,
    pub challenge: String,
}

/// What a single node reports during the handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawHandshakeResponse {
    #[serde(default)]
    pub server_public_key: String,
    #[serde(default)]
    pub subnet_public_key: String,
    #[serde(default)]
    pub network_public_key: String,
    #[serde(default)]
    pub network_public_key_set: String,
    #[serde(default)]
    pub client_sdk_version: String,
    #[serde(default)]
    pub hd_root_pubkeys: Vec<String>,
    #[serde(default)]
    pub latest_blockhash: Option<String>,
    #[serde(default)]
    pub node_version: String,
    pub epoch: u64,
    /// Unix seconds at which `epoch` began, if the node knows it.
    #[serde(default)]
    pub epoch_start_time: Option<u64>,
    #[serde(default)]
    pub node_identity_key: Option<String>,
}

impl RawHandshakeResponse {
    /// Canonical form used for voting: trimmed, lowercased key material.
    fn normalized(mut self) -> Self {
        fn canon(s: &str) -> String {
            s.trim().to_lowercase()
        }
        self.subnet_public_key = canon(&self.subnet_public_key);
        self.network_public_key = canon(&self.network_public_key);
        self.network_public_key_set = canon(&self.network_public_key_set);
        self.hd_root_pubkeys = self.hd_root_pubkeys.iter().map(|k| canon(k)).collect();
        self.latest_blockhash = self.latest_blockhash.as_deref().map(canon);
        self
    }
}

/// Network parameters agreed on by the responding nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreNodeConfig {
    pub connected_nodes: Vec<String>,
    pub subnet_pub_key: String,
    pub network_pub_key: String,
    pub network_pub_key_set: String,
    pub hd_root_pubkeys: Vec<String>,
    pub latest_blockhash: String,
    pub epoch: u64,
    pub epoch_start_time: Option<u64>,
    /// Signing threshold for requests against `connected_nodes`.
    pub threshold: usize,
}

impl CoreNodeConfig {
    pub fn epoch_cache(&self) -> EpochCache {
        EpochCache::new(self.epoch, self.epoch_start_time)
    }
}

/// Result of a handshake, before it is published.
#[derive(Debug, Clone)]
pub struct HandshakeOutcome {
    pub config: CoreNodeConfig,
    pub server_keys: BTreeMap<String, RawHandshakeResponse>,
}

/// Result of a refresh against the shared state.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub config: CoreNodeConfig,
    /// The node set changed and was replaced.
    pub drifted: bool,
    pub generation: u64,
}

/// Minimum number of handshake successes for `node_count` nodes.
pub fn minimum_required(minimum_threshold: usize, node_count: usize) -> usize {
    minimum_threshold.max(node_count * 2 / 3)
}

/// Runs handshakes and publishes their results.
#[derive(Clone)]
pub struct HandshakeCoordinator {
    transport: Arc<dyn NodeTransport>,
    endpoint: Endpoint,
    per_node_timeout: Duration,
    overall_timeout: Duration,
    minimum_threshold: usize,
    consensus_mode: ConsensusMode,
    check_node_identity: bool,
}

impl HandshakeCoordinator {
    pub fn new(transport: Arc<dyn NodeTransport>, settings: &Settings) -> Self {
        Self {
            transport,
            endpoint: Endpoint::handshake(settings.endpoint_version()),
            per_node_timeout: settings.request_timeout(),
            overall_timeout: settings.connect_timeout(),
            minimum_threshold: settings.minimum_threshold(),
            consensus_mode: settings.consensus_mode(),
            check_node_identity: settings.check_node_identity(),
        }
    }

    // =========================================================================
    // Handshake
    // =========================================================================

    /// Handshake with every node of `node_set` and resolve the agreed config.
    ///
    /// Fails with [`QuorumError::Init`] if too few nodes answer or the
    /// answers cannot be reconciled.
    pub async fn handshake(&self, node_set: &NodeSet) -> QuorumResult<HandshakeOutcome> {
        let required = minimum_required(self.minimum_threshold, node_set.len());
        let request_id = Uuid::new_v4().simple().to_string();

        tracing::info!(
            request_id = %request_id,
            nodes = node_set.len(),
            required,
            "Starting handshake"
        );

        let dispatcher = RequestDispatcher::new(self.per_node_timeout)
            .with_overall_deadline(self.overall_timeout);

        let batch = dispatcher
            .dispatch(
                node_set,
                &self.endpoint,
                |target: NodeTarget| self.handshake_node(target, request_id.clone()),
                required,
            )
            .await
            .map_err(|e| {
                if matches!(e, QuorumError::InvalidUrl { .. }) {
                    e
                } else {
                    QuorumError::Init(format!("Handshake could not start: {e}"))
                }
            })?;

        let responses = match batch {
            BatchResult::Success { values } => values,
            BatchResult::Rejected {
                failures,
                successes,
                ..
            } => {
                let details = failures
                    .iter()
                    .map(|f| format!("{}: {}", f.node_url, f.error))
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(QuorumError::Init(format!(
                    "Insufficient successful handshakes: got {successes}, need {required}; errors={details}"
                )));
            }
        };

        let server_keys: BTreeMap<String, RawHandshakeResponse> = responses.into_iter().collect();
        let connected_nodes: Vec<String> = node_set
            .urls()
            .iter()
            .filter(|url| server_keys.contains_key(*url))
            .cloned()
            .collect();

        let config = self.resolve(&server_keys, connected_nodes, &request_id)?;

        tracing::info!(
            request_id = %request_id,
            connected = config.connected_nodes.len(),
            epoch = config.epoch,
            threshold = config.threshold,
            "Handshake complete"
        );

        Ok(HandshakeOutcome {
            config,
            server_keys,
        })
    }

    async fn handshake_node(
        &self,
        target: NodeTarget,
        request_id: String,
    ) -> QuorumResult<(String, RawHandshakeResponse)> {
        let body = serde_json::to_value(HandshakeRequest {
            client_public_key: String::new(),
            challenge: Uuid::new_v4().simple().to_string(),
        })?;

        let request = NodeRequest {
            node_url: target.node_url.clone(),
            full_url: target.full_url,
            body,
            request_id,
            epoch: 0,
        };

        let raw = self.transport.send(&request).await?;
        let response: RawHandshakeResponse = decode_node_response(raw)?;

        if self.check_node_identity {
            validate_node_identity_key(response.node_identity_key.as_deref())?;
        }

        Ok((target.node_url, response.normalized()))
    }

    /// Vote on every agreed field.
    fn resolve(
        &self,
        server_keys: &BTreeMap<String, RawHandshakeResponse>,
        connected_nodes: Vec<String>,
        request_id: &str,
    ) -> QuorumResult<CoreNodeConfig> {
        let mode = self.consensus_mode;
        let responses: Vec<&RawHandshakeResponse> = server_keys.values().collect();

        let agree = |field: &str, values: Vec<String>| -> QuorumResult<String> {
            consensus::pick(values, mode).ok_or_else(|| {
                QuorumError::Init(format!(
                    "No {mode} agreement on {field} for request {request_id}"
                ))
            })
        };

        let blockhashes: Vec<String> = responses
            .iter()
            .filter_map(|r| r.latest_blockhash.clone())
            .filter(|h| !h.is_empty())
            .collect();
        if blockhashes.is_empty() {
            return Err(QuorumError::Init(format!(
                "latestBlockhash unavailable for request {request_id}"
            )));
        }
        let latest_blockhash = agree("latestBlockhash", blockhashes)?;

        let subnet_pub_key = agree(
            "subnetPublicKey",
            responses.iter().map(|r| r.subnet_public_key.clone()).collect(),
        )?;
        let network_pub_key = agree(
            "networkPublicKey",
            responses.iter().map(|r| r.network_public_key.clone()).collect(),
        )?;
        let network_pub_key_set = agree(
            "networkPublicKeySet",
            responses
                .iter()
                .map(|r| r.network_public_key_set.clone())
                .collect(),
        )?;
        let hd_root_pubkeys = consensus::pick(
            responses.iter().map(|r| r.hd_root_pubkeys.clone()),
            mode,
        )
        .ok_or_else(|| {
            QuorumError::Init(format!(
                "No {mode} agreement on hdRootPubkeys for request {request_id}"
            ))
        })?;

        let epoch = consensus::pick(responses.iter().map(|r| r.epoch), mode).ok_or_else(|| {
            QuorumError::Init(format!(
                "No {mode} agreement on epoch for request {request_id}"
            ))
        })?;
        // Start time is only trusted from nodes that agree on the epoch
        let epoch_start_time = consensus::most_common(
            responses
                .iter()
                .filter(|r| r.epoch == epoch)
                .map(|r| r.epoch_start_time),
        )
        .flatten();

        let threshold = self
            .minimum_threshold
            .max(connected_nodes.len() * 2 / 3);

        Ok(CoreNodeConfig {
            connected_nodes,
            subnet_pub_key,
            network_pub_key,
            network_pub_key_set,
            hd_root_pubkeys,
            latest_blockhash,
            epoch,
            epoch_start_time,
            threshold,
        })
    }

    // =========================================================================
    // Shared State
    // =========================================================================

    /// Handshake against `candidate` and publish the result into `state`.
    ///
    /// Only one handshake runs at a time per state. A caller that had to wait
    /// for another in-flight handshake reuses its result.
    pub async fn refresh(
        &self,
        state: &NetworkState,
        candidate: &NodeSet,
    ) -> QuorumResult<RefreshOutcome> {
        let observed_generation = state.generation();
        let _guard = state.lock_handshake().await;

        let current = state.snapshot().await;
        if current.generation != observed_generation
            && let Some(config) = current.core_config
        {
            tracing::debug!(
                generation = current.generation,
                "Reusing handshake completed while waiting"
            );
            return Ok(RefreshOutcome {
                config,
                drifted: false,
                generation: current.generation,
            });
        }

        let outcome = self.handshake(candidate).await?;
        let connected = NodeSet::new(outcome.config.connected_nodes.clone())?;
        let drifted = current.node_set.differs_from(&connected);

        if drifted {
            tracing::info!(
                previous = current.node_set.len(),
                current = connected.len(),
                "Node set drift detected, replacing node set"
            );
        }

        let generation = state
            .publish(
                drifted.then_some(connected),
                outcome.config.epoch_cache(),
                outcome.config.clone(),
            )
            .await;

        Ok(RefreshOutcome {
            config: outcome.config,
            drifted,
            generation,
        })
    }
}

/// A node identity key must be 32 bytes of hex, with or without `0x`.
fn validate_node_identity_key(key: Option<&str>) -> QuorumResult<()> {
    let key = key.ok_or_else(|| QuorumError::NodeError("Missing nodeIdentityKey".to_string()))?;
    match hex::decode(key.trim_start_matches("0x")) {
        Ok(bytes) if bytes.len() == NODE_IDENTITY_KEY_LEN => Ok(()),
        _ => Err(QuorumError::NodeError("Invalid nodeIdentityKey".to_string())),
    }
}
