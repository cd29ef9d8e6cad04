//! Quorum client facade.
//!
//! Ties the pieces together for callers:
//!
//! ```text
//! connect/refresh -> HandshakeCoordinator -> NetworkState (node set, epoch)
//! pkp_sign        -> RequestDispatcher -> ShareNormalizer -> ShareCombiner
//! execute_js      -> RequestDispatcher -> ShareCombiner::combine_all
//! ```

use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::config::Settings;
use crate::error::{QuorumError, QuorumResult};
use crate::hashing::pkp_sign_message_bytes;
use crate::network::dispatcher::{NodeTarget, RequestDispatcher};
use crate::network::endpoint::{Endpoint, Endpoints};
use crate::network::epoch::EpochTracker;
use crate::network::handshake::{CoreNodeConfig, HandshakeCoordinator, RefreshOutcome};
use crate::network::node_set::NodeSet;
use crate::network::state::{NetworkSnapshot, NetworkState};
use crate::network::transport::{
    HttpNodeTransport, NodeRequest, NodeTransport, decode_node_response,
};
use crate::shares::combiner::{ExecuteJsNodeValue, ExecuteJsOutcome, ShareCombiner};
use crate::shares::normalizer::normalize;
use crate::shares::strategy::ResponseStrategy;
use crate::shares::types::{CombinedSignature, SigType};

/// A PKP signing request.
#[derive(Debug, Clone)]
pub struct PkpSignRequest {
    pub pub_key: String,
    pub to_sign: Vec<u8>,
    pub sig_type: SigType,
    /// Chain whose digest convention applies to ECDSA messages.
    pub chain: String,
    pub bypass_auto_hashing: bool,
    /// Extra fields merged into every node body, e.g. auth material.
    pub extra: Map<String, Value>,
}

impl PkpSignRequest {
    pub fn new(pub_key: impl Into<String>, to_sign: Vec<u8>, sig_type: SigType) -> Self {
        Self {
            pub_key: pub_key.into(),
            to_sign,
            sig_type,
            chain: "ethereum".to_string(),
            bypass_auto_hashing: false,
            extra: Map::new(),
        }
    }
}

/// An executeJs request: exactly one of `code` or `ipfs_id`.
#[derive(Debug, Clone, Default)]
pub struct ExecuteJsRequest {
    pub code: Option<String>,
    pub ipfs_id: Option<String>,
    pub js_params: Value,
    pub extra: Map<String, Value>,
    /// Overrides the configured response strategy.
    pub response_strategy: Option<ResponseStrategy>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PkpSignNodeResponse {
    #[serde(default)]
    success: bool,
    values: Vec<PkpSignValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PkpSignValue {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    signature_share: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteJsNodeResponse {
    #[serde(default)]
    success: bool,
    values: Vec<ExecuteJsNodeValue>,
}

pub struct QuorumClient {
    bootstrap: NodeSet,
    state: NetworkState,
    transport: Arc<dyn NodeTransport>,
    handshake: HandshakeCoordinator,
    dispatcher: RequestDispatcher,
    epoch_tracker: EpochTracker,
    endpoints: Endpoints,
    combiner: ShareCombiner,
    response_strategy: ResponseStrategy,
}

impl QuorumClient {
    /// Build a client talking HTTP to the configured nodes.
    pub fn new(settings: Settings) -> QuorumResult<Self> {
        settings.validate().map_err(QuorumError::Config)?;
        let transport = Arc::new(HttpNodeTransport::new(&settings)?);
        Self::with_transport(settings, transport)
    }

    /// Build a client over any transport.
    pub fn with_transport(
        settings: Settings,
        transport: Arc<dyn NodeTransport>,
    ) -> QuorumResult<Self> {
        settings.validate().map_err(QuorumError::Config)?;
        let bootstrap = NodeSet::new(settings.bootstrap_urls().to_vec())?;

        Ok(Self {
            state: NetworkState::new(bootstrap.clone()),
            bootstrap,
            handshake: HandshakeCoordinator::new(Arc::clone(&transport), &settings),
            transport,
            dispatcher: RequestDispatcher::new(settings.request_timeout()),
            epoch_tracker: EpochTracker::new(settings.epoch_policy()),
            endpoints: Endpoints::with_version(settings.endpoint_version()),
            combiner: ShareCombiner::new(settings.consensus_mode()),
            response_strategy: settings.response_strategy().into(),
        })
    }

    /// Handshake with the bootstrap nodes.
    pub async fn connect(&self) -> QuorumResult<CoreNodeConfig> {
        let outcome = self.refresh().await?;
        Ok(outcome.config)
    }

    /// Re-handshake with the bootstrap nodes, replacing the node set on drift.
    pub async fn refresh(&self) -> QuorumResult<RefreshOutcome> {
        self.handshake.refresh(&self.state, &self.bootstrap).await
    }

    /// Forget the agreed config and epoch.
    pub async fn disconnect(&self) {
        self.state.reset().await;
        tracing::info!("Disconnected from node network");
    }

    pub async fn is_connected(&self) -> bool {
        self.state.snapshot().await.is_connected()
    }

    pub async fn core_config(&self) -> Option<CoreNodeConfig> {
        self.state.snapshot().await.core_config
    }

    pub async fn node_set(&self) -> NodeSet {
        self.state.node_set().await
    }

    /// Epoch to address requests to right now.
    pub async fn effective_epoch(&self) -> Option<u64> {
        let cache = self.state.epoch_cache().await;
        self.epoch_tracker.effective_epoch(&cache)
    }

    /// Sign with a PKP and combine the node shares.
    pub async fn pkp_sign(&self, request: PkpSignRequest) -> QuorumResult<CombinedSignature> {
        let to_sign = pkp_sign_message_bytes(
            &request.chain,
            request.sig_type,
            &request.to_sign,
            request.bypass_auto_hashing,
        )?;

        let mut body = request.extra;
        body.insert("toSign".to_string(), json!(to_sign));
        body.insert("pubkey".to_string(), json!(request.pub_key));
        body.insert("signingScheme".to_string(), json!(request.sig_type.as_str()));

        let (responses, threshold) = self
            .fan_out::<PkpSignNodeResponse>(&self.endpoints.pkp_sign, Value::Object(body))
            .await?;

        let values: Vec<(bool, Value)> = responses
            .into_iter()
            .filter_map(|response| {
                let node_success = response.success;
                response
                    .values
                    .into_iter()
                    .find(|v| !v.signature_share.is_null())
                    .map(|v| (node_success && v.success, v.signature_share))
            })
            .collect();

        // Raw successes must already meet the threshold
        let successes = values.iter().filter(|(ok, _)| *ok).count();
        if successes < threshold {
            return Err(QuorumError::NoValidShares {
                needed: threshold,
                have: successes,
            });
        }

        let shares: Vec<_> = values
            .into_iter()
            .filter_map(|(ok, raw)| match normalize(&raw) {
                Ok(mut share) => {
                    if !ok {
                        share.set_success(false);
                    }
                    Some(share)
                }
                Err(error) => {
                    tracing::warn!(error = %error, "Dropping malformed signature share");
                    None
                }
            })
            .collect();

        let signature = self.combiner.combine_with_drop_budget(&shares, threshold)?;

        tracing::info!(
            sig_type = %request.sig_type,
            shares = shares.len(),
            threshold,
            "PKP signature combined"
        );

        Ok(signature)
    }

    /// Run user code on every node and combine the results.
    pub async fn execute_js(&self, request: ExecuteJsRequest) -> QuorumResult<ExecuteJsOutcome> {
        let mut body = request.extra;
        match (request.code, request.ipfs_id) {
            (Some(code), None) => {
                body.insert("code".to_string(), json!(code));
            }
            (None, Some(ipfs_id)) => {
                body.insert("ipfsId".to_string(), json!(ipfs_id));
            }
            _ => {
                return Err(QuorumError::InvalidInput(
                    "executeJs needs exactly one of code or ipfsId".to_string(),
                ));
            }
        }
        if !request.js_params.is_null() {
            body.insert("jsParams".to_string(), request.js_params);
        }

        let (responses, threshold) = self
            .fan_out::<ExecuteJsNodeResponse>(&self.endpoints.execute_js, Value::Object(body))
            .await?;

        let values: Vec<ExecuteJsNodeValue> = responses
            .into_iter()
            .filter_map(|response| {
                let node_success = response.success;
                response.values.into_iter().next().map(|mut value| {
                    value.success &= node_success;
                    value
                })
            })
            .collect();

        let strategy = request
            .response_strategy
            .unwrap_or_else(|| self.response_strategy.clone());
        let outcome = self.combiner.combine_all(&values, threshold, &strategy)?;

        tracing::info!(
            signatures = outcome.signatures.len(),
            combined = outcome.combined().count(),
            claims = outcome.claims.len(),
            "executeJs combined"
        );

        Ok(outcome)
    }

    /// Send `body` to every node of the current set at the effective epoch.
    ///
    /// Returns the decoded successes and the signing threshold.
    async fn fan_out<T>(&self, endpoint: &Endpoint, body: Value) -> QuorumResult<(Vec<T>, usize)>
    where
        T: DeserializeOwned,
    {
        let snapshot = self.state.snapshot().await;
        let (config, epoch) = self.connected_epoch(&snapshot)?;
        let threshold = config.threshold.max(1);
        let request_id = Uuid::new_v4().simple().to_string();

        tracing::debug!(
            request_id = %request_id,
            path = %endpoint.path,
            epoch,
            threshold,
            "Dispatching to node set"
        );

        let transport = &self.transport;
        let body = &body;
        let request_id = &request_id;
        let batch = self
            .dispatcher
            .dispatch(
                &snapshot.node_set,
                endpoint,
                |target: NodeTarget| {
                    let request = NodeRequest {
                        node_url: target.node_url,
                        full_url: target.full_url,
                        body: body.clone(),
                        request_id: request_id.clone(),
                        epoch,
                    };
                    async move {
                        let raw = transport.send(&request).await?;
                        decode_node_response::<T>(raw)
                    }
                },
                threshold,
            )
            .await?;

        Ok((batch.into_result()?, threshold))
    }

    fn connected_epoch<'a>(
        &self,
        snapshot: &'a NetworkSnapshot,
    ) -> QuorumResult<(&'a CoreNodeConfig, u64)> {
        let config = snapshot.core_config.as_ref().ok_or(QuorumError::NotConnected)?;
        let epoch = self
            .epoch_tracker
            .effective_epoch(&snapshot.epoch_cache)
            .ok_or(QuorumError::NotConnected)?;
        Ok((config, epoch))
    }
}
