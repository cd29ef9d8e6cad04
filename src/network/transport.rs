//! Transport to individual nodes.
//!
//! [`NodeTransport`] is the seam between quorum logic and the wire. The HTTP
//! implementation talks JSON over reqwest, optionally with mTLS; tests plug in
//! in-memory transports.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;

use crate::config::Settings;
use crate::error::{QuorumError, QuorumResult};
use crate::tls;

/// Header carrying the per-operation request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Header carrying the client version.
pub const CLIENT_VERSION_HEADER: &str = "x-client-version";

/// One outbound call to one node.
#[derive(Debug, Clone)]
pub struct NodeRequest {
    /// Node base URL, as listed in the node set.
    pub node_url: String,
    /// Fully composed endpoint URL.
    pub full_url: String,
    pub body: serde_json::Value,
    pub request_id: String,
    pub epoch: u64,
}

impl NodeRequest {
    /// Body with the addressed epoch stamped in.
    pub fn body_with_epoch(&self) -> serde_json::Value {
        let mut body = self.body.clone();
        if let Some(obj) = body.as_object_mut() {
            obj.insert("epoch".to_string(), serde_json::json!(self.epoch));
        }
        body
    }
}

/// Sends a JSON request to a single node.
#[async_trait]
pub trait NodeTransport: Send + Sync {
    async fn send(&self, request: &NodeRequest) -> QuorumResult<serde_json::Value>;
}

/// Decode a node response, accepting both bare and `{ "data": ... }` wrapped bodies.
pub fn decode_node_response<T: DeserializeOwned>(value: serde_json::Value) -> QuorumResult<T> {
    match serde_json::from_value::<T>(value.clone()) {
        Ok(parsed) => Ok(parsed),
        Err(err) => match value.get("data") {
            Some(data) => serde_json::from_value::<T>(data.clone()).map_err(|e| {
                QuorumError::Deserialization(format!("Unexpected node response shape: {e}"))
            }),
            None => Err(QuorumError::Deserialization(format!(
                "Unexpected node response shape: {err}"
            ))),
        },
    }
}

/// HTTP transport over reqwest.
#[derive(Debug, Clone)]
pub struct HttpNodeTransport {
    http_client: Client,
    client_version: String,
}

impl HttpNodeTransport {
    /// Build the transport from settings.
    ///
    /// If mTLS is enabled, the HTTP client presents the configured client
    /// certificate and only trusts the configured CA.
    pub fn new(settings: &Settings) -> QuorumResult<Self> {
        let http_client = if settings.mtls_enabled() {
            let ca_path = settings
                .mtls_ca_path()
                .ok_or_else(|| QuorumError::TlsConfig("mTLS CA path required".to_string()))?;
            let cert_path = settings
                .mtls_cert_path()
                .ok_or_else(|| QuorumError::TlsConfig("mTLS cert path required".to_string()))?;
            let key_path = settings
                .mtls_key_path()
                .ok_or_else(|| QuorumError::TlsConfig("mTLS key path required".to_string()))?;

            tls::check_key_permissions(key_path);

            let tls_config = tls::load_client_config(ca_path, cert_path, key_path)?;

            tracing::info!("Creating node HTTP client with mTLS");
            Client::builder()
                .timeout(settings.request_timeout())
                .use_preconfigured_tls(tls_config)
                .build()
                .map_err(|e| QuorumError::TlsConfig(format!("Failed to create mTLS client: {e}")))?
        } else if let Some(ca_path) = settings.mtls_ca_path() {
            let tls_config = tls::load_ca_only_config(ca_path)?;

            tracing::info!("Creating node HTTP client pinned to the configured CA");
            Client::builder()
                .timeout(settings.request_timeout())
                .use_preconfigured_tls(tls_config)
                .build()
                .map_err(|e| QuorumError::TlsConfig(format!("Failed to create TLS client: {e}")))?
        } else {
            Client::builder()
                .timeout(settings.request_timeout())
                .use_preconfigured_tls(tls::public_roots_config())
                .build()
                .map_err(|e| QuorumError::TlsConfig(format!("Failed to create HTTP client: {e}")))?
        };

        Ok(Self {
            http_client,
            client_version: settings.client_version().to_string(),
        })
    }

    /// Wrap an existing reqwest client.
    pub fn with_client(http_client: Client, client_version: impl Into<String>) -> Self {
        Self {
            http_client,
            client_version: client_version.into(),
        }
    }

    fn headers(&self, request_id: &str) -> QuorumResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            CLIENT_VERSION_HEADER,
            HeaderValue::from_str(&self.client_version)
                .map_err(|e| QuorumError::Config(format!("Invalid client version header: {e}")))?,
        );
        headers.insert(
            REQUEST_ID_HEADER,
            HeaderValue::from_str(request_id)
                .map_err(|e| QuorumError::InvalidInput(format!("Invalid request id: {e}")))?,
        );
        Ok(headers)
    }
}

#[async_trait]
impl NodeTransport for HttpNodeTransport {
    async fn send(&self, request: &NodeRequest) -> QuorumResult<serde_json::Value> {
        tracing::debug!(
            node_url = %request.node_url,
            request_id = %request.request_id,
            epoch = request.epoch,
            "Sending node request"
        );

        let response = self
            .http_client
            .post(&request.full_url)
            .headers(self.headers(&request.request_id)?)
            .json(&request.body_with_epoch())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(QuorumError::NodeError(format!(
                "Node request failed with {status}: {error_text}"
            )));
        }

        response.json().await.map_err(|e| {
            QuorumError::Deserialization(format!("Failed to parse node response: {e}"))
        })
    }
}
