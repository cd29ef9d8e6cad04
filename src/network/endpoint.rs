//! Node endpoint paths and URL composition.

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{QuorumError, QuorumResult};

/// A node API endpoint: path plus version suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub path: String,
    pub version: String,
}

impl Endpoint {
    pub fn new(path: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            version: version.into(),
        }
    }

    pub fn handshake(version: &str) -> Self {
        Self::new("/web/handshake", version)
    }

    pub fn pkp_sign(version: &str) -> Self {
        Self::new("/web/pkp/sign", version)
    }

    pub fn execute_js(version: &str) -> Self {
        Self::new("/web/execute", version)
    }
}

/// The node endpoints the client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub handshake: Endpoint,
    pub pkp_sign: Endpoint,
    pub execute_js: Endpoint,
}

impl Endpoints {
    pub fn with_version(version: &str) -> Self {
        Self {
            handshake: Endpoint::handshake(version),
            pkp_sign: Endpoint::pkp_sign(version),
            execute_js: Endpoint::execute_js(version),
        }
    }
}

/// Check that a node base URL is an absolute http(s) URL.
pub fn validate_base_url(base: &str) -> QuorumResult<()> {
    let url = Url::parse(base).map_err(|e| QuorumError::InvalidUrl {
        url: base.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(QuorumError::InvalidUrl {
            url: base.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }

    if url.host_str().is_none() {
        return Err(QuorumError::InvalidUrl {
            url: base.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(())
}

/// Compose `{base}{path}{version}` after validating the base.
pub fn compose_node_url(base: &str, endpoint: &Endpoint) -> QuorumResult<String> {
    validate_base_url(base)?;
    Ok(format!("{base}{}{}", endpoint.path, endpoint.version))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_node_url() {
        let endpoint = Endpoint::pkp_sign("/v2");
        assert_eq!(
            compose_node_url("https://node-1.example:7470", &endpoint).unwrap(),
            "https://node-1.example:7470/web/pkp/sign/v2"
        );
    }

    #[test]
    fn test_invalid_base_url_fails_fast() {
        let endpoint = Endpoint::handshake("/v2");
        let err = compose_node_url("not a url", &endpoint).unwrap_err();
        assert!(matches!(err, QuorumError::InvalidUrl { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_non_http_scheme_rejected() {
        let err = validate_base_url("ftp://node-1:21").unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn test_endpoints_share_version() {
        let endpoints = Endpoints::with_version("/v1");
        assert_eq!(endpoints.handshake.version, "/v1");
        assert_eq!(endpoints.execute_js.path, "/web/execute");
    }
}
