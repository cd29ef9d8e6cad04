//! TLS configuration for client-to-node connections.
//!
//! Three modes, all for `reqwest::Client::builder().use_preconfigured_tls()`:
//!
//! - **mTLS**: trust only the node CA and present a client certificate
//!   ([`load_client_config`]).
//! - **CA pinning**: trust only the node CA, no client certificate
//!   ([`load_ca_only_config`]).
//! - **Public roots**: the Mozilla root set bundled by `webpki-roots`
//!   ([`public_roots_config`]).

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ClientConfig, RootCertStore};

use crate::error::{QuorumError, QuorumResult};

/// Read every certificate from a PEM file.
fn load_certs(path: &Path) -> QuorumResult<Vec<CertificateDer<'static>>> {
    let file = File::open(path).map_err(|e| {
        QuorumError::TlsConfig(format!(
            "Failed to open certificate file {}: {e}",
            path.display()
        ))
    })?;
    let mut reader = BufReader::new(file);

    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            QuorumError::TlsConfig(format!(
                "Failed to parse certificates from {}: {e}",
                path.display()
            ))
        })?;

    if certs.is_empty() {
        return Err(QuorumError::TlsConfig(format!(
            "No certificates found in {}",
            path.display()
        )));
    }

    Ok(certs)
}

/// Read the first private key (PKCS#8, RSA or SEC1) from a PEM file.
fn load_private_key(path: &Path) -> QuorumResult<PrivateKeyDer<'static>> {
    let file = File::open(path).map_err(|e| {
        QuorumError::TlsConfig(format!("Failed to open key file {}: {e}", path.display()))
    })?;
    let mut reader = BufReader::new(file);

    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| {
            QuorumError::TlsConfig(format!(
                "Failed to parse private key from {}: {e}",
                path.display()
            ))
        })?
        .ok_or_else(|| {
            QuorumError::TlsConfig(format!("No private key found in {}", path.display()))
        })
}

fn build_root_store(ca_path: &Path) -> QuorumResult<RootCertStore> {
    let mut root_store = RootCertStore::empty();
    for cert in load_certs(ca_path)? {
        root_store.add(cert).map_err(|e| {
            QuorumError::TlsConfig(format!("Failed to add node CA to root store: {e}"))
        })?;
    }
    Ok(root_store)
}

/// Client config for mTLS towards nodes.
pub fn load_client_config(
    ca_path: &Path,
    cert_path: &Path,
    key_path: &Path,
) -> QuorumResult<ClientConfig> {
    let root_store = build_root_store(ca_path)?;
    let cert_chain = load_certs(cert_path)?;
    let private_key = load_private_key(key_path)?;

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_client_auth_cert(cert_chain, private_key)
        .map_err(|e| QuorumError::TlsConfig(format!("Failed to build client config: {e}")))?;

    tracing::info!(
        ca = %ca_path.display(),
        cert = %cert_path.display(),
        "Loaded node mTLS configuration"
    );

    Ok(config)
}

/// Client config that trusts only the node CA.
pub fn load_ca_only_config(ca_path: &Path) -> QuorumResult<ClientConfig> {
    let root_store = build_root_store(ca_path)?;

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    tracing::info!(ca = %ca_path.display(), "Loaded node CA pinning configuration");

    Ok(config)
}

/// Root store holding the bundled Mozilla CA set.
pub fn public_root_store() -> RootCertStore {
    RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned())
}

/// Client config for nodes serving publicly issued certificates.
pub fn public_roots_config() -> ClientConfig {
    ClientConfig::builder()
        .with_root_certificates(public_root_store())
        .with_no_client_auth()
}

/// Warn when the client key is readable by group or others.
#[cfg(unix)]
pub fn check_key_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Ok(metadata) = std::fs::metadata(path) {
        let mode = metadata.permissions().mode();
        if mode & 0o044 != 0 {
            tracing::warn!(
                path = %path.display(),
                mode = format!("{mode:o}"),
                "Client key file is readable by others; run chmod 600 {}",
                path.display()
            );
        }
    }
}

#[cfg(not(unix))]
pub fn check_key_permissions(_path: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{
        BasicConstraints, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa, Issuer,
        KeyPair, KeyUsagePurpose,
    };
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct TestPki {
        ca: PathBuf,
        client_cert: PathBuf,
        client_key: PathBuf,
    }

    /// Node CA plus one client identity, written as PEM files.
    fn generate_test_pki(temp_dir: &TempDir) -> TestPki {
        let ca_key = KeyPair::generate().expect("CA key generation failed");
        let mut ca_params = CertificateParams::default();
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        ca_params
            .distinguished_name
            .push(DnType::CommonName, "Test Node CA");
        ca_params.key_usages.push(KeyUsagePurpose::KeyCertSign);
        let ca_cert = ca_params.self_signed(&ca_key).expect("CA generation failed");
        let issuer = Issuer::from_params(&ca_params, &ca_key);

        let client_key = KeyPair::generate().expect("Client key generation failed");
        let mut client_params = CertificateParams::default();
        client_params
            .distinguished_name
            .push(DnType::CommonName, "quorum-client");
        client_params
            .key_usages
            .push(KeyUsagePurpose::DigitalSignature);
        client_params
            .extended_key_usages
            .push(ExtendedKeyUsagePurpose::ClientAuth);
        let client_cert = client_params
            .signed_by(&client_key, &issuer)
            .expect("Client cert generation failed");

        let pki = TestPki {
            ca: temp_dir.path().join("ca.pem"),
            client_cert: temp_dir.path().join("client.pem"),
            client_key: temp_dir.path().join("client.key"),
        };
        std::fs::write(&pki.ca, ca_cert.pem()).expect("Write CA failed");
        std::fs::write(&pki.client_cert, client_cert.pem()).expect("Write cert failed");
        std::fs::write(&pki.client_key, client_key.serialize_pem()).expect("Write key failed");
        pki
    }

    #[test]
    fn test_load_client_config() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let pki = generate_test_pki(&temp_dir);

        let config = load_client_config(&pki.ca, &pki.client_cert, &pki.client_key);
        assert!(config.is_ok(), "Failed to load client config: {config:?}");
    }

    #[test]
    fn test_load_ca_only_config() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let pki = generate_test_pki(&temp_dir);

        let config = load_ca_only_config(&pki.ca);
        assert!(config.is_ok(), "Failed to load CA config: {config:?}");
    }

    #[test]
    fn test_key_file_without_key() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let pki = generate_test_pki(&temp_dir);

        // A certificate where the key should be
        let result = load_client_config(&pki.ca, &pki.client_cert, &pki.client_cert);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("No private key"), "unexpected error: {err}");
    }

    #[test]
    fn test_public_root_store_is_populated() {
        let store = public_root_store();
        assert!(!store.is_empty());
        assert_eq!(store.len(), webpki_roots::TLS_SERVER_ROOTS.len());

        let config = public_roots_config();
        assert!(config.alpn_protocols.is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_certs(Path::new("/nonexistent/ca.pem"));
        assert!(result.unwrap_err().to_string().contains("Failed to open"));
    }

    #[test]
    fn test_load_empty_cert_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let empty_path = temp_dir.path().join("empty.pem");
        std::fs::write(&empty_path, "").expect("Write failed");

        let result = load_ca_only_config(&empty_path);
        assert!(result.unwrap_err().to_string().contains("No certificates"));
    }
}
