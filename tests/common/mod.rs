//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use frost_secp256k1::rand_core::OsRng;
use k256::ecdsa::{SigningKey, VerifyingKey};
use k256::elliptic_curve::Field;
use k256::elliptic_curve::ops::Reduce;
use k256::elliptic_curve::point::AffineCoordinates;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{FieldBytes, ProjectivePoint, Scalar, U256};
use quorum_client::network::NodeRequest;
use quorum_client::{NodeTransport, QuorumError, QuorumResult};
use serde_json::{Value, json};

pub const NODE_URLS: [&str; 3] = [
    "http://127.0.0.1:7470",
    "http://127.0.0.1:7471",
    "http://127.0.0.1:7472",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Handshake,
    PkpSign,
    ExecuteJs,
}

impl Operation {
    fn from_url(url: &str) -> Option<Self> {
        if url.contains("/web/handshake") {
            Some(Self::Handshake)
        } else if url.contains("/web/pkp/sign") {
            Some(Self::PkpSign)
        } else if url.contains("/web/execute") {
            Some(Self::ExecuteJs)
        } else {
            None
        }
    }
}

/// In-memory node network. Unscripted calls fail as unreachable.
#[derive(Default)]
pub struct MockNetwork {
    responses: Mutex<HashMap<(String, Operation), Value>>,
    pub handshakes: AtomicUsize,
    pub requests: Mutex<Vec<NodeRequest>>,
}

impl MockNetwork {
    pub fn respond(&self, node_url: &str, operation: Operation, body: Value) {
        self.responses
            .lock()
            .unwrap()
            .insert((node_url.to_string(), operation), body);
    }

    pub fn go_down(&self, node_url: &str, operation: Operation) {
        self.responses
            .lock()
            .unwrap()
            .remove(&(node_url.to_string(), operation));
    }

    pub fn requests_for(&self, operation: Operation) -> Vec<NodeRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| Operation::from_url(&r.full_url) == Some(operation))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NodeTransport for MockNetwork {
    async fn send(&self, request: &NodeRequest) -> QuorumResult<Value> {
        let operation = Operation::from_url(&request.full_url)
            .ok_or_else(|| QuorumError::NodeError(format!("No route {}", request.full_url)))?;
        if operation == Operation::Handshake {
            self.handshakes.fetch_add(1, Ordering::SeqCst);
        }
        self.requests.lock().unwrap().push(request.clone());

        // Let concurrent callers interleave as they would over a socket
        tokio::task::yield_now().await;

        self.responses
            .lock()
            .unwrap()
            .get(&(request.node_url.clone(), operation))
            .cloned()
            .ok_or_else(|| QuorumError::NodeUnreachable(request.node_url.clone()))
    }
}

pub fn now_secs() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap()
}

/// Handshake body as a node would send it.
pub fn handshake_body(epoch: u64, epoch_start_time: u64) -> Value {
    json!({
        "serverPublicKey": "5e2b",
        "subnetPublicKey": "0xSUBNETKEY",
        "networkPublicKey": "0xNETWORKKEY",
        "networkPublicKeySet": "0xKEYSET",
        "clientSdkVersion": "1",
        "hdRootPubkeys": ["0xROOT1", "0xROOT2"],
        "latestBlockhash": "0xBEEF",
        "nodeVersion": "1.2.0",
        "epoch": epoch,
        "epochStartTime": epoch_start_time,
        "nodeIdentityKey": "11".repeat(32),
    })
}

/// Additively shared secp256k1 ECDSA signature over `digest`.
pub struct EcdsaFixture {
    pub verifying_key: VerifyingKey,
    pub shares: Vec<Value>,
}

pub fn ecdsa_fixture(digest: &[u8], parts: usize) -> EcdsaFixture {
    let signing_key = SigningKey::random(&mut OsRng);
    let x: Scalar = **signing_key.as_nonzero_scalar();
    let k = Scalar::random(&mut OsRng);
    let big_r = (ProjectivePoint::GENERATOR * k).to_affine();
    let r = <Scalar as Reduce<U256>>::reduce_bytes(&big_r.x());
    let digest_bytes: [u8; 32] = digest.try_into().expect("32-byte digest");
    let z = <Scalar as Reduce<U256>>::reduce_bytes(&FieldBytes::from(digest_bytes));
    let k_inv = Option::<Scalar>::from(k.invert()).unwrap();
    let s = k_inv * (z + r * x);

    let mut pieces: Vec<Scalar> = (1..parts).map(|_| Scalar::random(&mut OsRng)).collect();
    let partial_sum = pieces.iter().fold(Scalar::ZERO, |acc, p| acc + p);
    pieces.push(s - partial_sum);

    let verifying_key = *signing_key.verifying_key();
    let public_key = hex::encode(verifying_key.to_encoded_point(false).as_bytes());
    let big_r = hex::encode(big_r.to_encoded_point(true).as_bytes());

    // Node wire shape: snake_case, quoted upper-case hex, no 0x on the digest
    let shares = pieces
        .iter()
        .enumerate()
        .map(|(i, piece)| {
            json!({
                "EcdsaSignedMessageShare": {
                    "digest": hex::encode(digest),
                    "result": "success",
                    "share_id": format!("\"{:064X}\"", i + 1),
                    "peer_id": format!("peer-{i}"),
                    "signature_share": format!("\"{}\"", hex::encode_upper(piece.to_bytes())),
                    "big_r": format!("{{\"affine_point\":\"{big_r}\"}}"),
                    "compressed_public_key": "",
                    "public_key": format!("\"{public_key}\""),
                    "sig_type": "K256",
                }
            })
        })
        .collect();

    EcdsaFixture {
        verifying_key,
        shares,
    }
}

pub fn pkp_sign_body(share: &Value) -> Value {
    json!({
        "success": true,
        "values": [{ "success": true, "signedData": [], "signatureShare": share }]
    })
}
