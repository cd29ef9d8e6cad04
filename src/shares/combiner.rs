//! Combining a quorum of normalized shares.
//!
//! # Single signature
//! [`ShareCombiner::combine`] re-checks the threshold after normalization,
//! votes on the public key, sig type and signed data, drops shares that
//! disagree and hands the rest to the scheme-specific combiner.
//!
//! # executeJs
//! [`ShareCombiner::combine_all`] groups shares by signature name across
//! nodes and combines each group on its own: one name failing never fails
//! another. Claims are collected, not combined. The free-form response is
//! picked by a [`ResponseStrategy`] after inline `{r, s, v}` signatures are
//! lifted out of it. Values from nodes that reported failure are ignored.
//!
//! # Dropping shares
//! A group that fails to combine is retried without the culprits the scheme
//! named, then without every subset of up to `len - threshold` shares, each
//! subset once, capped at [`MAX_DROP_ATTEMPTS`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ConsensusMode;
use crate::error::{QuorumError, QuorumResult};
use crate::network::consensus;
use crate::shares::ecdsa::combine_ecdsa;
use crate::shares::frost::combine_frost;
use crate::shares::normalizer::normalize;
use crate::shares::response;
use crate::shares::strategy::ResponseStrategy;
use crate::shares::types::{ClaimResult, CombinedSignature, NodeShare, SigType};

/// One node's executeJs value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecuteJsNodeValue {
    pub success: bool,
    pub claim_data: BTreeMap<String, Value>,
    pub decrypted_data: Value,
    pub logs: String,
    pub response: Value,
    pub signed_data: BTreeMap<String, Value>,
}

impl ExecuteJsNodeValue {
    fn response_text(&self) -> String {
        match &self.response {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Combined result of an executeJs call.
#[derive(Debug, Clone)]
pub struct ExecuteJsOutcome {
    pub success: bool,
    /// Per signature name; each name succeeds or fails independently.
    pub signatures: BTreeMap<String, QuorumResult<CombinedSignature>>,
    pub claims: BTreeMap<String, ClaimResult>,
    pub response: Value,
    pub logs: String,
    pub decrypted_data: Value,
}

impl ExecuteJsOutcome {
    /// Signatures that combined successfully.
    pub fn combined(&self) -> impl Iterator<Item = (&String, &CombinedSignature)> {
        self.signatures
            .iter()
            .filter_map(|(name, result)| result.as_ref().ok().map(|sig| (name, sig)))
    }
}

/// Upper bound on subsets tried by the drop search for one signature.
pub const MAX_DROP_ATTEMPTS: usize = 64;

#[derive(Debug, Clone, Copy, Default)]
pub struct ShareCombiner {
    consensus_mode: ConsensusMode,
}

impl ShareCombiner {
    pub fn new(consensus_mode: ConsensusMode) -> Self {
        Self { consensus_mode }
    }

    /// Combine one logical signature from its shares.
    pub fn combine(
        &self,
        shares: &[NodeShare],
        threshold: usize,
    ) -> QuorumResult<CombinedSignature> {
        let needed = threshold.max(1);
        let eligible: Vec<&NodeShare> = shares.iter().filter(|s| s.success()).collect();
        if eligible.len() < needed {
            return Err(QuorumError::NoValidShares {
                needed,
                have: eligible.len(),
            });
        }

        let no_agreement = || QuorumError::NoValidShares {
            needed,
            have: eligible.len(),
        };
        let mode = self.consensus_mode;
        let public_key =
            consensus::pick(eligible.iter().map(|s| s.public_key()), mode).ok_or_else(no_agreement)?;
        let sig_type_name =
            consensus::pick(eligible.iter().map(|s| s.sig_type()), mode).ok_or_else(no_agreement)?;
        let data_signed =
            consensus::pick(eligible.iter().map(|s| s.data_signed()), mode).ok_or_else(no_agreement)?;
        let sig_type: SigType = sig_type_name.parse()?;

        let agreeing: Vec<&NodeShare> = eligible
            .iter()
            .copied()
            .filter(|s| {
                s.public_key() == public_key
                    && s.sig_type() == sig_type_name
                    && s.data_signed() == data_signed
                    && s.is_ecdsa() == sig_type.is_ecdsa()
            })
            .collect();

        if agreeing.len() < eligible.len() {
            tracing::warn!(
                public_key = %public_key,
                sig_type = %sig_type,
                dropped = eligible.len() - agreeing.len(),
                "Dropping shares that disagree with the quorum"
            );
        }
        if agreeing.len() < needed {
            return Err(QuorumError::NoValidShares {
                needed,
                have: agreeing.len(),
            });
        }

        let combined = if sig_type.is_ecdsa() {
            let shares: Vec<_> = agreeing
                .iter()
                .filter_map(|s| match s {
                    NodeShare::Ecdsa(share) => Some(share.clone()),
                    NodeShare::Frost(_) => None,
                })
                .collect();
            combine_ecdsa(sig_type, &shares)?
        } else {
            let shares: Vec<_> = agreeing
                .iter()
                .filter_map(|s| match s {
                    NodeShare::Frost(share) => Some(share.clone()),
                    NodeShare::Ecdsa(_) => None,
                })
                .collect();
            combine_frost(sig_type, &shares)?
        };

        tracing::debug!(
            sig_type = %sig_type,
            shares = agreeing.len(),
            "Combined signature"
        );

        Ok(CombinedSignature {
            public_key: public_key.to_string(),
            sig_type: sig_type_name.to_string(),
            signed_data: data_signed.to_string(),
            ..combined
        })
    }

    /// [`Self::combine`], retrying with shares dropped while the group still
    /// has more shares than `threshold`.
    pub fn combine_with_drop_budget(
        &self,
        shares: &[NodeShare],
        threshold: usize,
    ) -> QuorumResult<CombinedSignature> {
        let budget = shares.len().saturating_sub(threshold);
        self.combine_dropping(shares, threshold, budget)
    }

    fn combine_dropping(
        &self,
        shares: &[NodeShare],
        threshold: usize,
        budget: usize,
    ) -> QuorumResult<CombinedSignature> {
        let error = match self.combine(shares, threshold) {
            Ok(signature) => return Ok(signature),
            Err(error) => error,
        };
        if budget == 0 || !is_retryable(&error) {
            return Err(error);
        }

        // Culprits named by the combiner go first
        let mut remaining = shares.to_vec();
        let mut remaining_budget = budget;
        let mut last = error.clone();
        while let QuorumError::InvalidSignatureShare { peer_ids } = &last {
            let before = remaining.len();
            remaining.retain(|s| !peer_ids.iter().any(|p| p == s.peer_id()));
            let dropped = before - remaining.len();
            if dropped == 0 || dropped > remaining_budget {
                break;
            }
            tracing::warn!(peer_ids = ?peer_ids, "Dropping culprit shares and retrying");
            remaining_budget -= dropped;
            match self.combine(&remaining, threshold) {
                Ok(signature) => return Ok(signature),
                Err(next) => last = next,
            }
        }

        // Then every subset, smallest drop first, each tried once
        let mut attempts = 0;
        for drop_count in 1..=budget {
            let mut dropped: Vec<usize> = (0..drop_count).collect();
            loop {
                if attempts == MAX_DROP_ATTEMPTS {
                    tracing::warn!(
                        attempts,
                        shares = shares.len(),
                        "Giving up on dropping shares"
                    );
                    return Err(error);
                }
                attempts += 1;

                let subset: Vec<NodeShare> = shares
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| !dropped.contains(i))
                    .map(|(_, s)| s.clone())
                    .collect();
                if let Ok(signature) = self.combine(&subset, threshold) {
                    let dropped_peers: Vec<&str> =
                        dropped.iter().map(|&i| shares[i].peer_id()).collect();
                    tracing::warn!(
                        dropped_peers = ?dropped_peers,
                        "Combined after dropping shares"
                    );
                    return Ok(signature);
                }

                if !next_combination(&mut dropped, shares.len()) {
                    break;
                }
            }
        }

        Err(error)
    }

    /// Combine every named signature, collect claims and pick the response.
    ///
    /// Only values from nodes that reported success take part. Fewer than
    /// `threshold` of them is `NoValidShares`.
    pub fn combine_all(
        &self,
        values: &[ExecuteJsNodeValue],
        threshold: usize,
        strategy: &ResponseStrategy,
    ) -> QuorumResult<ExecuteJsOutcome> {
        let needed = threshold.max(1);
        let successful: Vec<&ExecuteJsNodeValue> = values.iter().filter(|v| v.success).collect();
        if successful.len() < needed {
            return Err(QuorumError::NoValidShares {
                needed,
                have: successful.len(),
            });
        }
        if successful.len() < values.len() {
            tracing::warn!(
                failed = values.len() - successful.len(),
                "Ignoring values from failed nodes"
            );
        }

        let mut groups: BTreeMap<String, Vec<NodeShare>> = BTreeMap::new();
        for value in &successful {
            for (name, raw) in &value.signed_data {
                let group = groups.entry(name.clone()).or_default();
                match normalize(raw) {
                    Ok(share) => group.push(share),
                    Err(error) => {
                        tracing::warn!(name = %name, error = %error, "Dropping malformed share");
                    }
                }
            }
        }

        let mut signatures: BTreeMap<String, QuorumResult<CombinedSignature>> = groups
            .into_iter()
            .map(|(name, shares)| {
                let result = self.combine_with_drop_budget(&shares, threshold);
                if let Err(error) = &result {
                    tracing::warn!(name = %name, error = %error, "Signature group failed");
                }
                (name, result)
            })
            .collect();

        let raw_responses: Vec<String> =
            successful.iter().map(|v| v.response_text()).collect();
        let extracted = response::extract_signatures(&raw_responses);
        if let Some(result) = response::combine_response_signatures(&extracted.signatures) {
            if let Err(error) = &result {
                tracing::warn!(error = %error, "Inline response signature unusable");
            }
            signatures.insert(response::RESPONSE_SIGNATURE.to_string(), result);
        }

        let chosen = strategy.resolve(&extracted.responses);
        let logs = chosen
            .as_ref()
            .and_then(|c| extracted.responses.iter().position(|r| r == c))
            .and_then(|i| successful.get(i))
            .or_else(|| successful.first())
            .map(|v| v.logs.clone())
            .unwrap_or_default();
        let response = match chosen {
            Some(text) if !text.is_empty() => {
                serde_json::from_str(&text).unwrap_or(Value::String(text))
            }
            _ => Value::Null,
        };

        let decrypted_data = consensus::most_common_json(
            successful
                .iter()
                .map(|v| &v.decrypted_data)
                .filter(|v| !v.is_null()),
        )
        .unwrap_or(Value::Null);

        Ok(ExecuteJsOutcome {
            success: true,
            signatures,
            claims: collect_claims(&successful),
            response,
            logs,
            decrypted_data,
        })
    }
}

/// Advance `indices` to the next `indices.len()`-combination of `0..n` in
/// lexicographic order. Returns `false` after the last one.
fn next_combination(indices: &mut [usize], n: usize) -> bool {
    let k = indices.len();
    for i in (0..k).rev() {
        if indices[i] < n - k + i {
            indices[i] += 1;
            for j in i + 1..k {
                indices[j] = indices[j - 1] + 1;
            }
            return true;
        }
    }
    false
}

fn is_retryable(error: &QuorumError) -> bool {
    matches!(
        error,
        QuorumError::InvalidSignatureShare { .. }
            | QuorumError::InvalidSignature(_)
            | QuorumError::CombineFailed(_)
            | QuorumError::Deserialization(_)
    )
}

/// Group claims by key, keeping node order.
fn collect_claims(values: &[&ExecuteJsNodeValue]) -> BTreeMap<String, ClaimResult> {
    let mut signatures: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    let mut key_ids: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for value in values {
        for (key, claim) in &value.claim_data {
            let entry = signatures.entry(key.clone()).or_default();
            match claim.get("signatures") {
                Some(Value::Array(items)) => entry.extend(items.iter().cloned()),
                Some(other) if !other.is_null() => entry.push(other.clone()),
                _ => {}
            }
            if let Some(signature) = claim.get("signature").filter(|s| !s.is_null()) {
                entry.push(signature.clone());
            }
            if let Some(id) = claim.get("derivedKeyId").and_then(Value::as_str) {
                key_ids.entry(key.clone()).or_default().push(id.to_string());
            }
        }
    }

    signatures
        .into_iter()
        .map(|(key, signatures)| {
            let derived_key_id = key_ids
                .remove(&key)
                .and_then(consensus::most_common)
                .unwrap_or_default();
            (
                key,
                ClaimResult {
                    signatures,
                    derived_key_id,
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shares::test_support::{ecdsa_shares, rogue_share, sha256};
    use crate::shares::types::EcdsaShare;
    use serde_json::json;

    fn wrap(shares: Vec<EcdsaShare>) -> Vec<NodeShare> {
        shares.into_iter().map(NodeShare::Ecdsa).collect()
    }

    fn wire(share: &EcdsaShare) -> Value {
        json!({
            "EcdsaSignedMessageShare": {
                "digest": share.digest.trim_start_matches("0x"),
                "result": "success",
                "share_id": share.share_id,
                "peer_id": share.peer_id,
                "signature_share": share.signature_share.to_uppercase().replace("0X", "0x"),
                "big_r": share.big_r,
                "compressed_public_key": "",
                "public_key": share.public_key,
                "sig_type": "K256"
            }
        })
    }

    #[test]
    fn test_combine_with_exact_quorum() {
        let (shares, _) = ecdsa_shares(&sha256(b"quorum"), 3);
        let combined = ShareCombiner::default().combine(&wrap(shares.clone()), 3).unwrap();
        assert_eq!(combined.public_key, shares[0].public_key);
        assert_eq!(combined.sig_type, "EcdsaK256Sha256");
        assert!(combined.recovery_id.is_some());
    }

    #[test]
    fn test_failed_shares_do_not_count() {
        let (shares, _) = ecdsa_shares(&sha256(b"failed"), 3);
        let mut shares = wrap(shares);
        shares[0].set_success(false);

        let err = ShareCombiner::default().combine(&shares, 3).unwrap_err();
        assert_eq!(err, QuorumError::NoValidShares { needed: 3, have: 2 });
    }

    #[test]
    fn test_minority_wrong_key_is_dropped_before_threshold_check() {
        let digest = sha256(b"wrong key");
        let (honest, _) = ecdsa_shares(&digest, 3);
        let (other, _) = ecdsa_shares(&digest, 1);
        let mut shares = wrap(honest);
        shares.push(NodeShare::Ecdsa(EcdsaShare {
            peer_id: "peer-x".to_string(),
            ..other[0].clone()
        }));

        let combined = ShareCombiner::default().combine(&shares, 3).unwrap();
        assert_eq!(combined.public_key, shares[0].public_key());

        // Same batch, but the threshold needs the stray share too
        let err = ShareCombiner::default().combine(&shares, 4).unwrap_err();
        assert_eq!(err, QuorumError::NoValidShares { needed: 4, have: 3 });
    }

    #[test]
    fn test_strict_majority_without_majority_fails() {
        let digest = sha256(b"split");
        let (a, _) = ecdsa_shares(&digest, 1);
        let (b, _) = ecdsa_shares(&digest, 1);
        let shares = wrap(vec![a[0].clone(), b[0].clone()]);

        let err = ShareCombiner::new(ConsensusMode::StrictMajority)
            .combine(&shares, 1)
            .unwrap_err();
        // Both shares were eligible; they just did not agree
        assert_eq!(err, QuorumError::NoValidShares { needed: 1, have: 2 });
    }

    #[test]
    fn test_drop_budget_recovers_from_rogue_share() {
        let digest = sha256(b"rogue");
        let (honest, _) = ecdsa_shares(&digest, 3);
        let rogue = rogue_share(&honest[0], "peer-rogue");
        let mut shares = wrap(honest);
        shares.insert(1, NodeShare::Ecdsa(rogue));

        let combiner = ShareCombiner::default();
        assert!(combiner.combine(&shares, 3).is_err());
        let combined = combiner.combine_with_drop_budget(&shares, 3).unwrap();
        assert!(combined.signature.starts_with("0x"));
    }

    #[test]
    fn test_drop_budget_exhausted() {
        let digest = sha256(b"exhausted");
        let (honest, _) = ecdsa_shares(&digest, 3);
        let mut shares = wrap(honest.clone());
        shares.push(NodeShare::Ecdsa(rogue_share(&honest[0], "rogue-1")));
        shares.push(NodeShare::Ecdsa(rogue_share(&honest[0], "rogue-2")));

        // Two rogue shares need a budget of two; threshold 4 leaves one
        let err = ShareCombiner::default()
            .combine_with_drop_budget(&shares, 4)
            .unwrap_err();
        assert!(matches!(err, QuorumError::InvalidSignature(_)));
    }

    #[test]
    fn test_combine_all_signature_groups_are_independent() {
        let (a, _) = ecdsa_shares(&sha256(b"a"), 3);
        let (b, _) = ecdsa_shares(&sha256(b"b"), 3);

        let values: Vec<ExecuteJsNodeValue> = (0..3)
            .map(|i| {
                let mut signed_data = BTreeMap::new();
                signed_data.insert("a".to_string(), wire(&a[i]));
                if i < 2 {
                    signed_data.insert("b".to_string(), wire(&b[i]));
                }
                ExecuteJsNodeValue {
                    success: true,
                    signed_data,
                    response: json!("ok"),
                    ..ExecuteJsNodeValue::default()
                }
            })
            .collect();

        let outcome = ShareCombiner::default()
            .combine_all(&values, 3, &ResponseStrategy::default())
            .unwrap();

        let sig_a = outcome.signatures["a"].as_ref().unwrap();
        assert_eq!(sig_a.signed_data, a[0].data_signed);
        assert_eq!(sig_a.sig_type, "K256");
        assert_eq!(
            outcome.signatures["b"].as_ref().unwrap_err(),
            &QuorumError::NoValidShares { needed: 3, have: 2 }
        );
        assert_eq!(outcome.combined().count(), 1);
        assert!(outcome.success);
    }

    #[test]
    fn test_combine_all_claims_and_response() {
        let values: Vec<ExecuteJsNodeValue> = ["r1", "r1", "r2"]
            .iter()
            .enumerate()
            .map(|(i, response)| {
                let mut claim_data = BTreeMap::new();
                claim_data.insert(
                    "login".to_string(),
                    json!({"signature": format!("sig-{i}"), "derivedKeyId": "kid"}),
                );
                ExecuteJsNodeValue {
                    success: true,
                    claim_data,
                    logs: format!("log-{i}"),
                    response: json!(response),
                    ..ExecuteJsNodeValue::default()
                }
            })
            .collect();

        let outcome = ShareCombiner::default()
            .combine_all(&values, 2, &ResponseStrategy::default())
            .unwrap();

        let claim = &outcome.claims["login"];
        assert_eq!(claim.derived_key_id, "kid");
        assert_eq!(
            claim.signatures,
            vec![json!("sig-0"), json!("sig-1"), json!("sig-2")]
        );
        assert_eq!(outcome.response, json!("r2"));
        assert_eq!(outcome.logs, "log-2");
        assert!(outcome.signatures.is_empty());
    }

    #[test]
    fn test_combine_all_parses_json_response() {
        let values = vec![
            ExecuteJsNodeValue {
                success: true,
                response: json!("{\"balance\":42}"),
                decrypted_data: json!({"plain": "x"}),
                ..ExecuteJsNodeValue::default()
            };
            3
        ];

        let outcome = ShareCombiner::default()
            .combine_all(&values, 3, &ResponseStrategy::MostCommon)
            .unwrap();
        assert_eq!(outcome.response, json!({"balance": 42}));
        assert_eq!(outcome.decrypted_data, json!({"plain": "x"}));
    }

    #[test]
    fn test_combine_all_drops_malformed_shares() {
        let (a, _) = ecdsa_shares(&sha256(b"malformed"), 2);
        let values: Vec<ExecuteJsNodeValue> = (0..3)
            .map(|i| {
                let mut signed_data = BTreeMap::new();
                let raw = if i < 2 { wire(&a[i]) } else { json!("garbage") };
                signed_data.insert("sig".to_string(), raw);
                ExecuteJsNodeValue {
                    success: true,
                    signed_data,
                    ..ExecuteJsNodeValue::default()
                }
            })
            .collect();

        let outcome = ShareCombiner::default()
            .combine_all(&values, 2, &ResponseStrategy::default())
            .unwrap();
        assert!(outcome.signatures["sig"].is_ok());
        assert_eq!(outcome.response, Value::Null);
    }

    fn response_value(success: bool, response: &str) -> ExecuteJsNodeValue {
        ExecuteJsNodeValue {
            success,
            response: json!(response),
            logs: format!("log {response}"),
            decrypted_data: json!(response),
            ..ExecuteJsNodeValue::default()
        }
    }

    #[test]
    fn test_failed_node_response_is_ignored() {
        let mut values = vec![response_value(true, "ok"); 3];
        values.push(response_value(false, "node crashed"));

        // leastCommon would pick the lone failed response if it were counted
        let outcome = ShareCombiner::default()
            .combine_all(&values, 3, &ResponseStrategy::default())
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.response, json!("ok"));
        assert_eq!(outcome.logs, "log ok");
        assert_eq!(outcome.decrypted_data, json!("ok"));
    }

    #[test]
    fn test_too_few_successful_values_is_an_error() {
        let mut values = vec![response_value(true, "ok"); 2];
        values.push(response_value(false, "node crashed"));

        let err = ShareCombiner::default()
            .combine_all(&values, 3, &ResponseStrategy::default())
            .unwrap_err();
        assert_eq!(err, QuorumError::NoValidShares { needed: 3, have: 2 });

        let all_failed = vec![response_value(false, "node crashed"); 4];
        let err = ShareCombiner::default()
            .combine_all(&all_failed, 3, &ResponseStrategy::default())
            .unwrap_err();
        assert_eq!(err, QuorumError::NoValidShares { needed: 3, have: 0 });
    }

    #[test]
    fn test_failed_node_shares_are_not_combined() {
        let (a, _) = ecdsa_shares(&sha256(b"failed node"), 3);
        let values: Vec<ExecuteJsNodeValue> = (0..4)
            .map(|i| {
                let mut signed_data = BTreeMap::new();
                let share = if i < 3 {
                    wire(&a[i])
                } else {
                    wire(&rogue_share(&a[0], "peer-failed"))
                };
                signed_data.insert("sig".to_string(), share);
                ExecuteJsNodeValue {
                    success: i < 3,
                    signed_data,
                    ..ExecuteJsNodeValue::default()
                }
            })
            .collect();

        let outcome = ShareCombiner::default()
            .combine_all(&values, 3, &ResponseStrategy::default())
            .unwrap();
        assert!(outcome.signatures["sig"].is_ok());
    }

    #[test]
    fn test_inline_response_signature_is_lifted() {
        let response = json!({"r": "aa", "s": "bb", "v": 27, "balance": 1}).to_string();
        let signed = json!({"signature": {"r": "aa", "s": "bb", "v": 27}, "balance": 1}).to_string();
        let values = vec![
            response_value(true, &signed),
            response_value(true, &signed),
            response_value(true, &response),
        ];

        let outcome = ShareCombiner::default()
            .combine_all(&values, 3, &ResponseStrategy::MostCommon)
            .unwrap();

        let signature = outcome.signatures[response::RESPONSE_SIGNATURE]
            .as_ref()
            .unwrap();
        assert_eq!(signature.signature, "0xaabb1b");
        assert_eq!(signature.recovery_id, Some(0));
        assert_eq!(outcome.response, json!({"balance": 1}));
    }

    #[test]
    fn test_next_combination_visits_each_subset_once() {
        let mut indices = vec![0, 1];
        let mut seen = vec![indices.clone()];
        while next_combination(&mut indices, 5) {
            seen.push(indices.clone());
        }
        assert_eq!(seen.len(), 10);
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert!(seen.iter().all(|c| c[0] < c[1] && c[1] < 5));
    }

    #[test]
    fn test_drop_search_is_bounded() {
        let digest = sha256(b"all rogue");
        let (honest, _) = ecdsa_shares(&digest, 1);
        let shares: Vec<NodeShare> = (0..8)
            .map(|i| NodeShare::Ecdsa(rogue_share(&honest[0], &format!("rogue-{i}"))))
            .collect();

        // Budget 5 over 8 shares is 218 subsets; the search stops at the cap
        let started = std::time::Instant::now();
        let err = ShareCombiner::default()
            .combine_with_drop_budget(&shares, 3)
            .unwrap_err();
        assert!(matches!(err, QuorumError::InvalidSignature(_)));
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }
}
