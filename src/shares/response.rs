//! Signatures returned inline in executeJs responses.
//!
//! User code can return an already-combined `{r, s, v}` signature in its
//! response instead of signing through `signedData`. Such objects are lifted
//! out before the response strategy runs, so only the remaining payload is
//! voted on. They are looked for in three places:
//! - the whole response is the signature
//! - under a `signature` key, as an object or a JSON-encoded string
//! - as any other top-level value of the response object

use serde_json::{Map, Value, json};

use crate::error::{QuorumError, QuorumResult};
use crate::network::consensus;
use crate::shares::types::{CombinedSignature, SigType};

/// Name under which an inline response signature is reported.
pub const RESPONSE_SIGNATURE: &str = "response_signature";

/// Node responses with inline signatures removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedResponses {
    /// One response text per input, in input order.
    pub responses: Vec<String>,
    pub signatures: Vec<Value>,
}

/// Lift inline signatures out of raw response texts.
///
/// Responses that are not JSON objects, or carry no signature, are kept
/// byte-for-byte.
pub fn extract_signatures(responses: &[String]) -> ExtractedResponses {
    let mut extracted = ExtractedResponses::default();
    for text in responses {
        let cleaned = match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(object)) => strip_signatures(object, &mut extracted.signatures),
            _ => None,
        };
        extracted.responses.push(cleaned.unwrap_or_else(|| text.clone()));
    }
    extracted
}

/// Package the most common inline signature, if any were found.
pub fn combine_response_signatures(
    signatures: &[Value],
) -> Option<QuorumResult<CombinedSignature>> {
    consensus::most_common_json(signatures).map(|chosen| package(&chosen))
}

fn strip_signatures(mut object: Map<String, Value>, found: &mut Vec<Value>) -> Option<String> {
    if is_signature_object(&object) {
        found.push(Value::Object(object));
        return Some(json!({"success": true}).to_string());
    }

    if let Some(field) = object.get("signature").filter(|v| is_present(v)) {
        let parsed = match field {
            Value::String(s) => serde_json::from_str::<Value>(s).ok(),
            other => Some(other.clone()),
        };
        return match parsed {
            Some(Value::Object(signature)) if is_signature_object(&signature) => {
                found.push(Value::Object(signature));
                object.remove("signature");
                Some(Value::Object(object).to_string())
            }
            _ => None,
        };
    }

    let keys: Vec<String> = object
        .iter()
        .filter(|(_, v)| v.as_object().is_some_and(is_signature_object))
        .map(|(k, _)| k.clone())
        .collect();
    if keys.is_empty() {
        return None;
    }
    for key in keys {
        if let Some(signature) = object.remove(&key) {
            found.push(signature);
        }
    }
    Some(Value::Object(object).to_string())
}

fn is_signature_object(object: &Map<String, Value>) -> bool {
    ["r", "s", "v"].iter().all(|k| object.contains_key(*k))
}

fn is_present(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
        && value.as_str().is_none_or(|s| !s.is_empty())
}

fn package(signature: &Value) -> QuorumResult<CombinedSignature> {
    let r = scalar_hex(signature, "r")?;
    let s = scalar_hex(signature, "s")?;
    let v = recovery_byte(&signature["v"])?;

    Ok(CombinedSignature {
        signature: format!("0x{r}{s}{v:02x}"),
        public_key: String::new(),
        sig_type: SigType::EcdsaK256Sha256.to_string(),
        // 27/28 legacy Ethereum form
        recovery_id: Some(if v >= 27 { v - 27 } else { v }),
        verifying_key: None,
        signed_data: String::new(),
    })
}

fn scalar_hex(signature: &Value, component: &str) -> QuorumResult<String> {
    let raw = signature[component].as_str().ok_or_else(|| {
        QuorumError::InvalidShareShape(format!("Response signature '{component}' is not a string"))
    })?;
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(QuorumError::InvalidShareShape(format!(
            "Response signature '{component}' is not hex"
        )));
    }
    Ok(digits.to_ascii_lowercase())
}

fn recovery_byte(v: &Value) -> QuorumResult<u8> {
    let number = match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    number
        .and_then(|n| u8::try_from(n).ok())
        .ok_or_else(|| QuorumError::InvalidShareShape(format!("Invalid recovery value {v}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(values: &[Value]) -> Vec<String> {
        values
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_whole_response_is_signature() {
        let extracted = extract_signatures(&texts(&[json!({"r": "0xAA", "s": "bb", "v": 27})]));
        assert_eq!(extracted.signatures, vec![json!({"r": "0xAA", "s": "bb", "v": 27})]);
        assert_eq!(extracted.responses, vec!["{\"success\":true}".to_string()]);
    }

    #[test]
    fn test_signature_key_is_removed() {
        let encoded = json!({"r": "aa", "s": "bb", "v": 0}).to_string();
        let extracted = extract_signatures(&texts(&[
            json!({"signature": encoded, "balance": 5}),
            json!({"signature": {"r": "aa", "s": "bb", "v": 0}, "balance": 5}),
        ]));
        assert_eq!(extracted.signatures.len(), 2);
        assert_eq!(extracted.responses, vec!["{\"balance\":5}"; 2]);
    }

    #[test]
    fn test_nested_signatures_are_removed() {
        let extracted = extract_signatures(&texts(&[json!({
            "first": {"r": "aa", "s": "bb", "v": 1},
            "second": {"r": "cc", "s": "dd", "v": 0},
            "note": "kept"
        })]));
        assert_eq!(extracted.signatures.len(), 2);
        assert_eq!(extracted.responses, vec!["{\"note\":\"kept\"}".to_string()]);
    }

    #[test]
    fn test_plain_responses_are_untouched() {
        let raw = vec![
            "not json".to_string(),
            "42".to_string(),
            "{\"signature\":\"opaque\"}".to_string(),
            "{\"r\":\"aa\",\"s\":\"bb\"}".to_string(),
        ];
        let extracted = extract_signatures(&raw);
        assert!(extracted.signatures.is_empty());
        assert_eq!(extracted.responses, raw);
    }

    #[test]
    fn test_package_most_common_signature() {
        let signatures = vec![
            json!({"r": "0xAA", "s": "bb", "v": 28}),
            json!({"r": "0xAA", "s": "bb", "v": 28}),
            json!({"r": "cc", "s": "dd", "v": 27}),
        ];
        let combined = combine_response_signatures(&signatures).unwrap().unwrap();
        assert_eq!(combined.signature, "0xaabb1c");
        assert_eq!(combined.recovery_id, Some(1));
        assert_eq!(combined.sig_type, "EcdsaK256Sha256");
    }

    #[test]
    fn test_package_rejects_non_hex_component() {
        let result = combine_response_signatures(&[json!({"r": "zz", "s": "bb", "v": 0})]);
        assert!(matches!(result, Some(Err(QuorumError::InvalidShareShape(_)))));
        assert!(combine_response_signatures(&[]).is_none());
    }
}
