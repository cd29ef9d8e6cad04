//! Share normalization.
//!
//! Nodes report shares in several shapes: wrapped in a scheme envelope
//! (`{"EcdsaSignedMessageShare": {...}}`) or flat, with snake_case or
//! camelCase keys, byte strings as hex with or without `0x`, as JSON-quoted
//! hex, or as arrays of byte values. Everything here maps those shapes to a
//! single canonical form so that equal shares compare equal:
//!
//! - keys are camelCase
//! - byte fields are lowercase `0x`-prefixed hex
//! - `dataSigned` carries the digest (ECDSA) or message (FROST)
//! - the node's `result` string becomes the boolean `success`

use serde_json::{Map, Value};

use crate::error::{QuorumError, QuorumResult};
use crate::shares::types::{EcdsaShare, FrostShare, NodeShare};

pub const ECDSA_ENVELOPE: &str = "EcdsaSignedMessageShare";
pub const FROST_ENVELOPE: &str = "FrostSignedMessageShare";

/// Fields whose string values are byte strings.
const BYTE_FIELDS: &[&str] = &[
    "digest",
    "message",
    "shareId",
    "signatureShare",
    "bigR",
    "compressedPublicKey",
    "publicKey",
    "signingCommitments",
    "verifyingShare",
];

/// Normalize and decode one raw node share.
pub fn normalize(raw: &Value) -> QuorumResult<NodeShare> {
    let (envelope, fields) = unwrap_envelope(raw)?;
    let canonical = canonicalize_fields(fields);

    let family = match envelope {
        Some(ECDSA_ENVELOPE) => Family::Ecdsa,
        Some(FROST_ENVELOPE) => Family::Frost,
        Some(other) => {
            return Err(QuorumError::InvalidShareShape(format!(
                "Unrecognized share envelope '{other}'"
            )));
        }
        None if canonical.contains_key("bigR") => Family::Ecdsa,
        None if canonical.contains_key("signingCommitments") => Family::Frost,
        None => {
            return Err(QuorumError::InvalidShareShape(
                "Share carries neither bigR nor signingCommitments".to_string(),
            ));
        }
    };

    let value = Value::Object(canonical);
    let share = match family {
        Family::Ecdsa => NodeShare::Ecdsa(decode::<EcdsaShare>(value)?),
        Family::Frost => NodeShare::Frost(decode::<FrostShare>(value)?),
    };

    if share.public_key().is_empty() || share.sig_type().is_empty() {
        return Err(QuorumError::InvalidShareShape(
            "Share is missing publicKey or sigType".to_string(),
        ));
    }

    Ok(share)
}

/// Normalize a raw share into its canonical flat JSON object without
/// decoding it into a typed share.
pub fn normalize_value(raw: &Value) -> QuorumResult<Value> {
    let (_, fields) = unwrap_envelope(raw)?;
    Ok(Value::Object(canonicalize_fields(fields)))
}

enum Family {
    Ecdsa,
    Frost,
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> QuorumResult<T> {
    serde_json::from_value(value).map_err(|e| QuorumError::InvalidShareShape(e.to_string()))
}

/// Split an optional single-key envelope from the share body.
fn unwrap_envelope(raw: &Value) -> QuorumResult<(Option<&str>, &Map<String, Value>)> {
    let object = raw.as_object().ok_or_else(|| {
        QuorumError::InvalidShareShape("Share is not a JSON object".to_string())
    })?;

    if object.len() == 1 {
        if let Some((key, Value::Object(inner))) = object.iter().next() {
            return Ok((Some(key.as_str()), inner));
        }
    }

    Ok((None, object))
}

fn canonicalize_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::with_capacity(fields.len() + 1);
    let mut result = None;

    for (key, value) in fields {
        let key = snake_to_camel(key);
        if key == "result" {
            result = Some(value.clone());
            continue;
        }
        let value = canonical_value(&key, value);
        out.insert(key, value);
    }

    let data_signed = out.get("digest").or_else(|| out.get("message")).cloned();
    if let Some(data_signed) = data_signed {
        out.insert("dataSigned".to_string(), data_signed);
    }

    match result {
        Some(Value::String(result)) => {
            out.insert(
                "success".to_string(),
                Value::Bool(result.eq_ignore_ascii_case("success")),
            );
        }
        Some(Value::Bool(ok)) => {
            out.insert("success".to_string(), Value::Bool(ok));
        }
        _ => {}
    }

    out
}

fn canonical_value(key: &str, value: &Value) -> Value {
    match value {
        Value::Array(items) => match byte_array_to_hex(items) {
            Some(hex) => Value::String(hex),
            None => value.clone(),
        },
        Value::String(s) => Value::String(canonical_string(key, s)),
        _ => value.clone(),
    }
}

/// `[1, 2, 255]` -> `"0x0102ff"`; `None` if any element is not a byte.
fn byte_array_to_hex(items: &[Value]) -> Option<String> {
    if items.is_empty() {
        return None;
    }
    let bytes = items
        .iter()
        .map(|item| item.as_u64().and_then(|n| u8::try_from(n).ok()))
        .collect::<Option<Vec<u8>>>()?;
    Some(format!("0x{}", hex::encode(bytes)))
}

fn canonical_string(key: &str, s: &str) -> String {
    let s = strip_quotes(s.trim());

    // Some node versions send bigR as an encoded `{"affine_point": ...}` object
    if key == "bigR" && s.starts_with('{') {
        if let Some(point) = serde_json::from_str::<Value>(s)
            .ok()
            .and_then(|v| v.get("affine_point").and_then(Value::as_str).map(str::to_string))
        {
            return canonical_string(key, &point);
        }
    }

    if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if is_hex(rest) {
            return format!("0x{}", rest.to_ascii_lowercase());
        }
        return s.to_string();
    }

    if BYTE_FIELDS.contains(&key) && !s.is_empty() && s.len() % 2 == 0 && is_hex(s) {
        return format!("0x{}", s.to_ascii_lowercase());
    }

    s.to_string()
}

fn strip_quotes(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(s)
}

fn is_hex(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_hexdigit())
}

fn snake_to_camel(key: &str) -> String {
    if !key.contains('_') {
        return key.to_string();
    }
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '_' {
            upper = !out.is_empty();
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
