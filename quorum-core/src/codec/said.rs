use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use rst_common::standard::serde_json::Value;
use rst_common::with_cryptography::blake3;

use super::serder::dumps;
use super::types::{CodecError, Ked, Kind, DIGEST_CODE, SAID_DUMMY, SAID_SIZE};
use super::version::versify;

/// Blake3-256 digest of `data` encoded as a fully qualified base64 text
///
/// The 32 digest bytes are prefixed with one zero byte before encoding,
/// which yields 44 characters whose first character is then replaced with
/// the derivation code.
pub fn digest(data: &[u8]) -> String {
    let hashed = blake3::hash(data);

    let mut padded = Vec::with_capacity(33);
    padded.push(0u8);
    padded.extend_from_slice(hashed.as_bytes());

    let encoded = URL_SAFE_NO_PAD.encode(padded);
    format!("{}{}", DIGEST_CODE, &encoded[1..])
}

fn dummy() -> String {
    SAID_DUMMY.to_string().repeat(SAID_SIZE)
}

/// Compute the self-addressing identifier of `ked` over `labels`
///
/// Every label is replaced with a placeholder of the final identifier size and,
/// when the map carries a version string, it is recomputed for a JSON
/// serialization. The digest always runs over canonical JSON, so the same
/// logical fields produce the same identifier whatever kind they travel in.
pub fn compute_said_with(ked: &Ked, labels: &[&str]) -> Result<String, CodecError> {
    let mut sed = ked.clone();
    for label in labels {
        if !sed.contains_key(*label) {
            return Err(CodecError::MissingField(label.to_string()));
        }

        sed.insert(label.to_string(), Value::from(dummy()));
    }

    if sed.contains_key("v") {
        sed.insert("v".to_string(), Value::from(versify(Kind::Json, 0)));
        let size = dumps(&sed, Kind::Json)?.len();
        sed.insert("v".to_string(), Value::from(versify(Kind::Json, size)));
    }

    let raw = dumps(&sed, Kind::Json)?;
    Ok(digest(&raw))
}

pub fn compute_said(ked: &Ked, label: &str) -> Result<String, CodecError> {
    compute_said_with(ked, &[label])
}

/// Compute and embed the identifier into every label of `ked`
pub fn saidify_with(mut ked: Ked, labels: &[&str]) -> Result<(String, Ked), CodecError> {
    let said = compute_said_with(&ked, labels)?;
    for label in labels {
        ked.insert(label.to_string(), Value::from(said.clone()));
    }

    Ok((said, ked))
}

pub fn saidify(ked: Ked, label: &str) -> Result<(String, Ked), CodecError> {
    saidify_with(ked, &[label])
}

/// Check that the value stored under `label` is the identifier of `ked`
pub fn verify_said(ked: &Ked, label: &str) -> bool {
    let current = match ked.get(label).and_then(|val| val.as_str()) {
        Some(val) => val.to_string(),
        None => return false,
    };

    compute_said(ked, label)
        .map(|said| said == current)
        .unwrap_or(false)
}
