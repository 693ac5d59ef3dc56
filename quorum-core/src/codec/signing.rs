use std::collections::BTreeMap;

use prople_crypto::eddsa::pubkey::PubKey;
use prople_crypto::types::ByteHex;

use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;

use super::serder::Serder;
use super::types::CodecError;

/// Indexed signature, `index` is the position of the signing key in the key list
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Siger {
    #[serde(rename = "i")]
    pub index: u32,

    #[serde(rename = "s")]
    pub signature: String,
}

impl Siger {
    pub fn new(index: u32, signature: String) -> Self {
        Self { index, signature }
    }
}

/// Signatures grouped per embedded message path
pub type Pathed = BTreeMap<String, Vec<Siger>>;

/// `Attachment` carries the signatures that travel after a serialized event
///
/// `sigers` sign the message itself, `pathed` sign the embedded messages
/// labelled by their path inside the `e` section.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Attachment {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sigers: Vec<Siger>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub pathed: Pathed,
}

impl Attachment {
    pub fn new(sigers: Vec<Siger>) -> Self {
        Self {
            sigers,
            pathed: BTreeMap::new(),
        }
    }

    pub fn with_path(mut self, path: &str, sigers: Vec<Siger>) -> Self {
        self.pathed.insert(path.to_string(), sigers);
        self
    }

    pub fn path(&self, path: &str) -> Vec<Siger> {
        self.pathed.get(path).cloned().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.sigers.is_empty() && self.pathed.is_empty()
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        if self.is_empty() {
            return Ok(Vec::new());
        }

        serde_json::to_vec(self).map_err(|err| CodecError::EncodeError(err.to_string()))
    }

    pub fn decode(raw: &[u8]) -> Result<Self, CodecError> {
        if raw.iter().all(|byte| byte.is_ascii_whitespace()) {
            return Ok(Self::default());
        }

        serde_json::from_slice(raw).map_err(|err| CodecError::DecodeError(err.to_string()))
    }
}

/// Join a serialized event with its attachment into one message
pub fn messagize(serder: &Serder, attachment: &Attachment) -> Result<Vec<u8>, CodecError> {
    let mut msg = serder.raw().to_vec();
    msg.extend(attachment.encode()?);
    Ok(msg)
}

/// Split a message built by [`messagize`]
pub fn parse_message(msg: &[u8]) -> Result<(Serder, Attachment), CodecError> {
    let serder = Serder::from_raw(msg)?;
    let attachment = Attachment::decode(&msg[serder.size()..])?;
    Ok((serder, attachment))
}

/// `Verfer` verifies ed25519 signatures made by a single public key
#[derive(Debug, Clone, PartialEq)]
pub struct Verfer {
    key: String,
}

impl Verfer {
    /// `key` is the hex encoded ed25519 public key
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn verify(&self, message: &[u8], signature: &str) -> bool {
        let pubkey = match PubKey::from_hex(ByteHex::from(self.key.clone())) {
            Ok(val) => val,
            Err(_) => return false,
        };

        pubkey
            .verify(message, ByteHex::from(signature.to_string()))
            .unwrap_or(false)
    }
}
