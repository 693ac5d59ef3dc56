use std::fmt;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::Value;
use rst_common::with_errors::thiserror::{self, Error};

use crate::codec::types::CodecError;
use crate::codec::{Serder, Siger};

/// EscrowError is a base error types for the `escrow` domain
#[derive(Debug, PartialEq, Error, Clone, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum EscrowError {
    #[error("unknown error: {0}")]
    UnknownError(String),

    #[error("repository error: {0}")]
    RepoError(String),

    #[error("escrow entry not found: {0}")]
    NotFound(String),

    #[error("conflicting said for {key}: escrowed {escrowed}, given {given}")]
    Conflict {
        key: String,
        escrowed: String,
        given: String,
    },

    #[error("invalid material: {0}")]
    InvalidMaterial(String),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Identifies one escrowed artifact, an identifier prefix and a sequence number
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct EscrowKey {
    pub pre: String,
    pub sn: u64,
}

impl EscrowKey {
    pub fn new(pre: &str, sn: u64) -> Self {
        Self {
            pre: pre.to_string(),
            sn,
        }
    }

    /// Key of the event held by `serder`, from its `i` and `s` fields
    pub fn from_serder(serder: &Serder) -> Result<Self, CodecError> {
        Ok(Self {
            pre: serder.require_pre()?,
            sn: serder.sn()?,
        })
    }
}

impl fmt::Display for EscrowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:032x}", self.pre, self.sn)
    }
}

/// Evidence required before an escrowed artifact is complete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde", tag = "type", rename_all = "snake_case")]
pub enum Material {
    /// Complete once `sigers` by `keys` satisfy the threshold `sith`
    Signed {
        keys: Vec<String>,
        sith: Value,
        sigers: Vec<Siger>,
    },

    /// Complete once the anchoring key event `anchor` is complete with `anchor_said`
    Anchored {
        anchor: EscrowKey,
        anchor_said: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct EscrowEntry {
    pub key: EscrowKey,
    pub said: String,
    pub ilk: String,
    pub raw: Vec<u8>,
    pub material: Material,
}

impl EscrowEntry {
    pub fn serder(&self) -> Result<Serder, CodecError> {
        Serder::from_raw(&self.raw)
    }

    pub fn sigers(&self) -> Vec<Siger> {
        match &self.material {
            Material::Signed { sigers, .. } => sigers.clone(),
            Material::Anchored { .. } => Vec::new(),
        }
    }
}

/// Durable storage of escrow entries and completion markers
///
/// Entries are never deleted, a completion marker only ever gets written once per key.
#[async_trait]
pub trait EscrowRepoBuilder: Clone + Send + Sync {
    async fn save_entry(&self, entry: &EscrowEntry) -> Result<(), EscrowError>;
    async fn get_entry(&self, key: &EscrowKey) -> Result<Option<EscrowEntry>, EscrowError>;
    async fn list_entries(&self) -> Result<Vec<EscrowEntry>, EscrowError>;
    async fn save_completion(&self, key: &EscrowKey, said: &str) -> Result<(), EscrowError>;
    async fn get_completion(&self, key: &EscrowKey) -> Result<Option<String>, EscrowError>;
}
