use rst_common::standard::async_trait::async_trait;
use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::uuid::Uuid;
use rst_common::with_errors::thiserror::{self, Error};

use crate::codec::types::CodecError;
use crate::escrow::EscrowError;

/// RelayError is a base error types for the `relay` domain
#[derive(Debug, PartialEq, Error, Clone, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum RelayError {
    #[error("unknown error: {0}")]
    UnknownError(String),

    #[error("repository error: {0}")]
    RepoError(String),

    #[error("transport error: {0}")]
    TransportError(String),

    #[error("message not found: {0}")]
    NotFound(String),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("escrow error: {0}")]
    Escrow(#[from] EscrowError),
}

/// Topic used between members of the same group
pub const TOPIC_MULTISIG: &str = "multisig";

/// Topic used to forward credentials and their event logs
pub const TOPIC_CREDENTIAL: &str = "credential";

/// One outbound message for one recipient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Postage {
    pub id: String,
    pub said: String,
    pub src: String,
    pub dest: String,
    pub topic: String,
    pub message: Vec<u8>,
    pub delivered: bool,
    pub created_at: DateTime<Utc>,
}

impl Postage {
    pub fn new(said: &str, src: &str, dest: &str, topic: &str, message: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            said: said.to_string(),
            src: src.to_string(),
            dest: dest.to_string(),
            topic: topic.to_string(),
            message,
            delivered: false,
            created_at: Utc::now(),
        }
    }
}

/// Durable queue of postages
///
/// Postages are appended and marked delivered, never removed.
#[async_trait]
pub trait PostageRepoBuilder: Clone + Send + Sync {
    async fn save_postage(&self, postage: &Postage) -> Result<(), RelayError>;
    async fn list_postages(&self) -> Result<Vec<Postage>, RelayError>;
    async fn postages_by_said(&self, said: &str) -> Result<Vec<Postage>, RelayError>;
}

/// Raw transport towards other agents, mailbox and http delivery live behind it
#[async_trait]
pub trait TransportBuilder: Clone + Send + Sync {
    async fn deliver(&self, postage: &Postage) -> Result<(), RelayError>;
}

/// Storage of received and endorsed `exn` messages with their attachments
#[async_trait]
pub trait ExchangeRepoBuilder: Clone + Send + Sync {
    async fn save_message(&self, said: &str, message: &[u8]) -> Result<(), RelayError>;
    async fn get_message(&self, said: &str) -> Result<Option<Vec<u8>>, RelayError>;
}
