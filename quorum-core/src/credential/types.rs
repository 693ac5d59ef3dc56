use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::with_errors::thiserror::{self, Error};

use crate::codec::types::CodecError;
use crate::escrow::EscrowError;

/// Status type of credentials tracked by a registry
pub const REGISTRY_TYPE: &str = "KERICredentialRegistry";

/// Registry configuration trait, the registry has no backers
pub const NO_BACKERS: &str = "NB";

/// CredentialError is a base error types for the `credential` domain
#[derive(Debug, PartialEq, Error, Clone, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum CredentialError {
    #[error("unknown error: {0}")]
    UnknownError(String),

    #[error("repository error: {0}")]
    RepoError(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("schema validation failed: {0}")]
    SchemaValidation(String),

    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    #[error("invalid registry event: {0}")]
    InvalidEvent(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("escrow error: {0}")]
    Escrow(#[from] EscrowError),
}

/// A credential registry managed by an issuer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Registry {
    pub name: String,
    pub regk: String,
    pub pre: String,
    pub vcp: Vec<u8>,
}

/// Resolves a schema by its identifier, `None` when the schema is unknown
#[async_trait]
pub trait SchemaResolverBuilder: Clone + Send + Sync {
    async fn resolve(&self, said: &str) -> Result<Option<Vec<u8>>, CredentialError>;
}

#[async_trait]
pub trait RegistryRepoBuilder: Clone + Send + Sync {
    async fn save_registry(&self, registry: &Registry) -> Result<(), CredentialError>;
    async fn get_registry(&self, regk: &str) -> Result<Option<Registry>, CredentialError>;
    async fn registry_by_name(&self, name: &str) -> Result<Option<Registry>, CredentialError>;

    /// Store an accepted transaction event of `pre` at sequence `sn`
    async fn save_tel_event(&self, pre: &str, sn: u64, raw: &[u8]) -> Result<(), CredentialError>;

    /// Accepted transaction events of `pre` ordered by sequence number
    async fn tel_events(&self, pre: &str) -> Result<Vec<Vec<u8>>, CredentialError>;

    async fn save_credential(&self, said: &str, raw: &[u8]) -> Result<(), CredentialError>;
    async fn get_credential(&self, said: &str) -> Result<Option<Vec<u8>>, CredentialError>;
}
