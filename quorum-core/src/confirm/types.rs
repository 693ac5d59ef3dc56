use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::with_errors::thiserror::{self, Error};

use crate::codec::types::CodecError;
use crate::credential::{
    CredentialError, RegistryRepoBuilder, SchemaResolverBuilder,
};
use crate::escrow::{EscrowError, EscrowRepoBuilder};
use crate::group::{GroupError, HaberyBuilder};
use crate::notification::{Notice, NoticeID, NotificationError, NotificationRepoBuilder};
use crate::relay::{ExchangeRepoBuilder, PostageRepoBuilder, RelayError, TransportBuilder};

use super::summary::Summary;

/// ConfirmError is a base error types for the `confirm` domain
///
/// `Usage`, `Validation` and `Configuration` classify failures of a single
/// proposal, none of them stops the confirmation loop.
#[derive(Debug, PartialEq, Error, Clone, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum ConfirmError {
    #[error("unknown error: {0}")]
    UnknownError(String),

    #[error("usage error: {0}")]
    Usage(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("decision error: {0}")]
    Decision(String),

    #[error("repository error: {0}")]
    RepoError(String),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("escrow error: {0}")]
    Escrow(#[from] EscrowError),

    #[error("group error: {0}")]
    Group(#[from] GroupError),

    #[error("relay error: {0}")]
    Relay(#[from] RelayError),

    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("notification error: {0}")]
    Notification(#[from] NotificationError),
}

/// How a handler finished with a proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Approved and committed, the notice can go
    Completed,

    /// Rejected by the operator or not addressed to a local member
    Declined,

    /// Approved but the completion predicate did not hold within the wait policy
    TimedOut,

    Cancelled,
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed)
    }
}

/// What a single scan over the pending notices did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanReport {
    pub scanned: usize,
    pub completed: Vec<NoticeID>,
    pub discarded: Vec<NoticeID>,
    pub retained: Vec<NoticeID>,
    pub skipped: Vec<NoticeID>,
    pub failed: Vec<(NoticeID, ConfirmError)>,
}

impl ScanReport {
    pub fn removed(&self) -> usize {
        self.completed.len() + self.discarded.len()
    }
}

/// Display only information about another participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Contact {
    pub pre: String,
    pub alias: String,
}

#[async_trait]
pub trait ContactDirectory: Clone + Send + Sync {
    async fn get(&self, pre: &str) -> Result<Option<Contact>, ConfirmError>;
}

/// Source of every operator decision taken while confirming proposals
///
/// A terminal prompt, a scripted double or an automated policy can stand behind
/// it, the confirmation loop does not know which.
#[async_trait]
pub trait DecisionProvider: Clone + Send + Sync {
    /// Approve or decline the proposal described by `summary`
    async fn approve(&self, summary: &Summary) -> Result<bool, ConfirmError>;

    /// Alias for a group identifier created or joined locally
    async fn alias(&self, prompt: &str) -> Result<String, ConfirmError>;

    async fn registry_name(&self, prompt: &str) -> Result<String, ConfirmError>;

    /// Whether a notice whose proposal did not complete should be removed anyway
    async fn discard(&self, notice: &Notice) -> Result<bool, ConfirmError>;

    /// Informational message for the operator
    async fn report(&self, message: &str);
}

/// Every collaborator the confirmation loop needs, bundled by the host application
pub trait Components: Clone + Send + Sync {
    type Store: HaberyBuilder;
    type Escrow: EscrowRepoBuilder;
    type Notices: NotificationRepoBuilder;
    type Postages: PostageRepoBuilder;
    type Transport: TransportBuilder;
    type Exchanges: ExchangeRepoBuilder;
    type Registries: RegistryRepoBuilder;
    type Schemas: SchemaResolverBuilder;
    type Contacts: ContactDirectory;

    fn store(&self) -> Self::Store;
    fn escrow(&self) -> Self::Escrow;
    fn notices(&self) -> Self::Notices;
    fn postages(&self) -> Self::Postages;
    fn transport(&self) -> Self::Transport;
    fn exchanges(&self) -> Self::Exchanges;
    fn registries(&self) -> Self::Registries;
    fn schemas(&self) -> Self::Schemas;
    fn contacts(&self) -> Self::Contacts;
}
