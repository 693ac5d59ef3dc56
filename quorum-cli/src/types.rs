use rst_common::with_errors::thiserror::{self, Error};

use prople_quorum_core::confirm::ConfirmError;
use prople_quorum_core::credential::CredentialError;
use prople_quorum_core::group::GroupError;
use prople_quorum_core::notification::NotificationError;
use prople_quorum_core::relay::RelayError;

pub const QUORUM_DEFAULT_DIR: &str = ".quorum";
pub const QUORUM_DEFAULT_BASE: &str = "default";
pub const QUORUM_DB_EXT: &str = "redb";

#[derive(Debug, Error)]
pub enum CliError {
    #[error("homedir error: {0}")]
    HomeDirError(String),

    #[error("database error: {0}")]
    DBError(String),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("usage error: {0}")]
    Usage(String),

    #[error("bundle error: {0}")]
    BundleError(String),

    #[error("table error: {0}")]
    TableError(String),

    #[error(transparent)]
    Confirm(#[from] ConfirmError),

    #[error(transparent)]
    Group(#[from] GroupError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Notification(#[from] NotificationError),
}
