use derive_more::{AsRef, From, Into};
use the_newtype::Newtype;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::uuid::Uuid;
use rst_common::with_errors::thiserror::{self, Error};

use crate::codec::Ked;

/// NotificationError is a base error types for the `notification` domain
#[derive(Debug, PartialEq, Error, Clone, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum NotificationError {
    #[error("unknown error: {0}")]
    UnknownError(String),

    #[error("repository error: {0}")]
    RepoError(String),

    #[error("notice not found: {0}")]
    NotFound(String),

    #[error("invalid proposal: {0}")]
    InvalidProposal(String),
}

/// Unique identifier of a notice
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Newtype, From, Into, AsRef)]
#[serde(crate = "self::serde")]
pub struct NoticeID(String);

impl NoticeID {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_validated(id: String) -> Self {
        Self(id)
    }

    pub fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A pending notification, `attrs.r` holds the route of the proposal it announces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Notice {
    pub id: NoticeID,
    pub attrs: Ked,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

impl Notice {
    pub fn new(attrs: Ked) -> Self {
        Self {
            id: NoticeID::generate(),
            attrs,
            created_at: Utc::now(),
            read: false,
        }
    }

    pub fn route(&self) -> Option<&str> {
        self.attrs.get("r").and_then(|val| val.as_str())
    }
}

/// Repository abstraction of the notification store.
///
/// Notices are written by the inbound message processing and read by the
/// confirmation loop, which only ever removes them by key.
#[async_trait]
pub trait NotificationRepoBuilder: Clone + Send + Sync {
    /// Save a new notice
    ///
    /// # Arguments
    /// * `notice` - The notice built from an inbound proposal
    ///
    /// # Returns
    /// * `Ok(())` - Notice persisted
    /// * `Err(NotificationError)` - The store failed
    async fn save_notice(&self, notice: &Notice) -> Result<(), NotificationError>;

    /// All stored notices, in store order
    async fn list_notices(&self) -> Result<Vec<Notice>, NotificationError>;

    /// Load a specific notice
    ///
    /// # Arguments
    /// * `id` - Unique identifier of the notice
    ///
    /// # Returns
    /// * `Ok(Some(Notice))` - The notice
    /// * `Ok(None)` - No notice with this identifier
    /// * `Err(NotificationError)` - The store failed
    async fn get_notice(&self, id: &NoticeID) -> Result<Option<Notice>, NotificationError>;

    /// Remove a notice
    ///
    /// # Returns
    /// * `Ok(true)` - The notice existed and was removed
    /// * `Ok(false)` - There was nothing to remove
    /// * `Err(NotificationError)` - The store failed
    async fn remove_notice(&self, id: &NoticeID) -> Result<bool, NotificationError>;
}
