use rst_common::standard::async_trait::async_trait;
use rst_common::with_logging::log::warn;

use prople_quorum_core::escrow::{EscrowEntry, EscrowError, EscrowKey, EscrowRepoBuilder};

use crate::db::record::{from_bytes, to_bytes};
use crate::db::{AppError, Runner};

const ENTRY_KEY_ID: &str = "escrow:entry";
const COMPLETION_KEY_ID: &str = "escrow:done";

fn repo_error(err: AppError) -> EscrowError {
    EscrowError::RepoError(err.to_string())
}

#[derive(Clone)]
pub struct EscrowRepository {
    db: Runner,
}

impl EscrowRepository {
    pub fn new(db: Runner) -> Self {
        Self { db }
    }

    fn entry_key(key: &EscrowKey) -> String {
        format!("{}:{}", ENTRY_KEY_ID, key)
    }

    fn completion_key(key: &EscrowKey) -> String {
        format!("{}:{}", COMPLETION_KEY_ID, key)
    }
}

#[async_trait]
impl EscrowRepoBuilder for EscrowRepository {
    async fn save_entry(&self, entry: &EscrowEntry) -> Result<(), EscrowError> {
        let value = to_bytes(entry).map_err(repo_error)?;
        self.db
            .save(Self::entry_key(&entry.key), value)
            .await
            .map_err(repo_error)
    }

    async fn get_entry(&self, key: &EscrowKey) -> Result<Option<EscrowEntry>, EscrowError> {
        let value = self.db.get(Self::entry_key(key)).await.map_err(repo_error)?;
        value
            .map(|bytes| from_bytes::<EscrowEntry>(&bytes))
            .transpose()
            .map_err(repo_error)
    }

    async fn list_entries(&self) -> Result<Vec<EscrowEntry>, EscrowError> {
        let entries = self
            .db
            .list(format!("{}:", ENTRY_KEY_ID))
            .await
            .map_err(repo_error)?;

        entries
            .iter()
            .map(|(_, value)| from_bytes::<EscrowEntry>(value))
            .collect::<Result<Vec<EscrowEntry>, AppError>>()
            .map_err(repo_error)
    }

    /// Write once, a second marker with another said is a conflict
    async fn save_completion(&self, key: &EscrowKey, said: &str) -> Result<(), EscrowError> {
        let created = self
            .db
            .save_new(Self::completion_key(key), said.as_bytes().to_vec())
            .await
            .map_err(repo_error)?;

        if created {
            return Ok(());
        }

        let escrowed = self.get_completion(key).await?.unwrap_or_default();
        if escrowed == said {
            return Ok(());
        }

        warn!("[escrow:save_completion] key: {key} | completed: {escrowed} | given: {said}");
        Err(EscrowError::Conflict {
            key: key.to_string(),
            escrowed,
            given: said.to_string(),
        })
    }

    async fn get_completion(&self, key: &EscrowKey) -> Result<Option<String>, EscrowError> {
        let value = self
            .db
            .get(Self::completion_key(key))
            .await
            .map_err(repo_error)?;

        value
            .map(|bytes| {
                String::from_utf8(bytes).map_err(|err| EscrowError::RepoError(err.to_string()))
            })
            .transpose()
    }
}
