use rst_common::standard::async_trait::async_trait;

use prople_quorum_core::relay::{ExchangeRepoBuilder, RelayError};

use crate::db::{AppError, Runner};

const EXCHANGE_KEY_ID: &str = "exn";

fn repo_error(err: AppError) -> RelayError {
    RelayError::RepoError(err.to_string())
}

/// Received and endorsed `exn` messages, stored as sent on the wire
#[derive(Clone)]
pub struct ExchangeRepository {
    db: Runner,
}

impl ExchangeRepository {
    pub fn new(db: Runner) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ExchangeRepoBuilder for ExchangeRepository {
    async fn save_message(&self, said: &str, message: &[u8]) -> Result<(), RelayError> {
        self.db
            .save(format!("{}:{}", EXCHANGE_KEY_ID, said), message.to_vec())
            .await
            .map_err(repo_error)
    }

    async fn get_message(&self, said: &str) -> Result<Option<Vec<u8>>, RelayError> {
        self.db
            .get(format!("{}:{}", EXCHANGE_KEY_ID, said))
            .await
            .map_err(repo_error)
    }
}
