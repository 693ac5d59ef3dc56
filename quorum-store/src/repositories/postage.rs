use rst_common::standard::async_trait::async_trait;

use prople_quorum_core::relay::{Postage, PostageRepoBuilder, RelayError};

use crate::db::record::{from_bytes, to_bytes};
use crate::db::{AppError, Runner};

const POSTAGE_KEY_ID: &str = "postage";

fn repo_error(err: AppError) -> RelayError {
    RelayError::RepoError(err.to_string())
}

#[derive(Clone)]
pub struct PostageRepository {
    db: Runner,
}

impl PostageRepository {
    pub fn new(db: Runner) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PostageRepoBuilder for PostageRepository {
    async fn save_postage(&self, postage: &Postage) -> Result<(), RelayError> {
        let value = to_bytes(postage).map_err(repo_error)?;
        self.db
            .save(format!("{}:{}", POSTAGE_KEY_ID, postage.id), value)
            .await
            .map_err(repo_error)
    }

    async fn list_postages(&self) -> Result<Vec<Postage>, RelayError> {
        let entries = self
            .db
            .list(format!("{}:", POSTAGE_KEY_ID))
            .await
            .map_err(repo_error)?;

        let mut postages = entries
            .iter()
            .map(|(_, value)| from_bytes::<Postage>(value))
            .collect::<Result<Vec<Postage>, AppError>>()
            .map_err(repo_error)?;

        postages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(postages)
    }

    async fn postages_by_said(&self, said: &str) -> Result<Vec<Postage>, RelayError> {
        let postages = self.list_postages().await?;
        Ok(postages
            .into_iter()
            .filter(|postage| postage.said == said)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rst_common::with_tokio::tokio;

    use crate::common::helpers::testdb::open_runner;

    #[tokio::test]
    async fn test_postages_by_said() {
        let (_dir, db) = open_runner();
        let repo = PostageRepository::new(db);

        let mut first = Postage::new("ESaidA", "EBob", "EAlice", "multisig", b"a".to_vec());
        first.delivered = true;
        repo.save_postage(&first).await.unwrap();
        repo.save_postage(&Postage::new("ESaidA", "EBob", "ECarol", "multisig", b"a".to_vec()))
            .await
            .unwrap();
        repo.save_postage(&Postage::new("ESaidB", "EBob", "EAlice", "multisig", b"b".to_vec()))
            .await
            .unwrap();

        assert_eq!(repo.list_postages().await.unwrap().len(), 3);

        let sent = repo.postages_by_said("ESaidA").await.unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().any(|postage| postage.delivered && postage.dest == "EAlice"))
    }
}
