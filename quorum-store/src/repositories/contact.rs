use rst_common::standard::async_trait::async_trait;

use prople_quorum_core::confirm::{ConfirmError, Contact, ContactDirectory};

use crate::db::record::{from_bytes, to_bytes};
use crate::db::{AppError, Runner};

const CONTACT_KEY_ID: &str = "contact";

fn repo_error(err: AppError) -> ConfirmError {
    ConfirmError::RepoError(err.to_string())
}

#[derive(Clone)]
pub struct ContactRepository {
    db: Runner,
}

impl ContactRepository {
    pub fn new(db: Runner) -> Self {
        Self { db }
    }

    pub async fn save_contact(&self, contact: &Contact) -> Result<(), ConfirmError> {
        let value = to_bytes(contact).map_err(repo_error)?;
        self.db
            .save(format!("{}:{}", CONTACT_KEY_ID, contact.pre), value)
            .await
            .map_err(repo_error)
    }

    pub async fn list_contacts(&self) -> Result<Vec<Contact>, ConfirmError> {
        let entries = self
            .db
            .list(format!("{}:", CONTACT_KEY_ID))
            .await
            .map_err(repo_error)?;

        entries
            .iter()
            .map(|(_, value)| from_bytes::<Contact>(value))
            .collect::<Result<Vec<Contact>, AppError>>()
            .map_err(repo_error)
    }
}

#[async_trait]
impl ContactDirectory for ContactRepository {
    async fn get(&self, pre: &str) -> Result<Option<Contact>, ConfirmError> {
        let value = self
            .db
            .get(format!("{}:{}", CONTACT_KEY_ID, pre))
            .await
            .map_err(repo_error)?;

        value
            .map(|bytes| from_bytes::<Contact>(&bytes))
            .transpose()
            .map_err(repo_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rst_common::with_tokio::tokio;

    use crate::common::helpers::testdb::open_runner;

    #[tokio::test]
    async fn test_contact_overwritten_by_prefix() {
        let (_dir, db) = open_runner();
        let repo = ContactRepository::new(db);

        let mut contact = Contact {
            pre: "EAlice".to_string(),
            alias: "alice".to_string(),
        };
        repo.save_contact(&contact).await.unwrap();

        contact.alias = "alice-laptop".to_string();
        repo.save_contact(&contact).await.unwrap();

        let found = repo.get("EAlice").await.unwrap();
        assert_eq!(found.map(|c| c.alias), Some("alice-laptop".to_string()));
        assert!(repo.get("EBob").await.unwrap().is_none());
        assert_eq!(repo.list_contacts().await.unwrap().len(), 1)
    }
}
