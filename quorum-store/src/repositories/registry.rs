use rst_common::standard::async_trait::async_trait;

use prople_quorum_core::credential::{CredentialError, Registry, RegistryRepoBuilder};

use crate::db::record::{from_bytes, to_bytes};
use crate::db::{AppError, Runner};

const REGISTRY_KEY_ID: &str = "registry";
const REGISTRY_NAME_KEY_ID: &str = "registry-name";
const TEL_KEY_ID: &str = "tel";
const CREDENTIAL_KEY_ID: &str = "credential";

fn repo_error(err: AppError) -> CredentialError {
    CredentialError::RepoError(err.to_string())
}

/// Registries by key and by name, their transaction event logs and issued credentials
#[derive(Clone)]
pub struct RegistryRepository {
    db: Runner,
}

impl RegistryRepository {
    pub fn new(db: Runner) -> Self {
        Self { db }
    }

    /// Registries created or joined by this agent
    pub async fn list_registries(&self) -> Result<Vec<Registry>, CredentialError> {
        let entries = self
            .db
            .list(format!("{}:", REGISTRY_KEY_ID))
            .await
            .map_err(repo_error)?;

        entries
            .iter()
            .map(|(_, value)| from_bytes::<Registry>(value))
            .collect::<Result<Vec<Registry>, AppError>>()
            .map_err(repo_error)
    }

    fn tel_prefix(pre: &str) -> String {
        format!("{}:{}:", TEL_KEY_ID, pre)
    }
}

#[async_trait]
impl RegistryRepoBuilder for RegistryRepository {
    async fn save_registry(&self, registry: &Registry) -> Result<(), CredentialError> {
        let value = to_bytes(registry).map_err(repo_error)?;
        self.db
            .save(format!("{}:{}", REGISTRY_KEY_ID, registry.regk), value)
            .await
            .map_err(repo_error)?;

        self.db
            .save(
                format!("{}:{}", REGISTRY_NAME_KEY_ID, registry.name),
                registry.regk.as_bytes().to_vec(),
            )
            .await
            .map_err(repo_error)
    }

    async fn get_registry(&self, regk: &str) -> Result<Option<Registry>, CredentialError> {
        let value = self
            .db
            .get(format!("{}:{}", REGISTRY_KEY_ID, regk))
            .await
            .map_err(repo_error)?;

        value
            .map(|bytes| from_bytes::<Registry>(&bytes))
            .transpose()
            .map_err(repo_error)
    }

    async fn registry_by_name(&self, name: &str) -> Result<Option<Registry>, CredentialError> {
        let regk = self
            .db
            .get(format!("{}:{}", REGISTRY_NAME_KEY_ID, name))
            .await
            .map_err(repo_error)?;

        match regk {
            Some(bytes) => {
                let regk = String::from_utf8(bytes)
                    .map_err(|err| CredentialError::RepoError(err.to_string()))?;
                self.get_registry(&regk).await
            }
            None => Ok(None),
        }
    }

    async fn save_tel_event(&self, pre: &str, sn: u64, raw: &[u8]) -> Result<(), CredentialError> {
        self.db
            .save(format!("{}{:032x}", Self::tel_prefix(pre), sn), raw.to_vec())
            .await
            .map_err(repo_error)
    }

    async fn tel_events(&self, pre: &str) -> Result<Vec<Vec<u8>>, CredentialError> {
        let entries = self
            .db
            .list(Self::tel_prefix(pre))
            .await
            .map_err(repo_error)?;

        Ok(entries.into_iter().map(|(_, value)| value).collect())
    }

    async fn save_credential(&self, said: &str, raw: &[u8]) -> Result<(), CredentialError> {
        self.db
            .save(format!("{}:{}", CREDENTIAL_KEY_ID, said), raw.to_vec())
            .await
            .map_err(repo_error)
    }

    async fn get_credential(&self, said: &str) -> Result<Option<Vec<u8>>, CredentialError> {
        self.db
            .get(format!("{}:{}", CREDENTIAL_KEY_ID, said))
            .await
            .map_err(repo_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rst_common::with_tokio::tokio;

    use crate::common::helpers::testdb::open_runner;

    fn registry(name: &str, regk: &str) -> Registry {
        Registry {
            name: name.to_string(),
            regk: regk.to_string(),
            pre: "EGroup".to_string(),
            vcp: b"{}".to_vec(),
        }
    }

    #[tokio::test]
    async fn test_registry_by_name() {
        let (_dir, db) = open_runner();
        let repo = RegistryRepository::new(db);

        repo.save_registry(&registry("vlei", "ERegA")).await.unwrap();
        repo.save_registry(&registry("audit", "ERegB")).await.unwrap();

        let found = repo.registry_by_name("vlei").await.unwrap();
        assert_eq!(found.map(|reg| reg.regk), Some("ERegA".to_string()));
        assert!(repo.registry_by_name("missing").await.unwrap().is_none());
        assert_eq!(repo.list_registries().await.unwrap().len(), 2)
    }

    #[tokio::test]
    async fn test_tel_events_in_sequence_order() {
        let (_dir, db) = open_runner();
        let repo = RegistryRepository::new(db);

        repo.save_tel_event("ECred", 16, b"rev").await.unwrap();
        repo.save_tel_event("ECred", 2, b"second").await.unwrap();
        repo.save_tel_event("ECred", 0, b"iss").await.unwrap();
        repo.save_tel_event("ECredOther", 0, b"other").await.unwrap();

        let events = repo.tel_events("ECred").await.unwrap();
        assert_eq!(
            events,
            vec![b"iss".to_vec(), b"second".to_vec(), b"rev".to_vec()]
        )
    }
}
