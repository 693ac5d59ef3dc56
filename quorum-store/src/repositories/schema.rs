use std::fs;
use std::path::Path;

use rst_common::standard::async_trait::async_trait;
use rst_common::with_logging::log::{debug, warn};

use prople_quorum_core::credential::{CredentialError, SchemaResolverBuilder, Schemer};

use crate::db::{AppError, Runner};

const SCHEMA_KEY_ID: &str = "schema";

fn repo_error(err: AppError) -> CredentialError {
    CredentialError::RepoError(err.to_string())
}

/// Self addressed JSON schemas known to this agent
#[derive(Clone)]
pub struct SchemaRepository {
    db: Runner,
}

impl SchemaRepository {
    pub fn new(db: Runner) -> Self {
        Self { db }
    }

    /// Store `raw` under the SAID it declares, once it compiled and verified
    pub async fn save_schema(&self, raw: &[u8]) -> Result<String, CredentialError> {
        let said = Schemer::new(raw)?.said().to_string();
        self.db
            .save(format!("{}:{}", SCHEMA_KEY_ID, said), raw.to_vec())
            .await
            .map_err(repo_error)?;

        debug!("[schema:save] said: {said}");
        Ok(said)
    }

    /// Load every `*.json` file of `dir`, returns the SAIDs of the accepted schemas
    ///
    /// Files that are not valid self addressed schemas are skipped.
    pub async fn load_dir(&self, dir: &Path) -> Result<Vec<String>, CredentialError> {
        let entries = fs::read_dir(dir).map_err(|err| {
            CredentialError::Configuration(format!("{}: {err}", dir.display()))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|err| CredentialError::Configuration(err.to_string()))?
                .path();

            if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut saids = Vec::new();
        for path in paths {
            let raw = fs::read(&path)
                .map_err(|err| CredentialError::Configuration(format!("{}: {err}", path.display())))?;

            match self.save_schema(&raw).await {
                Ok(said) => saids.push(said),
                Err(err) => warn!("[schema:load_dir] path: {} | error: {err}", path.display()),
            }
        }

        Ok(saids)
    }
}

#[async_trait]
impl SchemaResolverBuilder for SchemaRepository {
    async fn resolve(&self, said: &str) -> Result<Option<Vec<u8>>, CredentialError> {
        self.db
            .get(format!("{}:{}", SCHEMA_KEY_ID, said))
            .await
            .map_err(repo_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rst_common::standard::serde_json::{self, json, Value};
    use rst_common::with_tokio::tokio;

    use prople_quorum_core::codec::{saidify, Ked};
    use prople_quorum_core::credential::schemer::SCHEMA_ID;

    use crate::common::helpers::testdb::open_runner;

    fn schema_raw(title: &str) -> Vec<u8> {
        let schema = json!({
            "$id": "",
            "$schema": "http://json-schema.org/draft-07/schema#",
            "title": title,
            "type": "object",
            "properties": {"LEI": {"type": "string"}},
            "required": ["LEI"]
        });

        let sed: Ked = match schema {
            Value::Object(map) => map,
            _ => Ked::new(),
        };

        let (_, sed) = saidify(sed, SCHEMA_ID).unwrap();
        serde_json::to_vec(&sed).unwrap()
    }

    #[tokio::test]
    async fn test_save_and_resolve() {
        let (_dir, db) = open_runner();
        let repo = SchemaRepository::new(db);

        let raw = schema_raw("Legal Entity");
        let said = repo.save_schema(&raw).await.unwrap();

        assert_eq!(repo.resolve(&said).await.unwrap(), Some(raw));
        assert!(repo.resolve("EUnknown").await.unwrap().is_none())
    }

    #[tokio::test]
    async fn test_tampered_schema_rejected() {
        let (_dir, db) = open_runner();
        let repo = SchemaRepository::new(db);

        let mut sed: Value = serde_json::from_slice(&schema_raw("Legal Entity")).unwrap();
        sed["title"] = json!("Tampered");

        let result = repo.save_schema(&serde_json::to_vec(&sed).unwrap()).await;
        assert!(matches!(result, Err(CredentialError::InvalidSchema(_))))
    }

    #[tokio::test]
    async fn test_load_dir_skips_invalid_files() {
        let (dir, db) = open_runner();
        let repo = SchemaRepository::new(db);

        let schemas = dir.path().join("schemas");
        fs::create_dir_all(&schemas).unwrap();
        fs::write(schemas.join("lei.json"), schema_raw("Legal Entity")).unwrap();
        fs::write(schemas.join("broken.json"), b"{not json").unwrap();
        fs::write(schemas.join("notes.txt"), b"ignored").unwrap();

        let saids = repo.load_dir(&schemas).await.unwrap();
        assert_eq!(saids.len(), 1);
        assert!(repo.resolve(&saids[0]).await.unwrap().is_some())
    }
}
