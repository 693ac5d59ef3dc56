use jsonschema::Validator;

use rst_common::standard::serde_json::{self, Value};

use crate::codec::{compute_said, Ked};

use super::types::{CredentialError, SchemaResolverBuilder};

/// Label of the self-addressing identifier inside a JSON schema
pub const SCHEMA_ID: &str = "$id";

/// `Schemer` is a compiled JSON schema addressed by its SAID
pub struct Schemer {
    raw: Vec<u8>,
    sed: Ked,
    said: String,
    validator: Validator,
}

impl Schemer {
    /// Parse and compile `raw`, the `$id` of the schema must be its own SAID
    pub fn new(raw: &[u8]) -> Result<Self, CredentialError> {
        let sed: Ked = serde_json::from_slice(raw)
            .map_err(|err| CredentialError::InvalidSchema(err.to_string()))?;

        let said = compute_said(&sed, SCHEMA_ID)?;
        let declared = sed.get(SCHEMA_ID).and_then(|val| val.as_str());
        if declared != Some(said.as_str()) {
            return Err(CredentialError::InvalidSchema(format!(
                "schema id {} does not match its content {said}",
                declared.unwrap_or_default()
            )));
        }

        let validator = jsonschema::validator_for(&Value::Object(sed.clone()))
            .map_err(|err| CredentialError::InvalidSchema(err.to_string()))?;

        Ok(Self {
            raw: raw.to_vec(),
            sed,
            said,
            validator,
        })
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn sed(&self) -> &Ked {
        &self.sed
    }

    pub fn said(&self) -> &str {
        &self.said
    }

    pub fn title(&self) -> Option<&str> {
        self.sed.get("title").and_then(|val| val.as_str())
    }

    pub fn verify(&self, value: &Value) -> Result<(), CredentialError> {
        if self.validator.is_valid(value) {
            return Ok(());
        }

        let reasons = self
            .validator
            .iter_errors(value)
            .map(|err| err.to_string())
            .collect::<Vec<String>>()
            .join("; ");

        Err(CredentialError::SchemaValidation(reasons))
    }
}

/// Resolve and compile the schema `said`, an unknown schema is a configuration error
pub async fn resolve_schemer<TResolver>(
    resolver: &TResolver,
    said: &str,
) -> Result<Schemer, CredentialError>
where
    TResolver: SchemaResolverBuilder,
{
    let raw = resolver
        .resolve(said)
        .await?
        .ok_or(CredentialError::Configuration(format!(
            "credential schema {said} not found"
        )))?;

    Schemer::new(&raw)
}


#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;

    use rst_common::standard::async_trait::async_trait;
    use rst_common::standard::serde_json::json;
    use rst_common::with_tokio::tokio;

    mock!(
        FakeResolver{}

        impl Clone for FakeResolver {
            fn clone(&self) -> Self;
        }

        #[async_trait]
        impl SchemaResolverBuilder for FakeResolver {
            async fn resolve(&self, said: &str) -> Result<Option<Vec<u8>>, CredentialError>;
        }
    );

    #[test]
    fn test_schemer_verify() {
        let schemer = Schemer::new(&fixtures::schema_raw()).unwrap();
        assert_eq!(schemer.title(), Some("Legal Entity vLEI Credential"));
        assert!(schemer.said().starts_with('E'));

        assert!(schemer.verify(&json!({"LEI": "254900OPPU84GM83MG36"})).is_ok());

        let invalid = schemer.verify(&json!({"i": "EHolder"}));
        assert!(matches!(invalid, Err(CredentialError::SchemaValidation(_))));
    }

    #[test]
    fn test_schemer_rejects_wrong_id() {
        let raw = serde_json::to_vec(&json!({"$id": "EWrong", "type": "object"})).unwrap();
        let result = Schemer::new(&raw);
        assert!(matches!(result, Err(CredentialError::InvalidSchema(_))));
    }

    #[tokio::test]
    async fn test_resolve_schemer_unknown() {
        let mut resolver = MockFakeResolver::new();
        resolver.expect_resolve().times(1).returning(|_| Ok(None));

        let result = resolve_schemer(&resolver, "EUnknown").await;
        assert!(matches!(result, Err(CredentialError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_resolve_schemer_found() {
        let mut resolver = MockFakeResolver::new();
        resolver
            .expect_resolve()
            .times(1)
            .returning(|_| Ok(Some(fixtures::schema_raw())));

        let schemer = resolve_schemer(&resolver, "ESchema").await.unwrap();
        assert!(schemer.title().is_some());
    }
}
