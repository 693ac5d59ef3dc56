use rst_common::standard::serde_json::{json, Value};

use crate::codec::eventing::now_iso8601;
use crate::codec::types::{CodecError, Ked, Kind};
use crate::codec::version::versify;
use crate::codec::{compute_said, saidify, Serder};

use super::schemer::Schemer;
use super::types::{CredentialError, REGISTRY_TYPE};

/// Label of the credential identifier inside the `d` section
pub const CREDENTIAL_ID: &str = "id";

#[derive(Debug, Clone, Default)]
pub struct CredentialParams {
    pub schema: String,
    pub issuer: String,
    pub subject: Value,

    /// Defaults to now
    pub issuance: Option<String>,
    pub expiry: Option<String>,

    /// Registry tracking the credential status
    pub regk: Option<String>,
    pub kind: Kind,
}

/// Build a new credential, its subject is checked against `schemer`
pub fn credential(params: CredentialParams, schemer: &Schemer) -> Result<Credentialer, CredentialError> {
    let mut body = Ked::new();
    body.insert(CREDENTIAL_ID.to_string(), Value::from(""));
    body.insert("type".to_string(), json!([params.schema]));
    body.insert("issuer".to_string(), Value::from(params.issuer));
    body.insert(
        "issuanceDate".to_string(),
        Value::from(params.issuance.unwrap_or_else(now_iso8601)),
    );
    body.insert("credentialSubject".to_string(), params.subject);

    if let Some(regk) = params.regk {
        body.insert(
            "credentialStatus".to_string(),
            json!({"id": regk, "type": REGISTRY_TYPE}),
        );
    }

    if let Some(expiry) = params.expiry {
        body.insert("expirationDate".to_string(), Value::from(expiry));
    }

    let (_, body) = saidify(body, CREDENTIAL_ID)?;

    let mut crd = Ked::new();
    crd.insert("v".to_string(), Value::from(versify(params.kind, 0)));
    crd.insert("x".to_string(), Value::from(params.schema));
    crd.insert("d".to_string(), Value::Object(body));

    Credentialer::from_crd(crd, params.kind, schemer)
}

/// Schema identifier of a serialized credential, read before any validation
pub fn schema_of(raw: &[u8]) -> Result<String, CredentialError> {
    let serder = Serder::from_raw(raw)?;
    serder
        .field_str("x")
        .map(|val| val.to_string())
        .ok_or(CredentialError::Codec(CodecError::MissingField("x".to_string())))
}

/// `Credentialer` is a verifiable credential in its canonical serialization
///
/// Construction always validates the subject against the schema, an instance
/// therefore always holds a valid credential. It cannot be changed afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Credentialer {
    serder: Serder,
    said: String,
}

impl Credentialer {
    pub fn from_raw(raw: &[u8], schemer: &Schemer) -> Result<Self, CredentialError> {
        let serder = Serder::from_raw(raw)?;
        Self::build(serder, schemer)
    }

    pub fn from_crd(crd: Ked, kind: Kind, schemer: &Schemer) -> Result<Self, CredentialError> {
        let serder = Serder::from_ked(crd, Some(kind))?;
        Self::build(serder, schemer)
    }

    fn build(serder: Serder, schemer: &Schemer) -> Result<Self, CredentialError> {
        let body = serder
            .ked()
            .get("d")
            .and_then(|val| val.as_object())
            .ok_or(CredentialError::InvalidCredential("missing d section".to_string()))?;

        let said = compute_said(body, CREDENTIAL_ID)?;
        if body.get(CREDENTIAL_ID).and_then(|val| val.as_str()) != Some(said.as_str()) {
            return Err(CredentialError::InvalidCredential(format!(
                "credential id does not match its content {said}"
            )));
        }

        let schema = serder.field_str("x").unwrap_or_default();
        if schema != schemer.said() {
            return Err(CredentialError::SchemaValidation(format!(
                "credential schema {schema} resolved to {}",
                schemer.said()
            )));
        }

        let subject = body
            .get("credentialSubject")
            .ok_or(CredentialError::InvalidCredential(
                "missing credentialSubject".to_string(),
            ))?;
        schemer.verify(subject)?;

        Ok(Self { serder, said })
    }

    fn body(&self) -> Option<&Value> {
        self.serder.ked().get("d")
    }

    pub fn said(&self) -> &str {
        &self.said
    }

    pub fn issuer(&self) -> &str {
        self.body()
            .and_then(|body| body.get("issuer"))
            .and_then(|val| val.as_str())
            .unwrap_or_default()
    }

    pub fn schema(&self) -> &str {
        self.serder.field_str("x").unwrap_or_default()
    }

    pub fn subject(&self) -> Option<&Value> {
        self.body().and_then(|body| body.get("credentialSubject"))
    }

    /// Identifier the credential is issued to, when the subject names one
    pub fn issuee(&self) -> Option<&str> {
        self.subject()
            .and_then(|subject| subject.get("i"))
            .and_then(|val| val.as_str())
    }

    pub fn status(&self) -> Option<&str> {
        self.body()
            .and_then(|body| body.get("credentialStatus"))
            .and_then(|status| status.get("id"))
            .and_then(|val| val.as_str())
    }

    pub fn raw(&self) -> &[u8] {
        self.serder.raw()
    }

    pub fn crd(&self) -> &Ked {
        self.serder.ked()
    }

    pub fn kind(&self) -> Kind {
        self.serder.kind()
    }

    pub fn size(&self) -> usize {
        self.serder.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::schemer::fixtures;

    fn schemer() -> Schemer {
        Schemer::new(&fixtures::schema_raw()).unwrap()
    }

    fn params(schemer: &Schemer, kind: Kind) -> CredentialParams {
        CredentialParams {
            schema: schemer.said().to_string(),
            issuer: "EIssuer".to_string(),
            subject: json!({"i": "EHolder", "LEI": "254900OPPU84GM83MG36"}),
            issuance: Some("2024-01-01T00:00:00.000000+00:00".to_string()),
            regk: Some("ERegistry".to_string()),
            kind,
            ..Default::default()
        }
    }

    #[test]
    fn test_credential_accessors() {
        let schemer = schemer();
        let creder = credential(params(&schemer, Kind::Json), &schemer).unwrap();

        assert_eq!(creder.issuer(), "EIssuer");
        assert_eq!(creder.schema(), schemer.said());
        assert_eq!(creder.issuee(), Some("EHolder"));
        assert_eq!(creder.status(), Some("ERegistry"));
        assert_eq!(creder.size(), creder.raw().len());
        assert_eq!(schema_of(creder.raw()).unwrap(), schemer.said());
    }

    #[test]
    fn test_credential_said_independent_of_kind() {
        let schemer = schemer();
        let json = credential(params(&schemer, Kind::Json), &schemer).unwrap();
        let cbor = credential(params(&schemer, Kind::Cbor), &schemer).unwrap();

        assert_eq!(json.said(), cbor.said());
        assert_ne!(json.raw(), cbor.raw());

        let parsed = Credentialer::from_raw(cbor.raw(), &schemer).unwrap();
        assert_eq!(parsed, cbor);
    }

    #[test]
    fn test_credential_schema_validation() {
        let schemer = schemer();
        let mut invalid = params(&schemer, Kind::Json);
        invalid.subject = json!({"i": "EHolder"});

        let result = credential(invalid, &schemer);
        assert!(matches!(result, Err(CredentialError::SchemaValidation(_))));
    }

    #[test]
    fn test_credential_tampered_body() {
        let schemer = schemer();
        let creder = credential(params(&schemer, Kind::Json), &schemer).unwrap();

        let mut crd = creder.crd().clone();
        if let Some(Value::Object(body)) = crd.get_mut("d") {
            body.insert("issuer".to_string(), json!("EMallory"));
        }

        let result = Credentialer::from_crd(crd, Kind::Json, &schemer);
        assert!(matches!(result, Err(CredentialError::InvalidCredential(_))));
    }
}
