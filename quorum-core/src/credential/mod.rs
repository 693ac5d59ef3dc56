//! `credential` wraps verifiable credentials and their registries
//!
//! A credential is validated against a JSON schema resolved by its SAID when it
//! is built or parsed. Registries track issuance and revocation through
//! transaction events anchored in key events of the issuer.
pub mod credentialer;
pub mod registrar;
pub mod registry;
pub mod schemer;
pub mod types;

pub use credentialer::{credential, schema_of, CredentialParams, Credentialer};
pub use registrar::Registrar;
pub use schemer::{resolve_schemer, Schemer};
pub use types::{CredentialError, Registry, RegistryRepoBuilder, SchemaResolverBuilder};
