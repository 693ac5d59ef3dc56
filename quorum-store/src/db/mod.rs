//! Single table key value storage over `redb`
//!
//! Every repository of this crate shares one [`Runner`]. Keys are namespaced as
//! `prefix:key` and values are JSON records or raw message bytes.
mod builder;
mod runner;
mod types;

pub use builder::Builder;
pub use runner::Runner;
pub use types::{AppError, Instruction, OutputOpts};

pub(crate) mod record {
    use rst_common::standard::serde::de::DeserializeOwned;
    use rst_common::standard::serde::Serialize;
    use rst_common::standard::serde_json;

    use super::AppError;

    pub(crate) fn to_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, AppError> {
        serde_json::to_vec(value).map_err(|err| AppError::RecordError(err.to_string()))
    }

    pub(crate) fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, AppError> {
        serde_json::from_slice(bytes).map_err(|err| AppError::RecordError(err.to_string()))
    }
}
