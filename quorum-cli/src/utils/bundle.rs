use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;

use crate::types::CliError;

/// Messages carried between agents as a file, each one base64 encoded
///
/// Used for key event logs handed to a new contact and for outbox messages
/// forwarded by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Bundle {
    messages: Vec<String>,
}

impl Bundle {
    pub fn new(messages: &[Vec<u8>]) -> Self {
        Self {
            messages: messages.iter().map(|msg| STANDARD.encode(msg)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> Result<Vec<Vec<u8>>, CliError> {
        self.messages
            .iter()
            .map(|msg| {
                STANDARD
                    .decode(msg)
                    .map_err(|err| CliError::BundleError(err.to_string()))
            })
            .collect()
    }

    pub fn write(&self, path: &Path) -> Result<(), CliError> {
        let content = serde_json::to_vec_pretty(self)
            .map_err(|err| CliError::BundleError(err.to_string()))?;

        fs::write(path, content)
            .map_err(|err| CliError::BundleError(format!("{}: {err}", path.display())))
    }

    pub fn read(path: &Path) -> Result<Self, CliError> {
        let content = fs::read(path)
            .map_err(|err| CliError::BundleError(format!("{}: {err}", path.display())))?;

        serde_json::from_slice(&content).map_err(|err| CliError::BundleError(err.to_string()))
    }
}
