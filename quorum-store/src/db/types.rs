use rst_common::with_errors::thiserror::{self, Error};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AppError {
    #[error("db error: {0}")]
    DbError(String),

    #[error("record error: {0}")]
    RecordError(String),
}

pub enum Instruction {
    Save { key: String, value: Vec<u8> },

    /// Save only when nothing is stored at `key` yet
    SaveNew { key: String, value: Vec<u8> },

    Get { key: String },
    Remove { key: String },

    /// Every entry whose key starts with `prefix`, in key order
    List { prefix: String },
}

#[derive(Debug, PartialEq)]
pub enum OutputOpts {
    SingleByte { value: Option<Vec<u8>> },
    MultiBytes { values: Vec<(String, Vec<u8>)> },
    Saved { created: bool },
    Removed { existed: bool },
    None,
}

impl OutputOpts {
    pub fn is_none(&self) -> bool {
        matches!(self, OutputOpts::None)
    }
}
