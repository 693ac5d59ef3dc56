use std::fmt;
use std::str::FromStr;

use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::{Map, Value};
use rst_common::with_errors::thiserror::{self, Error};

pub const PROTOCOL: &str = "KERI";
pub const VERSION: Version = Version { major: 1, minor: 0 };

/// Length of the full version string, `KERI10JSON0000fd_`
pub const VERSION_FULL_SIZE: usize = 17;

/// The version string must start inside this many leading bytes
pub const VERSION_MAX_OFFSET: usize = 12;
pub const MIN_SNIFF_SIZE: usize = VERSION_MAX_OFFSET + VERSION_FULL_SIZE;

pub const SAID_DUMMY: char = '#';
pub const SAID_SIZE: usize = 44;

/// Derivation code of a Blake3-256 digest
pub const DIGEST_CODE: &str = "E";

/// Key event dictionary, an insertion ordered JSON object
pub type Ked = Map<String, Value>;

/// CodecError is a base error types for the `codec` domain
#[derive(Debug, PartialEq, Error, Clone, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum CodecError {
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    #[error("version mismatch: {0}")]
    VersionMismatch(String),

    #[error("truncated input: need {need} bytes, got {got}")]
    TruncatedInput { need: usize, got: usize },

    #[error("decode error: {0}")]
    DecodeError(String),

    #[error("encode error: {0}")]
    EncodeError(String),

    #[error("missing field: {0}")]
    MissingField(String),

    #[error("invalid field: {0}")]
    InvalidField(String),

    #[error("invalid threshold: {0}")]
    InvalidThreshold(String),

    #[error("signature error: {0}")]
    SignatureError(String),
}

/// Serialization kind embedded in the version string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum Kind {
    #[serde(rename = "JSON")]
    Json,

    #[serde(rename = "CBOR")]
    Cbor,

    #[serde(rename = "MGPK")]
    Mgpk,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Json => "JSON",
            Kind::Cbor => "CBOR",
            Kind::Mgpk => "MGPK",
        }
    }
}

impl Default for Kind {
    fn default() -> Self {
        Kind::Json
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "JSON" => Ok(Kind::Json),
            "CBOR" => Ok(Kind::Cbor),
            "MGPK" => Ok(Kind::Mgpk),
            other => Err(CodecError::MalformedHeader(format!(
                "unsupported serialization kind: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Event type codes carried in the `t` field
pub mod ilks {
    pub const ICP: &str = "icp";
    pub const DIP: &str = "dip";
    pub const ROT: &str = "rot";
    pub const IXN: &str = "ixn";
    pub const RPY: &str = "rpy";
    pub const EXN: &str = "exn";
    pub const VCP: &str = "vcp";
    pub const ISS: &str = "iss";
    pub const REV: &str = "rev";

    /// Event types that change the key event log of an identifier
    pub fn is_key_event(ilk: &str) -> bool {
        matches!(ilk, ICP | DIP | ROT | IXN)
    }
}

/// Configuration trait codes carried in the `c` field of an inception
pub mod traits {
    pub const ESTABLISHMENT_ONLY: &str = "EO";
    pub const DO_NOT_DELEGATE: &str = "DND";
}
