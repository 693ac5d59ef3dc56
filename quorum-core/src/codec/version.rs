use once_cell::sync::Lazy;
use regex::bytes::Regex;

use super::types::{
    CodecError, Kind, Version, MIN_SNIFF_SIZE, PROTOCOL, VERSION, VERSION_FULL_SIZE,
    VERSION_MAX_OFFSET,
};

static REVER: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| {
    Regex::new(r"(?-u)([A-Z]{4})([0-9a-f])([0-9a-f])([A-Z]{4})([0-9a-f]{6})_")
});

fn rever() -> Result<&'static Regex, CodecError> {
    REVER
        .as_ref()
        .map_err(|err| CodecError::MalformedHeader(err.to_string()))
}

/// Build a version string for the current protocol version
pub fn versify(kind: Kind, size: usize) -> String {
    format!(
        "{}{:x}{:x}{}{:06x}_",
        PROTOCOL,
        VERSION.major,
        VERSION.minor,
        kind.as_str(),
        size
    )
}

/// Parse a full version string into its kind, version and declared size
pub fn deversify(vs: &str) -> Result<(Kind, Version, usize), CodecError> {
    if vs.len() != VERSION_FULL_SIZE {
        return Err(CodecError::MalformedHeader(format!(
            "invalid version string: {vs}"
        )));
    }

    let captures = rever()?
        .captures(vs.as_bytes())
        .ok_or(CodecError::MalformedHeader(format!(
            "invalid version string: {vs}"
        )))?;

    parse_captures(&captures)
}

/// Locate the version string span inside a raw serialization
///
/// The span must start at or before [`VERSION_MAX_OFFSET`]
pub fn locate(raw: &[u8]) -> Result<(usize, usize), CodecError> {
    let found = rever()?
        .find(raw)
        .ok_or(CodecError::MalformedHeader(
            "missing version string".to_string(),
        ))?;

    if found.start() > VERSION_MAX_OFFSET {
        return Err(CodecError::MalformedHeader(format!(
            "version string found at offset {}",
            found.start()
        )));
    }

    Ok((found.start(), found.end()))
}

/// Sniff the kind, version and declared size from the leading bytes of `raw`
pub fn sniff(raw: &[u8]) -> Result<(Kind, Version, usize), CodecError> {
    if raw.len() < MIN_SNIFF_SIZE {
        return Err(CodecError::TruncatedInput {
            need: MIN_SNIFF_SIZE,
            got: raw.len(),
        });
    }

    let (start, _) = locate(raw)?;
    let captures = rever()?
        .captures(&raw[start..])
        .ok_or(CodecError::MalformedHeader(
            "missing version string".to_string(),
        ))?;

    parse_captures(&captures)
}

fn parse_captures(captures: &regex::bytes::Captures) -> Result<(Kind, Version, usize), CodecError> {
    let field = |idx: usize| -> Result<String, CodecError> {
        captures
            .get(idx)
            .map(|val| String::from_utf8_lossy(val.as_bytes()).to_string())
            .ok_or(CodecError::MalformedHeader(format!(
                "missing version group {idx}"
            )))
    };

    let proto = field(1)?;
    if proto != PROTOCOL {
        return Err(CodecError::VersionMismatch(format!(
            "unsupported protocol: {proto}"
        )));
    }

    let parse_hex = |val: String| -> Result<usize, CodecError> {
        usize::from_str_radix(&val, 16)
            .map_err(|err| CodecError::MalformedHeader(err.to_string()))
    };

    let major = parse_hex(field(2)?)? as u8;
    let minor = parse_hex(field(3)?)? as u8;
    let kind: Kind = field(4)?.parse()?;
    let size = parse_hex(field(5)?)?;

    let version = Version { major, minor };
    if version != VERSION {
        return Err(CodecError::VersionMismatch(format!(
            "unsupported version {version}, expected {VERSION}"
        )));
    }

    Ok((kind, version, size))
}
