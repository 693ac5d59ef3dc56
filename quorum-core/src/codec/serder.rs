use rst_common::standard::serde_json::{self, Value};

use super::types::{CodecError, Ked, Kind, Version, VERSION};
use super::version::{deversify, locate, sniff, versify};

/// Serialize a [`Ked`] with the given kind, without touching its version string
pub fn dumps(ked: &Ked, kind: Kind) -> Result<Vec<u8>, CodecError> {
    match kind {
        Kind::Json => {
            serde_json::to_vec(ked).map_err(|err| CodecError::EncodeError(err.to_string()))
        }
        Kind::Cbor => {
            serde_cbor::to_vec(ked).map_err(|err| CodecError::EncodeError(err.to_string()))
        }
        Kind::Mgpk => {
            rmp_serde::to_vec_named(ked).map_err(|err| CodecError::EncodeError(err.to_string()))
        }
    }
}

/// Deserialize exactly `raw` as the given kind
pub fn loads(raw: &[u8], kind: Kind) -> Result<Ked, CodecError> {
    let value: Value = match kind {
        Kind::Json => serde_json::from_slice(raw)
            .map_err(|err| CodecError::DecodeError(format!("json: {err}")))?,
        Kind::Cbor => serde_cbor::from_slice(raw)
            .map_err(|err| CodecError::DecodeError(format!("cbor: {err}")))?,
        Kind::Mgpk => rmp_serde::from_slice(raw)
            .map_err(|err| CodecError::DecodeError(format!("mgpk: {err}")))?,
    };

    match value {
        Value::Object(ked) => Ok(ked),
        _ => Err(CodecError::DecodeError(
            "serialized event is not a map".to_string(),
        )),
    }
}

/// `Serder` holds an event both as its field map and as its canonical serialization
///
/// The two representations are always consistent: the version string inside
/// the field map carries the kind and the exact byte size of `raw`. A `Serder`
/// is immutable, building a changed event means building a new `Serder`.
#[derive(Debug, Clone, PartialEq)]
pub struct Serder {
    raw: Vec<u8>,
    ked: Ked,
    kind: Kind,
    version: Version,
    size: usize,
}

impl Serder {
    /// Serialize `ked` with `kind`, or with the kind of its current version string
    /// when `kind` is `None`
    pub fn from_ked(mut ked: Ked, kind: Option<Kind>) -> Result<Self, CodecError> {
        let vs = ked
            .get("v")
            .and_then(|val| val.as_str())
            .map(|val| val.to_string())
            .ok_or(CodecError::MissingField("v".to_string()))?;

        let (current, version, _) = deversify(&vs)?;
        let kind = kind.unwrap_or(current);

        ked.insert("v".to_string(), Value::from(versify(kind, 0)));
        let raw = dumps(&ked, kind)?;
        let size = raw.len();

        let (fore, back) = locate(&raw)?;
        let vs = versify(kind, size);

        let mut spliced = Vec::with_capacity(size);
        spliced.extend_from_slice(&raw[..fore]);
        spliced.extend_from_slice(vs.as_bytes());
        spliced.extend_from_slice(&raw[back..]);

        if spliced.len() != size {
            return Err(CodecError::MalformedHeader(format!(
                "version string size changed: {vs}"
            )));
        }

        ked.insert("v".to_string(), Value::from(vs));
        Ok(Self {
            raw: spliced,
            ked,
            kind,
            version,
            size,
        })
    }

    /// Deserialize the leading event of `raw`, trailing bytes are ignored
    pub fn from_raw(raw: &[u8]) -> Result<Self, CodecError> {
        let (kind, version, size) = sniff(raw)?;
        if version != VERSION {
            return Err(CodecError::VersionMismatch(format!(
                "unsupported version {version}, expected {VERSION}"
            )));
        }

        if raw.len() < size {
            return Err(CodecError::TruncatedInput {
                need: size,
                got: raw.len(),
            });
        }

        let ked = loads(&raw[..size], kind)?;
        Ok(Self {
            raw: raw[..size].to_vec(),
            ked,
            kind,
            version,
            size,
        })
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn ked(&self) -> &Ked {
        &self.ked
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn field_str(&self, label: &str) -> Option<&str> {
        self.ked.get(label).and_then(|val| val.as_str())
    }

    /// Self-addressing identifier of this event, the `d` field
    pub fn said(&self) -> Option<&str> {
        self.field_str("d")
    }

    /// Identifier prefix, the `i` field
    pub fn pre(&self) -> Option<&str> {
        self.field_str("i")
    }

    /// Event type, the `t` field
    pub fn ilk(&self) -> Option<&str> {
        self.field_str("t")
    }

    /// Route of a reply or exchange message, the `r` field
    pub fn route(&self) -> Option<&str> {
        self.field_str("r")
    }

    /// Sequence number parsed from the hex `s` field
    pub fn sn(&self) -> Result<u64, CodecError> {
        let sn = self
            .field_str("s")
            .ok_or(CodecError::MissingField("s".to_string()))?;

        u64::from_str_radix(sn, 16).map_err(|err| CodecError::InvalidField(format!("s: {err}")))
    }

    pub fn require_said(&self) -> Result<String, CodecError> {
        self.said()
            .map(|val| val.to_string())
            .ok_or(CodecError::MissingField("d".to_string()))
    }

    pub fn require_pre(&self) -> Result<String, CodecError> {
        self.pre()
            .map(|val| val.to_string())
            .ok_or(CodecError::MissingField("i".to_string()))
    }

    pub fn pretty(&self) -> String {
        serde_json::to_string_pretty(&self.ked).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rst_common::standard::serde_json::json;

    fn fixture() -> Ked {
        let value = json!({
            "v": "KERI10JSON000000_",
            "t": "ixn",
            "d": "EBabiu_JCkE0GbiglDXNB5C4NQq-hiGgxhHKXBxkiojg",
            "i": "EBfdlu8R27Fbx-ehrqwImnK-8Cm79sqbAQ4MmvEAYqao",
            "s": "1",
            "p": "EBabiu_JCkE0GbiglDXNB5C4NQq-hiGgxhHKXBxkiojg",
            "a": [{"i": "EKYLUMmNPZeEs77Zvclf0bSN5IN-mLfLpx2ySb-HDlk4", "s": "0", "d": "EKYLUMmNPZeEs77Zvclf0bSN5IN-mLfLpx2ySb-HDlk4"}]
        });

        match value {
            Value::Object(ked) => ked,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn test_round_trip_every_kind() {
        for kind in [Kind::Json, Kind::Cbor, Kind::Mgpk] {
            let serder = Serder::from_ked(fixture(), Some(kind)).unwrap();
            assert_eq!(serder.size(), serder.raw().len());
            assert_eq!(serder.kind(), kind);

            let (_, _, size) = deversify(serder.field_str("v").unwrap()).unwrap();
            assert_eq!(size, serder.raw().len());

            let parsed = Serder::from_raw(serder.raw()).unwrap();
            assert_eq!(parsed.ked(), serder.ked());
            assert_eq!(parsed.kind(), kind);
            assert_eq!(parsed.size(), serder.size());
        }
    }

    #[test]
    fn test_deterministic() {
        let first = Serder::from_ked(fixture(), Some(Kind::Cbor)).unwrap();
        let second = Serder::from_ked(fixture(), Some(Kind::Cbor)).unwrap();
        assert_eq!(first.raw(), second.raw());
    }

    #[test]
    fn test_json_keeps_field_order() {
        let serder = Serder::from_ked(fixture(), None).unwrap();
        let raw = String::from_utf8(serder.raw().to_vec()).unwrap();
        assert!(raw.starts_with(r#"{"v":"KERI10JSON"#));
        assert!(raw.find(r#""t":"ixn""#).unwrap() < raw.find(r#""a":"#).unwrap());
    }

    #[test]
    fn test_truncated_input() {
        let serder = Serder::from_ked(fixture(), None).unwrap();
        let raw = &serder.raw()[..serder.size() - 5];
        let result = Serder::from_raw(raw);
        assert!(matches!(result, Err(CodecError::TruncatedInput { .. })));
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let serder = Serder::from_ked(fixture(), None).unwrap();
        let mut raw = serder.raw().to_vec();
        raw.extend_from_slice(br#"{"sigers":[]}"#);

        let parsed = Serder::from_raw(&raw).unwrap();
        assert_eq!(parsed.raw(), serder.raw());
    }

    #[test]
    fn test_version_mismatch() {
        let serder = Serder::from_ked(fixture(), None).unwrap();
        let raw = String::from_utf8(serder.raw().to_vec())
            .unwrap()
            .replacen("KERI10", "KERI20", 1);

        let result = Serder::from_raw(raw.as_bytes());
        assert!(matches!(result, Err(CodecError::VersionMismatch(_))));
    }

    #[test]
    fn test_decode_error() {
        let serder = Serder::from_ked(fixture(), None).unwrap();
        let raw = String::from_utf8(serder.raw().to_vec())
            .unwrap()
            .replacen(r#""t":"ixn""#, r#""t":"ixn"#, 1);

        let mut bytes = raw.into_bytes();
        bytes.push(b' ');
        let result = Serder::from_raw(&bytes);
        assert!(matches!(result, Err(CodecError::DecodeError(_))));
    }

    #[test]
    fn test_missing_version() {
        let mut ked = fixture();
        ked.remove("v");
        let result = Serder::from_ked(ked, None);
        assert!(matches!(result, Err(CodecError::MissingField(_))));
    }

    #[test]
    fn test_accessors() {
        let serder = Serder::from_ked(fixture(), None).unwrap();
        assert_eq!(serder.ilk(), Some("ixn"));
        assert_eq!(serder.sn().unwrap(), 1);
        assert_eq!(
            serder.pre(),
            Some("EBfdlu8R27Fbx-ehrqwImnK-8Cm79sqbAQ4MmvEAYqao")
        );
    }
}
