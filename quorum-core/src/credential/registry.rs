//! Builders of credential registry transaction events
use rst_common::standard::serde_json::Value;

use crate::codec::eventing::now_iso8601;
use crate::codec::said::{saidify, saidify_with};
use crate::codec::types::{ilks, CodecError, Ked, Kind};
use crate::codec::version::versify;
use crate::codec::Serder;

use super::types::NO_BACKERS;

/// Registry inception without backers, the registry identifier is self-addressing
pub fn incept_registry(pre: &str, nonce: &str, kind: Kind) -> Result<Serder, CodecError> {
    let mut ked = Ked::new();
    ked.insert("v".to_string(), Value::from(versify(kind, 0)));
    ked.insert("t".to_string(), Value::from(ilks::VCP));
    ked.insert("d".to_string(), Value::from(""));
    ked.insert("i".to_string(), Value::from(""));
    ked.insert("ii".to_string(), Value::from(pre));
    ked.insert("s".to_string(), Value::from("0"));
    ked.insert("c".to_string(), Value::from(vec![NO_BACKERS]));
    ked.insert("bt".to_string(), Value::from("0"));
    ked.insert("b".to_string(), Value::Array(Vec::new()));
    ked.insert("n".to_string(), Value::from(nonce));

    let (_, ked) = saidify_with(ked, &["i", "d"])?;
    Serder::from_ked(ked, Some(kind))
}

/// Issuance of credential `vcdig` in registry `regk`
pub fn issue(vcdig: &str, regk: &str, stamp: Option<String>, kind: Kind) -> Result<Serder, CodecError> {
    let mut ked = Ked::new();
    ked.insert("v".to_string(), Value::from(versify(kind, 0)));
    ked.insert("t".to_string(), Value::from(ilks::ISS));
    ked.insert("d".to_string(), Value::from(""));
    ked.insert("i".to_string(), Value::from(vcdig));
    ked.insert("s".to_string(), Value::from("0"));
    ked.insert("ri".to_string(), Value::from(regk));
    ked.insert(
        "dt".to_string(),
        Value::from(stamp.unwrap_or_else(now_iso8601)),
    );

    let (_, ked) = saidify(ked, "d")?;
    Serder::from_ked(ked, Some(kind))
}

/// Revocation of credential `vcdig`, `dig` is the said of its issuance event
pub fn revoke(
    vcdig: &str,
    regk: &str,
    dig: &str,
    stamp: Option<String>,
    kind: Kind,
) -> Result<Serder, CodecError> {
    let mut ked = Ked::new();
    ked.insert("v".to_string(), Value::from(versify(kind, 0)));
    ked.insert("t".to_string(), Value::from(ilks::REV));
    ked.insert("d".to_string(), Value::from(""));
    ked.insert("i".to_string(), Value::from(vcdig));
    ked.insert("s".to_string(), Value::from("1"));
    ked.insert("ri".to_string(), Value::from(regk));
    ked.insert("p".to_string(), Value::from(dig));
    ked.insert(
        "dt".to_string(),
        Value::from(stamp.unwrap_or_else(now_iso8601)),
    );

    let (_, ked) = saidify(ked, "d")?;
    Serder::from_ked(ked, Some(kind))
}
