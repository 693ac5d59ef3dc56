//! Builders of key events and reply messages
//!
//! Each builder inserts fields in the protocol order for its event type, computes
//! the self-addressing identifier and returns a serialized [`Serder`].
use rst_common::standard::chrono::{SecondsFormat, Utc};
use rst_common::standard::serde_json::{json, Value};

use super::said::{saidify, saidify_with};
use super::serder::Serder;
use super::tholder::Tholder;
use super::types::{ilks, CodecError, Ked, Kind};
use super::version::versify;

/// Current time as an ISO-8601 timestamp with microseconds, the message `dt` format
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

fn hex(num: u64) -> Value {
    Value::from(format!("{num:x}"))
}

fn strings(items: &[String]) -> Value {
    Value::from(items.to_vec())
}

fn check_threshold(sith: &Value, count: usize, label: &str) -> Result<(), CodecError> {
    let tholder = Tholder::new(sith)?;
    let valid = match tholder.num() {
        Some(num) => num >= 1 && num as usize <= count,
        None => tholder.size() == count,
    };

    if !valid {
        return Err(CodecError::InvalidThreshold(format!(
            "{label} threshold {} does not fit {count} keys",
            tholder.sith()
        )));
    }

    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct InceptionParams {
    pub keys: Vec<String>,
    pub isith: Value,
    pub ndigs: Vec<String>,
    pub nsith: Value,
    pub toad: u64,
    pub wits: Vec<String>,
    pub cnfg: Vec<String>,
    pub data: Vec<Value>,
    pub delpre: Option<String>,
    pub kind: Kind,
}

/// Build a self-addressing inception, or a delegated inception when `delpre` is set
pub fn incept(params: InceptionParams) -> Result<Serder, CodecError> {
    if params.keys.is_empty() {
        return Err(CodecError::InvalidField("k: empty key list".to_string()));
    }

    check_threshold(&params.isith, params.keys.len(), "signing")?;
    if !params.ndigs.is_empty() {
        check_threshold(&params.nsith, params.ndigs.len(), "next")?;
    }

    if params.toad as usize > params.wits.len() {
        return Err(CodecError::InvalidField(format!(
            "bt: witness threshold {} exceeds {} witnesses",
            params.toad,
            params.wits.len()
        )));
    }

    let ilk = match params.delpre {
        Some(_) => ilks::DIP,
        None => ilks::ICP,
    };

    let mut ked = Ked::new();
    ked.insert("v".to_string(), Value::from(versify(params.kind, 0)));
    ked.insert("t".to_string(), Value::from(ilk));
    ked.insert("d".to_string(), Value::from(""));
    ked.insert("i".to_string(), Value::from(""));
    ked.insert("s".to_string(), hex(0));
    ked.insert("kt".to_string(), params.isith);
    ked.insert("k".to_string(), strings(&params.keys));
    ked.insert("nt".to_string(), params.nsith);
    ked.insert("n".to_string(), strings(&params.ndigs));
    ked.insert("bt".to_string(), hex(params.toad));
    ked.insert("b".to_string(), strings(&params.wits));
    ked.insert("c".to_string(), strings(&params.cnfg));
    ked.insert("a".to_string(), Value::from(params.data));

    if let Some(delpre) = params.delpre {
        ked.insert("di".to_string(), Value::from(delpre));
    }

    let (_, ked) = saidify_with(ked, &["i", "d"])?;
    Serder::from_ked(ked, Some(params.kind))
}

#[derive(Debug, Clone, Default)]
pub struct RotationParams {
    pub pre: String,
    pub dig: String,
    pub sn: u64,
    pub keys: Vec<String>,
    pub isith: Value,
    pub ndigs: Vec<String>,
    pub nsith: Value,
    pub toad: u64,
    pub cuts: Vec<String>,
    pub adds: Vec<String>,
    pub data: Vec<Value>,
    pub kind: Kind,
}

pub fn rotate(params: RotationParams) -> Result<Serder, CodecError> {
    if params.sn == 0 {
        return Err(CodecError::InvalidField(
            "s: rotation sequence number must be positive".to_string(),
        ));
    }

    if params.keys.is_empty() {
        return Err(CodecError::InvalidField("k: empty key list".to_string()));
    }

    check_threshold(&params.isith, params.keys.len(), "signing")?;

    let mut ked = Ked::new();
    ked.insert("v".to_string(), Value::from(versify(params.kind, 0)));
    ked.insert("t".to_string(), Value::from(ilks::ROT));
    ked.insert("d".to_string(), Value::from(""));
    ked.insert("i".to_string(), Value::from(params.pre));
    ked.insert("s".to_string(), hex(params.sn));
    ked.insert("p".to_string(), Value::from(params.dig));
    ked.insert("kt".to_string(), params.isith);
    ked.insert("k".to_string(), strings(&params.keys));
    ked.insert("nt".to_string(), params.nsith);
    ked.insert("n".to_string(), strings(&params.ndigs));
    ked.insert("bt".to_string(), hex(params.toad));
    ked.insert("br".to_string(), strings(&params.cuts));
    ked.insert("ba".to_string(), strings(&params.adds));
    ked.insert("a".to_string(), Value::from(params.data));

    let (_, ked) = saidify(ked, "d")?;
    Serder::from_ked(ked, Some(params.kind))
}

/// Build an interaction event anchoring `data` after the event `dig` at `sn - 1`
pub fn interact(
    pre: &str,
    dig: &str,
    sn: u64,
    data: Vec<Value>,
    kind: Kind,
) -> Result<Serder, CodecError> {
    if sn == 0 {
        return Err(CodecError::InvalidField(
            "s: interaction sequence number must be positive".to_string(),
        ));
    }

    let mut ked = Ked::new();
    ked.insert("v".to_string(), Value::from(versify(kind, 0)));
    ked.insert("t".to_string(), Value::from(ilks::IXN));
    ked.insert("d".to_string(), Value::from(""));
    ked.insert("i".to_string(), Value::from(pre));
    ked.insert("s".to_string(), hex(sn));
    ked.insert("p".to_string(), Value::from(dig));
    ked.insert("a".to_string(), Value::from(data));

    let (_, ked) = saidify(ked, "d")?;
    Serder::from_ked(ked, Some(kind))
}

pub fn reply(
    route: &str,
    data: Value,
    stamp: Option<String>,
    kind: Kind,
) -> Result<Serder, CodecError> {
    let mut ked = Ked::new();
    ked.insert("v".to_string(), Value::from(versify(kind, 0)));
    ked.insert("t".to_string(), Value::from(ilks::RPY));
    ked.insert("d".to_string(), Value::from(""));
    ked.insert(
        "dt".to_string(),
        Value::from(stamp.unwrap_or_else(now_iso8601)),
    );
    ked.insert("r".to_string(), Value::from(route));
    ked.insert("a".to_string(), data);

    let (_, ked) = saidify(ked, "d")?;
    Serder::from_ked(ked, Some(kind))
}

/// Event seal `{i, s, d}` referencing `serder`, used as an anchor
pub fn seal(serder: &Serder) -> Result<Value, CodecError> {
    let pre = serder.require_pre()?;
    let said = serder.require_said()?;
    let sn = serder.sn()?;

    Ok(json!({"i": pre, "s": format!("{sn:x}"), "d": said}))
}
