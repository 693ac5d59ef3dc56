//! Peer to peer `exn` messages and the multisig messages exchanged inside a group
//!
//! An `exn` carries a route, a payload in `a` and embedded events in `e`. The
//! embedded section is itself self addressed and the signatures of every
//! embedded event travel as a pathed group of the attachment, labelled with
//! the embed name.
use rst_common::standard::serde_json::{json, Value};

use crate::codec::eventing::now_iso8601;
use crate::codec::types::{ilks, CodecError, Ked, Kind};
use crate::codec::version::versify;
use crate::codec::{saidify, Attachment, Serder, Siger};
use crate::group::GroupHab;

/// Routes of the messages exchanged between members of a group
pub mod routes {
    pub const ICP: &str = "/multisig/icp";
    pub const IXN: &str = "/multisig/ixn";
    pub const ROT: &str = "/multisig/rot";
    pub const RPY: &str = "/multisig/rpy";
    pub const VCP: &str = "/multisig/vcp";
    pub const ISS: &str = "/multisig/iss";
    pub const REV: &str = "/multisig/rev";
    pub const EXN: &str = "/multisig/exn";
}

/// Embedded section of an `exn` together with the signatures of each embed
#[derive(Debug, Clone, Default)]
pub struct Embeds {
    ked: Ked,
    attachment: Attachment,
}

impl Embeds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Embed the event `serder` under `label`, with its `sigers` when there are any
    pub fn event(mut self, label: &str, serder: &Serder, sigers: Vec<Siger>) -> Self {
        self.ked
            .insert(label.to_string(), Value::Object(serder.ked().clone()));

        if !sigers.is_empty() {
            self.attachment = self.attachment.with_path(label, sigers);
        }

        self
    }

    pub fn is_empty(&self) -> bool {
        self.ked.is_empty()
    }
}

/// Build an `exn` message sent by `sender`, returns it with the pathed signatures of its embeds
pub fn exchange(
    route: &str,
    payload: Value,
    sender: &str,
    embeds: Embeds,
    stamp: Option<String>,
) -> Result<(Serder, Attachment), CodecError> {
    let section = match embeds.is_empty() {
        true => Value::Object(Ked::new()),
        false => {
            let mut section = Ked::new();
            section.insert("d".to_string(), Value::from(""));
            section.extend(embeds.ked);

            let (_, section) = saidify(section, "d")?;
            Value::Object(section)
        }
    };

    let mut ked = Ked::new();
    ked.insert("v".to_string(), Value::from(versify(Kind::Json, 0)));
    ked.insert("t".to_string(), Value::from(ilks::EXN));
    ked.insert("d".to_string(), Value::from(""));
    ked.insert("i".to_string(), Value::from(sender));
    ked.insert(
        "dt".to_string(),
        Value::from(stamp.unwrap_or_else(now_iso8601)),
    );
    ked.insert("r".to_string(), Value::from(route));
    ked.insert("q".to_string(), Value::Object(Ked::new()));
    ked.insert("a".to_string(), payload);
    ked.insert("e".to_string(), section);

    let (_, ked) = saidify(ked, "d")?;
    let serder = Serder::from_ked(ked, Some(Kind::Json))?;
    Ok((serder, embeds.attachment))
}

/// The event embedded under `label` of `exn`, serialized again in its own kind
pub fn embedded(exn: &Serder, label: &str) -> Result<Serder, CodecError> {
    let ked = exn
        .ked()
        .get("e")
        .and_then(|section| section.get(label))
        .and_then(|val| val.as_object())
        .cloned()
        .ok_or(CodecError::MissingField(format!("e.{label}")))?;

    Serder::from_ked(ked, None)
}

/// The payload section `a` of `exn`
pub fn payload(exn: &Serder) -> Result<&Ked, CodecError> {
    exn.ked()
        .get("a")
        .and_then(|val| val.as_object())
        .ok_or(CodecError::MissingField("a".to_string()))
}

pub fn multisig_inception_exn(
    ghab: &GroupHab,
    icp: &Serder,
    sigers: Vec<Siger>,
) -> Result<(Serder, Attachment), CodecError> {
    let payload = json!({"gid": ghab.pre, "smids": ghab.smids, "rmids": ghab.rmids});
    let embeds = Embeds::new().event("icp", icp, sigers);
    exchange(routes::ICP, payload, &ghab.mhab.pre, embeds, None)
}

pub fn multisig_interact_exn(
    ghab: &GroupHab,
    ixn: &Serder,
    sigers: Vec<Siger>,
    data: &[Value],
) -> Result<(Serder, Attachment), CodecError> {
    let payload = json!({
        "gid": ghab.pre,
        "smids": ghab.smids,
        "rmids": ghab.rmids,
        "data": data,
    });

    let embeds = Embeds::new().event("ixn", ixn, sigers);
    exchange(routes::IXN, payload, &ghab.mhab.pre, embeds, None)
}

pub fn multisig_rotate_exn(
    ghab: &GroupHab,
    smids: &[String],
    rmids: &[String],
    rot: &Serder,
    sigers: Vec<Siger>,
) -> Result<(Serder, Attachment), CodecError> {
    let payload = json!({"gid": ghab.pre, "smids": smids, "rmids": rmids});
    let embeds = Embeds::new().event("rot", rot, sigers);
    exchange(routes::ROT, payload, &ghab.mhab.pre, embeds, None)
}

pub fn multisig_rpy_exn(
    ghab: &GroupHab,
    rpy: &Serder,
    sigers: Vec<Siger>,
) -> Result<(Serder, Attachment), CodecError> {
    let embeds = Embeds::new().event("rpy", rpy, sigers);
    exchange(routes::RPY, json!({"gid": ghab.pre}), &ghab.mhab.pre, embeds, None)
}

pub fn multisig_registry_incept_exn(
    ghab: &GroupHab,
    usage: &str,
    vcp: &Serder,
    anc: &Serder,
    sigers: Vec<Siger>,
) -> Result<(Serder, Attachment), CodecError> {
    let payload = json!({"gid": ghab.pre, "usage": usage});
    let embeds = Embeds::new()
        .event("vcp", vcp, Vec::new())
        .event("anc", anc, sigers);

    exchange(routes::VCP, payload, &ghab.mhab.pre, embeds, None)
}

/// `acdc` is the serialized credential, carried as an embedded event
pub fn multisig_issue_exn(
    ghab: &GroupHab,
    acdc: &Serder,
    iss: &Serder,
    anc: &Serder,
    sigers: Vec<Siger>,
) -> Result<(Serder, Attachment), CodecError> {
    let embeds = Embeds::new()
        .event("acdc", acdc, Vec::new())
        .event("iss", iss, Vec::new())
        .event("anc", anc, sigers);

    exchange(routes::ISS, json!({"gid": ghab.pre}), &ghab.mhab.pre, embeds, None)
}

pub fn multisig_revoke_exn(
    ghab: &GroupHab,
    said: &str,
    rev: &Serder,
    anc: &Serder,
    sigers: Vec<Siger>,
) -> Result<(Serder, Attachment), CodecError> {
    let payload = json!({"gid": ghab.pre, "said": said});
    let embeds = Embeds::new()
        .event("rev", rev, Vec::new())
        .event("anc", anc, sigers);

    exchange(routes::REV, payload, &ghab.mhab.pre, embeds, None)
}

/// Wrap the group message `exn` so the other members can endorse it
pub fn multisig_exn(
    ghab: &GroupHab,
    exn: &Serder,
    sigers: Vec<Siger>,
) -> Result<(Serder, Attachment), CodecError> {
    let embeds = Embeds::new().event("exn", exn, sigers);
    exchange(routes::EXN, json!({"gid": ghab.pre}), &ghab.mhab.pre, embeds, None)
}
