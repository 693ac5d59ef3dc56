use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::Value;
use rst_common::with_errors::thiserror::{self, Error};

use crate::codec::said::compute_said_with;
use crate::codec::types::{ilks, traits, CodecError};
use crate::codec::{digest, Ked, Serder, Siger, Tholder};
use crate::escrow::EscrowError;

/// GroupError is a base error types for the `group` domain
#[derive(Debug, PartialEq, Error, Clone, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum GroupError {
    #[error("unknown error: {0}")]
    UnknownError(String),

    #[error("repository error: {0}")]
    RepoError(String),

    #[error("signing error: {0}")]
    SigningError(String),

    #[error("unknown identifier: {0}")]
    UnknownIdentifier(String),

    #[error("unknown member: {0}")]
    UnknownMember(String),

    #[error("local member missing: {0}")]
    LocalMemberMissing(String),

    #[error("alias already in use: {0}")]
    AliasInUse(String),

    #[error("invalid event: {0}")]
    InvalidEvent(String),

    #[error("out of order event: {0}")]
    OutOfOrder(String),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("escrow error: {0}")]
    Escrow(#[from] EscrowError),
}

/// A local single signature identifier, the member this agent controls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Hab {
    pub name: String,
    pub pre: String,
}

impl Hab {
    pub fn new(name: &str, pre: &str) -> Self {
        Self {
            name: name.to_string(),
            pre: pre.to_string(),
        }
    }
}

/// A group identifier together with the local member that participates in it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct GroupHab {
    pub name: String,
    pub pre: String,
    pub mhab: Hab,
    pub smids: Vec<String>,
    pub rmids: Vec<String>,
}

impl GroupHab {
    /// Members are the union of signing and rotation members, in first seen order
    pub fn members(&self) -> Vec<String> {
        union(&self.smids, &self.rmids)
    }
}

/// Union of two member lists keeping the first occurrence order
pub fn union(smids: &[String], rmids: &[String]) -> Vec<String> {
    let mut both: Vec<String> = Vec::with_capacity(smids.len() + rmids.len());
    for mid in smids.iter().chain(rmids.iter()) {
        if !both.contains(mid) {
            both.push(mid.clone());
        }
    }

    both
}

/// Current key state of an identifier, derived from its accepted key events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct KeyState {
    pub pre: String,
    pub sn: u64,
    pub said: String,
    pub ilk: String,
    pub keys: Vec<String>,
    pub sith: Value,
    pub ndigs: Vec<String>,
    pub nsith: Value,
    pub toad: u64,
    pub wits: Vec<String>,
    pub cnfg: Vec<String>,
    pub delpre: Option<String>,
}

fn strings(ked: &Ked, label: &str) -> Result<Vec<String>, CodecError> {
    match ked.get(label) {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(|val| val.to_string())
                    .ok_or(CodecError::InvalidField(format!("{label}: {item}")))
            })
            .collect(),
        Some(other) => Err(CodecError::InvalidField(format!("{label}: {other}"))),
    }
}

fn hex_field(ked: &Ked, label: &str) -> Result<u64, CodecError> {
    let text = ked
        .get(label)
        .and_then(|val| val.as_str())
        .ok_or(CodecError::MissingField(label.to_string()))?;

    u64::from_str_radix(text, 16).map_err(|err| CodecError::InvalidField(format!("{label}: {err}")))
}

fn field(ked: &Ked, label: &str) -> Result<Value, CodecError> {
    ked.get(label)
        .cloned()
        .ok_or(CodecError::MissingField(label.to_string()))
}

impl KeyState {
    pub fn tholder(&self) -> Result<Tholder, CodecError> {
        Tholder::new(&self.sith)
    }

    pub fn establishment_only(&self) -> bool {
        self.cnfg.iter().any(|c| c == traits::ESTABLISHMENT_ONLY)
    }

    /// Build the initial state from an inception event
    pub fn incept(serder: &Serder) -> Result<Self, GroupError> {
        let ilk = serder.ilk().unwrap_or_default();
        if ilk != ilks::ICP && ilk != ilks::DIP {
            return Err(GroupError::InvalidEvent(format!(
                "expected inception, got {ilk}"
            )));
        }

        let ked = serder.ked();
        let pre = serder.require_pre()?;
        let said = serder.require_said()?;
        let computed = compute_said_with(ked, &["i", "d"])?;
        if computed != pre || computed != said {
            return Err(GroupError::InvalidEvent(format!(
                "inception of {pre} is not self-addressing, expected {computed}"
            )));
        }

        Ok(Self {
            pre,
            sn: serder.sn()?,
            said,
            ilk: ilk.to_string(),
            keys: strings(ked, "k")?,
            sith: field(ked, "kt")?,
            ndigs: strings(ked, "n")?,
            nsith: field(ked, "nt")?,
            toad: hex_field(ked, "bt")?,
            wits: strings(ked, "b")?,
            cnfg: strings(ked, "c")?,
            delpre: ked
                .get("di")
                .and_then(|val| val.as_str())
                .map(|val| val.to_string()),
        })
    }

    /// Fails unless the keys at `indices` reveal enough of the committed next digests
    ///
    /// Every index refers to a position in `keys`, a revealed key counts at the
    /// position of its digest in the prior next key list.
    pub fn check_prior_next(&self, keys: &[String], indices: &[u32]) -> Result<(), GroupError> {
        if self.ndigs.is_empty() {
            return Err(GroupError::InvalidEvent(format!(
                "{} has no next keys to rotate to",
                self.pre
            )));
        }

        let revealed: Vec<u32> = indices
            .iter()
            .filter_map(|idx| keys.get(*idx as usize))
            .filter_map(|key| {
                let dig = digest(key.as_bytes());
                self.ndigs.iter().position(|ndig| *ndig == dig)
            })
            .map(|pos| pos as u32)
            .collect();

        if !Tholder::new(&self.nsith)?.satisfy(&revealed) {
            return Err(GroupError::InvalidEvent(format!(
                "{} rotation does not satisfy the prior next threshold",
                self.pre
            )));
        }

        Ok(())
    }

    /// Next state after accepting `serder`, which must directly follow this state
    pub fn apply(&self, serder: &Serder) -> Result<Self, GroupError> {
        let ilk = serder.ilk().unwrap_or_default();
        let sn = serder.sn()?;
        let prior = serder.field_str("p").unwrap_or_default();

        if serder.require_pre()? != self.pre {
            return Err(GroupError::InvalidEvent(format!(
                "event for {} applied to {}",
                serder.require_pre()?,
                self.pre
            )));
        }

        if sn != self.sn + 1 || prior != self.said {
            return Err(GroupError::OutOfOrder(format!(
                "{} expected sn {} after {}, got sn {sn} after {prior}",
                self.pre,
                self.sn + 1,
                self.said
            )));
        }

        let mut next = self.clone();
        next.sn = sn;
        next.said = serder.require_said()?;
        next.ilk = ilk.to_string();

        match ilk {
            ilks::IXN => {
                if self.establishment_only() {
                    return Err(GroupError::InvalidEvent(format!(
                        "{} is establishment only",
                        self.pre
                    )));
                }
            }
            ilks::ROT => {
                let ked = serder.ked();
                let cuts = strings(ked, "br")?;
                let adds = strings(ked, "ba")?;

                let keys = strings(ked, "k")?;
                let exposed: Vec<u32> = (0..keys.len() as u32).collect();
                self.check_prior_next(&keys, &exposed)?;

                next.keys = keys;
                next.sith = field(ked, "kt")?;
                next.ndigs = strings(ked, "n")?;
                next.nsith = field(ked, "nt")?;
                next.toad = hex_field(ked, "bt")?;
                next.wits = self
                    .wits
                    .iter()
                    .filter(|wit| !cuts.contains(wit))
                    .cloned()
                    .chain(adds.into_iter().filter(|wit| !self.wits.contains(wit)))
                    .collect();
            }
            other => {
                return Err(GroupError::InvalidEvent(format!(
                    "unsupported key event type: {other}"
                )))
            }
        }

        Ok(next)
    }
}

/// Inception parameters of a group taken from a proposed inception event
#[derive(Debug, Clone, PartialEq)]
pub struct GroupInits {
    pub isith: Value,
    pub nsith: Value,
    pub est_only: bool,
    pub dnd: bool,
    pub toad: u64,
    pub wits: Vec<String>,
    pub delpre: Option<String>,
}

impl GroupInits {
    pub fn from_ked(ked: &Ked) -> Result<Self, CodecError> {
        let cnfg = strings(ked, "c")?;
        Ok(Self {
            isith: field(ked, "kt")?,
            nsith: field(ked, "nt")?,
            est_only: cnfg.iter().any(|c| c == traits::ESTABLISHMENT_ONLY),
            dnd: cnfg.iter().any(|c| c == traits::DO_NOT_DELEGATE),
            toad: hex_field(ked, "bt")?,
            wits: strings(ked, "b")?,
            delpre: ked
                .get("di")
                .and_then(|val| val.as_str())
                .map(|val| val.to_string()),
        })
    }

    pub fn cnfg(&self) -> Vec<String> {
        let mut cnfg = Vec::new();
        if self.est_only {
            cnfg.push(traits::ESTABLISHMENT_ONLY.to_string());
        }

        if self.dnd {
            cnfg.push(traits::DO_NOT_DELEGATE.to_string());
        }

        cnfg
    }
}

/// Lifecycle of a group proposal, keyed by identifier and sequence number
///
/// There is no way back to `Proposed`, an abandoned proposal simply never advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalState {
    /// Locally approved, nothing escrowed yet
    Proposed,
    /// Local signature escrowed, waiting for the threshold
    Pending,
    Complete,
}

/// Identity store contract
///
/// Resolves local members and groups, holds the signing keys of local members
/// and keeps the accepted key event log and key state of every known identifier.
#[async_trait]
pub trait HaberyBuilder: Clone + Send + Sync {
    /// Local single signature identifier by prefix
    async fn local_hab(&self, pre: &str) -> Result<Option<Hab>, GroupError>;

    /// Group identifier by prefix
    async fn group_hab(&self, pre: &str) -> Result<Option<GroupHab>, GroupError>;

    /// Prefix of the local or group identifier using `name`
    async fn hab_by_name(&self, name: &str) -> Result<Option<String>, GroupError>;

    async fn save_group_hab(&self, ghab: &GroupHab) -> Result<(), GroupError>;

    /// Sign `raw` as the local member of `ghab`, indexed at its signing member position
    async fn sign(&self, ghab: &GroupHab, raw: &[u8]) -> Result<Vec<Siger>, GroupError>;

    /// Sign `raw` with the single key of a local identifier
    async fn sign_local(&self, hab: &Hab, raw: &[u8]) -> Result<Vec<Siger>, GroupError>;

    /// Rotate a local identifier to its committed next key, committing a fresh one
    async fn rotate_local(&self, hab: &Hab) -> Result<KeyState, GroupError>;

    async fn key_state(&self, pre: &str) -> Result<Option<KeyState>, GroupError>;

    /// Persist an accepted key event with its signatures and the resulting state
    async fn save_key_event(
        &self,
        serder: &Serder,
        sigers: &[Siger],
        state: &KeyState,
    ) -> Result<(), GroupError>;

    /// Accepted key event messages of `pre`, in sequence order
    async fn clone_pre_iter(&self, pre: &str) -> Result<Vec<Vec<u8>>, GroupError>;

    async fn save_end_role(&self, cid: &str, role: &str, eid: &str) -> Result<(), GroupError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rst_common::standard::serde_json::json;

    use crate::codec::eventing::{self, InceptionParams, RotationParams};
    use crate::codec::saidify;
    use crate::codec::types::Kind;

    fn inception() -> Serder {
        eventing::incept(InceptionParams {
            keys: vec!["aa".repeat(32), "bb".repeat(32)],
            isith: json!("2"),
            ndigs: vec![
                digest("cc".repeat(32).as_bytes()),
                digest("dd".repeat(32).as_bytes()),
            ],
            nsith: json!("1"),
            toad: 1,
            wits: vec!["BW1".to_string(), "BW2".to_string()],
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_union_keeps_order() {
        let smids = vec!["A".to_string(), "B".to_string()];
        let rmids = vec!["B".to_string(), "C".to_string()];
        assert_eq!(union(&smids, &rmids), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_key_state_incept() {
        let serder = inception();
        let state = KeyState::incept(&serder).unwrap();
        assert_eq!(state.sn, 0);
        assert_eq!(state.pre, serder.pre().unwrap());
        assert_eq!(state.toad, 1);
        assert_eq!(state.keys.len(), 2);
        assert_eq!(state.tholder().unwrap().num(), Some(2));
    }

    #[test]
    fn test_key_state_apply_interaction() {
        let serder = inception();
        let state = KeyState::incept(&serder).unwrap();

        let ixn = eventing::interact(&state.pre, &state.said, 1, vec![], Kind::Json).unwrap();
        let next = state.apply(&ixn).unwrap();
        assert_eq!(next.sn, 1);
        assert_eq!(next.said, ixn.said().unwrap());
        assert_eq!(next.keys, state.keys);

        let replay = state.apply(&ixn).unwrap();
        assert_eq!(replay, next);

        let skipped = eventing::interact(&state.pre, &state.said, 2, vec![], Kind::Json).unwrap();
        assert!(matches!(state.apply(&skipped), Err(GroupError::OutOfOrder(_))));
    }

    #[test]
    fn test_key_state_apply_rotation() {
        let state = KeyState::incept(&inception()).unwrap();
        let rot = eventing::rotate(RotationParams {
            pre: state.pre.clone(),
            dig: state.said.clone(),
            sn: 1,
            keys: vec!["cc".repeat(32)],
            isith: json!("1"),
            toad: 1,
            cuts: vec!["BW1".to_string()],
            adds: vec!["BW3".to_string()],
            ..Default::default()
        })
        .unwrap();

        let next = state.apply(&rot).unwrap();
        assert_eq!(next.keys, vec!["cc".repeat(32)]);
        assert_eq!(next.wits, vec!["BW2", "BW3"]);
    }

    #[test]
    fn test_key_state_rotation_to_uncommitted_key() {
        let state = KeyState::incept(&inception()).unwrap();
        let rot = eventing::rotate(RotationParams {
            pre: state.pre.clone(),
            dig: state.said.clone(),
            sn: 1,
            keys: vec!["ee".repeat(32)],
            isith: json!("1"),
            toad: 1,
            ..Default::default()
        })
        .unwrap();

        assert!(matches!(state.apply(&rot), Err(GroupError::InvalidEvent(_))));
        assert!(state.check_prior_next(&["dd".repeat(32)], &[0]).is_ok());
        assert!(state.check_prior_next(&["dd".repeat(32)], &[]).is_err());
    }

    #[test]
    fn test_key_state_rotation_without_next_keys() {
        let icp = eventing::incept(InceptionParams {
            keys: vec!["aa".repeat(32)],
            isith: json!("1"),
            ..Default::default()
        })
        .unwrap();

        let state = KeyState::incept(&icp).unwrap();
        let rot = eventing::rotate(RotationParams {
            pre: state.pre.clone(),
            dig: state.said.clone(),
            sn: 1,
            keys: vec!["aa".repeat(32)],
            isith: json!("1"),
            ..Default::default()
        })
        .unwrap();

        assert!(matches!(state.apply(&rot), Err(GroupError::InvalidEvent(_))));
    }

    #[test]
    fn test_key_state_incept_requires_self_addressing_prefix() {
        let mut ked = inception().ked().clone();
        ked.insert("i".to_string(), json!("EVictimPrefixAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"));
        let (_, ked) = saidify(ked, "d").unwrap();
        let forged = Serder::from_ked(ked, None).unwrap();

        assert!(matches!(KeyState::incept(&forged), Err(GroupError::InvalidEvent(_))));
    }

    #[test]
    fn test_group_inits_from_ked() {
        let serder = eventing::incept(InceptionParams {
            keys: vec!["aa".repeat(32)],
            isith: json!("1"),
            cnfg: vec!["EO".to_string(), "DND".to_string()],
            delpre: Some("EDel".to_string()),
            ..Default::default()
        })
        .unwrap();

        let inits = GroupInits::from_ked(serder.ked()).unwrap();
        assert!(inits.est_only);
        assert!(inits.dnd);
        assert_eq!(inits.delpre, Some("EDel".to_string()));
        assert_eq!(inits.cnfg(), vec!["EO", "DND"]);
    }
}
