use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use prople_crypto::eddsa::keypair::KeyPair;
use prople_crypto::keysecure::types::ToKeySecure;
use prople_crypto::keysecure::KeySecure;
use prople_crypto::types::{Hexer, VectorValue};

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::json;
use rst_common::with_logging::log::{debug, info};

use prople_quorum_core::codec::eventing::{self, InceptionParams, RotationParams};
use prople_quorum_core::codec::types::ilks;
use prople_quorum_core::codec::{
    digest, messagize, parse_message, Attachment, Serder, Siger, Tholder, Verfer,
};
use prople_quorum_core::group::{GroupError, GroupHab, Hab, Habery, HaberyBuilder, KeyState};

use crate::db::record::{from_bytes, to_bytes};
use crate::db::{AppError, Runner};

const LOCAL_KEY_ID: &str = "hab";
const GROUP_KEY_ID: &str = "group";
const NAME_KEY_ID: &str = "name";
const STATE_KEY_ID: &str = "state";
const KEL_KEY_ID: &str = "kel";
const ROLE_KEY_ID: &str = "role";

fn repo_error(err: AppError) -> GroupError {
    GroupError::RepoError(err.to_string())
}

/// A local identifier with its encrypted current and next private keys
#[derive(Clone, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
struct LocalRecord {
    hab: Hab,
    signing: KeySecure,
    next: KeySecure,
}

/// An authorized endpoint role of a controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct EndRole {
    pub cid: String,
    pub role: String,
    pub eid: String,
}

/// `Keeper` is the durable identity store of an agent
///
/// Private keys never leave it unencrypted, they are sealed with the agent
/// passcode and only opened in memory to sign.
#[derive(Clone)]
pub struct Keeper {
    db: Runner,
    passcode: String,
    unlocked: Arc<Mutex<HashMap<String, String>>>,
}

impl Keeper {
    pub fn new(db: Runner, passcode: &str) -> Self {
        Self {
            db,
            passcode: passcode.to_string(),
            unlocked: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn seal(&self, pair: &KeyPair) -> Result<KeySecure, GroupError> {
        pair.priv_key()
            .to_keysecure(self.passcode.clone().into())
            .map_err(|err| GroupError::SigningError(err.to_string()))
    }

    /// Create a local single key identifier named `alias`
    pub async fn create_local(&self, alias: &str) -> Result<Hab, GroupError> {
        if self.hab_by_name(alias).await?.is_some() {
            return Err(GroupError::AliasInUse(alias.to_string()));
        }

        let pair = KeyPair::generate();
        let next = KeyPair::generate();

        let icp = eventing::incept(InceptionParams {
            keys: vec![pair.pub_key().to_hex().hex()],
            isith: json!("1"),
            ndigs: vec![digest(next.pub_key().to_hex().hex().as_bytes())],
            nsith: json!("1"),
            ..Default::default()
        })?;

        let state = KeyState::incept(&icp)?;
        let hab = Hab::new(alias, &state.pre);

        let record = LocalRecord {
            hab: hab.clone(),
            signing: self.seal(&pair)?,
            next: self.seal(&next)?,
        };

        self.db
            .save(
                format!("{}:{}", LOCAL_KEY_ID, hab.pre),
                to_bytes(&record).map_err(repo_error)?,
            )
            .await
            .map_err(repo_error)?;
        self.save_name(alias, &hab.pre).await?;

        let sigers = vec![Siger::new(0, pair.signature(icp.raw()).to_hex())];
        self.save_key_event(&icp, &sigers, &state).await?;

        info!("[keeper:create_local] alias: {alias} | pre: {}", hab.pre);
        Ok(hab)
    }

    pub async fn list_locals(&self) -> Result<Vec<Hab>, GroupError> {
        let entries = self
            .db
            .list(format!("{}:", LOCAL_KEY_ID))
            .await
            .map_err(repo_error)?;

        entries
            .iter()
            .map(|(_, value)| from_bytes::<LocalRecord>(value).map(|record| record.hab))
            .collect::<Result<Vec<Hab>, AppError>>()
            .map_err(repo_error)
    }

    pub async fn list_groups(&self) -> Result<Vec<GroupHab>, GroupError> {
        let entries = self
            .db
            .list(format!("{}:", GROUP_KEY_ID))
            .await
            .map_err(repo_error)?;

        entries
            .iter()
            .map(|(_, value)| from_bytes::<GroupHab>(value))
            .collect::<Result<Vec<GroupHab>, AppError>>()
            .map_err(repo_error)
    }

    pub async fn end_roles(&self, cid: &str) -> Result<Vec<EndRole>, GroupError> {
        let entries = self
            .db
            .list(format!("{}:{}:", ROLE_KEY_ID, cid))
            .await
            .map_err(repo_error)?;

        entries
            .iter()
            .map(|(_, value)| from_bytes::<EndRole>(value))
            .collect::<Result<Vec<EndRole>, AppError>>()
            .map_err(repo_error)
    }

    /// Verify and accept the key event log of another identifier
    ///
    /// Every event must be signed to its threshold by the keys it establishes,
    /// or by the current keys for an interaction. A rotation must also be signed
    /// by keys revealing the prior next threshold. Events already known are skipped.
    pub async fn import_kel(&self, messages: &[Vec<u8>]) -> Result<KeyState, GroupError> {
        let habery = Habery::new(self.clone());

        let mut state: Option<KeyState> = None;
        for message in messages {
            let (serder, atc) = parse_message(message)?;
            let pre = serder.require_pre()?;

            let current = match &state {
                Some(state) => Some(state.clone()),
                None => self.key_state(&pre).await?,
            };

            match &current {
                Some(current) if serder.sn()? > current.sn => {
                    let next = current.apply(&serder)?;
                    let indices = verify(&serder, &atc.sigers, &next.keys, &next.tholder()?)?;
                    if serder.ilk() == Some(ilks::ROT) {
                        current.check_prior_next(&next.keys, &indices)?;
                    }
                }
                Some(_) => {
                    debug!("[keeper:import_kel] known: {pre} | sn: {}", serder.sn()?);
                    continue;
                }
                None => {
                    let incepted = KeyState::incept(&serder)?;
                    verify(&serder, &atc.sigers, &incepted.keys, &incepted.tholder()?)?;
                }
            }

            state = Some(habery.apply_event(&serder, &atc.sigers).await?);
        }

        state.ok_or(GroupError::InvalidEvent("empty key event log".to_string()))
    }

    async fn save_name(&self, name: &str, pre: &str) -> Result<(), GroupError> {
        self.db
            .save(
                format!("{}:{}", NAME_KEY_ID, name),
                pre.as_bytes().to_vec(),
            )
            .await
            .map_err(repo_error)
    }

    async fn local_record(&self, pre: &str) -> Result<Option<LocalRecord>, GroupError> {
        let value = self
            .db
            .get(format!("{}:{}", LOCAL_KEY_ID, pre))
            .await
            .map_err(repo_error)?;

        value
            .map(|bytes| from_bytes::<LocalRecord>(&bytes))
            .transpose()
            .map_err(repo_error)
    }

    /// Decrypt a sealed private key into its PEM text
    fn open(&self, secure: &KeySecure) -> Result<String, GroupError> {
        let decrypted = secure
            .decrypt(self.passcode.clone())
            .map_err(|err| GroupError::SigningError(err.to_string()))?;

        String::from_utf8(decrypted.vec()).map_err(|err| GroupError::SigningError(err.to_string()))
    }

    /// Signing key pair of a local identifier, decrypted once per process
    async fn pair(&self, pre: &str) -> Result<KeyPair, GroupError> {
        let cached = self
            .unlocked
            .lock()
            .map_err(|err| GroupError::SigningError(err.to_string()))?
            .get(pre)
            .cloned();

        let pem = match cached {
            Some(pem) => pem,
            None => {
                let record = self
                    .local_record(pre)
                    .await?
                    .ok_or(GroupError::UnknownIdentifier(pre.to_string()))?;

                let pem = self.open(&record.signing)?;
                self.unlocked
                    .lock()
                    .map_err(|err| GroupError::SigningError(err.to_string()))?
                    .insert(pre.to_string(), pem.clone());
                pem
            }
        };

        KeyPair::from_pem(pem).map_err(|err| GroupError::SigningError(err.to_string()))
    }
}

/// Check `sigers` against `keys` until `tholder` is satisfied, returning the verified indices
fn verify(
    serder: &Serder,
    sigers: &[Siger],
    keys: &[String],
    tholder: &Tholder,
) -> Result<Vec<u32>, GroupError> {
    let indices: Vec<u32> = sigers
        .iter()
        .filter(|siger| {
            keys.get(siger.index as usize)
                .map(|key| Verfer::new(key).verify(serder.raw(), &siger.signature))
                .unwrap_or(false)
        })
        .map(|siger| siger.index)
        .collect();

    if !tholder.satisfy(&indices) {
        return Err(GroupError::InvalidEvent(format!(
            "{} sn {} is not signed to its threshold",
            serder.pre().unwrap_or_default(),
            serder.sn()?
        )));
    }

    Ok(indices)
}

#[async_trait]
impl HaberyBuilder for Keeper {
    async fn local_hab(&self, pre: &str) -> Result<Option<Hab>, GroupError> {
        Ok(self.local_record(pre).await?.map(|record| record.hab))
    }

    async fn group_hab(&self, pre: &str) -> Result<Option<GroupHab>, GroupError> {
        let value = self
            .db
            .get(format!("{}:{}", GROUP_KEY_ID, pre))
            .await
            .map_err(repo_error)?;

        value
            .map(|bytes| from_bytes::<GroupHab>(&bytes))
            .transpose()
            .map_err(repo_error)
    }

    async fn hab_by_name(&self, name: &str) -> Result<Option<String>, GroupError> {
        let value = self
            .db
            .get(format!("{}:{}", NAME_KEY_ID, name))
            .await
            .map_err(repo_error)?;

        value
            .map(|bytes| String::from_utf8(bytes).map_err(|err| GroupError::RepoError(err.to_string())))
            .transpose()
    }

    async fn save_group_hab(&self, ghab: &GroupHab) -> Result<(), GroupError> {
        self.db
            .save(
                format!("{}:{}", GROUP_KEY_ID, ghab.pre),
                to_bytes(ghab).map_err(repo_error)?,
            )
            .await
            .map_err(repo_error)?;

        self.save_name(&ghab.name, &ghab.pre).await
    }

    async fn sign(&self, ghab: &GroupHab, raw: &[u8]) -> Result<Vec<Siger>, GroupError> {
        let index = ghab
            .smids
            .iter()
            .position(|mid| *mid == ghab.mhab.pre)
            .ok_or(GroupError::LocalMemberMissing(format!(
                "{} does not sign for {}",
                ghab.mhab.pre, ghab.pre
            )))?;

        let pair = self.pair(&ghab.mhab.pre).await?;
        Ok(vec![Siger::new(index as u32, pair.signature(raw).to_hex())])
    }

    async fn sign_local(&self, hab: &Hab, raw: &[u8]) -> Result<Vec<Siger>, GroupError> {
        let pair = self.pair(&hab.pre).await?;
        Ok(vec![Siger::new(0, pair.signature(raw).to_hex())])
    }

    async fn rotate_local(&self, hab: &Hab) -> Result<KeyState, GroupError> {
        let record = self
            .local_record(&hab.pre)
            .await?
            .ok_or(GroupError::UnknownIdentifier(hab.pre.clone()))?;
        let state = self
            .key_state(&hab.pre)
            .await?
            .ok_or(GroupError::UnknownIdentifier(hab.pre.clone()))?;

        let pem = self.open(&record.next)?;
        let signing = KeyPair::from_pem(pem.clone())
            .map_err(|err| GroupError::SigningError(err.to_string()))?;
        let next = KeyPair::generate();

        let rot = eventing::rotate(RotationParams {
            pre: state.pre.clone(),
            dig: state.said.clone(),
            sn: state.sn + 1,
            keys: vec![signing.pub_key().to_hex().hex()],
            isith: json!("1"),
            ndigs: vec![digest(next.pub_key().to_hex().hex().as_bytes())],
            nsith: json!("1"),
            toad: state.toad,
            ..Default::default()
        })?;

        let sigers = vec![Siger::new(0, signing.signature(rot.raw()).to_hex())];
        let rotated = Habery::new(self.clone()).apply_event(&rot, &sigers).await?;

        let record = LocalRecord {
            hab: record.hab,
            signing: record.next,
            next: self.seal(&next)?,
        };
        self.db
            .save(
                format!("{}:{}", LOCAL_KEY_ID, hab.pre),
                to_bytes(&record).map_err(repo_error)?,
            )
            .await
            .map_err(repo_error)?;

        self.unlocked
            .lock()
            .map_err(|err| GroupError::SigningError(err.to_string()))?
            .insert(hab.pre.clone(), pem);

        info!("[keeper:rotate_local] pre: {} | sn: {}", hab.pre, rotated.sn);
        Ok(rotated)
    }

    async fn key_state(&self, pre: &str) -> Result<Option<KeyState>, GroupError> {
        let value = self
            .db
            .get(format!("{}:{}", STATE_KEY_ID, pre))
            .await
            .map_err(repo_error)?;

        value
            .map(|bytes| from_bytes::<KeyState>(&bytes))
            .transpose()
            .map_err(repo_error)
    }

    async fn save_key_event(
        &self,
        serder: &Serder,
        sigers: &[Siger],
        state: &KeyState,
    ) -> Result<(), GroupError> {
        let message = messagize(serder, &Attachment::new(sigers.to_vec()))?;
        self.db
            .save(
                format!("{}:{}:{:032x}", KEL_KEY_ID, state.pre, serder.sn()?),
                message,
            )
            .await
            .map_err(repo_error)?;

        self.db
            .save(
                format!("{}:{}", STATE_KEY_ID, state.pre),
                to_bytes(state).map_err(repo_error)?,
            )
            .await
            .map_err(repo_error)
    }

    async fn clone_pre_iter(&self, pre: &str) -> Result<Vec<Vec<u8>>, GroupError> {
        let entries = self
            .db
            .list(format!("{}:{}:", KEL_KEY_ID, pre))
            .await
            .map_err(repo_error)?;

        Ok(entries.into_iter().map(|(_, value)| value).collect())
    }

    async fn save_end_role(&self, cid: &str, role: &str, eid: &str) -> Result<(), GroupError> {
        let record = EndRole {
            cid: cid.to_string(),
            role: role.to_string(),
            eid: eid.to_string(),
        };

        self.db
            .save(
                format!("{}:{}:{}:{}", ROLE_KEY_ID, cid, role, eid),
                to_bytes(&record).map_err(repo_error)?,
            )
            .await
            .map_err(repo_error)
    }
}
