//! In memory collaborators used to drive the confirmation loop in tests
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use prople_crypto::eddsa::keypair::KeyPair;
use prople_crypto::types::Hexer;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde_json::json;

use crate::codec::eventing::{self, InceptionParams, RotationParams};
use crate::codec::{digest, messagize, Attachment, Serder, Siger};
use crate::credential::{
    CredentialError, Registry, RegistryRepoBuilder, SchemaResolverBuilder, Schemer,
};
use crate::escrow::{EscrowEntry, EscrowError, EscrowKey, EscrowRepoBuilder};
use crate::group::{GroupError, GroupHab, Hab, HaberyBuilder, KeyState};
use crate::notification::{Notice, NoticeID, NotificationError, NotificationRepoBuilder};
use crate::relay::{ExchangeRepoBuilder, Postage, PostageRepoBuilder, RelayError, TransportBuilder};

use super::summary::Summary;
use super::types::{Components, ConfirmError, Contact, ContactDirectory, DecisionProvider};

/// Single key rotation of `state` to `signing`, committing to `next`
fn rotation(state: &KeyState, signing: &KeyPair, next: &KeyPair) -> Result<(Serder, Siger), GroupError> {
    let rot = eventing::rotate(RotationParams {
        pre: state.pre.clone(),
        dig: state.said.clone(),
        sn: state.sn + 1,
        keys: vec![signing.pub_key().to_hex().hex()],
        isith: json!("1"),
        ndigs: vec![digest(next.pub_key().to_hex().hex().as_bytes())],
        nsith: json!("1"),
        ..Default::default()
    })?;

    let siger = Siger::new(0, signing.signature(rot.raw()).to_hex());
    Ok((rot, siger))
}

/// A member identifier with its signing key, known to the test but not to the store
pub(crate) struct Member {
    pub hab: Hab,
    pub pair: KeyPair,
    pub next: KeyPair,
    pub state: KeyState,
}

impl Member {
    pub fn new(name: &str) -> Self {
        let pair = KeyPair::generate();
        let next = KeyPair::generate();

        let icp = eventing::incept(InceptionParams {
            keys: vec![pair.pub_key().to_hex().hex()],
            isith: json!("1"),
            ndigs: vec![digest(next.pub_key().to_hex().hex().as_bytes())],
            nsith: json!("1"),
            ..Default::default()
        })
        .unwrap();

        let state = KeyState::incept(&icp).unwrap();
        Self {
            hab: Hab::new(name, &state.pre),
            pair,
            next,
            state,
        }
    }

    pub fn pre(&self) -> String {
        self.hab.pre.clone()
    }

    /// Hex public key committed as the next signing key
    pub fn next_key(&self) -> String {
        self.next.pub_key().to_hex().hex()
    }

    pub fn sign(&self, index: u32, serder: &Serder) -> Siger {
        Siger::new(index, self.pair.signature(serder.raw()).to_hex())
    }

    /// Rotate to the committed next key
    pub fn rotate(&mut self) -> Serder {
        let next = KeyPair::generate();
        let (rot, _) = rotation(&self.state, &self.next, &next).unwrap();
        self.state = self.state.apply(&rot).unwrap();
        self.pair = std::mem::replace(&mut self.next, next);
        rot
    }
}

#[derive(Default)]
struct Identities {
    locals: HashMap<String, Hab>,
    pairs: HashMap<String, KeyPair>,
    nexts: HashMap<String, KeyPair>,
    groups: HashMap<String, GroupHab>,
    states: HashMap<String, KeyState>,
    kels: HashMap<String, Vec<Vec<u8>>>,
    roles: Vec<(String, String, String)>,
    signed: usize,
}

#[derive(Clone, Default)]
pub(crate) struct MemStore {
    inner: Arc<Mutex<Identities>>,
}

impl MemStore {
    /// Make `member` a local identifier of this store
    pub fn add_local(&self, member: Member) -> Hab {
        let mut inner = self.inner.lock().unwrap();
        inner.states.insert(member.pre(), member.state.clone());
        inner.locals.insert(member.pre(), member.hab.clone());
        let pre = member.pre();
        inner.pairs.insert(pre.clone(), member.pair);
        inner.nexts.insert(pre, member.next);
        member.hab
    }

    /// Current signing key of a local identifier
    pub fn current_key(&self, pre: &str) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner.pairs.get(pre).map(|pair| pair.pub_key().to_hex().hex())
    }

    pub fn add_remote(&self, member: &Member) {
        let mut inner = self.inner.lock().unwrap();
        inner.states.insert(member.pre(), member.state.clone());
    }

    pub fn add_group(&self, ghab: GroupHab, state: KeyState) {
        let mut inner = self.inner.lock().unwrap();
        inner.states.insert(ghab.pre.clone(), state);
        inner.groups.insert(ghab.pre.clone(), ghab);
    }

    /// How many times a group event got signed locally
    pub fn signed(&self) -> usize {
        self.inner.lock().unwrap().signed
    }

    pub fn roles(&self) -> Vec<(String, String, String)> {
        self.inner.lock().unwrap().roles.clone()
    }

    fn signature(&self, pre: &str, index: u32, raw: &[u8]) -> Result<Siger, GroupError> {
        let inner = self.inner.lock().unwrap();
        let pair = inner
            .pairs
            .get(pre)
            .ok_or(GroupError::SigningError(format!("no key for {pre}")))?;

        Ok(Siger::new(index, pair.signature(raw).to_hex()))
    }
}

#[async_trait]
impl HaberyBuilder for MemStore {
    async fn local_hab(&self, pre: &str) -> Result<Option<Hab>, GroupError> {
        Ok(self.inner.lock().unwrap().locals.get(pre).cloned())
    }

    async fn group_hab(&self, pre: &str) -> Result<Option<GroupHab>, GroupError> {
        Ok(self.inner.lock().unwrap().groups.get(pre).cloned())
    }

    async fn hab_by_name(&self, name: &str) -> Result<Option<String>, GroupError> {
        let inner = self.inner.lock().unwrap();
        let local = inner.locals.values().find(|hab| hab.name == name).map(|hab| hab.pre.clone());
        let group = inner.groups.values().find(|ghab| ghab.name == name).map(|ghab| ghab.pre.clone());
        Ok(local.or(group))
    }

    async fn save_group_hab(&self, ghab: &GroupHab) -> Result<(), GroupError> {
        let mut inner = self.inner.lock().unwrap();
        inner.groups.insert(ghab.pre.clone(), ghab.clone());
        Ok(())
    }

    async fn sign(&self, ghab: &GroupHab, raw: &[u8]) -> Result<Vec<Siger>, GroupError> {
        let index = ghab
            .smids
            .iter()
            .position(|mid| *mid == ghab.mhab.pre)
            .ok_or(GroupError::LocalMemberMissing(ghab.mhab.pre.clone()))?;

        let siger = self.signature(&ghab.mhab.pre, index as u32, raw)?;
        self.inner.lock().unwrap().signed += 1;
        Ok(vec![siger])
    }

    async fn sign_local(&self, hab: &Hab, raw: &[u8]) -> Result<Vec<Siger>, GroupError> {
        Ok(vec![self.signature(&hab.pre, 0, raw)?])
    }

    async fn rotate_local(&self, hab: &Hab) -> Result<KeyState, GroupError> {
        let mut inner = self.inner.lock().unwrap();
        let state = inner
            .states
            .get(&hab.pre)
            .cloned()
            .ok_or(GroupError::UnknownIdentifier(hab.pre.clone()))?;
        let signing = inner
            .nexts
            .remove(&hab.pre)
            .ok_or(GroupError::SigningError(format!("no next key for {}", hab.pre)))?;

        let next = KeyPair::generate();
        let (rot, siger) = rotation(&state, &signing, &next)?;
        let rotated = state.apply(&rot)?;
        let message = messagize(&rot, &Attachment::new(vec![siger]))?;

        inner.states.insert(hab.pre.clone(), rotated.clone());
        inner.kels.entry(hab.pre.clone()).or_default().push(message);
        inner.pairs.insert(hab.pre.clone(), signing);
        inner.nexts.insert(hab.pre.clone(), next);
        Ok(rotated)
    }

    async fn key_state(&self, pre: &str) -> Result<Option<KeyState>, GroupError> {
        Ok(self.inner.lock().unwrap().states.get(pre).cloned())
    }

    async fn save_key_event(
        &self,
        serder: &Serder,
        sigers: &[Siger],
        state: &KeyState,
    ) -> Result<(), GroupError> {
        let message = messagize(serder, &Attachment::new(sigers.to_vec()))?;

        let mut inner = self.inner.lock().unwrap();
        inner.states.insert(state.pre.clone(), state.clone());
        inner.kels.entry(state.pre.clone()).or_default().push(message);
        Ok(())
    }

    async fn clone_pre_iter(&self, pre: &str) -> Result<Vec<Vec<u8>>, GroupError> {
        Ok(self.inner.lock().unwrap().kels.get(pre).cloned().unwrap_or_default())
    }

    async fn save_end_role(&self, cid: &str, role: &str, eid: &str) -> Result<(), GroupError> {
        let mut inner = self.inner.lock().unwrap();
        inner.roles.push((cid.to_string(), role.to_string(), eid.to_string()));
        Ok(())
    }
}

#[derive(Clone, Default)]
pub(crate) struct MemEscrow {
    entries: Arc<Mutex<HashMap<EscrowKey, EscrowEntry>>>,
    completions: Arc<Mutex<HashMap<EscrowKey, String>>>,
}

#[async_trait]
impl EscrowRepoBuilder for MemEscrow {
    async fn save_entry(&self, entry: &EscrowEntry) -> Result<(), EscrowError> {
        self.entries.lock().unwrap().insert(entry.key.clone(), entry.clone());
        Ok(())
    }

    async fn get_entry(&self, key: &EscrowKey) -> Result<Option<EscrowEntry>, EscrowError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn list_entries(&self) -> Result<Vec<EscrowEntry>, EscrowError> {
        let mut entries: Vec<EscrowEntry> = self.entries.lock().unwrap().values().cloned().collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    async fn save_completion(&self, key: &EscrowKey, said: &str) -> Result<(), EscrowError> {
        self.completions
            .lock()
            .unwrap()
            .entry(key.clone())
            .or_insert(said.to_string());
        Ok(())
    }

    async fn get_completion(&self, key: &EscrowKey) -> Result<Option<String>, EscrowError> {
        Ok(self.completions.lock().unwrap().get(key).cloned())
    }
}

#[derive(Clone, Default)]
pub(crate) struct MemNotices {
    notices: Arc<Mutex<Vec<Notice>>>,
}

#[async_trait]
impl NotificationRepoBuilder for MemNotices {
    async fn save_notice(&self, notice: &Notice) -> Result<(), NotificationError> {
        let mut notices = self.notices.lock().unwrap();
        notices.retain(|current| current.id != notice.id);
        notices.push(notice.clone());
        Ok(())
    }

    async fn list_notices(&self) -> Result<Vec<Notice>, NotificationError> {
        Ok(self.notices.lock().unwrap().clone())
    }

    async fn get_notice(&self, id: &NoticeID) -> Result<Option<Notice>, NotificationError> {
        let notices = self.notices.lock().unwrap();
        Ok(notices.iter().find(|notice| notice.id == *id).cloned())
    }

    async fn remove_notice(&self, id: &NoticeID) -> Result<bool, NotificationError> {
        let mut notices = self.notices.lock().unwrap();
        let before = notices.len();
        notices.retain(|notice| notice.id != *id);
        Ok(notices.len() < before)
    }
}

#[derive(Clone, Default)]
pub(crate) struct MemPostages {
    postages: Arc<Mutex<Vec<Postage>>>,
}

impl MemPostages {
    pub fn all(&self) -> Vec<Postage> {
        self.postages.lock().unwrap().clone()
    }
}

#[async_trait]
impl PostageRepoBuilder for MemPostages {
    async fn save_postage(&self, postage: &Postage) -> Result<(), RelayError> {
        let mut postages = self.postages.lock().unwrap();
        match postages.iter_mut().find(|current| current.id == postage.id) {
            Some(current) => *current = postage.clone(),
            None => postages.push(postage.clone()),
        }

        Ok(())
    }

    async fn list_postages(&self) -> Result<Vec<Postage>, RelayError> {
        Ok(self.all())
    }

    async fn postages_by_said(&self, said: &str) -> Result<Vec<Postage>, RelayError> {
        Ok(self.all().into_iter().filter(|postage| postage.said == said).collect())
    }
}

/// Records every delivered postage instead of sending it anywhere
#[derive(Clone, Default)]
pub(crate) struct MemTransport {
    delivered: Arc<Mutex<Vec<Postage>>>,
    offline: Arc<Mutex<bool>>,
}

impl MemTransport {
    pub fn delivered(&self) -> Vec<Postage> {
        self.delivered.lock().unwrap().clone()
    }

    /// Fail every delivery while offline
    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }
}

#[async_trait]
impl TransportBuilder for MemTransport {
    async fn deliver(&self, postage: &Postage) -> Result<(), RelayError> {
        if *self.offline.lock().unwrap() {
            return Err(RelayError::TransportError(format!("{} unreachable", postage.dest)));
        }

        self.delivered.lock().unwrap().push(postage.clone());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub(crate) struct MemExchanges {
    messages: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

#[async_trait]
impl ExchangeRepoBuilder for MemExchanges {
    async fn save_message(&self, said: &str, message: &[u8]) -> Result<(), RelayError> {
        self.messages.lock().unwrap().insert(said.to_string(), message.to_vec());
        Ok(())
    }

    async fn get_message(&self, said: &str) -> Result<Option<Vec<u8>>, RelayError> {
        Ok(self.messages.lock().unwrap().get(said).cloned())
    }
}

#[derive(Clone, Default)]
pub(crate) struct MemRegistries {
    registries: Arc<Mutex<HashMap<String, Registry>>>,
    tels: Arc<Mutex<HashMap<String, Vec<(u64, Vec<u8>)>>>>,
    credentials: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

#[async_trait]
impl RegistryRepoBuilder for MemRegistries {
    async fn save_registry(&self, registry: &Registry) -> Result<(), CredentialError> {
        self.registries
            .lock()
            .unwrap()
            .insert(registry.regk.clone(), registry.clone());
        Ok(())
    }

    async fn get_registry(&self, regk: &str) -> Result<Option<Registry>, CredentialError> {
        Ok(self.registries.lock().unwrap().get(regk).cloned())
    }

    async fn registry_by_name(&self, name: &str) -> Result<Option<Registry>, CredentialError> {
        let registries = self.registries.lock().unwrap();
        Ok(registries.values().find(|registry| registry.name == name).cloned())
    }

    async fn save_tel_event(&self, pre: &str, sn: u64, raw: &[u8]) -> Result<(), CredentialError> {
        let mut tels = self.tels.lock().unwrap();
        let events = tels.entry(pre.to_string()).or_default();
        events.retain(|(current, _)| *current != sn);
        events.push((sn, raw.to_vec()));
        events.sort_by_key(|(current, _)| *current);
        Ok(())
    }

    async fn tel_events(&self, pre: &str) -> Result<Vec<Vec<u8>>, CredentialError> {
        let tels = self.tels.lock().unwrap();
        Ok(tels
            .get(pre)
            .map(|events| events.iter().map(|(_, raw)| raw.clone()).collect())
            .unwrap_or_default())
    }

    async fn save_credential(&self, said: &str, raw: &[u8]) -> Result<(), CredentialError> {
        self.credentials.lock().unwrap().insert(said.to_string(), raw.to_vec());
        Ok(())
    }

    async fn get_credential(&self, said: &str) -> Result<Option<Vec<u8>>, CredentialError> {
        Ok(self.credentials.lock().unwrap().get(said).cloned())
    }
}

#[derive(Clone, Default)]
pub(crate) struct MemSchemas {
    schemas: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemSchemas {
    /// Register a schema under its own SAID
    pub fn add(&self, raw: Vec<u8>) -> String {
        let said = Schemer::new(&raw).unwrap().said().to_string();
        self.schemas.lock().unwrap().insert(said.clone(), raw);
        said
    }
}

#[async_trait]
impl SchemaResolverBuilder for MemSchemas {
    async fn resolve(&self, said: &str) -> Result<Option<Vec<u8>>, CredentialError> {
        Ok(self.schemas.lock().unwrap().get(said).cloned())
    }
}

#[derive(Clone, Default)]
pub(crate) struct MemContacts {
    contacts: Arc<Mutex<HashMap<String, Contact>>>,
}

impl MemContacts {
    pub fn add(&self, pre: &str, alias: &str) {
        self.contacts.lock().unwrap().insert(
            pre.to_string(),
            Contact {
                pre: pre.to_string(),
                alias: alias.to_string(),
            },
        );
    }
}

#[async_trait]
impl ContactDirectory for MemContacts {
    async fn get(&self, pre: &str) -> Result<Option<Contact>, ConfirmError> {
        Ok(self.contacts.lock().unwrap().get(pre).cloned())
    }
}

/// One agent worth of in memory components
#[derive(Clone, Default)]
pub(crate) struct Memory {
    pub store: MemStore,
    pub escrow: MemEscrow,
    pub notices: MemNotices,
    pub postages: MemPostages,
    pub transport: MemTransport,
    pub exchanges: MemExchanges,
    pub registries: MemRegistries,
    pub schemas: MemSchemas,
    pub contacts: MemContacts,
}

impl Components for Memory {
    type Store = MemStore;
    type Escrow = MemEscrow;
    type Notices = MemNotices;
    type Postages = MemPostages;
    type Transport = MemTransport;
    type Exchanges = MemExchanges;
    type Registries = MemRegistries;
    type Schemas = MemSchemas;
    type Contacts = MemContacts;

    fn store(&self) -> Self::Store {
        self.store.clone()
    }

    fn escrow(&self) -> Self::Escrow {
        self.escrow.clone()
    }

    fn notices(&self) -> Self::Notices {
        self.notices.clone()
    }

    fn postages(&self) -> Self::Postages {
        self.postages.clone()
    }

    fn transport(&self) -> Self::Transport {
        self.transport.clone()
    }

    fn exchanges(&self) -> Self::Exchanges {
        self.exchanges.clone()
    }

    fn registries(&self) -> Self::Registries {
        self.registries.clone()
    }

    fn schemas(&self) -> Self::Schemas {
        self.schemas.clone()
    }

    fn contacts(&self) -> Self::Contacts {
        self.contacts.clone()
    }
}

/// Operator double answering every question from a script
#[derive(Clone, Default)]
pub(crate) struct Scripted {
    approve: bool,
    discard: bool,
    names: Arc<Mutex<VecDeque<String>>>,
    summaries: Arc<Mutex<Vec<Summary>>>,
    reports: Arc<Mutex<Vec<String>>>,
}

impl Scripted {
    pub fn new(approve: bool, discard: bool, names: &[&str]) -> Self {
        Self {
            approve,
            discard,
            names: Arc::new(Mutex::new(names.iter().map(|name| name.to_string()).collect())),
            ..Default::default()
        }
    }

    pub fn summaries(&self) -> Vec<Summary> {
        self.summaries.lock().unwrap().clone()
    }

    pub fn reports(&self) -> Vec<String> {
        self.reports.lock().unwrap().clone()
    }

    fn next_name(&self) -> Result<String, ConfirmError> {
        self.names
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(ConfirmError::Decision("no name left in the script".to_string()))
    }
}

#[async_trait]
impl DecisionProvider for Scripted {
    async fn approve(&self, summary: &Summary) -> Result<bool, ConfirmError> {
        self.summaries.lock().unwrap().push(summary.clone());
        Ok(self.approve)
    }

    async fn alias(&self, _prompt: &str) -> Result<String, ConfirmError> {
        self.next_name()
    }

    async fn registry_name(&self, _prompt: &str) -> Result<String, ConfirmError> {
        self.next_name()
    }

    async fn discard(&self, _notice: &Notice) -> Result<bool, ConfirmError> {
        Ok(self.discard)
    }

    async fn report(&self, message: &str) {
        self.reports.lock().unwrap().push(message.to_string());
    }
}
