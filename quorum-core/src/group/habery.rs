use rst_common::standard::serde_json::Value;
use rst_common::with_logging::log::{debug, info};

use crate::codec::eventing::{self, InceptionParams};
use crate::codec::types::{ilks, Kind};
use crate::codec::{digest, Serder, Siger};

use super::types::{union, GroupError, GroupHab, GroupInits, Hab, HaberyBuilder, KeyState};

/// `Habery` holds the group identity rules on top of an identity store
///
/// The store only persists and signs, every decision about membership, key
/// lists and key state progression is made here.
#[derive(Clone)]
pub struct Habery<TStore>
where
    TStore: HaberyBuilder,
{
    store: TStore,
}

impl<TStore> Habery<TStore>
where
    TStore: HaberyBuilder,
{
    pub fn new(store: TStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &TStore {
        &self.store
    }

    async fn check_alias(&self, alias: &str) -> Result<(), GroupError> {
        match self.store.hab_by_name(alias).await? {
            Some(_) => Err(GroupError::AliasInUse(alias.to_string())),
            None => Ok(()),
        }
    }

    async fn member_state(&self, mid: &str) -> Result<KeyState, GroupError> {
        self.store
            .key_state(mid)
            .await?
            .ok_or(GroupError::UnknownMember(mid.to_string()))
    }

    /// Build the inception event of a group without recording anything
    ///
    /// Signing keys are the current keys of `smids` and next key digests are
    /// the next digests of `rmids`, both in the given member order.
    pub async fn incept_group(
        &self,
        smids: &[String],
        rmids: &[String],
        inits: &GroupInits,
    ) -> Result<Serder, GroupError> {
        let mut keys = Vec::with_capacity(smids.len());
        for mid in smids {
            let state = self.member_state(mid).await?;
            let key = state
                .keys
                .first()
                .cloned()
                .ok_or(GroupError::UnknownMember(format!("{mid} has no signing key")))?;
            keys.push(key);
        }

        let mut ndigs = Vec::with_capacity(rmids.len());
        for mid in rmids {
            let state = self.member_state(mid).await?;
            if let Some(ndig) = state.ndigs.first() {
                ndigs.push(ndig.clone());
            }
        }

        let serder = eventing::incept(InceptionParams {
            keys,
            isith: inits.isith.clone(),
            ndigs,
            nsith: inits.nsith.clone(),
            toad: inits.toad,
            wits: inits.wits.clone(),
            cnfg: inits.cnfg(),
            data: Vec::new(),
            delpre: inits.delpre.clone(),
            kind: Kind::Json,
        })?;

        Ok(serder)
    }

    /// Create the local view of a new group and its inception event
    pub async fn make_group_hab(
        &self,
        alias: &str,
        mhab: &Hab,
        smids: &[String],
        rmids: &[String],
        inits: GroupInits,
    ) -> Result<(GroupHab, Serder), GroupError> {
        self.check_alias(alias).await?;
        if !union(smids, rmids).contains(&mhab.pre) {
            return Err(GroupError::LocalMemberMissing(mhab.pre.clone()));
        }

        let serder = self.incept_group(smids, rmids, &inits).await?;
        let ghab = GroupHab {
            name: alias.to_string(),
            pre: serder.require_pre()?,
            mhab: mhab.clone(),
            smids: smids.to_vec(),
            rmids: rmids.to_vec(),
        };

        self.store.save_group_hab(&ghab).await?;
        info!(
            "[habery:make_group_hab] alias: {alias} | pre: {} | members: {}",
            ghab.pre,
            ghab.members().len()
        );

        Ok((ghab, serder))
    }

    /// Record an existing group the local member is joining through a rotation
    pub async fn join_group_hab(
        &self,
        pre: &str,
        alias: &str,
        mhab: &Hab,
        smids: &[String],
        rmids: &[String],
    ) -> Result<GroupHab, GroupError> {
        self.check_alias(alias).await?;
        if !union(smids, rmids).contains(&mhab.pre) {
            return Err(GroupError::LocalMemberMissing(mhab.pre.clone()));
        }

        let ghab = GroupHab {
            name: alias.to_string(),
            pre: pre.to_string(),
            mhab: mhab.clone(),
            smids: smids.to_vec(),
            rmids: rmids.to_vec(),
        };

        self.store.save_group_hab(&ghab).await?;
        info!("[habery:join_group_hab] alias: {alias} | pre: {pre}");
        Ok(ghab)
    }

    /// Build the next interaction event of the group anchoring `data`
    pub async fn interact(&self, ghab: &GroupHab, data: Vec<Value>) -> Result<Serder, GroupError> {
        let state = self
            .store
            .key_state(&ghab.pre)
            .await?
            .ok_or(GroupError::UnknownIdentifier(ghab.pre.clone()))?;

        if state.establishment_only() {
            return Err(GroupError::InvalidEvent(format!(
                "{} is establishment only",
                ghab.pre
            )));
        }

        let serder = eventing::interact(&state.pre, &state.said, state.sn + 1, data, Kind::Json)?;
        Ok(serder)
    }

    /// Bring a local signing member to the key a group rotation expects from it
    ///
    /// When `rot` carries the key committed as the member's next key, the member
    /// rotates first so that it signs with the newly exposed key.
    pub async fn align_member(&self, mhab: &Hab, rot: &Serder) -> Result<KeyState, GroupError> {
        let state = self.member_state(&mhab.pre).await?;
        let keys: Vec<String> = rot
            .ked()
            .get("k")
            .and_then(|val| val.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(|key| key.to_string()))
                    .collect()
            })
            .unwrap_or_default();

        if state.keys.iter().any(|key| keys.contains(key)) {
            return Ok(state);
        }

        let exposed = keys
            .iter()
            .any(|key| state.ndigs.contains(&digest(key.as_bytes())));
        if !exposed {
            return Err(GroupError::InvalidEvent(format!(
                "rotation of {} carries no key of member {}",
                rot.pre().unwrap_or_default(),
                mhab.pre
            )));
        }

        let rotated = self.store.rotate_local(mhab).await?;
        info!(
            "[habery:align_member] pre: {} | sn: {}",
            mhab.pre, rotated.sn
        );

        Ok(rotated)
    }

    pub async fn signing_members(&self, pre: &str) -> Result<Vec<String>, GroupError> {
        let ghab = self
            .store
            .group_hab(pre)
            .await?
            .ok_or(GroupError::UnknownIdentifier(pre.to_string()))?;

        Ok(ghab.smids)
    }

    pub async fn rotation_members(&self, pre: &str) -> Result<Vec<String>, GroupError> {
        let ghab = self
            .store
            .group_hab(pre)
            .await?
            .ok_or(GroupError::UnknownIdentifier(pre.to_string()))?;

        Ok(ghab.rmids)
    }

    /// Keys and threshold that must sign `serder` on behalf of `pre`
    ///
    /// Establishment events carry their own keys, anything else is signed by the
    /// current keys of the identifier.
    pub async fn governing(
        &self,
        pre: &str,
        serder: &Serder,
    ) -> Result<(Vec<String>, Value), GroupError> {
        let ilk = serder.ilk().unwrap_or_default();
        if matches!(ilk, ilks::ICP | ilks::DIP | ilks::ROT) {
            let state = match ilk {
                ilks::ROT => {
                    let current = self
                        .store
                        .key_state(pre)
                        .await?
                        .ok_or(GroupError::UnknownIdentifier(pre.to_string()))?;
                    current.apply(serder)?
                }
                _ => KeyState::incept(serder)?,
            };

            return Ok((state.keys, state.sith));
        }

        let state = self
            .store
            .key_state(pre)
            .await?
            .ok_or(GroupError::UnknownIdentifier(pre.to_string()))?;

        Ok((state.keys, state.sith))
    }

    /// Accept a completed key event into the key event log
    ///
    /// Applying an event at or below the current sequence number is a no-op, so a
    /// completed proposal may be committed more than once.
    pub async fn apply_event(
        &self,
        serder: &Serder,
        sigers: &[Siger],
    ) -> Result<KeyState, GroupError> {
        let pre = serder.require_pre()?;
        let sn = serder.sn()?;
        let current = self.store.key_state(&pre).await?;

        let next = match current {
            Some(state) if sn <= state.sn => {
                debug!("[habery:apply_event] already accepted: {pre} | sn: {sn}");
                return Ok(state);
            }
            Some(state) => state.apply(serder)?,
            None => KeyState::incept(serder)?,
        };

        self.store.save_key_event(serder, sigers, &next).await?;
        info!(
            "[habery:apply_event] accepted: {pre} | sn: {sn} | said: {}",
            next.said
        );

        Ok(next)
    }

    /// Whether `pre` has a witness pool
    pub async fn witnessed(&self, pre: &str) -> Result<bool, GroupError> {
        let state = self.store.key_state(pre).await?;
        Ok(state.map(|state| !state.wits.is_empty()).unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;

    use rst_common::standard::async_trait::async_trait;
    use rst_common::standard::serde_json::json;
    use rst_common::with_tokio::tokio;

    mock!(
        FakeStore{}

        impl Clone for FakeStore {
            fn clone(&self) -> Self;
        }

        #[async_trait]
        impl HaberyBuilder for FakeStore {
            async fn local_hab(&self, pre: &str) -> Result<Option<Hab>, GroupError>;
            async fn group_hab(&self, pre: &str) -> Result<Option<GroupHab>, GroupError>;
            async fn hab_by_name(&self, name: &str) -> Result<Option<String>, GroupError>;
            async fn save_group_hab(&self, ghab: &GroupHab) -> Result<(), GroupError>;
            async fn sign(&self, ghab: &GroupHab, raw: &[u8]) -> Result<Vec<Siger>, GroupError>;
            async fn sign_local(&self, hab: &Hab, raw: &[u8]) -> Result<Vec<Siger>, GroupError>;
            async fn rotate_local(&self, hab: &Hab) -> Result<KeyState, GroupError>;
            async fn key_state(&self, pre: &str) -> Result<Option<KeyState>, GroupError>;
            async fn save_key_event(&self, serder: &Serder, sigers: &[Siger], state: &KeyState) -> Result<(), GroupError>;
            async fn clone_pre_iter(&self, pre: &str) -> Result<Vec<Vec<u8>>, GroupError>;
            async fn save_end_role(&self, cid: &str, role: &str, eid: &str) -> Result<(), GroupError>;
        }
    );

    fn member_state(pre: &str, key: &str, ndig: &str) -> KeyState {
        KeyState {
            pre: pre.to_string(),
            sn: 0,
            said: pre.to_string(),
            ilk: "icp".to_string(),
            keys: vec![key.to_string()],
            sith: json!("1"),
            ndigs: vec![ndig.to_string()],
            nsith: json!("1"),
            toad: 0,
            wits: vec![],
            cnfg: vec![],
            delpre: None,
        }
    }

    fn inits() -> GroupInits {
        GroupInits {
            isith: json!("2"),
            nsith: json!("2"),
            est_only: false,
            dnd: false,
            toad: 0,
            wits: vec![],
            delpre: None,
        }
    }

    fn mids() -> Vec<String> {
        vec!["EA".to_string(), "EB".to_string(), "EC".to_string()]
    }

    #[tokio::test]
    async fn test_make_group_hab() {
        let mut store = MockFakeStore::new();
        store.expect_hab_by_name().times(1).returning(|_| Ok(None));
        store.expect_key_state().returning(|pre| {
            let key = pre.to_lowercase().repeat(32);
            Ok(Some(member_state(pre, &key, &format!("N{pre}"))))
        });
        store
            .expect_save_group_hab()
            .times(1)
            .withf(|ghab| ghab.name == "team" && ghab.smids.len() == 3)
            .returning(|_| Ok(()));

        let habery = Habery::new(store);
        let mhab = Hab::new("alice", "EA");
        let (ghab, serder) = habery
            .make_group_hab("team", &mhab, &mids(), &mids(), inits())
            .await
            .unwrap();

        assert_eq!(ghab.pre, serder.pre().unwrap());
        assert_eq!(serder.ked()["k"].as_array().unwrap().len(), 3);
        assert_eq!(serder.ked()["n"], json!(["NEA", "NEB", "NEC"]));
        assert_eq!(ghab.members(), vec!["EA", "EB", "EC"]);
    }

    #[tokio::test]
    async fn test_make_group_hab_alias_in_use() {
        let mut store = MockFakeStore::new();
        store
            .expect_hab_by_name()
            .times(1)
            .returning(|_| Ok(Some("EOther".to_string())));
        store.expect_save_group_hab().times(0);

        let habery = Habery::new(store);
        let result = habery
            .make_group_hab("team", &Hab::new("alice", "EA"), &mids(), &mids(), inits())
            .await;

        assert!(matches!(result, Err(GroupError::AliasInUse(_))));
    }

    #[tokio::test]
    async fn test_make_group_hab_local_member_missing() {
        let mut store = MockFakeStore::new();
        store.expect_hab_by_name().returning(|_| Ok(None));
        store.expect_key_state().times(0);
        store.expect_save_group_hab().times(0);

        let habery = Habery::new(store);
        let result = habery
            .make_group_hab("team", &Hab::new("mallory", "EZ"), &mids(), &mids(), inits())
            .await;

        assert!(matches!(result, Err(GroupError::LocalMemberMissing(_))));
    }

    #[tokio::test]
    async fn test_apply_event_is_idempotent() {
        let serder = eventing::incept(InceptionParams {
            keys: vec!["aa".repeat(32)],
            isith: json!("1"),
            ..Default::default()
        })
        .unwrap();

        let accepted = KeyState::incept(&serder).unwrap();
        let mut store = MockFakeStore::new();
        store
            .expect_key_state()
            .times(1)
            .returning(move |_| Ok(Some(accepted.clone())));
        store.expect_save_key_event().times(0);

        let habery = Habery::new(store);
        let state = habery.apply_event(&serder, &[]).await.unwrap();
        assert_eq!(state.sn, 0);
    }

    #[tokio::test]
    async fn test_apply_event_interaction() {
        let serder = eventing::incept(InceptionParams {
            keys: vec!["aa".repeat(32)],
            isith: json!("1"),
            ..Default::default()
        })
        .unwrap();

        let accepted = KeyState::incept(&serder).unwrap();
        let ixn = eventing::interact(&accepted.pre, &accepted.said, 1, vec![], Kind::Json).unwrap();
        let said = ixn.said().unwrap().to_string();

        let mut store = MockFakeStore::new();
        store
            .expect_key_state()
            .returning(move |_| Ok(Some(accepted.clone())));
        store
            .expect_save_key_event()
            .times(1)
            .withf(move |_, _, state| state.sn == 1 && state.said == said)
            .returning(|_, _, _| Ok(()));

        let habery = Habery::new(store);
        let state = habery.apply_event(&ixn, &[]).await.unwrap();
        assert_eq!(state.sn, 1);
    }

    #[tokio::test]
    async fn test_governing_uses_event_keys_for_inception() {
        let serder = eventing::incept(InceptionParams {
            keys: vec!["aa".repeat(32), "bb".repeat(32)],
            isith: json!(["1/2", "1/2"]),
            ..Default::default()
        })
        .unwrap();

        let mut store = MockFakeStore::new();
        store.expect_key_state().times(0);

        let habery = Habery::new(store);
        let (keys, sith) = habery
            .governing(serder.pre().unwrap(), &serder)
            .await
            .unwrap();

        assert_eq!(keys.len(), 2);
        assert_eq!(sith, json!(["1/2", "1/2"]));
    }

    fn group_rotation(keys: Vec<String>) -> Serder {
        eventing::rotate(eventing::RotationParams {
            pre: "EGroup".to_string(),
            dig: "EPrior".to_string(),
            sn: 1,
            isith: json!(format!("{:x}", keys.len())),
            keys,
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_align_member_rotates_to_exposed_next_key() {
        let current = "aa".repeat(32);
        let next = "bb".repeat(32);
        let committed = digest(next.as_bytes());

        let mut store = MockFakeStore::new();
        store
            .expect_key_state()
            .returning(move |pre| Ok(Some(member_state(pre, &current, &committed))));
        let rotated = member_state("EA", &next, "ENext");
        store
            .expect_rotate_local()
            .times(1)
            .withf(|hab| hab.pre == "EA")
            .returning(move |_| Ok(rotated.clone()));

        let habery = Habery::new(store);
        let rot = group_rotation(vec![next.clone(), "cc".repeat(32)]);
        let state = habery.align_member(&Hab::new("alice", "EA"), &rot).await.unwrap();
        assert_eq!(state.keys, vec![next]);
    }

    #[tokio::test]
    async fn test_align_member_keeps_current_key() {
        let mut store = MockFakeStore::new();
        store
            .expect_key_state()
            .returning(|pre| Ok(Some(member_state(pre, &"aa".repeat(32), "ENext"))));
        store.expect_rotate_local().times(0);

        let habery = Habery::new(store);
        let rot = group_rotation(vec!["aa".repeat(32)]);
        let state = habery.align_member(&Hab::new("alice", "EA"), &rot).await.unwrap();
        assert_eq!(state.sn, 0);
    }

    #[tokio::test]
    async fn test_align_member_rejects_foreign_keys() {
        let mut store = MockFakeStore::new();
        store
            .expect_key_state()
            .returning(|pre| Ok(Some(member_state(pre, &"aa".repeat(32), "ENext"))));
        store.expect_rotate_local().times(0);

        let habery = Habery::new(store);
        let rot = group_rotation(vec!["ff".repeat(32)]);
        let result = habery.align_member(&Hab::new("alice", "EA"), &rot).await;
        assert!(matches!(result, Err(GroupError::InvalidEvent(_))));
    }

    #[tokio::test]
    async fn test_signing_members_unknown_group() {
        let mut store = MockFakeStore::new();
        store.expect_group_hab().returning(|_| Ok(None));

        let habery = Habery::new(store);
        let result = habery.signing_members("EGroup").await;
        assert!(matches!(result, Err(GroupError::UnknownIdentifier(_))));
    }
}
