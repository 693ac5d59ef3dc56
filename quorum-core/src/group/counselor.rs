use rst_common::with_logging::log::{debug, info};

use crate::codec::types::ilks;
use crate::codec::{Serder, Siger};
use crate::escrow::{EscrowKey, EscrowRepoBuilder, Tracker};

use super::habery::Habery;
use super::types::{GroupError, GroupHab, HaberyBuilder, ProposalState};

/// `Counselor` moves a group proposal from local approval to commit
///
/// It never waits by itself. Callers poll [`Counselor::complete`] through a
/// [`super::waiter::Waiter`] and decide how long to keep trying.
#[derive(Clone)]
pub struct Counselor<TStore, TEscrow>
where
    TStore: HaberyBuilder,
    TEscrow: EscrowRepoBuilder,
{
    habery: Habery<TStore>,
    tracker: Tracker<TEscrow>,
}

impl<TStore, TEscrow> Counselor<TStore, TEscrow>
where
    TStore: HaberyBuilder,
    TEscrow: EscrowRepoBuilder,
{
    pub fn new(habery: Habery<TStore>, tracker: Tracker<TEscrow>) -> Self {
        Self { habery, tracker }
    }

    pub fn habery(&self) -> &Habery<TStore> {
        &self.habery
    }

    pub fn tracker(&self) -> &Tracker<TEscrow> {
        &self.tracker
    }

    /// Sign `serder` as the local member and escrow it with the `received` signatures
    ///
    /// Returns only the local signatures, these are what peers need to see.
    pub async fn start(
        &self,
        key: EscrowKey,
        ghab: &GroupHab,
        serder: &Serder,
        received: Vec<Siger>,
    ) -> Result<Vec<Siger>, GroupError> {
        let mpre = &ghab.mhab.pre;
        if !ghab.members().contains(mpre) {
            return Err(GroupError::LocalMemberMissing(mpre.clone()));
        }

        let (keys, sith) = self.habery.governing(&ghab.pre, serder).await?;
        let sigers = match ghab.smids.contains(mpre) {
            true => self.habery.store().sign(ghab, serder.raw()).await?,
            false => Vec::new(),
        };

        let mut all = sigers.clone();
        all.extend(received);

        self.tracker
            .submit_signed(key.clone(), serder, keys, sith, all)
            .await?;

        info!(
            "[counselor:start] key: {key} | said: {} | local sigs: {}",
            serder.said().unwrap_or_default(),
            sigers.len()
        );

        Ok(sigers)
    }

    pub async fn state(&self, key: &EscrowKey) -> Result<ProposalState, GroupError> {
        if self.tracker.is_complete(key).await? {
            return Ok(ProposalState::Complete);
        }

        match self.tracker.entry(key).await? {
            Some(_) => Ok(ProposalState::Pending),
            None => Ok(ProposalState::Proposed),
        }
    }

    pub async fn process(&self) -> Result<Vec<EscrowKey>, GroupError> {
        let promoted = self.tracker.process_pending().await?;
        Ok(promoted)
    }

    /// Whether the proposal at `key` is complete, committing key events on the way
    pub async fn complete(&self, key: &EscrowKey) -> Result<bool, GroupError> {
        if !self.tracker.is_complete(key).await? {
            return Ok(false);
        }

        let entry = self
            .tracker
            .entry(key)
            .await?
            .ok_or(GroupError::UnknownError(format!("completed without entry: {key}")))?;

        if ilks::is_key_event(&entry.ilk) {
            let serder = entry.serder()?;
            self.habery.apply_event(&serder, &entry.sigers()).await?;
        }

        debug!("[counselor:complete] key: {key} | said: {}", entry.said);
        Ok(true)
    }
}
