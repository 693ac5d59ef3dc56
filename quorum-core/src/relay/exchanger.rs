use rst_common::with_logging::log::debug;

use crate::codec::{messagize, parse_message, Attachment, Serder, Siger};
use crate::escrow::{EscrowKey, EscrowRepoBuilder, Tracker};
use crate::group::GroupHab;

use super::types::{ExchangeRepoBuilder, RelayError};

/// `Exchanger` keeps `exn` messages and tracks group endorsements of them
///
/// A group message is escrowed under its own said at sequence zero, members
/// endorse it through [`crate::group::Counselor::start`] and it is complete once
/// the group threshold signed it.
#[derive(Clone)]
pub struct Exchanger<TRepo, TEscrow>
where
    TRepo: ExchangeRepoBuilder,
    TEscrow: EscrowRepoBuilder,
{
    repo: TRepo,
    tracker: Tracker<TEscrow>,
}

impl<TRepo, TEscrow> Exchanger<TRepo, TEscrow>
where
    TRepo: ExchangeRepoBuilder,
    TEscrow: EscrowRepoBuilder,
{
    pub fn new(repo: TRepo, tracker: Tracker<TEscrow>) -> Self {
        Self { repo, tracker }
    }

    /// Escrow key of the group message `said`
    pub fn key(said: &str) -> EscrowKey {
        EscrowKey::new(said, 0)
    }

    pub async fn save(&self, serder: &Serder, attachment: &Attachment) -> Result<String, RelayError> {
        let said = serder.require_said()?;
        let message = messagize(serder, attachment)?;

        self.repo.save_message(&said, &message).await?;
        debug!("[exchanger:save] said: {said} | route: {}", serder.route().unwrap_or_default());
        Ok(said)
    }

    pub async fn clone_message(&self, said: &str) -> Result<(Serder, Attachment), RelayError> {
        let message = self
            .repo
            .get_message(said)
            .await?
            .ok_or(RelayError::NotFound(said.to_string()))?;

        let (serder, attachment) = parse_message(&message)?;
        Ok((serder, attachment))
    }

    pub async fn complete(&self, said: &str) -> Result<bool, RelayError> {
        let done = self.tracker.is_complete(&Self::key(said)).await?;
        Ok(done)
    }

    pub async fn process_escrow(&self) -> Result<Vec<EscrowKey>, RelayError> {
        let promoted = self.tracker.process_pending().await?;
        Ok(promoted)
    }

    /// Signatures collected so far for the group message `said`
    pub async fn endorsements(&self, said: &str) -> Result<Vec<Siger>, RelayError> {
        let entry = self.tracker.entry(&Self::key(said)).await?;
        Ok(entry.map(|entry| entry.sigers()).unwrap_or_default())
    }

    /// Whether the local member is the one who forwards the completed message
    ///
    /// The lead is the signing member at the lowest endorsed index, every member
    /// reaches the same answer from the same endorsements.
    pub async fn lead(&self, ghab: &GroupHab, said: &str) -> Result<bool, RelayError> {
        let lowest = self
            .endorsements(said)
            .await?
            .iter()
            .map(|siger| siger.index)
            .min();

        let leader = lowest.and_then(|index| ghab.smids.get(index as usize));
        Ok(leader == Some(&ghab.mhab.pre))
    }
}
