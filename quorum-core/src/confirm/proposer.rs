use rst_common::with_logging::log::info;

use crate::codec::Attachment;
use crate::escrow::{EscrowKey, Tracker};
use crate::group::{Counselor, GroupHab, GroupInits, Habery, HaberyBuilder};
use crate::relay::exchanging::multisig_inception_exn;
use crate::relay::{Poster, TOPIC_MULTISIG};

use super::types::{Components, ConfirmError};

/// `Proposer` starts a group inception on behalf of a local member
///
/// The other members receive the proposal as a `/multisig/icp` notice. Their
/// signatures come back the same way and complete the inception during the
/// confirmation loop of this agent.
pub struct Proposer<TComp>
where
    TComp: Components,
{
    counselor: Counselor<TComp::Store, TComp::Escrow>,
    poster: Poster<TComp::Postages, TComp::Transport>,
}

impl<TComp> Proposer<TComp>
where
    TComp: Components,
{
    pub fn new(components: &TComp) -> Self {
        Self {
            counselor: Counselor::new(
                Habery::new(components.store()),
                Tracker::new(components.escrow()),
            ),
            poster: Poster::new(components.postages(), components.transport()),
        }
    }

    /// Create the group `alias` with the local identifier `member` and send the proposal
    pub async fn incept(
        &self,
        alias: &str,
        member: &str,
        smids: &[String],
        rmids: &[String],
        inits: GroupInits,
    ) -> Result<GroupHab, ConfirmError> {
        let habery = self.counselor.habery();
        let mhab = habery
            .store()
            .local_hab(member)
            .await?
            .ok_or(ConfirmError::Usage(format!("{member} is not a local identifier")))?;

        let (ghab, icp) = habery
            .make_group_hab(alias, &mhab, smids, rmids, inits)
            .await?;

        let key = EscrowKey::new(&ghab.pre, 0);
        let sigers = self.counselor.start(key, &ghab, &icp, Vec::new()).await?;

        let (exn, atc) = multisig_inception_exn(&ghab, &icp, sigers)?;
        let atc = Attachment {
            sigers: habery.store().sign_local(&mhab, exn.raw()).await?,
            pathed: atc.pathed,
        };

        for recipient in ghab.members().iter().filter(|mid| **mid != mhab.pre) {
            self.poster
                .send(&mhab.pre, recipient, TOPIC_MULTISIG, &exn, &atc)
                .await?;
        }
        self.poster.process().await?;

        info!(
            "[proposer:incept] alias: {alias} | pre: {} | members: {}",
            ghab.pre,
            ghab.members().len()
        );
        Ok(ghab)
    }
}
