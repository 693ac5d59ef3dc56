use std::future::Future;

use rst_common::standard::serde_json::Value;
use rst_common::with_logging::log::debug;

use crate::codec::{Attachment, Serder, Siger, Tholder};
use crate::credential::Registrar;
use crate::escrow::{EscrowError, EscrowKey, EscrowRepoBuilder, Tracker};
use crate::group::{
    Counselor, GroupHab, Hab, Habery, HaberyBuilder, ProposalState, WaitOutcome, Waiter,
};
use crate::relay::exchanging::embedded;
use crate::relay::{Exchanger, Poster, TOPIC_MULTISIG};

use super::summary::MemberTable;
use super::types::{Components, ConfirmError, ContactDirectory, DecisionProvider, Outcome};

/// Collaborators shared by every proposal handler
pub(crate) struct Context<TComp, TDecision>
where
    TComp: Components,
    TDecision: DecisionProvider,
{
    pub(crate) counselor: Counselor<TComp::Store, TComp::Escrow>,
    pub(crate) poster: Poster<TComp::Postages, TComp::Transport>,
    pub(crate) exchanger: Exchanger<TComp::Exchanges, TComp::Escrow>,
    pub(crate) registrar: Registrar<TComp::Registries, TComp::Escrow>,
    pub(crate) schemas: TComp::Schemas,
    pub(crate) contacts: TComp::Contacts,
    pub(crate) decisions: TDecision,
    pub(crate) waiter: Waiter,
}

impl<TComp, TDecision> Context<TComp, TDecision>
where
    TComp: Components,
    TDecision: DecisionProvider,
{
    pub(crate) fn new(components: &TComp, decisions: TDecision, waiter: Waiter) -> Self {
        let tracker = Tracker::new(components.escrow());

        Self {
            counselor: Counselor::new(Habery::new(components.store()), tracker.clone()),
            poster: Poster::new(components.postages(), components.transport()),
            exchanger: Exchanger::new(components.exchanges(), tracker.clone()),
            registrar: Registrar::new(components.registries(), tracker),
            schemas: components.schemas(),
            contacts: components.contacts(),
            decisions,
            waiter,
        }
    }

    pub(crate) fn habery(&self) -> &Habery<TComp::Store> {
        self.counselor.habery()
    }

    pub(crate) fn tracker(&self) -> &Tracker<TComp::Escrow> {
        self.counselor.tracker()
    }

    pub(crate) async fn group(&self, pre: &str) -> Result<GroupHab, ConfirmError> {
        self.habery()
            .store()
            .group_hab(pre)
            .await?
            .ok_or(ConfirmError::Usage(format!("unknown group identifier {pre}")))
    }

    /// First member of `mids` that is a local identifier
    pub(crate) async fn first_local(&self, mids: &[String]) -> Result<Option<Hab>, ConfirmError> {
        for mid in mids {
            if let Some(hab) = self.habery().store().local_hab(mid).await? {
                return Ok(Some(hab));
            }
        }

        Ok(None)
    }

    pub(crate) async fn alias_of(&self, pre: &str) -> Result<Option<String>, ConfirmError> {
        if let Some(hab) = self.habery().store().local_hab(pre).await? {
            return Ok(Some(hab.name));
        }

        let contact = self.contacts.get(pre).await?;
        Ok(contact.map(|contact| contact.alias))
    }

    pub(crate) async fn member_table(
        &self,
        title: &str,
        mids: &[String],
        local: &Hab,
        sith: &Value,
    ) -> Result<MemberTable, ConfirmError> {
        let tholder = Tholder::new(sith)?;

        let mut aliases = Vec::with_capacity(mids.len());
        for mid in mids {
            let contact = self.contacts.get(mid).await?;
            aliases.push(contact.map(|contact| contact.alias));
        }

        Ok(MemberTable::build(title, mids, local, &aliases, &tholder))
    }

    /// The stored `exn` behind a proposal and the signatures of its `label` embed
    pub(crate) async fn proposed(
        &self,
        said: Option<&str>,
        label: &str,
    ) -> Result<Option<(Serder, Vec<Siger>)>, ConfirmError> {
        let said = match said {
            Some(said) => said,
            None => return Ok(None),
        };

        let (exn, atc) = self.exchanger.clone_message(said).await?;
        let serder = embedded(&exn, label)?;
        Ok(Some((serder, atc.path(label))))
    }

    /// Handle a proposal this agent already started, possibly a peer echoing it back
    ///
    /// Returns false when nothing is escrowed at `key` yet. Otherwise the given
    /// signatures are merged into the pending entry.
    pub(crate) async fn echo(
        &self,
        key: &EscrowKey,
        said: &str,
        sigers: Vec<Siger>,
    ) -> Result<bool, ConfirmError> {
        match self.counselor.state(key).await? {
            ProposalState::Proposed => Ok(false),
            ProposalState::Complete => Ok(true),
            ProposalState::Pending => {
                if !sigers.is_empty() {
                    match self.tracker().add_signatures(key, said, sigers).await {
                        Ok(_) => {}
                        Err(EscrowError::Conflict { escrowed, given, .. }) => {
                            return Err(ConfirmError::Validation(format!(
                                "{key} already holds {escrowed}, proposal carries {given}"
                            )))
                        }
                        Err(err) => return Err(err.into()),
                    }
                }

                debug!("[confirm:echo] key: {key} | said: {said}");
                Ok(true)
            }
        }
    }

    /// Sign `exn` as the local member and queue it for every recipient
    pub(crate) async fn broadcast(
        &self,
        ghab: &GroupHab,
        recipients: &[String],
        exn: &Serder,
        atc: Attachment,
    ) -> Result<(), ConfirmError> {
        let sigers = self
            .habery()
            .store()
            .sign_local(&ghab.mhab, exn.raw())
            .await?;

        let atc = Attachment {
            sigers,
            pathed: atc.pathed,
        };

        for recipient in recipients.iter().filter(|rcp| **rcp != ghab.mhab.pre) {
            self.poster
                .send(&ghab.mhab.pre, recipient, TOPIC_MULTISIG, exn, &atc)
                .await?;
        }

        Ok(())
    }

    /// Deliver pending postages and promote escrowed artifacts once
    pub(crate) async fn pump(&self) -> Result<(), ConfirmError> {
        self.poster.process().await?;
        self.counselor.process().await?;
        Ok(())
    }

    /// Tick until `done` holds, pumping the relay and the escrow before each check
    pub(crate) async fn wait_for<F, Fut>(&self, mut done: F) -> Result<Outcome, ConfirmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool, ConfirmError>>,
    {
        let outcome = self
            .waiter
            .until(|| {
                let check = done();
                async move {
                    self.pump().await?;
                    check.await
                }
            })
            .await?;

        Ok(match outcome {
            WaitOutcome::Ready => Outcome::Completed,
            WaitOutcome::TimedOut => Outcome::TimedOut,
            WaitOutcome::Cancelled => Outcome::Cancelled,
        })
    }

    /// Ask for an alias until an unused one is given, `None` once cancelled
    pub(crate) async fn fresh_alias(&self) -> Result<Option<String>, ConfirmError> {
        loop {
            if self.waiter.is_cancelled() {
                return Ok(None);
            }

            let alias = self.decisions.alias("Enter alias for new AID: ").await?;
            if self.habery().store().hab_by_name(&alias).await?.is_none() {
                return Ok(Some(alias));
            }

            self.decisions
                .report(&format!("AID alias {alias} is already in use, please try again"))
                .await;
        }
    }

    pub(crate) async fn decline(&self, message: &str) -> Outcome {
        self.decisions.report(message).await;
        Outcome::Declined
    }
}

/// Wait on an escrowed key event until it is committed
pub(crate) async fn committed<TStore, TEscrow>(
    counselor: &Counselor<TStore, TEscrow>,
    key: &EscrowKey,
) -> Result<bool, ConfirmError>
where
    TStore: HaberyBuilder,
    TEscrow: EscrowRepoBuilder,
{
    Ok(counselor.complete(key).await?)
}
