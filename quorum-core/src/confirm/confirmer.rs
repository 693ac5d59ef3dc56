use rst_common::with_logging::log::{debug, info, warn};

use crate::group::Waiter;
use crate::notification::{Notice, NotificationRepoBuilder, Proposal};

use super::context::Context;
use super::handlers::{group, peer, registry};
use super::types::{Components, ConfirmError, DecisionProvider, Outcome, ScanReport};

/// `Confirmer` walks the pending notices and drives each proposal to a decision
///
/// A scan visits the notices in store order. A completed proposal removes its
/// notice, anything else leaves it to the operator through
/// [`DecisionProvider::discard`]. A failing handler never stops the scan, its
/// notice is kept and the error lands in the [`ScanReport`].
pub struct Confirmer<TComp, TDecision>
where
    TComp: Components,
    TDecision: DecisionProvider,
{
    notices: TComp::Notices,
    ctx: Context<TComp, TDecision>,
}

impl<TComp, TDecision> Confirmer<TComp, TDecision>
where
    TComp: Components,
    TDecision: DecisionProvider,
{
    pub fn new(components: &TComp, decisions: TDecision, waiter: Waiter) -> Self {
        Self {
            notices: components.notices(),
            ctx: Context::new(components, decisions, waiter),
        }
    }

    /// Run the handler of `proposal`, `None` when no handler exists for its route
    pub async fn handle(&self, proposal: Proposal) -> Result<Option<Outcome>, ConfirmError> {
        let ctx = &self.ctx;
        let outcome = match proposal {
            Proposal::Inception(proposal) => group::inception(ctx, proposal).await?,
            Proposal::Interaction(proposal) => group::interaction(ctx, proposal).await?,
            Proposal::Rotation(proposal) => group::rotation(ctx, proposal).await?,
            Proposal::EndRole(proposal) => peer::end_role(ctx, proposal).await?,
            Proposal::RegistryInception(proposal) => {
                registry::registry_inception(ctx, proposal).await?
            }
            Proposal::Issuance(proposal) => registry::issuance(ctx, proposal).await?,
            Proposal::Revocation(proposal) => registry::revocation(ctx, proposal).await?,
            Proposal::PeerExchange(proposal) => peer::peer_exchange(ctx, proposal).await?,
            Proposal::Unhandled(_) => return Ok(None),
        };

        Ok(Some(outcome))
    }

    async fn confirm(&self, notice: &Notice) -> Result<Option<Outcome>, ConfirmError> {
        let proposal = Proposal::parse(&notice.attrs)?;
        debug!(
            "[confirmer:confirm] notice: {} | route: {}",
            notice.id.as_ref(),
            proposal.route()
        );

        self.handle(proposal).await
    }

    async fn remove(&self, notice: &Notice) -> Result<(), ConfirmError> {
        let removed = self.notices.remove_notice(&notice.id).await?;
        debug!(
            "[confirmer:remove] notice: {} | removed: {removed}",
            notice.id.as_ref()
        );

        Ok(())
    }

    /// One full scan over the pending notices
    pub async fn run_once(&self) -> Result<ScanReport, ConfirmError> {
        let notices = self.notices.list_notices().await?;
        let mut report = ScanReport::default();

        for notice in notices {
            if self.ctx.waiter.is_cancelled() {
                break;
            }

            report.scanned += 1;
            let id = notice.id.clone();

            let outcome = match self.confirm(&notice).await {
                Ok(Some(outcome)) => outcome,
                Ok(None) => {
                    report.skipped.push(id);
                    continue;
                }
                Err(err) => {
                    warn!("[confirmer:scan] notice: {} | error: {err}", id.as_ref());
                    self.ctx.decisions.report(&err.to_string()).await;
                    report.failed.push((id, err));
                    continue;
                }
            };

            let settled = match outcome {
                Outcome::Completed => self.remove(&notice).await.map(|_| true),
                Outcome::Cancelled => Ok(false),
                Outcome::Declined | Outcome::TimedOut => {
                    match self.ctx.decisions.discard(&notice).await {
                        Ok(true) => self.remove(&notice).await.map(|_| true),
                        Ok(false) => Ok(false),
                        Err(err) => Err(err),
                    }
                }
            };

            match settled {
                Ok(true) if outcome.is_completed() => report.completed.push(id),
                Ok(true) => report.discarded.push(id),
                Ok(false) => report.retained.push(id),
                Err(err) => {
                    warn!("[confirmer:scan] notice: {} | error: {err}", id.as_ref());
                    report.failed.push((id, err));
                }
            }
        }

        Ok(report)
    }

    /// Scan every tick until cancelled
    pub async fn run(&self) -> Result<(), ConfirmError> {
        info!("[confirmer:run] waiting for group multisig events");

        loop {
            let report = self.run_once().await?;
            if report.scanned > 0 {
                info!(
                    "[confirmer:run] scanned: {} | removed: {} | retained: {} | failed: {}",
                    report.scanned,
                    report.removed(),
                    report.retained.len(),
                    report.failed.len()
                );
            }

            if let Err(err) = self.ctx.pump().await {
                warn!("[confirmer:run] pump error: {err}");
            }

            if !self.ctx.waiter.tick().await {
                break;
            }
        }

        info!("[confirmer:run] cancelled");
        Ok(())
    }
}
