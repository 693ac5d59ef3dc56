use rst_common::with_logging::log::info;

use crate::codec::Attachment;
use crate::group::HaberyBuilder;
use crate::notification::ExchangeRef;
use crate::relay::exchanging::{embedded, multisig_exn, multisig_rpy_exn};
use crate::relay::{Exchanger, TOPIC_CREDENTIAL};

use crate::confirm::context::{committed, Context};
use crate::confirm::summary::{labelled, Summary};
use crate::confirm::types::{Components, ConfirmError, DecisionProvider, Outcome};

use super::{payload_str, sender_label};

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) async fn end_role<TComp, TDecision>(
    ctx: &Context<TComp, TDecision>,
    proposal: ExchangeRef,
) -> Result<Outcome, ConfirmError>
where
    TComp: Components,
    TDecision: DecisionProvider,
{
    let (exn, atc) = ctx.exchanger.clone_message(&proposal.d).await?;
    let gid = payload_str(&exn, "gid")?;
    let ghab = ctx.group(&gid).await?;

    let rpy = embedded(&exn, "rpy")?;
    let field = |label: &str| {
        rpy.ked()
            .get("a")
            .and_then(|data| data.get(label))
            .and_then(|val| val.as_str())
            .map(|val| val.to_string())
            .ok_or(ConfirmError::Validation(format!("reply without {label}")))
    };

    let (cid, role, eid) = (field("cid")?, field("role")?, field("eid")?);
    if cid != gid {
        return Err(ConfirmError::Validation(format!(
            "Endpoint role authorization request for wrong controller {gid} != {cid}"
        )));
    }

    let said = rpy.require_said()?;
    let key = Exchanger::<TComp::Exchanges, TComp::Escrow>::key(&said);
    if ctx.echo(&key, &said, atc.path("rpy")).await? {
        return Ok(Outcome::Completed);
    }

    let endpoint = ctx.alias_of(&eid).await?;
    let summary = Summary::new(
        &format!("Endpoint Role Authorization (from {})", sender_label(ctx, &exn).await?),
        "Approve",
    )
    .with_field("Controller", labelled(Some(ghab.name.as_str()), &cid, ""))
    .with_field("Role", capitalize(&role))
    .with_field(
        "Endpoint Provider",
        labelled(endpoint.as_deref(), &eid, "Unknown Endpoint"),
    );

    if !ctx.decisions.approve(&summary).await? {
        return Ok(ctx.decline("End role authorization declined").await);
    }

    let sigers = ctx
        .counselor
        .start(key.clone(), &ghab, &rpy, atc.path("rpy"))
        .await?;

    let (rexn, ratc) = multisig_rpy_exn(&ghab, &rpy, sigers)?;
    ctx.broadcast(&ghab, &ghab.smids, &rexn, ratc).await?;

    let key = &key;
    let outcome = ctx.wait_for(move || committed(&ctx.counselor, key)).await?;
    if outcome.is_completed() {
        ctx.habery().store().save_end_role(&cid, &role, &eid).await?;
        info!("[confirm:end_role] cid: {cid} | role: {role} | eid: {eid}");
        ctx.decisions
            .report(&format!("End role authorization added for role {role}"))
            .await;
    }

    Ok(outcome)
}

pub(crate) async fn peer_exchange<TComp, TDecision>(
    ctx: &Context<TComp, TDecision>,
    proposal: ExchangeRef,
) -> Result<Outcome, ConfirmError>
where
    TComp: Components,
    TDecision: DecisionProvider,
{
    let (exn, atc) = ctx.exchanger.clone_message(&proposal.d).await?;
    let eexn = embedded(&exn, "exn")?;
    let ghab = ctx.group(&eexn.require_pre()?).await?;

    let said = eexn.require_said()?;
    let key = Exchanger::<TComp::Exchanges, TComp::Escrow>::key(&said);
    if ctx.echo(&key, &said, atc.path("exn")).await? {
        return Ok(Outcome::Completed);
    }

    let recipient = eexn
        .ked()
        .get("a")
        .and_then(|data| data.get("i"))
        .and_then(|val| val.as_str())
        .map(|val| val.to_string());

    let mut summary = Summary::new(
        &format!("Group Peer-2-Peer Message proposal (from {})", sender_label(ctx, &exn).await?),
        "Approve",
    )
    .with_field("Message Type", eexn.route().unwrap_or_default())
    .with_field("Sending From", labelled(Some(ghab.name.as_str()), &ghab.pre, ""));

    if let Some(recipient) = &recipient {
        let alias = ctx.alias_of(recipient).await?;
        summary = summary.with_field(
            "Sending To",
            labelled(alias.as_deref(), recipient, "Unknown AID"),
        );
    }

    if !ctx.decisions.approve(&summary).await? {
        return Ok(ctx.decline("Group message declined").await);
    }

    let sigers = ctx
        .counselor
        .start(key.clone(), &ghab, &eexn, atc.path("exn"))
        .await?;

    let (rexn, ratc) = multisig_exn(&ghab, &eexn, sigers)?;
    ctx.broadcast(&ghab, &ghab.smids, &rexn, ratc).await?;

    let said_ref = said.as_str();
    let outcome = ctx
        .wait_for(move || async move {
            Ok::<bool, ConfirmError>(ctx.exchanger.complete(said_ref).await?)
        })
        .await?;

    if !outcome.is_completed() {
        return Ok(outcome);
    }

    let lead = ctx.exchanger.lead(&ghab, &said).await?;
    let recipient = match recipient {
        Some(recipient) if lead => recipient,
        _ => return Ok(outcome),
    };

    ctx.decisions
        .report(&format!("Sending message {said} to {recipient}"))
        .await;

    let endorsed = Attachment::new(ctx.exchanger.endorsements(&said).await?);
    ctx.poster
        .send(&ghab.mhab.pre, &recipient, TOPIC_CREDENTIAL, &eexn, &endorsed)
        .await?;

    let outcome = ctx
        .wait_for(move || async move {
            Ok::<bool, ConfirmError>(ctx.poster.sent(said_ref).await?)
        })
        .await?;

    if outcome.is_completed() {
        ctx.decisions.report("... message sent").await;
    }

    Ok(outcome)
}
