use rst_common::with_logging::log::info;

use crate::codec::parse_message;
use crate::credential::{resolve_schemer, schema_of, Credentialer, RegistryRepoBuilder};
use crate::escrow::EscrowKey;
use crate::group::{GroupHab, HaberyBuilder, ProposalState};
use crate::notification::ExchangeRef;
use crate::relay::exchanging::{
    embedded, multisig_issue_exn, multisig_registry_incept_exn, multisig_revoke_exn,
};
use crate::relay::TOPIC_CREDENTIAL;

use crate::confirm::context::Context;
use crate::confirm::summary::{labelled, Summary};
use crate::confirm::types::{Components, ConfirmError, DecisionProvider, Outcome};

use super::{check_anchor, check_sequence, classify, payload_str, sender_label, subject_data};

const UNKNOWN_AID: &str = "Unknown AID";

async fn credential_of<TComp, TDecision>(
    ctx: &Context<TComp, TDecision>,
    raw: &[u8],
) -> Result<(Credentialer, Option<String>), ConfirmError>
where
    TComp: Components,
    TDecision: DecisionProvider,
{
    let schema = schema_of(raw).map_err(classify)?;
    let schemer = resolve_schemer(&ctx.schemas, &schema)
        .await
        .map_err(classify)?;

    let creder = Credentialer::from_raw(raw, &schemer).map_err(classify)?;
    Ok((creder, schemer.title().map(|title| title.to_string())))
}

async fn issuee_label<TComp, TDecision>(
    ctx: &Context<TComp, TDecision>,
    creder: &Credentialer,
) -> Result<Option<String>, ConfirmError>
where
    TComp: Components,
    TDecision: DecisionProvider,
{
    match creder.issuee() {
        Some(issuee) => {
            let alias = ctx.alias_of(issuee).await?;
            Ok(Some(labelled(alias.as_deref(), issuee, UNKNOWN_AID)))
        }
        None => Ok(None),
    }
}

pub(crate) async fn registry_inception<TComp, TDecision>(
    ctx: &Context<TComp, TDecision>,
    proposal: ExchangeRef,
) -> Result<Outcome, ConfirmError>
where
    TComp: Components,
    TDecision: DecisionProvider,
{
    let (exn, atc) = ctx.exchanger.clone_message(&proposal.d).await?;
    let ghab = ctx.group(&payload_str(&exn, "gid")?).await?;
    let usage = payload_str(&exn, "usage").unwrap_or_default();

    let vcp = embedded(&exn, "vcp")?;
    let anc = embedded(&exn, "anc")?;
    check_anchor(&anc, &ghab.pre, &vcp)?;

    let regk = vcp.require_pre()?;
    let anc_key = EscrowKey::from_serder(&anc)?;
    if ctx.echo(&anc_key, &anc.require_said()?, atc.path("anc")).await? {
        return Ok(Outcome::Completed);
    }

    check_sequence(ctx, &anc).await?;

    let summary = Summary::new(
        &format!("Group Credential Registry Creation (from {})", sender_label(ctx, &exn).await?),
        "Approve",
    )
    .with_field("Usage", usage.clone())
    .with_field("Registry", regk.clone());

    if !ctx.decisions.approve(&summary).await? {
        return Ok(ctx.decline("Registry creation declined").await);
    }

    let name = loop {
        if ctx.waiter.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }

        let name = ctx.decisions.registry_name("Name for Registry: ").await?;
        match ctx.registrar.repo().registry_by_name(&name).await? {
            Some(existing) if existing.regk != regk => {
                ctx.decisions
                    .report(&format!("Registry name {name} is already in use, please try again"))
                    .await;
            }
            _ => break name,
        }
    };

    ctx.registrar.make_registry(&name, &ghab.pre, &vcp).await?;
    let sigers = ctx
        .counselor
        .start(anc_key.clone(), &ghab, &anc, atc.path("anc"))
        .await?;

    ctx.registrar.incept(&vcp, &anc).await?;

    let (rexn, ratc) = multisig_registry_incept_exn(&ghab, &usage, &vcp, &anc, sigers)?;
    ctx.broadcast(&ghab, &ghab.smids, &rexn, ratc).await?;
    info!("[confirm:registry_inception] name: {name} | regk: {regk}");

    let (key, regk_ref) = (&anc_key, regk.as_str());
    let outcome = ctx
        .wait_for(move || async move {
            let committed = ctx.counselor.complete(key).await?;
            Ok::<bool, ConfirmError>(committed && ctx.registrar.complete(regk_ref, 0).await?)
        })
        .await?;

    if outcome.is_completed() {
        ctx.decisions.report(&format!("Registry {regk} created.")).await;
    }

    Ok(outcome)
}

pub(crate) async fn issuance<TComp, TDecision>(
    ctx: &Context<TComp, TDecision>,
    proposal: ExchangeRef,
) -> Result<Outcome, ConfirmError>
where
    TComp: Components,
    TDecision: DecisionProvider,
{
    let (exn, atc) = ctx.exchanger.clone_message(&proposal.d).await?;
    let ghab = ctx.group(&payload_str(&exn, "gid")?).await?;

    let acdc = embedded(&exn, "acdc")?;
    let iss = embedded(&exn, "iss")?;
    let anc = embedded(&exn, "anc")?;
    check_anchor(&anc, &ghab.pre, &iss)?;

    let anc_key = EscrowKey::from_serder(&anc)?;
    if ctx.echo(&anc_key, &anc.require_said()?, atc.path("anc")).await? {
        return Ok(Outcome::Completed);
    }

    check_sequence(ctx, &anc).await?;

    let (creder, title) = credential_of(ctx, acdc.raw()).await?;
    if creder.issuer() != ghab.pre {
        return Err(ConfirmError::Validation(format!(
            "credential issuer {} is not the group {}",
            creder.issuer(),
            ghab.pre
        )));
    }

    let mut summary = Summary::new(
        &format!("Group Credential Issuance Proposed (from {})", sender_label(ctx, &exn).await?),
        "Approve",
    )
    .with_field("Credential", creder.said())
    .with_field("Type", title.unwrap_or_default())
    .with_field("Issued By", labelled(Some(ghab.name.as_str()), &ghab.pre, UNKNOWN_AID));

    if let Some(issuee) = issuee_label(ctx, &creder).await? {
        summary = summary.with_field("Issued To", issuee);
    }

    let summary = summary.with_data(subject_data(creder.subject()));
    if !ctx.decisions.approve(&summary).await? {
        return Ok(ctx.decline("Credential issuance declined").await);
    }

    let sigers = ctx
        .counselor
        .start(anc_key.clone(), &ghab, &anc, atc.path("anc"))
        .await?;

    ctx.registrar.issue(&creder, &iss, &anc).await?;

    let (rexn, ratc) = multisig_issue_exn(&ghab, &acdc, &iss, &anc, sigers)?;
    ctx.broadcast(&ghab, &ghab.smids, &rexn, ratc).await?;
    info!("[confirm:issuance] said: {} | issuer: {}", creder.said(), ghab.pre);

    let (key, said) = (&anc_key, creder.said());
    let outcome = ctx
        .wait_for(move || async move {
            let committed = ctx.counselor.complete(key).await?;
            Ok::<bool, ConfirmError>(committed && ctx.registrar.credential_complete(said).await?)
        })
        .await?;

    if outcome.is_completed() {
        ctx.decisions
            .report(&format!("Credential {} complete.", creder.said()))
            .await;
    }

    Ok(outcome)
}

pub(crate) async fn revocation<TComp, TDecision>(
    ctx: &Context<TComp, TDecision>,
    proposal: ExchangeRef,
) -> Result<Outcome, ConfirmError>
where
    TComp: Components,
    TDecision: DecisionProvider,
{
    let (exn, atc) = ctx.exchanger.clone_message(&proposal.d).await?;
    let said = payload_str(&exn, "said")?;

    let raw = match ctx.registrar.credential(&said).await? {
        Some(raw) => raw,
        None => return Ok(ctx.decline(&format!("invalid credential SAID {said}")).await),
    };

    let (creder, title) = credential_of(ctx, &raw).await?;
    let ghab = ctx.group(creder.issuer()).await?;

    let rev = embedded(&exn, "rev")?;
    let anc = embedded(&exn, "anc")?;
    check_anchor(&anc, &ghab.pre, &rev)?;

    let anc_key = EscrowKey::from_serder(&anc)?;
    if ctx.echo(&anc_key, &anc.require_said()?, atc.path("anc")).await? {
        return match ctx.counselor.state(&anc_key).await? {
            ProposalState::Complete => notify_issuee(ctx, &ghab, &creder, &said).await,
            _ => Ok(Outcome::Completed),
        };
    }

    check_sequence(ctx, &anc).await?;

    let mut summary = Summary::new(
        &format!("Group Credential Revocation Proposed (from {})", sender_label(ctx, &exn).await?),
        "Approve Revocation",
    )
    .with_field("Credential", creder.said())
    .with_field("Type", title.unwrap_or_default())
    .with_field("Issued By", labelled(Some(ghab.name.as_str()), &ghab.pre, UNKNOWN_AID));

    if let Some(issuee) = issuee_label(ctx, &creder).await? {
        summary = summary.with_field("Issued To", issuee);
    }

    if !ctx.decisions.approve(&summary).await? {
        return Ok(ctx.decline("Credential revocation declined").await);
    }

    let sigers = ctx
        .counselor
        .start(anc_key.clone(), &ghab, &anc, atc.path("anc"))
        .await?;

    ctx.registrar.revoke(&creder, &rev, &anc).await?;

    let (rexn, ratc) = multisig_revoke_exn(&ghab, &said, &rev, &anc, sigers)?;
    ctx.broadcast(&ghab, &ghab.smids, &rexn, ratc).await?;
    info!("[confirm:revocation] said: {said} | issuer: {}", ghab.pre);

    let (key, cred) = (&anc_key, said.as_str());
    let outcome = ctx
        .wait_for(move || async move {
            let committed = ctx.counselor.complete(key).await?;
            Ok::<bool, ConfirmError>(committed && ctx.registrar.complete(cred, 1).await?)
        })
        .await?;

    if !outcome.is_completed() {
        return Ok(outcome);
    }

    ctx.decisions.report(&format!("Credential {said} revoked.")).await;
    notify_issuee(ctx, &ghab, &creder, &said).await
}

/// Send the revocation state of a witnessed group credential to its issuee
///
/// Runs again on every rescan of a completed revocation. Messages already
/// queued for the issuee are only waited on, never queued twice.
async fn notify_issuee<TComp, TDecision>(
    ctx: &Context<TComp, TDecision>,
    ghab: &GroupHab,
    creder: &Credentialer,
    said: &str,
) -> Result<Outcome, ConfirmError>
where
    TComp: Components,
    TDecision: DecisionProvider,
{
    let witnessed = ctx.habery().witnessed(&ghab.pre).await?;
    let issuee = match creder.issuee() {
        Some(issuee) if witnessed => issuee.to_string(),
        _ => return Ok(Outcome::Completed),
    };

    let mut msgs = ctx.habery().store().clone_pre_iter(&ghab.pre).await?;
    msgs.extend(ctx.registrar.clone_tel_iter(said).await?);

    let mut last = None;
    for msg in msgs {
        let (serder, atc) = parse_message(&msg)?;
        let current = serder.require_said()?;
        if !ctx.poster.queued(&current, &issuee).await? {
            ctx.poster
                .send(&ghab.mhab.pre, &issuee, TOPIC_CREDENTIAL, &serder, &atc)
                .await?;
        }

        last = Some(current);
    }

    match last {
        Some(last) => {
            let last = last.as_str();
            info!("[confirm:notify_issuee] said: {said} | issuee: {issuee}");
            ctx.wait_for(move || async move {
                Ok::<bool, ConfirmError>(ctx.poster.sent(last).await?)
            })
            .await
        }
        None => Ok(Outcome::Completed),
    }
}
