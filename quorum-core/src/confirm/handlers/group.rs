use rst_common::standard::serde_json::Value;
use rst_common::with_logging::log::info;

use crate::codec::types::ilks;
use crate::codec::{verify_said, Serder, Siger};
use crate::escrow::EscrowKey;
use crate::group::types::union;
use crate::group::{GroupHab, GroupInits, HaberyBuilder};
use crate::notification::{InceptionProposal, InteractionProposal, RotationProposal};
use crate::relay::exchanging::{
    multisig_inception_exn, multisig_interact_exn, multisig_rotate_exn,
};

use crate::confirm::context::{committed, Context};
use crate::confirm::summary::{inception_config, rotation_config, Summary};
use crate::confirm::types::{Components, ConfirmError, DecisionProvider, Outcome};

/// Signatures of the proposed event, kept only when it is the event rebuilt locally
fn matching(proposed: Option<(Serder, Vec<Siger>)>, said: &str) -> Result<Vec<Siger>, ConfirmError> {
    match proposed {
        Some((serder, sigers)) if serder.said() == Some(said) => Ok(sigers),
        Some((serder, _)) => Err(ConfirmError::Validation(format!(
            "proposed event {} does not match local event {said}",
            serder.said().unwrap_or_default()
        ))),
        None => Ok(Vec::new()),
    }
}

async fn delegator_alias<TComp, TDecision>(
    ctx: &Context<TComp, TDecision>,
    ked: &crate::codec::Ked,
) -> Result<Option<String>, ConfirmError>
where
    TComp: Components,
    TDecision: DecisionProvider,
{
    match ked.get("di").and_then(|val| val.as_str()) {
        Some(di) => ctx.alias_of(di).await,
        None => Ok(None),
    }
}

pub(crate) async fn inception<TComp, TDecision>(
    ctx: &Context<TComp, TDecision>,
    proposal: InceptionProposal,
) -> Result<Outcome, ConfirmError>
where
    TComp: Components,
    TDecision: DecisionProvider,
{
    let smids = proposal.smids.clone();
    let rmids = proposal.rmids.clone().unwrap_or_else(|| smids.clone());
    let both = union(&smids, &rmids);

    let mhab = match ctx.first_local(&both).await? {
        Some(hab) => hab,
        None => {
            return Ok(ctx
                .decline("Invalid multisig group inception request, aid list must contain a local identifier")
                .await)
        }
    };

    let ked = proposal.ked;
    let said = ked
        .get("d")
        .and_then(|val| val.as_str())
        .ok_or(ConfirmError::Validation("proposed inception without said".to_string()))?
        .to_string();

    let pre = ked
        .get("i")
        .and_then(|val| val.as_str())
        .unwrap_or_default()
        .to_string();

    if let Some(ghab) = ctx.habery().store().group_hab(&pre).await? {
        let key = EscrowKey::new(&ghab.pre, 0);
        let received = matching(ctx.proposed(proposal.d.as_deref(), "icp").await?, &said)?;
        if ctx.echo(&key, &said, received).await? {
            ctx.decisions
                .report(&format!("Group {} ({}) already joined", ghab.name, ghab.pre))
                .await;
            return Ok(Outcome::Completed);
        }

        return Err(ConfirmError::Usage(format!(
            "group {pre} exists without a pending inception"
        )));
    }

    let sith = ked.get("kt").cloned().unwrap_or(Value::Null);
    let delegator = delegator_alias(ctx, &ked).await?;
    let summary = Summary::new("Group Multisig Inception proposed", "Join")
        .with_table(ctx.member_table("Participants", &smids, &mhab, &sith).await?)
        .with_config(inception_config(&ked, delegator.as_deref())?);

    if !ctx.decisions.approve(&summary).await? {
        return Ok(ctx.decline("Group inception declined").await);
    }

    let alias = match ctx.fresh_alias().await? {
        Some(alias) => alias,
        None => return Ok(Outcome::Cancelled),
    };

    let inits = GroupInits::from_ked(&ked)?;
    let rebuilt = ctx.habery().incept_group(&smids, &rmids, &inits).await?;
    if rebuilt.said() != Some(said.as_str()) {
        return Err(ConfirmError::Validation(format!(
            "rebuilt inception {} does not match proposed {said}",
            rebuilt.said().unwrap_or_default()
        )));
    }

    let (ghab, icp) = ctx
        .habery()
        .make_group_hab(&alias, &mhab, &smids, &rmids, inits)
        .await?;

    let received = matching(ctx.proposed(proposal.d.as_deref(), "icp").await?, &said)?;
    let key = EscrowKey::new(&ghab.pre, 0);
    let sigers = ctx.counselor.start(key.clone(), &ghab, &icp, received).await?;

    let (exn, atc) = multisig_inception_exn(&ghab, &icp, sigers)?;
    ctx.broadcast(&ghab, &ghab.members(), &exn, atc).await?;

    info!("[confirm:inception] alias: {alias} | pre: {}", ghab.pre);
    ctx.decisions
        .report(&format!("Group identifier inception initialized for {}", ghab.pre))
        .await;

    let key = &key;
    let outcome = ctx.wait_for(move || committed(&ctx.counselor, key)).await?;
    if outcome.is_completed() {
        ctx.decisions
            .report(&format!("Group identifier {alias} ({}) complete", ghab.pre))
            .await;
    }

    Ok(outcome)
}

pub(crate) async fn interaction<TComp, TDecision>(
    ctx: &Context<TComp, TDecision>,
    proposal: InteractionProposal,
) -> Result<Outcome, ConfirmError>
where
    TComp: Components,
    TDecision: DecisionProvider,
{
    let ghab = ctx.group(&proposal.gid).await?;
    let rmids = proposal.rmids.clone().unwrap_or_else(|| proposal.smids.clone());
    let both = union(&proposal.smids, &rmids);

    if !both.contains(&ghab.mhab.pre) {
        return Ok(ctx
            .decline(&format!(
                "Local AID {} not a requested signer in {}",
                ghab.mhab.pre,
                both.join(", ")
            ))
            .await);
    }

    let proposed = ctx.proposed(proposal.d.as_deref(), "ixn").await?;
    if let Some((ixn, sigers)) = &proposed {
        let key = EscrowKey::from_serder(ixn)?;
        if ctx.echo(&key, &ixn.require_said()?, sigers.clone()).await? {
            return Ok(Outcome::Completed);
        }
    }

    let summary = Summary::new(
        &format!("Group Multisig Interaction for {} ({}) proposed", ghab.name, ghab.pre),
        "Approve",
    )
    .with_data(Value::Array(proposal.data.clone()));

    if !ctx.decisions.approve(&summary).await? {
        return Ok(ctx.decline("Group interaction declined").await);
    }

    let ixn = ctx.habery().interact(&ghab, proposal.data.clone()).await?;
    let received = matching(proposed, &ixn.require_said()?)?;

    let key = EscrowKey::from_serder(&ixn)?;
    let sigers = ctx.counselor.start(key.clone(), &ghab, &ixn, received).await?;

    let (exn, atc) = multisig_interact_exn(&ghab, &ixn, sigers, &proposal.data)?;
    ctx.broadcast(&ghab, &ghab.members(), &exn, atc).await?;
    info!("[confirm:interaction] pre: {} | key: {key}", ghab.pre);

    let key = &key;
    let outcome = ctx.wait_for(move || committed(&ctx.counselor, key)).await?;
    if outcome.is_completed() {
        ctx.decisions
            .report(&format!("Group interaction {} for {} complete", ixn.said().unwrap_or_default(), ghab.pre))
            .await;
    }

    Ok(outcome)
}

pub(crate) async fn rotation<TComp, TDecision>(
    ctx: &Context<TComp, TDecision>,
    proposal: RotationProposal,
) -> Result<Outcome, ConfirmError>
where
    TComp: Components,
    TDecision: DecisionProvider,
{
    let smids = proposal.smids.clone();
    let rmids = proposal.rmids.clone().unwrap_or_else(|| smids.clone());
    let both = union(&smids, &rmids);

    let rot = Serder::from_ked(proposal.ked.clone(), None)?;
    if rot.ilk() != Some(ilks::ROT) || !verify_said(rot.ked(), "d") {
        return Err(ConfirmError::Validation(format!(
            "invalid rotation proposal {}",
            rot.said().unwrap_or_default()
        )));
    }

    let pre = rot.require_pre()?;
    let said = rot.require_said()?;
    let existing = ctx.habery().store().group_hab(&pre).await?;

    let mhab = match &existing {
        Some(ghab) if both.contains(&ghab.mhab.pre) => Some(ghab.mhab.clone()),
        Some(_) => None,
        None => ctx.first_local(&both).await?,
    };

    let mhab = match mhab {
        Some(hab) => hab,
        None => {
            return Ok(ctx
                .decline("Invalid multisig group rotation request, signing member list must contain a local identifier")
                .await)
        }
    };

    if ctx.habery().store().key_state(&pre).await?.is_none() {
        return Err(ConfirmError::Usage(format!(
            "key state of group {pre} is unknown"
        )));
    }

    let key = EscrowKey::from_serder(&rot)?;
    let received = matching(ctx.proposed(proposal.d.as_deref(), "rot").await?, &said)?;
    if existing.is_some() && ctx.echo(&key, &said, received.clone()).await? {
        return Ok(Outcome::Completed);
    }

    let delegator = delegator_alias(ctx, rot.ked()).await?;
    let sith = rot.ked().get("kt").cloned().unwrap_or(Value::Null);
    let nsith = rot.ked().get("nt").cloned().unwrap_or(Value::Null);
    let summary = Summary::new("Group Multisig Rotation proposed", "Approve")
        .with_table(ctx.member_table("Signing Members", &smids, &mhab, &sith).await?)
        .with_table(ctx.member_table("Rotation Members", &rmids, &mhab, &nsith).await?)
        .with_config(rotation_config(rot.ked(), delegator.as_deref())?);

    if !ctx.decisions.approve(&summary).await? {
        return Ok(ctx.decline("Group rotation declined").await);
    }

    let ghab = match existing {
        Some(ghab) => GroupHab {
            smids: smids.clone(),
            rmids: rmids.clone(),
            ..ghab
        },
        None => {
            let alias = match ctx.fresh_alias().await? {
                Some(alias) => alias,
                None => return Ok(Outcome::Cancelled),
            };

            ctx.habery()
                .join_group_hab(&pre, &alias, &mhab, &smids, &rmids)
                .await?
        }
    };

    if ghab.smids.contains(&ghab.mhab.pre) {
        ctx.habery().align_member(&ghab.mhab, &rot).await?;
    }

    let sigers = ctx.counselor.start(key.clone(), &ghab, &rot, received).await?;
    let (exn, atc) = multisig_rotate_exn(&ghab, &smids, &rmids, &rot, sigers)?;
    ctx.broadcast(&ghab, &both, &exn, atc).await?;
    info!("[confirm:rotation] pre: {pre} | key: {key}");

    let key = &key;
    let outcome = ctx.wait_for(move || committed(&ctx.counselor, key)).await?;
    if outcome.is_completed() {
        ctx.habery().store().save_group_hab(&ghab).await?;
        ctx.decisions
            .report(&format!("Group rotation of {} ({pre}) complete", ghab.name))
            .await;
    }

    Ok(outcome)
}
