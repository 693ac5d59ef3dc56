//! One handler per proposal kind
//!
//! Every handler checks that a local member takes part, summarises the proposal,
//! asks for approval, submits the local contribution and then waits for the
//! completion predicate of the proposal.
pub(crate) mod group;
pub(crate) mod peer;
pub(crate) mod registry;

use rst_common::standard::serde_json::Value;

use crate::codec::eventing::seal;
use crate::codec::Serder;
use crate::credential::CredentialError;
use crate::group::HaberyBuilder;
use crate::relay::exchanging::payload;

use super::context::Context;
use super::types::{Components, ConfirmError, DecisionProvider};

/// `alias (pre)` of whoever sent `exn`
pub(crate) async fn sender_label<TComp, TDecision>(
    ctx: &Context<TComp, TDecision>,
    exn: &Serder,
) -> Result<String, ConfirmError>
where
    TComp: Components,
    TDecision: DecisionProvider,
{
    let sender = exn.pre().unwrap_or_default();
    let alias = ctx.alias_of(sender).await?;
    Ok(alias.unwrap_or(sender.to_string()))
}

/// Required string field of the payload of `exn`
pub(crate) fn payload_str(exn: &Serder, label: &str) -> Result<String, ConfirmError> {
    payload(exn)?
        .get(label)
        .and_then(|val| val.as_str())
        .map(|val| val.to_string())
        .ok_or(ConfirmError::Validation(format!("missing payload field {label}")))
}

/// Check that the key event `anc` of `pre` carries the seal of `tel`
pub(crate) fn check_anchor(anc: &Serder, pre: &str, tel: &Serder) -> Result<(), ConfirmError> {
    if anc.pre() != Some(pre) {
        return Err(ConfirmError::Validation(format!(
            "anchor {} is not an event of {pre}",
            anc.said().unwrap_or_default()
        )));
    }

    let expected = seal(tel)?;
    let anchored = anc
        .ked()
        .get("a")
        .and_then(|val| val.as_array())
        .map(|seals| seals.contains(&expected))
        .unwrap_or(false);

    match anchored {
        true => Ok(()),
        false => Err(ConfirmError::Validation(format!(
            "{} is not anchored by {}",
            tel.said().unwrap_or_default(),
            anc.said().unwrap_or_default()
        ))),
    }
}

/// Check that the anchoring event `anc` directly follows the accepted key state of its identifier
pub(crate) async fn check_sequence<TComp, TDecision>(
    ctx: &Context<TComp, TDecision>,
    anc: &Serder,
) -> Result<(), ConfirmError>
where
    TComp: Components,
    TDecision: DecisionProvider,
{
    let pre = anc.require_pre()?;
    let state = ctx
        .habery()
        .store()
        .key_state(&pre)
        .await?
        .ok_or(ConfirmError::Usage(format!("key state of {pre} is unknown")))?;

    let sn = anc.sn()?;
    let prior = anc.field_str("p").unwrap_or_default();
    if sn != state.sn + 1 || prior != state.said {
        return Err(ConfirmError::Validation(format!(
            "anchor {} at sn {sn} after {prior} does not follow {pre} at sn {} ({})",
            anc.said().unwrap_or_default(),
            state.sn,
            state.said
        )));
    }

    Ok(())
}

/// Credential failures sorted into the confirmation error taxonomy
pub(crate) fn classify(err: CredentialError) -> ConfirmError {
    match err {
        CredentialError::Configuration(msg) => ConfirmError::Configuration(msg),
        CredentialError::InvalidSchema(msg)
        | CredentialError::SchemaValidation(msg)
        | CredentialError::InvalidCredential(msg) => ConfirmError::Validation(msg),
        other => ConfirmError::Credential(other),
    }
}

/// Subject attributes worth showing, without the subject said and issuee
pub(crate) fn subject_data(subject: Option<&Value>) -> Value {
    match subject {
        Some(Value::Object(map)) => Value::Object(
            map.iter()
                .filter(|(key, _)| !matches!(key.as_str(), "d" | "i"))
                .map(|(key, val)| (key.clone(), val.clone()))
                .collect(),
        ),
        _ => Value::Null,
    }
}
