use rst_common::standard::serde_json::Value;
use rst_common::with_logging::log::{debug, info, warn};

use crate::codec::types::ilks;
use crate::codec::{parse_message, verify_said, Attachment, Ked, Serder, Verfer};
use crate::escrow::{EscrowError, EscrowKey, Tracker};
use crate::group::HaberyBuilder;
use crate::notification::{Notice, NotificationRepoBuilder};
use crate::relay::exchanging::{embedded, payload, routes};
use crate::relay::Exchanger;

use super::types::{Components, ConfirmError};

const MULTISIG_PREFIX: &str = "/multisig/";

/// `Inbound` turns received group messages into pending notices
///
/// Only messages signed to threshold by the current keys of a known sender are
/// accepted. The message is stored so handlers can load it again, signatures
/// carried for an already escrowed event are merged right away.
pub struct Inbound<TComp>
where
    TComp: Components,
{
    store: TComp::Store,
    exchanger: Exchanger<TComp::Exchanges, TComp::Escrow>,
    tracker: Tracker<TComp::Escrow>,
    notices: TComp::Notices,
}

impl<TComp> Inbound<TComp>
where
    TComp: Components,
{
    pub fn new(components: &TComp) -> Self {
        let tracker = Tracker::new(components.escrow());
        Self {
            store: components.store(),
            exchanger: Exchanger::new(components.exchanges(), tracker.clone()),
            tracker,
            notices: components.notices(),
        }
    }

    /// Ingest one wire message, returns the notice created for it
    ///
    /// Messages outside of the multisig routes are ignored.
    pub async fn ingest(&self, message: &[u8]) -> Result<Option<Notice>, ConfirmError> {
        let (exn, atc) = parse_message(message)?;
        if exn.ilk() != Some(ilks::EXN) {
            return Err(ConfirmError::Validation(format!(
                "expected exn message, got {}",
                exn.ilk().unwrap_or_default()
            )));
        }

        let route = exn
            .route()
            .ok_or(ConfirmError::Validation("exn without route".to_string()))?
            .to_string();

        if !route.starts_with(MULTISIG_PREFIX) {
            debug!("[inbound:ingest] ignored route: {route}");
            return Ok(None);
        }

        self.authenticate(&exn, &atc).await?;
        let said = self.exchanger.save(&exn, &atc).await?;
        self.merge_signatures(&exn, &atc).await?;

        let notice = Notice::new(notice_attrs(&route, &exn, &said)?);
        self.notices.save_notice(&notice).await?;

        info!(
            "[inbound:ingest] notice: {} | route: {route} | said: {said}",
            notice.id.as_ref()
        );
        Ok(Some(notice))
    }

    async fn authenticate(&self, exn: &Serder, atc: &Attachment) -> Result<(), ConfirmError> {
        let said = exn.said().unwrap_or_default();
        if !verify_said(exn.ked(), "d") {
            return Err(ConfirmError::Validation(format!(
                "exn {said} does not match its content"
            )));
        }

        let sender = exn.require_pre()?;
        let state = self
            .store
            .key_state(&sender)
            .await?
            .ok_or(ConfirmError::Validation(format!("exn {said} from unknown sender {sender}")))?;

        let indices: Vec<u32> = atc
            .sigers
            .iter()
            .filter(|siger| {
                state
                    .keys
                    .get(siger.index as usize)
                    .map(|key| Verfer::new(key).verify(exn.raw(), &siger.signature))
                    .unwrap_or(false)
            })
            .map(|siger| siger.index)
            .collect();

        if !state.tholder()?.satisfy(&indices) {
            return Err(ConfirmError::Validation(format!(
                "exn {said} is not signed to threshold by {sender}"
            )));
        }

        Ok(())
    }

    async fn merge_signatures(&self, exn: &Serder, atc: &Attachment) -> Result<(), ConfirmError> {
        for (label, sigers) in atc.pathed.iter() {
            let embed = match embedded(exn, label) {
                Ok(embed) => embed,
                Err(_) => continue,
            };

            let said = embed.require_said()?;
            let key = match embed.ilk().unwrap_or_default() {
                ilk if ilks::is_key_event(ilk) => EscrowKey::from_serder(&embed)?,
                ilks::RPY | ilks::EXN => Exchanger::<TComp::Exchanges, TComp::Escrow>::key(&said),
                _ => continue,
            };

            match self.tracker.add_signatures(&key, &said, sigers.clone()).await {
                Ok(_) => debug!("[inbound:merge] key: {key} | sigs: {}", sigers.len()),
                Err(EscrowError::NotFound(_)) => {}
                Err(EscrowError::Conflict { escrowed, given, .. }) => {
                    warn!("[inbound:merge] key: {key} | escrowed: {escrowed} | given: {given}")
                }
                Err(err) => return Err(err.into()),
            }
        }

        Ok(())
    }
}

fn copy(attrs: &mut Ked, source: &Ked, from: &str, to: &str) {
    if let Some(val) = source.get(from) {
        attrs.insert(to.to_string(), val.clone());
    }
}

/// Notice attributes of a multisig `exn`
///
/// Group key event proposals carry their payload inline, every other route only
/// references the stored message through `d`.
pub fn notice_attrs(route: &str, exn: &Serder, said: &str) -> Result<Ked, ConfirmError> {
    let mut attrs = Ked::new();
    attrs.insert("r".to_string(), Value::from(route));
    attrs.insert("d".to_string(), Value::from(said));

    let embed = match route {
        routes::ICP => Some("icp"),
        routes::ROT => Some("rot"),
        routes::IXN => None,
        _ => return Ok(attrs),
    };

    let data = payload(exn)?;
    copy(&mut attrs, data, "smids", "smids");
    copy(&mut attrs, data, "rmids", "rmids");

    match embed {
        Some(label) => {
            let event = embedded(exn, label)?;
            attrs.insert("ked".to_string(), Value::Object(event.ked().clone()));
        }
        None => {
            copy(&mut attrs, data, "gid", "gid");
            copy(&mut attrs, data, "smids", "aids");
            copy(&mut attrs, data, "data", "data");
            attrs.remove("smids");
        }
    }

    Ok(attrs)
}
