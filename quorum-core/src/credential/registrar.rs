use rst_common::with_logging::log::{debug, info};

use crate::codec::types::ilks;
use crate::codec::Serder;
use crate::escrow::{EscrowKey, EscrowRepoBuilder, Tracker};

use super::credentialer::Credentialer;
use super::types::{CredentialError, Registry, RegistryRepoBuilder};

/// `Registrar` tracks registry inception, issuance and revocation events
///
/// Every transaction event is escrowed until the group key event anchoring it
/// completes. Once complete it becomes part of the transaction event log.
#[derive(Clone)]
pub struct Registrar<TRepo, TEscrow>
where
    TRepo: RegistryRepoBuilder,
    TEscrow: EscrowRepoBuilder,
{
    repo: TRepo,
    tracker: Tracker<TEscrow>,
}

impl<TRepo, TEscrow> Registrar<TRepo, TEscrow>
where
    TRepo: RegistryRepoBuilder,
    TEscrow: EscrowRepoBuilder,
{
    pub fn new(repo: TRepo, tracker: Tracker<TEscrow>) -> Self {
        Self { repo, tracker }
    }

    pub fn repo(&self) -> &TRepo {
        &self.repo
    }

    /// Register the registry created by `vcp` for the issuer `pre` under `name`
    pub async fn make_registry(
        &self,
        name: &str,
        pre: &str,
        vcp: &Serder,
    ) -> Result<Registry, CredentialError> {
        if vcp.ilk() != Some(ilks::VCP) {
            return Err(CredentialError::InvalidEvent(format!(
                "expected registry inception, got {}",
                vcp.ilk().unwrap_or_default()
            )));
        }

        if vcp.field_str("ii") != Some(pre) {
            return Err(CredentialError::InvalidEvent(format!(
                "registry issuer {} is not {pre}",
                vcp.field_str("ii").unwrap_or_default()
            )));
        }

        let regk = vcp.require_pre()?;
        if let Some(existing) = self.repo.registry_by_name(name).await? {
            if existing.regk != regk {
                return Err(CredentialError::AlreadyExists(format!("registry name {name}")));
            }

            return Ok(existing);
        }

        let registry = Registry {
            name: name.to_string(),
            regk,
            pre: pre.to_string(),
            vcp: vcp.raw().to_vec(),
        };

        self.repo.save_registry(&registry).await?;
        info!("[registrar:make_registry] name: {name} | regk: {}", registry.regk);
        Ok(registry)
    }

    async fn escrow(&self, key: EscrowKey, tel: &Serder, anc: &Serder) -> Result<(), CredentialError> {
        let anchor = EscrowKey::from_serder(anc)?;
        let anchor_said = anc.require_said()?;

        debug!("[registrar:escrow] key: {key} | anchor: {anchor}");
        self.tracker
            .submit_anchored(key, tel, anchor, &anchor_said)
            .await?;

        Ok(())
    }

    /// Escrow the registry inception `vcp` until the anchoring event `anc` completes
    pub async fn incept(&self, vcp: &Serder, anc: &Serder) -> Result<(), CredentialError> {
        let key = EscrowKey::new(&vcp.require_pre()?, 0);
        self.escrow(key, vcp, anc).await
    }

    pub async fn issue(
        &self,
        creder: &Credentialer,
        iss: &Serder,
        anc: &Serder,
    ) -> Result<(), CredentialError> {
        if iss.pre() != Some(creder.said()) {
            return Err(CredentialError::InvalidEvent(format!(
                "issuance of {} does not match credential {}",
                iss.pre().unwrap_or_default(),
                creder.said()
            )));
        }

        let regk = iss.field_str("ri").unwrap_or_default();
        if self.repo.get_registry(regk).await?.is_none() {
            return Err(CredentialError::NotFound(format!("registry {regk}")));
        }

        self.repo.save_credential(creder.said(), creder.raw()).await?;
        self.escrow(EscrowKey::new(creder.said(), 0), iss, anc).await
    }

    pub async fn revoke(
        &self,
        creder: &Credentialer,
        rev: &Serder,
        anc: &Serder,
    ) -> Result<(), CredentialError> {
        if rev.pre() != Some(creder.said()) {
            return Err(CredentialError::InvalidEvent(format!(
                "revocation of {} does not match credential {}",
                rev.pre().unwrap_or_default(),
                creder.said()
            )));
        }

        self.escrow(EscrowKey::new(creder.said(), 1), rev, anc).await
    }

    /// Whether the transaction event of `pre` at `sn` completed
    ///
    /// A completed event is appended to the transaction event log, repeated
    /// calls write the same record again.
    pub async fn complete(&self, pre: &str, sn: u64) -> Result<bool, CredentialError> {
        let key = EscrowKey::new(pre, sn);
        if !self.tracker.is_complete(&key).await? {
            return Ok(false);
        }

        let entry = self
            .tracker
            .entry(&key)
            .await?
            .ok_or(CredentialError::NotFound(key.to_string()))?;

        self.repo.save_tel_event(pre, sn, &entry.raw).await?;
        Ok(true)
    }

    pub async fn credential_complete(&self, said: &str) -> Result<bool, CredentialError> {
        self.complete(said, 0).await
    }

    pub async fn credential(&self, said: &str) -> Result<Option<Vec<u8>>, CredentialError> {
        self.repo.get_credential(said).await
    }

    /// Accepted transaction events of `pre`, in sequence order
    pub async fn clone_tel_iter(&self, pre: &str) -> Result<Vec<Vec<u8>>, CredentialError> {
        self.repo.tel_events(pre).await
    }
}
