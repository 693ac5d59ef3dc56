use std::collections::HashSet;

use rst_common::standard::serde_json::Value;
use rst_common::with_logging::log::{debug, info};

use crate::codec::{Serder, Siger, Tholder, Verfer};

use super::types::{EscrowEntry, EscrowError, EscrowKey, EscrowRepoBuilder, Material};

/// `Tracker` answers whether an escrowed artifact reached its completion condition
///
/// Signed artifacts complete when enough distinct valid member signatures are
/// present, anchored artifacts complete when their anchoring key event does.
/// Signatures may arrive in any order and more than once.
#[derive(Clone)]
pub struct Tracker<TRepo>
where
    TRepo: EscrowRepoBuilder,
{
    repo: TRepo,
}

impl<TRepo> Tracker<TRepo>
where
    TRepo: EscrowRepoBuilder,
{
    pub fn new(repo: TRepo) -> Self {
        Self { repo }
    }

    async fn existing(
        &self,
        key: &EscrowKey,
        said: &str,
    ) -> Result<Option<EscrowEntry>, EscrowError> {
        let entry = self.repo.get_entry(key).await?;
        match entry {
            Some(entry) if entry.said != said => Err(EscrowError::Conflict {
                key: key.to_string(),
                escrowed: entry.said,
                given: said.to_string(),
            }),
            other => Ok(other),
        }
    }

    /// Escrow `serder` until `sigers` by `keys` satisfy `sith`
    ///
    /// Submitting again for the same key and said merges the signatures.
    pub async fn submit_signed(
        &self,
        key: EscrowKey,
        serder: &Serder,
        keys: Vec<String>,
        sith: Value,
        sigers: Vec<Siger>,
    ) -> Result<(), EscrowError> {
        let said = serder.require_said()?;
        let _ = Tholder::new(&sith)?;

        if self.existing(&key, &said).await?.is_some() {
            return self.add_signatures(&key, &said, sigers).await;
        }

        debug!("[tracker:submit_signed] key: {key} | said: {said}");
        let entry = EscrowEntry {
            key,
            said,
            ilk: serder.ilk().unwrap_or_default().to_string(),
            raw: serder.raw().to_vec(),
            material: Material::Signed {
                keys,
                sith,
                sigers: dedupe(Vec::new(), sigers),
            },
        };

        self.repo.save_entry(&entry).await
    }

    /// Escrow `serder` until the key event at `anchor` completes with `anchor_said`
    pub async fn submit_anchored(
        &self,
        key: EscrowKey,
        serder: &Serder,
        anchor: EscrowKey,
        anchor_said: &str,
    ) -> Result<(), EscrowError> {
        let said = serder.require_said()?;
        if self.existing(&key, &said).await?.is_some() {
            return Ok(());
        }

        debug!("[tracker:submit_anchored] key: {key} | said: {said} | anchor: {anchor}");
        let entry = EscrowEntry {
            key,
            said,
            ilk: serder.ilk().unwrap_or_default().to_string(),
            raw: serder.raw().to_vec(),
            material: Material::Anchored {
                anchor,
                anchor_said: anchor_said.to_string(),
            },
        };

        self.repo.save_entry(&entry).await
    }

    /// Record signatures that arrived for an already escrowed signed artifact
    pub async fn add_signatures(
        &self,
        key: &EscrowKey,
        said: &str,
        sigers: Vec<Siger>,
    ) -> Result<(), EscrowError> {
        let mut entry = self
            .existing(key, said)
            .await?
            .ok_or(EscrowError::NotFound(key.to_string()))?;

        entry.material = match entry.material {
            Material::Signed {
                keys,
                sith,
                sigers: current,
            } => Material::Signed {
                keys,
                sith,
                sigers: dedupe(current, sigers),
            },
            Material::Anchored { .. } => {
                return Err(EscrowError::InvalidMaterial(format!(
                    "{key} is anchored, signatures are not accepted"
                )))
            }
        };

        self.repo.save_entry(&entry).await
    }

    /// Non blocking completion check, without side effects
    pub async fn is_complete(&self, key: &EscrowKey) -> Result<bool, EscrowError> {
        Ok(self.repo.get_completion(key).await?.is_some())
    }

    pub async fn completed_said(&self, key: &EscrowKey) -> Result<Option<String>, EscrowError> {
        self.repo.get_completion(key).await
    }

    pub async fn entry(&self, key: &EscrowKey) -> Result<Option<EscrowEntry>, EscrowError> {
        self.repo.get_entry(key).await
    }

    /// Re-evaluate every pending entry and promote those that are now complete
    ///
    /// Repeats until a pass promotes nothing, so anchored entries complete in the
    /// same call as their anchor. Returns the promoted keys.
    pub async fn process_pending(&self) -> Result<Vec<EscrowKey>, EscrowError> {
        let entries = self.repo.list_entries().await?;

        let mut pending = Vec::new();
        for entry in entries {
            if self.repo.get_completion(&entry.key).await?.is_none() {
                pending.push(entry);
            }
        }

        let mut promoted = Vec::new();
        loop {
            let mut progressed = false;
            let mut remaining = Vec::new();

            for entry in pending {
                if self.satisfied(&entry).await? {
                    info!(
                        "[tracker:process_pending] complete: {} | said: {}",
                        entry.key, entry.said
                    );

                    self.repo.save_completion(&entry.key, &entry.said).await?;
                    promoted.push(entry.key);
                    progressed = true;
                } else {
                    remaining.push(entry);
                }
            }

            pending = remaining;
            if !progressed || pending.is_empty() {
                break;
            }
        }

        Ok(promoted)
    }

    async fn satisfied(&self, entry: &EscrowEntry) -> Result<bool, EscrowError> {
        match &entry.material {
            Material::Signed { keys, sith, sigers } => {
                let tholder = Tholder::new(sith)?;
                let indices = verified_indices(&entry.raw, keys, sigers);
                Ok(tholder.satisfy(&indices))
            }
            Material::Anchored {
                anchor,
                anchor_said,
            } => {
                let completion = self.repo.get_completion(anchor).await?;
                Ok(completion.as_deref() == Some(anchor_said.as_str()))
            }
        }
    }
}

fn dedupe(mut current: Vec<Siger>, incoming: Vec<Siger>) -> Vec<Siger> {
    let mut seen: HashSet<Siger> = current.iter().cloned().collect();
    for siger in incoming {
        if seen.insert(siger.clone()) {
            current.push(siger);
        }
    }

    current
}

/// Indices of the signatures in `sigers` that verify against `raw`
fn verified_indices(raw: &[u8], keys: &[String], sigers: &[Siger]) -> Vec<u32> {
    let mut indices: Vec<u32> = sigers
        .iter()
        .filter(|siger| {
            keys.get(siger.index as usize)
                .map(|key| Verfer::new(key).verify(raw, &siger.signature))
                .unwrap_or(false)
        })
        .map(|siger| siger.index)
        .collect();

    indices.sort_unstable();
    indices.dedup();
    indices
}
