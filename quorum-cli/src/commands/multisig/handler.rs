use std::path::Path;

use rst_common::standard::serde_json::{self, Value};
use rst_common::with_logging::log::{debug, info};
use rst_common::with_tokio::tokio;

use prople_quorum_core::codec::Tholder;
use prople_quorum_core::confirm::{Confirmer, Proposer};
use prople_quorum_core::group::{cancellation, GroupInits, HaberyBuilder, Waiter};

use crate::commands::handler::ContextHandler;
use crate::types::CliError;
use crate::utils::Terminal;

use super::MultisigCommands;

/// Threshold given on the command line, all `members` when omitted
///
/// A value starting with `[` is a JSON list of weights, anything else a hex
/// number.
pub fn threshold(raw: Option<&str>, members: usize) -> Result<Value, CliError> {
    let sith = match raw.map(|raw| raw.trim()) {
        None => Value::from(format!("{members:x}")),
        Some(raw) if raw.starts_with('[') => serde_json::from_str(raw)
            .map_err(|err| CliError::Usage(format!("invalid threshold {raw}: {err}")))?,
        Some(raw) => Value::from(raw),
    };

    Tholder::new(&sith).map_err(|err| CliError::Usage(err.to_string()))?;
    Ok(sith)
}

async fn join(ctx: &ContextHandler, timeout: Option<u64>, once: bool) -> Result<(), CliError> {
    let storage = ctx.storage();

    let mut agent = ctx.config().agent().clone();
    if timeout.is_some() {
        agent = agent.with_timeout(timeout);
    }

    if let Some(dir) = agent.get_schema_dir() {
        let saids = storage.schema_repo().load_dir(Path::new(&dir)).await?;
        info!("[multisig:join] schemas loaded: {} | dir: {dir}", saids.len());
    }

    let (handle, cancel) = cancellation();
    let confirmer = Confirmer::new(storage, Terminal::new(), Waiter::new(agent.wait_policy(), cancel));

    if once {
        let report = confirmer.run_once().await?;
        println!(
            "scanned: {} | completed: {} | discarded: {} | retained: {} | failed: {}",
            report.scanned,
            report.completed.len(),
            report.discarded.len(),
            report.retained.len(),
            report.failed.len()
        );

        for (id, err) in report.failed.iter() {
            println!("{}: {err}", id.as_ref());
        }

        return Ok(());
    }

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });

    println!("Waiting for group multisig events...");
    confirmer.run().await?;
    println!("Stopped");

    Ok(())
}

pub async fn handle_commands(
    ctx: &ContextHandler,
    commands: MultisigCommands,
) -> Result<(), CliError> {
    ctx.require_passcode()?;

    match commands {
        MultisigCommands::Join { timeout, once } => join(ctx, timeout, once).await,
        MultisigCommands::Incept {
            alias,
            group,
            members,
            rotation_members,
            isith,
            nsith,
        } => {
            let storage = ctx.storage();
            let member = storage
                .keeper()
                .hab_by_name(&alias)
                .await?
                .ok_or(CliError::Usage(format!("unknown alias: {alias}")))?;

            let mut smids = members;
            if !smids.contains(&member) {
                smids.insert(0, member.clone());
            }

            let rmids = match rotation_members.is_empty() {
                true => smids.clone(),
                false => rotation_members,
            };

            let isith = threshold(isith.as_deref(), smids.len())?;
            let nsith = match nsith {
                Some(raw) => threshold(Some(&raw), rmids.len())?,
                None => isith.clone(),
            };

            debug!(
                "[multisig:incept] group: {group} | smids: {} | rmids: {}",
                smids.len(),
                rmids.len()
            );

            let inits = GroupInits {
                isith,
                nsith,
                est_only: false,
                dnd: false,
                toad: 0,
                wits: Vec::new(),
                delpre: None,
            };

            let ghab = Proposer::new(storage)
                .incept(&group, &member, &smids, &rmids, inits)
                .await?;

            println!("{} {}", ghab.name, ghab.pre);
            println!("Proposal queued for {} members, see `quorum outbox list`", smids.len() - 1);
            Ok(())
        }
    }
}
