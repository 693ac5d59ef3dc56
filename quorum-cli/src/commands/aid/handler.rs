use cli_table::{print_stdout, Table, WithTitle};

use rst_common::with_logging::log::debug;

use prople_quorum_core::group::{Habery, HaberyBuilder};
use prople_quorum_store::Keeper;

use crate::commands::handler::ContextHandler;
use crate::types::CliError;
use crate::utils::Bundle;

use super::AidCommands;

#[derive(Table)]
struct IdentifierRow {
    #[table(title = "Alias")]
    alias: String,

    #[table(title = "Kind")]
    kind: &'static str,

    #[table(title = "AID")]
    aid: String,

    #[table(title = "Sn")]
    sn: u64,
}

#[derive(Table)]
struct MemberRow {
    #[table(title = "Signing")]
    signing: &'static str,

    #[table(title = "Rotation")]
    rotation: &'static str,

    #[table(title = "AID")]
    aid: String,
}

#[derive(Table)]
struct RoleRow {
    #[table(title = "Role")]
    role: String,

    #[table(title = "Endpoint")]
    eid: String,
}

fn mark(present: bool) -> &'static str {
    match present {
        true => "*",
        false => "",
    }
}

async fn resolve(keeper: &Keeper, alias: &str) -> Result<String, CliError> {
    keeper
        .hab_by_name(alias)
        .await?
        .ok_or(CliError::Usage(format!("unknown alias: {alias}")))
}

fn table_error(err: impl ToString) -> CliError {
    CliError::TableError(err.to_string())
}

pub async fn handle_commands(ctx: &ContextHandler, commands: AidCommands) -> Result<(), CliError> {
    let keeper = ctx.storage().keeper();

    match commands {
        AidCommands::Add { alias } => {
            ctx.require_passcode()?;
            debug!("[aid:add] alias: {alias}");

            let hab = keeper.create_local(&alias).await?;
            println!("{} {}", hab.name, hab.pre);
        }
        AidCommands::Rotate { alias } => {
            ctx.require_passcode()?;
            let pre = resolve(keeper, &alias).await?;
            let hab = keeper
                .local_hab(&pre)
                .await?
                .ok_or(CliError::Usage(format!("{alias} is not a local identifier")))?;

            let state = keeper.rotate_local(&hab).await?;
            debug!("[aid:rotate] pre: {pre} | sn: {}", state.sn);
            println!("{} {} rotated to sn {}", hab.name, hab.pre, state.sn);
        }
        AidCommands::List => {
            let mut rows = Vec::new();
            for hab in keeper.list_locals().await? {
                let sn = keeper.key_state(&hab.pre).await?.map(|state| state.sn);
                rows.push(IdentifierRow {
                    alias: hab.name,
                    kind: "local",
                    aid: hab.pre,
                    sn: sn.unwrap_or_default(),
                });
            }

            for ghab in keeper.list_groups().await? {
                let sn = keeper.key_state(&ghab.pre).await?.map(|state| state.sn);
                rows.push(IdentifierRow {
                    alias: ghab.name,
                    kind: "group",
                    aid: ghab.pre,
                    sn: sn.unwrap_or_default(),
                });
            }

            print_stdout(rows.with_title()).map_err(table_error)?;
        }
        AidCommands::Members { alias } => {
            let pre = resolve(keeper, &alias).await?;
            let habery = Habery::new(keeper.clone());
            let smids = habery.signing_members(&pre).await?;
            let rmids = habery.rotation_members(&pre).await?;

            let mut aids = smids.clone();
            aids.extend(rmids.iter().filter(|mid| !smids.contains(mid)).cloned());

            let rows: Vec<MemberRow> = aids
                .into_iter()
                .map(|aid| MemberRow {
                    signing: mark(smids.contains(&aid)),
                    rotation: mark(rmids.contains(&aid)),
                    aid,
                })
                .collect();

            print_stdout(rows.with_title()).map_err(table_error)?;
        }
        AidCommands::Roles { alias } => {
            let pre = resolve(keeper, &alias).await?;
            let rows: Vec<RoleRow> = keeper
                .end_roles(&pre)
                .await?
                .into_iter()
                .map(|role| RoleRow {
                    role: role.role,
                    eid: role.eid,
                })
                .collect();

            print_stdout(rows.with_title()).map_err(table_error)?;
        }
        AidCommands::Export { alias, out } => {
            let pre = resolve(keeper, &alias).await?;

            let kel = keeper.clone_pre_iter(&pre).await?;
            debug!("[aid:export] pre: {pre} | events: {}", kel.len());

            Bundle::new(&kel).write(&out)?;
            println!("{} events of {pre} written to {}", kel.len(), out.display());
        }
    }

    Ok(())
}
