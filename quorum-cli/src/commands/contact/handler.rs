use cli_table::{print_stdout, Table, WithTitle};

use rst_common::with_logging::log::{debug, info};

use prople_quorum_core::confirm::Contact;

use crate::commands::handler::ContextHandler;
use crate::types::CliError;
use crate::utils::Bundle;

use super::ContactCommands;

#[derive(Table)]
struct ContactRow {
    #[table(title = "Alias")]
    alias: String,

    #[table(title = "AID")]
    aid: String,
}

pub async fn handle_commands(
    ctx: &ContextHandler,
    commands: ContactCommands,
) -> Result<(), CliError> {
    let storage = ctx.storage();

    match commands {
        ContactCommands::Add { alias, pre, kel } => {
            debug!("[contact:add] alias: {alias}");

            let pre = match (kel, pre) {
                (Some(path), expected) => {
                    let messages = Bundle::read(&path)?.messages()?;
                    let state = storage.keeper().import_kel(&messages).await?;
                    info!("[contact:add] imported pre: {} | sn: {}", state.pre, state.sn);

                    if let Some(expected) = expected {
                        if expected != state.pre {
                            return Err(CliError::Usage(format!(
                                "bundle holds {} not {expected}",
                                state.pre
                            )));
                        }
                    }

                    state.pre
                }
                (None, Some(pre)) => pre,
                (None, None) => {
                    return Err(CliError::Usage(
                        "either --pre or --kel is required".to_string(),
                    ))
                }
            };

            storage
                .contact_repo()
                .save_contact(&Contact {
                    pre: pre.clone(),
                    alias: alias.clone(),
                })
                .await?;
            println!("{alias} {pre}");
        }
        ContactCommands::List => {
            let rows: Vec<ContactRow> = storage
                .contact_repo()
                .list_contacts()
                .await?
                .into_iter()
                .map(|contact| ContactRow {
                    alias: contact.alias,
                    aid: contact.pre,
                })
                .collect();

            print_stdout(rows.with_title()).map_err(|err| CliError::TableError(err.to_string()))?;
        }
    }

    Ok(())
}
