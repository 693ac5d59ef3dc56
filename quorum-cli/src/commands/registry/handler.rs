use cli_table::{print_stdout, Table, WithTitle};

use crate::commands::handler::ContextHandler;
use crate::types::CliError;

use super::RegistryCommands;

#[derive(Table)]
struct RegistryRow {
    #[table(title = "Name")]
    name: String,

    #[table(title = "Registry")]
    regk: String,

    #[table(title = "Issuer")]
    issuer: String,
}

pub async fn handle_commands(
    ctx: &ContextHandler,
    commands: RegistryCommands,
) -> Result<(), CliError> {
    match commands {
        RegistryCommands::List => {
            let rows: Vec<RegistryRow> = ctx
                .storage()
                .registry_repo()
                .list_registries()
                .await?
                .into_iter()
                .map(|registry| RegistryRow {
                    name: registry.name,
                    regk: registry.regk,
                    issuer: registry.pre,
                })
                .collect();

            print_stdout(rows.with_title()).map_err(|err| CliError::TableError(err.to_string()))?;
        }
    }

    Ok(())
}
