use cli_table::{print_stdout, Table, WithTitle};

use rst_common::with_logging::log::debug;

use prople_quorum_core::confirm::Components;
use prople_quorum_core::notification::{NoticeID, NotificationRepoBuilder};

use crate::commands::handler::ContextHandler;
use crate::types::CliError;

use super::NoticeCommands;

#[derive(Table)]
struct NoticeRow {
    #[table(title = "ID")]
    id: String,

    #[table(title = "Route")]
    route: String,

    #[table(title = "SAID")]
    said: String,

    #[table(title = "Received")]
    received: String,
}

pub async fn handle_commands(
    ctx: &ContextHandler,
    commands: NoticeCommands,
) -> Result<(), CliError> {
    let notices = ctx.storage().notices();

    match commands {
        NoticeCommands::List => {
            let rows: Vec<NoticeRow> = notices
                .list_notices()
                .await?
                .into_iter()
                .map(|notice| NoticeRow {
                    id: notice.id.as_ref().to_string(),
                    route: notice.route().unwrap_or_default().to_string(),
                    said: notice
                        .attrs
                        .get("d")
                        .and_then(|said| said.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    received: notice.created_at.to_rfc3339(),
                })
                .collect();

            print_stdout(rows.with_title()).map_err(|err| CliError::TableError(err.to_string()))?;
        }
        NoticeCommands::Remove { id } => {
            debug!("[notice:remove] id: {id}");

            let removed = notices.remove_notice(&NoticeID::from_validated(id.clone())).await?;
            match removed {
                true => println!("removed {id}"),
                false => println!("no notice {id}"),
            }
        }
    }

    Ok(())
}
