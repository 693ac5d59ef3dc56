use cli_table::{print_stdout, Table, WithTitle};

use rst_common::with_logging::log::info;

use crate::commands::handler::ContextHandler;
use crate::types::CliError;
use crate::utils::Bundle;

use super::OutboxCommands;

#[derive(Table)]
struct PostageRow {
    #[table(title = "Destination")]
    dest: String,

    #[table(title = "Topic")]
    topic: String,

    #[table(title = "SAID")]
    said: String,

    #[table(title = "Queued")]
    queued: String,
}

pub async fn handle_commands(
    ctx: &ContextHandler,
    commands: OutboxCommands,
) -> Result<(), CliError> {
    let outbox = ctx.storage().outbox();

    match commands {
        OutboxCommands::List { dest } => {
            let rows: Vec<PostageRow> = outbox
                .pending(dest.as_deref())
                .await?
                .into_iter()
                .map(|postage| PostageRow {
                    dest: postage.dest,
                    topic: postage.topic,
                    said: postage.said,
                    queued: postage.created_at.to_rfc3339(),
                })
                .collect();

            print_stdout(rows.with_title()).map_err(|err| CliError::TableError(err.to_string()))?;
        }
        OutboxCommands::Export { dest, out } => {
            let postages = outbox.pending(Some(&dest)).await?;
            if postages.is_empty() {
                println!("nothing queued for {dest}");
                return Ok(());
            }

            let messages: Vec<Vec<u8>> = postages
                .iter()
                .map(|postage| postage.message.clone())
                .collect();
            Bundle::new(&messages).write(&out)?;

            for postage in postages.iter() {
                outbox.take(postage).await?;
            }

            info!("[outbox:export] dest: {dest} | messages: {}", messages.len());
            println!("{} messages for {dest} written to {}", messages.len(), out.display());
        }
    }

    Ok(())
}
