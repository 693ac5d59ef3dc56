use rst_common::with_logging::log::{debug, warn};

use prople_quorum_core::confirm::Inbound;

use crate::commands::handler::ContextHandler;
use crate::types::CliError;
use crate::utils::Bundle;

use super::MessageCommands;

pub async fn handle_commands(
    ctx: &ContextHandler,
    commands: MessageCommands,
) -> Result<(), CliError> {
    match commands {
        MessageCommands::Ingest { file } => {
            let messages = Bundle::read(&file)?.messages()?;
            debug!("[message:ingest] file: {} | messages: {}", file.display(), messages.len());

            let inbound = Inbound::new(ctx.storage());
            let mut received = 0;
            for (idx, message) in messages.iter().enumerate() {
                match inbound.ingest(message).await {
                    Ok(Some(notice)) => {
                        received += 1;
                        println!(
                            "{} {}",
                            notice.id.as_ref(),
                            notice.route().unwrap_or_default()
                        );
                    }
                    Ok(None) => debug!("[message:ingest] ignored message: {idx}"),
                    Err(err) => warn!("[message:ingest] rejected message: {idx} | error: {err}"),
                }
            }

            println!("{received} of {} messages received", messages.len());
        }
    }

    Ok(())
}
