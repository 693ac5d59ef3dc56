use std::path::PathBuf;

use clap::{Args, Subcommand};

mod handler;

pub use handler::handle_commands as message_handler;

#[derive(Args, Clone)]
pub struct MessageArgs {
    #[command(subcommand)]
    pub commands: MessageCommands,
}

#[derive(Clone, Subcommand)]
#[command(subcommand_help_heading = "Messages")]
pub enum MessageCommands {
    /// Receive the messages of a bundle written by `outbox export`
    Ingest {
        #[arg(long, required(true))]
        file: PathBuf,
    },
}
