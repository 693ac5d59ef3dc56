use std::path::PathBuf;

use clap::{Args, Subcommand};

mod handler;

pub use handler::handle_commands as outbox_handler;

#[derive(Args, Clone)]
pub struct OutboxArgs {
    #[command(subcommand)]
    pub commands: OutboxCommands,
}

#[derive(Clone, Subcommand)]
#[command(subcommand_help_heading = "Outbox")]
pub enum OutboxCommands {
    /// List messages waiting to be carried to other participants
    List {
        #[arg(long)]
        dest: Option<String>,
    },

    /// Move the messages for `dest` into a bundle file
    Export {
        #[arg(long, required(true))]
        dest: String,

        #[arg(long, required(true))]
        out: PathBuf,
    },
}
