use std::path::PathBuf;

use clap::{Args, Subcommand};

mod handler;

pub use handler::handle_commands as contact_handler;

#[derive(Args, Clone)]
pub struct ContactArgs {
    #[command(subcommand)]
    pub commands: ContactCommands,
}

#[derive(Clone, Subcommand)]
#[command(subcommand_help_heading = "Contacts")]
pub enum ContactCommands {
    /// Name another participant, importing its key event log when given
    Add {
        #[arg(long, required(true))]
        alias: String,

        #[arg(long)]
        pre: Option<String>,

        /// Key event log bundle exported by the participant
        #[arg(long)]
        kel: Option<PathBuf>,
    },

    List,
}
