use std::path::PathBuf;

use clap::{Args, Subcommand};

mod handler;

pub use handler::handle_commands as aid_handler;

#[derive(Args, Clone)]
pub struct AidArgs {
    #[command(subcommand)]
    pub commands: AidCommands,
}

#[derive(Clone, Subcommand)]
#[command(subcommand_help_heading = "Identifiers")]
pub enum AidCommands {
    /// Create a local single key identifier
    Add {
        #[arg(long, required(true))]
        alias: String,
    },

    /// Rotate a local identifier to its committed next key
    Rotate {
        #[arg(long, required(true))]
        alias: String,
    },

    /// List local and group identifiers
    List,

    /// Signing and rotation members of a group identifier
    Members {
        #[arg(long, required(true))]
        alias: String,
    },

    /// Endpoint roles authorized for an identifier
    Roles {
        #[arg(long, required(true))]
        alias: String,
    },

    /// Write the key event log of an identifier to a bundle file
    Export {
        #[arg(long, required(true))]
        alias: String,

        #[arg(long, required(true))]
        out: PathBuf,
    },
}
