use clap::{Args, Subcommand};

mod handler;

pub use handler::{handle_commands as multisig_handler, threshold};

#[derive(Args, Clone)]
pub struct MultisigArgs {
    #[command(subcommand)]
    pub commands: MultisigCommands,
}

#[derive(Clone, Subcommand)]
#[command(subcommand_help_heading = "Multisig")]
pub enum MultisigCommands {
    /// Confirm pending group proposals until interrupted
    Join {
        /// Seconds to wait for the other members once a proposal is approved
        #[arg(long)]
        timeout: Option<u64>,

        /// Scan the pending notices once and exit
        #[arg(long)]
        once: bool,
    },

    /// Propose a new group identifier to the other members
    Incept {
        /// Local identifier joining the group
        #[arg(long, required(true))]
        alias: String,

        /// Alias of the new group identifier
        #[arg(long, required(true))]
        group: String,

        /// Signing member, repeated once per member
        #[arg(long = "member", required(true))]
        members: Vec<String>,

        /// Rotation member, the signing members when omitted
        #[arg(long = "rotation-member")]
        rotation_members: Vec<String>,

        /// Signing threshold, hex number or JSON list of weights
        #[arg(long)]
        isith: Option<String>,

        /// Next signing threshold, defaults to the signing threshold
        #[arg(long)]
        nsith: Option<String>,
    },
}
