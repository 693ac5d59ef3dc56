use clap::{Args, Subcommand};

mod handler;

pub use handler::handle_commands as registry_handler;

#[derive(Args, Clone)]
pub struct RegistryArgs {
    #[command(subcommand)]
    pub commands: RegistryCommands,
}

#[derive(Clone, Subcommand)]
#[command(subcommand_help_heading = "Registries")]
pub enum RegistryCommands {
    /// List credential registries created by local groups
    List,
}
