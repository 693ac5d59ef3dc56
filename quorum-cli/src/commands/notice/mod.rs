use clap::{Args, Subcommand};

mod handler;

pub use handler::handle_commands as notice_handler;

#[derive(Args, Clone)]
pub struct NoticeArgs {
    #[command(subcommand)]
    pub commands: NoticeCommands,
}

#[derive(Clone, Subcommand)]
#[command(subcommand_help_heading = "Notices")]
pub enum NoticeCommands {
    /// List pending notices
    List,

    /// Remove a notice without handling it
    Remove {
        #[arg(long, required(true))]
        id: String,
    },
}
