use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rst_common::with_tokio::tokio;
use rst_common::with_tracing::tracing_subscriber::{
    self, layer::SubscriberExt, util::SubscriberInitExt,
};

use prople_quorum_cli::commands::aid::{aid_handler, AidArgs};
use prople_quorum_cli::commands::contact::{contact_handler, ContactArgs};
use prople_quorum_cli::commands::message::{message_handler, MessageArgs};
use prople_quorum_cli::commands::multisig::{multisig_handler, MultisigArgs};
use prople_quorum_cli::commands::notice::{notice_handler, NoticeArgs};
use prople_quorum_cli::commands::outbox::{outbox_handler, OutboxArgs};
use prople_quorum_cli::commands::registry::{registry_handler, RegistryArgs};
use prople_quorum_cli::commands::{ContextHandler, GlobalArgs};
use prople_quorum_cli::types::CliError;

#[derive(Parser)]
#[command(name = "quorum")]
#[command(version = "0.1.0")]
#[command(about = "Join and approve multi-signature group events", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Aid(AidArgs),
    Contact(ContactArgs),
    Multisig(MultisigArgs),
    Notice(NoticeArgs),
    Message(MessageArgs),
    Outbox(OutboxArgs),
    Registry(RegistryArgs),
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let ctx = ContextHandler::build(&cli.global)?;

    match cli.commands {
        Commands::Aid(args) => aid_handler(&ctx, args.commands).await,
        Commands::Contact(args) => contact_handler(&ctx, args.commands).await,
        Commands::Multisig(args) => multisig_handler(&ctx, args.commands).await,
        Commands::Notice(args) => notice_handler(&ctx, args.commands).await,
        Commands::Message(args) => message_handler(&ctx, args.commands).await,
        Commands::Outbox(args) => outbox_handler(&ctx, args.commands).await,
        Commands::Registry(args) => registry_handler(&ctx, args.commands).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "{}=info,prople_quorum_cli=info,prople_quorum_core=info,prople_quorum_store=info",
                    env!("CARGO_CRATE_NAME")
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    match dispatch(Cli::parse()).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
