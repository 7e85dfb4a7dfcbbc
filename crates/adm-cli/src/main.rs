//! # adm CLI entry point
//!
//! Parses command-line arguments, initializes tracing, and dispatches to
//! subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use adm_cli::actions::{run_actions, ActionsArgs};
use adm_cli::deal::{
    run_pay, run_show, run_transition, run_watch, PayArgs, ShowArgs, TransitionArgs, WatchArgs,
};
use adm_cli::intents::{run_intents, IntentsArgs};
use adm_cli::SessionArgs;

/// Ad placement marketplace client.
///
/// Inspects the actions offered on a deal, performs transitions, records
/// escrow payments, and follows deposits until they confirm.
#[derive(Parser, Debug)]
#[command(name = "adm", version, about, long_about = None)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(flatten)]
    session: SessionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show which actions a role is offered at a status (offline).
    Actions(ActionsArgs),

    /// Load a deal and print its progress and offered actions.
    Show(ShowArgs),

    /// Perform a non-payment action on a deal.
    Transition(TransitionArgs),

    /// Record an escrow transfer sent from an external wallet and follow it.
    Pay(PayArgs),

    /// Resume following pending payments.
    Watch(WatchArgs),

    /// List or clear pending payment intents.
    Intents(IntentsArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG overrides the default level.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let session = &cli.session;
    let result = match &cli.command {
        Commands::Actions(args) => run_actions(args, session.json),
        Commands::Show(args) => run_show(args, session).await,
        Commands::Transition(args) => run_transition(args, session).await,
        Commands::Pay(args) => run_pay(args, session).await,
        Commands::Watch(args) => run_watch(args, session).await,
        Commands::Intents(args) => run_intents(args, session),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
