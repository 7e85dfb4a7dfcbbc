//! # Intents Subcommand
//!
//! Inspect or discard pending payment intents in the session directory.
//! Works offline.

use anyhow::Result;
use clap::{Args, Subcommand};

use adm_lifecycle::IntentStore;

use crate::{parse_deal_id, SessionArgs};

/// Arguments for `adm intents`.
#[derive(Args, Debug)]
pub struct IntentsArgs {
    #[command(subcommand)]
    pub command: IntentsCommand,
}

/// Intent subcommands.
#[derive(Subcommand, Debug)]
pub enum IntentsCommand {
    /// List pending payment intents.
    List,

    /// Forget the pending intent for a deal. The deposit itself is untouched.
    Clear {
        /// Deal identifier.
        deal_id: String,
    },
}

/// Execute `adm intents`.
pub fn run_intents(args: &IntentsArgs, session: &SessionArgs) -> Result<u8> {
    let store = session.intent_store();
    match &args.command {
        IntentsCommand::List => {
            let pending = store.pending()?;
            if session.json {
                println!("{}", serde_json::to_string_pretty(&pending)?);
                return Ok(0);
            }
            if pending.is_empty() {
                println!("no pending payments ({})", store.path().display());
                return Ok(0);
            }
            for intent in pending {
                println!(
                    "{}  {} nano -> {}  sent {}",
                    intent.deal_id, intent.amount_nano, intent.address, intent.sent_at
                );
            }
            Ok(0)
        }
        IntentsCommand::Clear { deal_id } => {
            let deal_id = parse_deal_id(deal_id)?;
            if store.load(&deal_id)?.is_none() {
                println!("no pending payment for deal {deal_id}");
                return Ok(0);
            }
            store.clear(&deal_id)?;
            tracing::info!(deal_id = %deal_id, "payment intent cleared by user");
            println!("cleared pending payment for deal {deal_id}");
            Ok(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adm_core::NanoAmount;
    use adm_lifecycle::PendingIntent;

    fn session_in(dir: &std::path::Path) -> SessionArgs {
        SessionArgs {
            session_dir: Some(dir.to_path_buf()),
            ..Default::default()
        }
    }

    #[test]
    fn clear_removes_only_the_named_deal() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_in(dir.path());
        let store = session.intent_store();
        for id in ["deal-1", "deal-2"] {
            store
                .save(&PendingIntent::escrow_deposit(
                    parse_deal_id(id).unwrap(),
                    "EQ-escrow",
                    NanoAmount::new(10),
                ))
                .unwrap();
        }

        let args = IntentsArgs {
            command: IntentsCommand::Clear {
                deal_id: "deal-1".into(),
            },
        };
        assert_eq!(run_intents(&args, &session).unwrap(), 0);

        let remaining: Vec<_> = store
            .pending()
            .unwrap()
            .into_iter()
            .map(|i| i.deal_id.to_string())
            .collect();
        assert_eq!(remaining, vec!["deal-2"]);
    }

    #[test]
    fn list_on_empty_session_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let args = IntentsArgs {
            command: IntentsCommand::List,
        };
        assert_eq!(run_intents(&args, &session_in(dir.path())).unwrap(), 0);
    }
}
