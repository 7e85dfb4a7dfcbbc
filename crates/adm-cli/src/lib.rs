//! # adm-cli: Command-Line Client for the Ad Placement Marketplace
//!
//! Provides the `adm` binary on top of `adm-lifecycle` and `adm-client`.
//!
//! ## Subcommands
//!
//! - `adm actions`: Offline policy lookup for a status and role.
//! - `adm show`: Load a deal and print its actions and progress.
//! - `adm transition`: Perform a non-payment action on a deal.
//! - `adm pay`: Record a transfer sent from an external wallet and
//!   follow the escrow deposit until it settles.
//! - `adm watch`: Resume following pending payments.
//! - `adm intents`: List or clear pending payment intents.
//!
//! ```bash
//! adm actions --status AWAITING_PAYMENT --role ADVERTISER
//! adm pay deal-42 --tx-hash 9f2c...
//! adm watch --all
//! ```
//!
//! Handlers return a process exit code. API credentials come from
//! `MARKET_API_URL` and `MARKET_API_TOKEN`; offline commands never read them.

pub mod actions;
pub mod deal;
pub mod intents;
pub mod wallet;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tokio::sync::broadcast::error::RecvError;

use adm_client::{MarketApiConfig, MarketClient};
use adm_core::DealId;
use adm_lifecycle::{
    DealOrchestrator, FileIntentStore, LedgerWallet, WatchConfig, WatchEvent, WatchOutcome,
    WatchSubscription, WatcherRegistry,
};
use adm_state::PolicyConfig;

/// Options shared by every subcommand that touches local session state.
#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
    /// Directory holding pending payment intents
    /// (default: `$ADM_SESSION_DIR`, else `.adm-session`).
    #[arg(long, global = true)]
    pub session_dir: Option<PathBuf>,

    /// Seconds between deposit polls (default: `$ADM_POLL_INTERVAL_SECS`, else 3).
    #[arg(long, global = true)]
    pub poll_interval_secs: Option<u64>,

    /// Seconds before a deposit watch gives up (default: `$ADM_WATCH_TIMEOUT_SECS`, else 600).
    #[arg(long, global = true)]
    pub watch_timeout_secs: Option<u64>,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,
}

impl SessionArgs {
    /// The intent store for this session.
    pub fn intent_store(&self) -> FileIntentStore {
        match &self.session_dir {
            Some(dir) => FileIntentStore::in_session_dir(dir),
            None => FileIntentStore::from_env(),
        }
    }

    /// Watch cadence: flags override the environment.
    pub fn watch_config(&self) -> WatchConfig {
        let mut config = WatchConfig::from_env();
        if let Some(secs) = self.poll_interval_secs.filter(|s| *s > 0) {
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = self.watch_timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
        config
    }
}

/// Everything an online command needs, wired from the environment.
pub struct Session {
    /// HTTP client for the marketplace API.
    pub client: Arc<MarketClient>,
    /// Orchestrator over `client` and the session's intent store.
    pub orchestrator: DealOrchestrator,
}

impl Session {
    /// Connect using `MARKET_*` environment configuration.
    pub fn connect(args: &SessionArgs, wallet: Arc<dyn LedgerWallet>) -> Result<Self> {
        let config = MarketApiConfig::from_env().context("loading marketplace API config")?;
        tracing::debug!(?config, "connecting to marketplace API");
        let client = Arc::new(MarketClient::new(config)?);

        let registry = Arc::new(WatcherRegistry::new(
            client.clone(),
            Arc::new(args.intent_store()),
            args.watch_config(),
        ));
        let orchestrator = DealOrchestrator::new(
            client.clone(),
            client.clone(),
            registry,
            wallet,
            PolicyConfig::from_env(),
        );
        Ok(Self {
            client,
            orchestrator,
        })
    }
}

/// Parse a deal identifier argument.
pub fn parse_deal_id(raw: &str) -> Result<DealId> {
    DealId::new(raw).with_context(|| format!("invalid deal id {raw:?}"))
}

/// Print events for `subscription` until its watch ends, then return how
/// it ended.
pub async fn follow(mut subscription: WatchSubscription, json: bool) -> WatchOutcome {
    let deal_id = subscription.deal_id().clone();
    loop {
        match subscription.events.recv().await {
            Ok(event) => print_event(&deal_id, &event, json),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(deal_id = %deal_id, skipped, "watch events dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }
    let outcome = subscription.outcome().await;
    print_outcome(&deal_id, &outcome, json);
    outcome
}

/// Exit code for a finished watch.
pub fn outcome_exit_code(outcome: &WatchOutcome) -> u8 {
    match outcome {
        WatchOutcome::Confirmed { .. } => 0,
        WatchOutcome::Failed { .. } => 2,
        WatchOutcome::Cancelled => 130,
    }
}

fn print_event(deal_id: &DealId, event: &WatchEvent, json: bool) {
    if json {
        print_json_line(deal_id, event);
        return;
    }
    let line = match event {
        WatchEvent::Progress {
            status,
            current,
            required,
        } => format!("{status:?}: {current}/{required} confirmations"),
        WatchEvent::Underpaid {
            received,
            shortfall: Some(shortfall),
        } => format!("underpaid: received {received} nano, {shortfall} nano short"),
        WatchEvent::Underpaid {
            received,
            shortfall: None,
        } => format!("underpaid: received {received} nano"),
        WatchEvent::Overpaid {
            received,
            excess: Some(excess),
        } => format!("overpaid: received {received} nano, {excess} nano over"),
        WatchEvent::Overpaid {
            received,
            excess: None,
        } => format!("overpaid: received {received} nano"),
        WatchEvent::UnderReview => "deposit is under operator review".to_string(),
        // Terminal events are reported through the outcome.
        WatchEvent::Confirmed { .. }
        | WatchEvent::Expired
        | WatchEvent::Rejected
        | WatchEvent::TimedOut => return,
    };
    println!("[{deal_id}] {line}");
}

fn print_outcome(deal_id: &DealId, outcome: &WatchOutcome, json: bool) {
    if json {
        print_json_line(deal_id, outcome);
        return;
    }
    match outcome {
        WatchOutcome::Confirmed { tx_hash: Some(hash) } => {
            println!("[{deal_id}] payment confirmed (tx {hash})");
        }
        WatchOutcome::Confirmed { tx_hash: None } => println!("[{deal_id}] payment confirmed"),
        WatchOutcome::Failed { failure } => {
            println!("[{deal_id}] payment {failure}: {}", failure.user_message());
        }
        WatchOutcome::Cancelled => {
            println!("[{deal_id}] stopped watching; run `adm watch {deal_id}` to resume");
        }
    }
}

fn print_json_line<T: serde::Serialize>(deal_id: &DealId, value: &T) {
    let line = serde_json::json!({ "dealId": deal_id, "data": value });
    println!("{line}");
}
