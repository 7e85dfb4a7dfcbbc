//! # Deal Subcommands
//!
//! Online commands against a single deal:
//!
//! - `show`: Load the deal, print its progress and offered actions.
//! - `transition`: Perform a non-payment action.
//! - `pay`: Record an externally sent transfer and follow the deposit.
//! - `watch`: Resume following pending payments.
//!
//! Every action is checked against the policy before any request is sent.

use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Args;

use adm_core::Timestamp;
use adm_lifecycle::{
    IntentStore, OrchestratorError, PaymentError, PerformOutcome, TransitionExecutor,
    WatchOutcome,
};
use adm_state::{plan, timeline_steps_for, ActionKind, Deal, PolicyConfig, StepState};

use crate::actions::print_plan;
use crate::wallet::ManualWallet;
use crate::{follow, outcome_exit_code, parse_deal_id, Session, SessionArgs};

/// Arguments for `adm show`.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Deal identifier.
    pub deal_id: String,
}

/// Arguments for `adm transition`.
#[derive(Args, Debug)]
pub struct TransitionArgs {
    /// Deal identifier.
    pub deal_id: String,

    /// Action to perform, e.g. `accept`, `counter-offer`, `cancel`.
    pub action: ActionKind,

    /// Reason sent with the request. Required for rejections, counter-offers
    /// and disputes.
    #[arg(long)]
    pub reason: Option<String>,
}

/// Arguments for `adm pay`.
#[derive(Args, Debug)]
pub struct PayArgs {
    /// Deal identifier.
    pub deal_id: String,

    /// Hash of the transfer sent from an external wallet.
    #[arg(long)]
    pub tx_hash: String,

    /// Record the payment and exit without following the deposit.
    #[arg(long)]
    pub no_wait: bool,
}

/// Arguments for `adm watch`.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Deal to follow. Omit with `--all` to follow every pending payment.
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub deal_id: Option<String>,

    /// Follow every pending payment in the session.
    #[arg(long)]
    pub all: bool,
}

/// Execute `adm show`.
pub async fn run_show(args: &ShowArgs, session: &SessionArgs) -> Result<u8> {
    let deal_id = parse_deal_id(&args.deal_id)?;
    let connected = Session::connect(session, Arc::new(ManualWallet::declining()))?;

    let deal = connected.client.deal(&deal_id).await?;
    if let Err(e) = deal.validate_timeline() {
        tracing::warn!(deal_id = %deal_id, error = %e, "deal timeline failed validation");
    }
    let plan = plan(deal.status, deal.role, &PolicyConfig::from_env());
    let pending = session.intent_store().load(&deal_id)?;

    if session.json {
        let out = serde_json::json!({
            "deal": deal,
            "steps": timeline_steps_for(&deal),
            "plan": plan,
            "pendingIntent": pending,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(0);
    }

    print_deal(&deal, Timestamp::now());
    println!("actions:");
    print_plan(&plan);
    if let Some(intent) = pending {
        println!(
            "pending payment of {} nano to {} since {}",
            intent.amount_nano, intent.address, intent.sent_at
        );
    }
    Ok(0)
}

fn print_deal(deal: &Deal, now: Timestamp) {
    println!("deal {} ({} as {})", deal.id, deal.status, deal.role);
    println!("price: {} nano", deal.price_nano);
    if let Some(deadline) = deal.deadline_at {
        match deal.time_remaining(now) {
            Some(left) if !left.is_zero() => {
                println!("deadline: {deadline} ({}m left)", left.as_secs() / 60);
            }
            _ => println!("deadline: {deadline} (passed)"),
        }
    }
    for step in timeline_steps_for(deal) {
        let marker = match step.state {
            StepState::Done => "x",
            StepState::Current => ">",
            StepState::Upcoming => " ",
        };
        match step.at {
            Some(at) => println!("  [{marker}] {} at {at}", step.status),
            None => println!("  [{marker}] {}", step.status),
        }
    }
}

/// Execute `adm transition`.
pub async fn run_transition(args: &TransitionArgs, session: &SessionArgs) -> Result<u8> {
    if args.action == ActionKind::Pay {
        bail!("use `adm pay {} --tx-hash <hash>` to pay", args.deal_id);
    }
    let deal_id = parse_deal_id(&args.deal_id)?;
    let connected = Session::connect(session, Arc::new(ManualWallet::declining()))?;

    let deal = connected.client.deal(&deal_id).await?;
    match connected
        .orchestrator
        .perform(&deal, args.action, args.reason.clone())
        .await
    {
        Ok(PerformOutcome::Transitioned(updated)) => {
            if session.json {
                println!("{}", serde_json::to_string_pretty(&updated)?);
            } else {
                println!("deal {} is now {}", updated.id, updated.status);
            }
            Ok(0)
        }
        Ok(PerformOutcome::PaymentArmed { .. }) => bail!("unexpected payment for {}", args.action),
        Err(e @ OrchestratorError::PolicyViolation { .. }) => {
            eprintln!("{e}");
            Ok(3)
        }
        Err(e) => Err(e.into()),
    }
}

/// Execute `adm pay`.
pub async fn run_pay(args: &PayArgs, session: &SessionArgs) -> Result<u8> {
    let deal_id = parse_deal_id(&args.deal_id)?;
    let wallet = Arc::new(ManualWallet::with_tx_hash(args.tx_hash.clone()));
    let connected = Session::connect(session, wallet)?;

    let view = connected.orchestrator.open(&deal_id).await?;
    if let Some(watch) = view.watch {
        println!("a payment for deal {deal_id} is already pending; following it");
        return finish_watch(watch, args.no_wait, session.json).await;
    }

    match connected
        .orchestrator
        .perform(&view.deal, ActionKind::Pay, None)
        .await
    {
        Ok(PerformOutcome::PaymentArmed { receipt, watch }) => {
            println!("payment recorded (tx {})", receipt.tx_hash);
            finish_watch(watch, args.no_wait, session.json).await
        }
        Ok(PerformOutcome::Transitioned(_)) => bail!("pay did not arm a payment"),
        Err(OrchestratorError::Payment(PaymentError::AlreadyPending(id))) => {
            eprintln!("a payment for deal {id} is already pending; run `adm watch {id}`");
            Ok(3)
        }
        Err(e @ OrchestratorError::PolicyViolation { .. }) => {
            eprintln!("{e}");
            Ok(3)
        }
        Err(e) => Err(e.into()),
    }
}

async fn finish_watch(
    watch: adm_lifecycle::WatchSubscription,
    no_wait: bool,
    json: bool,
) -> Result<u8> {
    if no_wait {
        println!(
            "run `adm watch {}` to follow the deposit",
            watch.deal_id()
        );
        return Ok(0);
    }
    let outcome = follow(watch, json).await;
    Ok(outcome_exit_code(&outcome))
}

/// Execute `adm watch`.
pub async fn run_watch(args: &WatchArgs, session: &SessionArgs) -> Result<u8> {
    let connected = Session::connect(session, Arc::new(ManualWallet::declining()))?;
    let registry = connected.orchestrator.registry();

    let subscriptions = match &args.deal_id {
        Some(raw) => {
            let deal_id = parse_deal_id(raw)?;
            match registry.resume(&deal_id).await? {
                Some(subscription) => vec![subscription],
                None => {
                    println!("no pending payment for deal {deal_id}");
                    return Ok(0);
                }
            }
        }
        None => registry.resume_pending().await?,
    };
    if subscriptions.is_empty() {
        println!("no pending payments");
        return Ok(0);
    }

    let json = session.json;
    let handles: Vec<_> = subscriptions
        .into_iter()
        .map(|subscription| tokio::spawn(follow(subscription, json)))
        .collect();

    let mut worst = 0;
    for handle in handles {
        let outcome = handle.await.unwrap_or(WatchOutcome::Cancelled);
        worst = worst.max(outcome_exit_code(&outcome));
    }
    Ok(worst)
}
