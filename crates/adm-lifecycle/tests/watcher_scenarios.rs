//! # Deposit Watcher Scenarios
//!
//! Drives the registry against scripted deposit sources on a paused clock,
//! so interval ticks and the wall-clock timeout are deterministic.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::TryRecvError;

use adm_core::NanoAmount;
use adm_lifecycle::{
    DepositStatus, IntentStore, MemoryIntentStore, PaymentError, PaymentFailure, SourceError,
    TransactionError, WatchConfig, WatchEvent, WatchOutcome, WatcherRegistry,
};

use common::{deal_id, deposit, pending_intent, RecordingWallet, ScriptedSource, ESCROW, PRICE};

fn config() -> WatchConfig {
    WatchConfig {
        poll_interval: Duration::from_secs(3),
        timeout: Duration::from_secs(10),
    }
}

fn registry(source: Arc<ScriptedSource>, store: Arc<MemoryIntentStore>) -> WatcherRegistry {
    WatcherRegistry::new(source, store, config())
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<WatchEvent>) -> Vec<WatchEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return events,
        }
    }
}

#[tokio::test(start_paused = true)]
async fn confirmation_after_progress_emits_one_confirmed() {
    let source = ScriptedSource::new(vec![
        Ok(deposit(DepositStatus::TxDetected, 0, 2)),
        Ok(deposit(DepositStatus::Confirming, 1, 2)),
        Ok(deposit(DepositStatus::Confirmed, 2, 2)),
    ]);
    let store = Arc::new(MemoryIntentStore::new());
    store.save(&pending_intent("deal-3")).unwrap();
    let registry = registry(source.clone(), store.clone());

    let mut sub = registry.watch_deposit(&deal_id("deal-3"), Some(NanoAmount::new(PRICE)));
    let outcome = sub.outcome().await;

    assert_eq!(
        outcome,
        WatchOutcome::Confirmed {
            tx_hash: Some("tx-abc".into())
        }
    );
    let events = drain(&mut sub.events);
    assert_eq!(
        events,
        vec![
            WatchEvent::Progress {
                status: DepositStatus::TxDetected,
                current: 0,
                required: 2
            },
            WatchEvent::Progress {
                status: DepositStatus::Confirming,
                current: 1,
                required: 2
            },
            WatchEvent::Confirmed {
                tx_hash: Some("tx-abc".into())
            },
        ]
    );
    assert_eq!(store.load(&deal_id("deal-3")).unwrap(), None);
    assert_eq!(source.calls(), 3);
    assert!(!registry.is_active(&deal_id("deal-3")));
}

#[tokio::test(start_paused = true)]
async fn awaiting_payment_past_timeout_times_out() {
    let source = ScriptedSource::statuses(&[DepositStatus::AwaitingPayment]);
    let store = Arc::new(MemoryIntentStore::new());
    store.save(&pending_intent("deal-3")).unwrap();
    let registry = registry(source.clone(), store.clone());

    let mut sub = registry.watch_deposit(&deal_id("deal-3"), None);
    let outcome = sub.outcome().await;

    assert_eq!(
        outcome,
        WatchOutcome::Failed {
            failure: PaymentFailure::TimedOut
        }
    );
    assert_eq!(drain(&mut sub.events), vec![WatchEvent::TimedOut]);
    assert_eq!(store.load(&deal_id("deal-3")).unwrap(), None);

    // Ticks at 0s, 3s, 6s, 9s; the deadline fires at 10s.
    let polls = source.calls();
    assert_eq!(polls, 4);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(source.calls(), polls);
    assert!(drain(&mut sub.events).is_empty());
}

#[tokio::test(start_paused = true)]
async fn expired_deposit_stops_polling() {
    let source = ScriptedSource::statuses(&[DepositStatus::Expired]);
    let store = Arc::new(MemoryIntentStore::new());
    store.save(&pending_intent("deal-3")).unwrap();
    let registry = registry(source.clone(), store.clone());

    let mut sub = registry.watch_deposit(&deal_id("deal-3"), None);
    assert_eq!(
        sub.outcome().await,
        WatchOutcome::Failed {
            failure: PaymentFailure::Expired
        }
    );
    assert_eq!(drain(&mut sub.events), vec![WatchEvent::Expired]);
    assert_eq!(store.load(&deal_id("deal-3")).unwrap(), None);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(source.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn rejected_deposit_fails_with_rejected() {
    let source = ScriptedSource::statuses(&[DepositStatus::Rejected]);
    let store = Arc::new(MemoryIntentStore::new());
    let registry = registry(source, store);

    let mut sub = registry.watch_deposit(&deal_id("deal-3"), None);
    assert_eq!(
        sub.outcome().await,
        WatchOutcome::Failed {
            failure: PaymentFailure::Rejected
        }
    );
}

#[tokio::test(start_paused = true)]
async fn pending_intent_resumes_without_paying() {
    let source = ScriptedSource::statuses(&[
        DepositStatus::AwaitingPayment,
        DepositStatus::Confirmed,
    ]);
    let store = Arc::new(MemoryIntentStore::new());
    store.save(&pending_intent("deal-3")).unwrap();
    let wallet = RecordingWallet::ok(store.clone());
    let registry = registry(source.clone(), store.clone());

    let mut sub = registry
        .resume(&deal_id("deal-3"))
        .await
        .unwrap()
        .expect("intent should resume a watch");
    assert!(matches!(sub.outcome().await, WatchOutcome::Confirmed { .. }));
    assert_eq!(wallet.calls(), 0);
    assert_eq!(source.calls(), 2);
    assert_eq!(store.load(&deal_id("deal-3")).unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn resume_without_intent_does_nothing() {
    let source = ScriptedSource::statuses(&[DepositStatus::Confirmed]);
    let registry = registry(source.clone(), Arc::new(MemoryIntentStore::new()));

    assert!(registry.resume(&deal_id("deal-3")).await.unwrap().is_none());
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(source.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn second_watch_attaches_to_the_running_poller() {
    let source = ScriptedSource::statuses(&[
        DepositStatus::AwaitingPayment,
        DepositStatus::AwaitingPayment,
        DepositStatus::Confirmed,
    ]);
    let registry = registry(source.clone(), Arc::new(MemoryIntentStore::new()));

    let mut first = registry.watch_deposit(&deal_id("deal-3"), None);
    let mut second = registry.watch_deposit(&deal_id("deal-3"), None);
    assert_eq!(registry.active_count(), 1);

    let a = first.outcome().await;
    let b = second.outcome().await;
    assert_eq!(a, b);
    assert_eq!(source.calls(), 3);
    assert_eq!(registry.active_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn watches_for_different_deals_run_independently() {
    let source = ScriptedSource::statuses(&[DepositStatus::AwaitingPayment]);
    let registry = registry(source, Arc::new(MemoryIntentStore::new()));

    let _a = registry.watch_deposit(&deal_id("deal-3"), None);
    let _b = registry.watch_deposit(&deal_id("deal-4"), None);
    assert_eq!(registry.active_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn cancel_leaves_intent_in_place() {
    let source = ScriptedSource::statuses(&[DepositStatus::AwaitingPayment]);
    let store = Arc::new(MemoryIntentStore::new());
    store.save(&pending_intent("deal-3")).unwrap();
    let registry = registry(source.clone(), store.clone());

    let mut sub = registry.watch_deposit(&deal_id("deal-3"), None);
    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(source.calls() >= 1);

    assert!(registry.cancel(&deal_id("deal-3")));
    assert_eq!(sub.outcome().await, WatchOutcome::Cancelled);
    assert!(store.load(&deal_id("deal-3")).unwrap().is_some());
    assert!(!registry.cancel(&deal_id("deal-3")));

    let polls = source.calls();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(source.calls(), polls);
}

#[tokio::test(start_paused = true)]
async fn failed_poll_is_retried_next_tick() {
    let source = ScriptedSource::new(vec![
        Err(SourceError::Transport("connection reset".into())),
        Err(SourceError::Api {
            status: 503,
            body: "unavailable".into(),
        }),
        Ok(deposit(DepositStatus::Confirmed, 2, 2)),
    ]);
    let registry = registry(source.clone(), Arc::new(MemoryIntentStore::new()));

    let mut sub = registry.watch_deposit(&deal_id("deal-3"), None);
    assert!(matches!(sub.outcome().await, WatchOutcome::Confirmed { .. }));
    assert_eq!(source.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn repeated_statuses_are_reported_once() {
    let source = ScriptedSource::new(vec![
        Ok(deposit(DepositStatus::Overpaid, 0, 2)),
        Ok(deposit(DepositStatus::Overpaid, 0, 2)),
        Ok(deposit(DepositStatus::AwaitingOperatorReview, 0, 2)),
        Ok(deposit(DepositStatus::AwaitingOperatorReview, 0, 2)),
        Ok(deposit(DepositStatus::Confirmed, 2, 2)),
    ]);
    let registry = WatcherRegistry::new(
        source,
        Arc::new(MemoryIntentStore::new()),
        WatchConfig {
            poll_interval: Duration::from_secs(3),
            timeout: Duration::from_secs(60),
        },
    );

    let mut sub = registry.watch_deposit(&deal_id("deal-3"), Some(NanoAmount::new(PRICE - 100)));
    sub.outcome().await;
    let events = drain(&mut sub.events);
    assert_eq!(
        events,
        vec![
            WatchEvent::Overpaid {
                received: NanoAmount::new(PRICE),
                excess: Some(NanoAmount::new(100)),
            },
            WatchEvent::UnderReview,
            WatchEvent::Confirmed {
                tx_hash: Some("tx-abc".into())
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn changed_underpaid_amount_is_reported_again() {
    let underpaid = |received: u64| {
        let mut info = deposit(DepositStatus::Underpaid, 0, 2);
        info.amount_nano = NanoAmount::new(received);
        Ok(info)
    };
    let source = ScriptedSource::new(vec![
        underpaid(600),
        underpaid(600),
        underpaid(900),
        Ok(deposit(DepositStatus::Confirmed, 2, 2)),
    ]);
    let registry = registry(source, Arc::new(MemoryIntentStore::new()));

    let mut sub = registry.watch_deposit(&deal_id("deal-3"), Some(NanoAmount::new(1_000)));
    assert!(matches!(sub.outcome().await, WatchOutcome::Confirmed { .. }));
    assert_eq!(
        drain(&mut sub.events),
        vec![
            WatchEvent::Underpaid {
                received: NanoAmount::new(600),
                shortfall: Some(NanoAmount::new(400)),
            },
            WatchEvent::Underpaid {
                received: NanoAmount::new(900),
                shortfall: Some(NanoAmount::new(100)),
            },
            WatchEvent::Confirmed {
                tx_hash: Some("tx-abc".into())
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn arm_payment_persists_intent_before_dispatch() {
    let source = ScriptedSource::statuses(&[DepositStatus::Confirmed]);
    let store = Arc::new(MemoryIntentStore::new());
    let wallet = RecordingWallet::ok(store.clone());
    let registry = registry(source, store.clone());

    let (receipt, mut sub) = registry
        .arm_payment(&deal_id("deal-3"), ESCROW, NanoAmount::new(PRICE), wallet.as_ref())
        .await
        .unwrap();
    assert_eq!(receipt.tx_hash, "tx-abc");
    assert_eq!(*wallet.intent_seen_at_send.lock(), Some(true));

    assert!(matches!(sub.outcome().await, WatchOutcome::Confirmed { .. }));
    assert_eq!(store.load(&deal_id("deal-3")).unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn dispatch_failure_rolls_back_intent() {
    let source = ScriptedSource::statuses(&[DepositStatus::AwaitingPayment]);
    let store = Arc::new(MemoryIntentStore::new());
    let wallet = RecordingWallet::failing(store.clone(), TransactionError::Declined);
    let registry = registry(source.clone(), store.clone());

    let err = registry
        .arm_payment(&deal_id("deal-3"), ESCROW, NanoAmount::new(PRICE), wallet.as_ref())
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Dispatch(TransactionError::Declined)));
    assert_eq!(*wallet.intent_seen_at_send.lock(), Some(true));
    assert_eq!(store.load(&deal_id("deal-3")).unwrap(), None);
    assert!(!registry.is_active(&deal_id("deal-3")));
    assert_eq!(source.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn arm_payment_refuses_while_intent_pending() {
    let source = ScriptedSource::statuses(&[DepositStatus::AwaitingPayment]);
    let store = Arc::new(MemoryIntentStore::new());
    store.save(&pending_intent("deal-3")).unwrap();
    let wallet = RecordingWallet::ok(store.clone());
    let registry = registry(source, store);

    let err = registry
        .arm_payment(&deal_id("deal-3"), ESCROW, NanoAmount::new(PRICE), wallet.as_ref())
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::AlreadyPending(_)));
    assert_eq!(wallet.calls(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_payments_for_one_deal_send_once() {
    // The deposit never settles, so the first intent stays pending.
    let source = ScriptedSource::statuses(&[DepositStatus::AwaitingPayment]);
    let store = Arc::new(MemoryIntentStore::new());
    let wallet = RecordingWallet::ok(store.clone());
    let registry = Arc::new(registry(source, store.clone()));

    let attempts: Vec<_> = (0..8)
        .map(|_| {
            let registry = registry.clone();
            let wallet = wallet.clone();
            tokio::spawn(async move {
                registry
                    .arm_payment(&deal_id("deal-3"), ESCROW, NanoAmount::new(PRICE), wallet.as_ref())
                    .await
                    .map(|_| ())
            })
        })
        .collect();

    let mut armed = 0;
    for attempt in attempts {
        match attempt.await.unwrap() {
            Ok(()) => armed += 1,
            Err(PaymentError::AlreadyPending(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(armed, 1);
    assert_eq!(wallet.calls(), 1);
}
