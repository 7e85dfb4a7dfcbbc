//! # Watcher Registry
//!
//! Owns every running deposit watch in the process and guarantees at most
//! one poller per deal. A second `watch_deposit` for a deal that is already
//! being watched attaches a new subscriber to the existing poller.
//!
//! The registry is also where payments are armed: the intent is persisted,
//! the transfer dispatched, and only then is polling started. If dispatch
//! fails the intent is rolled back.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{broadcast, watch};

use adm_core::{DealId, NanoAmount};

use crate::deposit::DepositSource;
use crate::intent::{blocking, IntentStore, IntentStoreError, PendingIntent};
use crate::payment::{LedgerWallet, TransactionError, TransferReceipt, TransferRequest};
use crate::watcher::{DepositWatch, WatchConfig, WatchEvent, WatchOutcome};

const EVENT_CAPACITY: usize = 64;

/// Errors from arming a payment.
#[derive(Error, Debug)]
pub enum PaymentError {
    /// An earlier payment for the deal is still unresolved.
    #[error("a payment for deal {0} is already pending")]
    AlreadyPending(DealId),

    /// The intent could not be persisted or rolled back.
    #[error(transparent)]
    Store(#[from] IntentStoreError),

    /// The wallet did not dispatch the transfer. The intent was cleared.
    #[error("payment dispatch failed: {0}")]
    Dispatch(#[from] TransactionError),
}

/// A subscriber's view of one deal's watch.
#[derive(Debug)]
pub struct WatchSubscription {
    deal_id: DealId,
    /// Events observed after subscribing.
    pub events: broadcast::Receiver<WatchEvent>,
    outcome: watch::Receiver<Option<WatchOutcome>>,
}

impl WatchSubscription {
    /// Deal being watched.
    pub fn deal_id(&self) -> &DealId {
        &self.deal_id
    }

    /// Wait for the watch to end.
    ///
    /// Resolves immediately if it already has. A poller that vanished
    /// without reporting counts as cancelled.
    pub async fn outcome(&mut self) -> WatchOutcome {
        match self.outcome.wait_for(Option::is_some).await {
            Ok(outcome) => (*outcome).clone().unwrap_or(WatchOutcome::Cancelled),
            Err(_) => WatchOutcome::Cancelled,
        }
    }

    /// The outcome, if the watch has already ended.
    pub fn try_outcome(&self) -> Option<WatchOutcome> {
        (*self.outcome.borrow()).clone()
    }
}

struct ActiveWatch {
    generation: u64,
    cancel: watch::Sender<bool>,
    events: broadcast::Sender<WatchEvent>,
    outcome: watch::Receiver<Option<WatchOutcome>>,
}

impl ActiveWatch {
    fn subscribe(&self, deal_id: &DealId) -> WatchSubscription {
        WatchSubscription {
            deal_id: deal_id.clone(),
            events: self.events.subscribe(),
            outcome: self.outcome.clone(),
        }
    }

    fn is_finished(&self) -> bool {
        self.outcome.borrow().is_some()
    }
}

/// Process-wide set of deposit watches.
pub struct WatcherRegistry {
    source: Arc<dyn DepositSource>,
    store: Arc<dyn IntentStore>,
    config: WatchConfig,
    active: Arc<Mutex<HashMap<DealId, ActiveWatch>>>,
    generation: AtomicU64,
}

impl std::fmt::Debug for WatcherRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherRegistry")
            .field("config", &self.config)
            .field("active", &self.active.lock().len())
            .finish()
    }
}

impl WatcherRegistry {
    /// Create a registry polling `source` and resolving intents in `store`.
    pub fn new(
        source: Arc<dyn DepositSource>,
        store: Arc<dyn IntentStore>,
        config: WatchConfig,
    ) -> Self {
        Self {
            source,
            store,
            config,
            active: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
        }
    }

    /// The intent store backing this registry.
    pub fn store(&self) -> &Arc<dyn IntentStore> {
        &self.store
    }

    /// Watch `deal_id`, or attach to the poller already watching it.
    ///
    /// `expected` is the transfer amount, used to size underpaid and
    /// overpaid notices. Must be called from within a tokio runtime.
    pub fn watch_deposit(&self, deal_id: &DealId, expected: Option<NanoAmount>) -> WatchSubscription {
        let mut active = self.active.lock();
        if let Some(existing) = active.get(deal_id).filter(|w| !w.is_finished()) {
            tracing::debug!(deal_id = %deal_id, "attaching to running deposit watch");
            return existing.subscribe(deal_id);
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (outcome_tx, outcome_rx) = watch::channel(None);

        let entry = ActiveWatch {
            generation,
            cancel: cancel_tx,
            events: events_tx.clone(),
            outcome: outcome_rx,
        };
        let subscription = entry.subscribe(deal_id);
        active.insert(deal_id.clone(), entry);
        drop(active);

        let poller = DepositWatch {
            deal_id: deal_id.clone(),
            expected,
            source: Arc::clone(&self.source),
            store: Arc::clone(&self.store),
            config: self.config,
            events: events_tx,
            cancel: cancel_rx,
        };
        let registry = Arc::clone(&self.active);
        let deal_id = deal_id.clone();
        tokio::spawn(async move {
            let outcome = poller.run().await;
            {
                let mut active = registry.lock();
                if active.get(&deal_id).is_some_and(|w| w.generation == generation) {
                    active.remove(&deal_id);
                }
            }
            let _ = outcome_tx.send(Some(outcome));
        });

        subscription
    }

    /// Resume watching `deal_id` if a payment intent for it is pending.
    ///
    /// Safe to call on every view of the deal: without an intent this does
    /// nothing, and with one it attaches to any running poller.
    pub async fn resume(
        &self,
        deal_id: &DealId,
    ) -> Result<Option<WatchSubscription>, IntentStoreError> {
        let id = deal_id.clone();
        let Some(intent) = blocking(&self.store, move |store| store.load(&id)).await? else {
            return Ok(None);
        };
        if !self.is_active(deal_id) {
            tracing::info!(deal_id = %deal_id, sent_at = %intent.sent_at, "resuming deposit watch from pending intent");
        }
        Ok(Some(self.watch_deposit(deal_id, Some(intent.amount_nano))))
    }

    /// Resume every pending intent in the store.
    pub async fn resume_pending(&self) -> Result<Vec<WatchSubscription>, IntentStoreError> {
        let pending = blocking(&self.store, |store| store.pending()).await?;
        Ok(pending
            .into_iter()
            .map(|intent| self.watch_deposit(&intent.deal_id, Some(intent.amount_nano)))
            .collect())
    }

    /// Record an intent, dispatch the transfer, and start watching.
    ///
    /// Refuses while an earlier intent for the deal is unresolved. If the
    /// wallet fails the intent is cleared and no watch starts.
    pub async fn arm_payment(
        &self,
        deal_id: &DealId,
        address: &str,
        amount_nano: NanoAmount,
        wallet: &dyn LedgerWallet,
    ) -> Result<(TransferReceipt, WatchSubscription), PaymentError> {
        let intent = PendingIntent::escrow_deposit(deal_id.clone(), address, amount_nano);
        let claimed = blocking(&self.store, move |store| store.save_if_absent(&intent)).await?;
        if !claimed {
            return Err(PaymentError::AlreadyPending(deal_id.clone()));
        }
        tracing::info!(deal_id = %deal_id, amount_nano = %amount_nano, "payment intent recorded");

        let request = TransferRequest {
            address: address.to_string(),
            amount_nano,
        };
        let receipt = match wallet.send(&request).await {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::warn!(deal_id = %deal_id, error = %e, "payment dispatch failed, clearing intent");
                let id = deal_id.clone();
                blocking(&self.store, move |store| store.clear(&id)).await?;
                return Err(PaymentError::Dispatch(e));
            }
        };
        tracing::info!(deal_id = %deal_id, tx_hash = %receipt.tx_hash, "payment dispatched");

        let subscription = self.watch_deposit(deal_id, Some(amount_nano));
        Ok((receipt, subscription))
    }

    /// Stop watching `deal_id`. The pending intent stays in the store.
    ///
    /// Returns whether a watch was running.
    pub fn cancel(&self, deal_id: &DealId) -> bool {
        match self.active.lock().remove(deal_id) {
            Some(watch) => {
                let _ = watch.cancel.send(true);
                true
            }
            None => false,
        }
    }

    /// Whether a poller is running for `deal_id`.
    pub fn is_active(&self, deal_id: &DealId) -> bool {
        self.active
            .lock()
            .get(deal_id)
            .is_some_and(|w| !w.is_finished())
    }

    /// Number of running pollers.
    pub fn active_count(&self) -> usize {
        self.active.lock().values().filter(|w| !w.is_finished()).count()
    }
}

impl Drop for WatcherRegistry {
    fn drop(&mut self) {
        for (_, watch) in self.active.lock().drain() {
            let _ = watch.cancel.send(true);
        }
    }
}
