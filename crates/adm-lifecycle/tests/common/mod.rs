//! Scripted collaborators shared by the lifecycle integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use adm_core::{DealId, NanoAmount, Timestamp};
use adm_lifecycle::{
    DepositInfo, DepositSource, DepositStatus, IntentStore, LedgerWallet, MemoryIntentStore,
    PendingIntent, SourceError, TransactionError, TransferReceipt, TransferRequest,
    TransitionError, TransitionExecutor, TransitionRequest,
};
use adm_state::{Deal, DealStatus, Role};

pub const ESCROW: &str = "EQ-escrow-deal-3";
pub const PRICE: u64 = 1_500_000_000;

pub fn deal_id(id: &str) -> DealId {
    DealId::new(id).unwrap()
}

pub fn deposit(status: DepositStatus, current: u32, required: u32) -> DepositInfo {
    DepositInfo {
        escrow_address: ESCROW.into(),
        amount_nano: NanoAmount::new(if status == DepositStatus::AwaitingPayment { 0 } else { PRICE }),
        status,
        current_confirmations: current,
        required_confirmations: required,
        tx_hash: (status != DepositStatus::AwaitingPayment).then(|| "tx-abc".to_string()),
        expires_at: None,
    }
}

pub fn pending_intent(id: &str) -> PendingIntent {
    PendingIntent {
        kind: adm_lifecycle::IntentType::EscrowDeposit,
        deal_id: deal_id(id),
        sent_at: Timestamp::now(),
        address: ESCROW.into(),
        amount_nano: NanoAmount::new(PRICE),
    }
}

/// Plays back a fixed sequence of responses, repeating the last one.
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<DepositInfo, SourceError>>>,
    last: Mutex<Option<Result<DepositInfo, SourceError>>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<DepositInfo, SourceError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn statuses(statuses: &[DepositStatus]) -> Arc<Self> {
        Self::new(statuses.iter().map(|s| Ok(deposit(*s, 0, 2))).collect())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DepositSource for ScriptedSource {
    async fn deposit_info(&self, _deal_id: &DealId) -> Result<DepositInfo, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front();
        match next {
            Some(step) => {
                *self.last.lock() = Some(step.clone());
                step
            }
            None => self
                .last
                .lock()
                .clone()
                .unwrap_or_else(|| Err(SourceError::Transport("empty script".into()))),
        }
    }
}

/// Wallet that records calls and whether an intent existed at send time.
pub struct RecordingWallet {
    store: Arc<MemoryIntentStore>,
    fail: Option<TransactionError>,
    pub calls: AtomicUsize,
    pub intent_seen_at_send: Mutex<Option<bool>>,
}

impl RecordingWallet {
    pub fn ok(store: Arc<MemoryIntentStore>) -> Arc<Self> {
        Arc::new(Self {
            store,
            fail: None,
            calls: AtomicUsize::new(0),
            intent_seen_at_send: Mutex::new(None),
        })
    }

    pub fn failing(store: Arc<MemoryIntentStore>, error: TransactionError) -> Arc<Self> {
        Arc::new(Self {
            store,
            fail: Some(error),
            calls: AtomicUsize::new(0),
            intent_seen_at_send: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerWallet for RecordingWallet {
    async fn send(&self, request: &TransferRequest) -> Result<TransferReceipt, TransactionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let seen = self
            .store
            .pending()
            .map(|p| p.iter().any(|i| i.address == request.address))
            .unwrap_or(false);
        *self.intent_seen_at_send.lock() = Some(seen);
        match &self.fail {
            Some(e) => Err(e.clone()),
            None => Ok(TransferReceipt {
                tx_hash: "tx-abc".into(),
            }),
        }
    }
}

/// Executor serving one deal and a scripted transition response.
pub struct FakeExecutor {
    pub deal: Deal,
    pub transition_result: Mutex<Option<Result<Deal, TransitionError>>>,
    pub transitions: Mutex<Vec<TransitionRequest>>,
}

impl FakeExecutor {
    pub fn new(deal: Deal) -> Arc<Self> {
        Arc::new(Self {
            deal,
            transition_result: Mutex::new(None),
            transitions: Mutex::new(Vec::new()),
        })
    }

    pub fn respond_with(&self, result: Result<Deal, TransitionError>) {
        *self.transition_result.lock() = Some(result);
    }

    pub fn transition_calls(&self) -> usize {
        self.transitions.lock().len()
    }
}

#[async_trait]
impl TransitionExecutor for FakeExecutor {
    async fn deal(&self, deal_id: &DealId) -> Result<Deal, TransitionError> {
        if *deal_id == self.deal.id {
            Ok(self.deal.clone())
        } else {
            Err(TransitionError::NotFound(deal_id.clone()))
        }
    }

    async fn transition(
        &self,
        _deal_id: &DealId,
        request: &TransitionRequest,
    ) -> Result<Deal, TransitionError> {
        self.transitions.lock().push(request.clone());
        self.transition_result
            .lock()
            .clone()
            .unwrap_or_else(|| Err(TransitionError::Transport("no response scripted".into())))
    }
}

/// A deal in `status` viewed as `role`, with a timeline that replays.
pub fn deal_in(id: &str, status: DealStatus, role: Role) -> Deal {
    use adm_state::Actor;
    let mut deal = Deal::create(
        deal_id(id),
        role,
        NanoAmount::new(PRICE),
        DealStatus::OfferPending,
        Timestamp::parse("2026-10-16T10:00:00Z").unwrap(),
    )
    .unwrap();
    let path = [
        (DealStatus::Accepted, Actor::Owner),
        (DealStatus::AwaitingPayment, Actor::System),
        (DealStatus::Funded, Actor::System),
        (DealStatus::CreativeSubmitted, Actor::Owner),
    ];
    for (to, actor) in path {
        if deal.status == status {
            break;
        }
        deal.try_transition(to, actor, None, Timestamp::parse("2026-10-16T11:00:00Z").unwrap())
            .unwrap();
    }
    assert_eq!(deal.status, status, "fixture path does not reach {status}");
    deal
}
