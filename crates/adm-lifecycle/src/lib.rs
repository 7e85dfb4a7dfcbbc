//! # adm-lifecycle: Deal Orchestration and Escrow Watching
//!
//! The asynchronous half of the marketplace client. Collaborators are
//! traits so the HTTP client, a wallet, or test doubles can be plugged in:
//!
//! - [`DepositSource`]: reads escrow deposit state.
//! - [`TransitionExecutor`]: reads deals and requests transitions.
//! - [`LedgerWallet`]: dispatches ledger transfers.
//! - [`IntentStore`]: persists pending payment intents.
//!
//! [`WatcherRegistry`] runs at most one deposit poller per deal and arms
//! payments. [`DealOrchestrator`] checks requested actions against the
//! policy resolver before calling any collaborator.
//!
//! ## Payment Flow
//!
//! ```text
//! pay ─▶ save intent ─▶ wallet.send ─▶ watch_deposit ─▶ Confirmed ─▶ clear intent
//!                            │ error
//!                            ▼
//!                       clear intent
//! ```

pub mod deposit;
pub mod executor;
pub mod intent;
pub mod orchestrator;
pub mod payment;
pub mod registry;
pub mod watcher;

pub use deposit::{DepositInfo, DepositSource, DepositStatus, SourceError};
pub use executor::{TransitionError, TransitionExecutor, TransitionRequest};
pub use intent::{
    FileIntentStore, IntentStore, IntentStoreError, IntentType, MemoryIntentStore, PendingIntent,
};
pub use orchestrator::{DealOrchestrator, DealView, OrchestratorError, PerformOutcome};
pub use payment::{
    LedgerWallet, PaymentFailure, TransactionError, TransferReceipt, TransferRequest,
};
pub use registry::{PaymentError, WatchSubscription, WatcherRegistry};
pub use watcher::{WatchConfig, WatchEvent, WatchOutcome};
