//! # Deal Orchestrator
//!
//! Ties the pure policy resolver to the backend collaborators. Opening a
//! deal loads it, resolves the viewer's actions, and resumes any pending
//! payment watch. Performing an action re-checks it against the policy
//! before anything touches the network.

use std::sync::Arc;

use thiserror::Error;

use adm_core::DealId;
use adm_state::{find_action, plan, ActionKind, ActionPlan, Deal, DealStatus, PolicyConfig, Role};

use crate::deposit::{DepositSource, DepositStatus, SourceError};
use crate::executor::{TransitionError, TransitionExecutor, TransitionRequest};
use crate::intent::IntentStoreError;
use crate::payment::{LedgerWallet, TransferReceipt};
use crate::registry::{PaymentError, WatchSubscription, WatcherRegistry};

/// Errors surfaced to the user by [`DealOrchestrator`].
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// The action is not offered for this status and role.
    #[error("action {action} is not available to {role} while the deal is {status}")]
    PolicyViolation {
        /// Deal status at the time of the request.
        status: DealStatus,
        /// Viewer role.
        role: Role,
        /// Requested action.
        action: ActionKind,
    },

    /// The action needs a non-empty reason.
    #[error("action {0} requires a reason")]
    ReasonRequired(ActionKind),

    /// The deal changed on the server since it was loaded.
    #[error("deal {0} changed since it was loaded; refresh and retry")]
    Conflict(DealId),

    /// The escrow deposit is already past the point where paying makes sense.
    #[error("escrow deposit for deal {deal_id} is already {status:?}")]
    DepositInProgress {
        /// Deal being paid.
        deal_id: DealId,
        /// Current deposit status.
        status: DepositStatus,
    },

    /// Any other transition failure.
    #[error(transparent)]
    Transition(TransitionError),

    /// Deposit info could not be fetched.
    #[error(transparent)]
    Deposit(#[from] SourceError),

    /// The payment could not be armed.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// The intent store failed while resuming a watch.
    #[error(transparent)]
    Store(#[from] IntentStoreError),
}

impl From<TransitionError> for OrchestratorError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::Conflict(deal_id) => Self::Conflict(deal_id),
            other => Self::Transition(other),
        }
    }
}

/// A deal as opened by the viewer.
#[derive(Debug)]
pub struct DealView {
    /// The deal as loaded.
    pub deal: Deal,
    /// Actions offered to the viewer.
    pub plan: ActionPlan,
    /// Resumed payment watch, when an intent for the deal was pending.
    pub watch: Option<WatchSubscription>,
}

/// Result of a performed action.
#[derive(Debug)]
pub enum PerformOutcome {
    /// The backend moved the deal.
    Transitioned(Deal),
    /// The escrow transfer was dispatched and is being watched.
    PaymentArmed {
        /// Wallet receipt.
        receipt: TransferReceipt,
        /// Watch on the deposit.
        watch: WatchSubscription,
    },
}

/// Entry point for interactive deal flows.
pub struct DealOrchestrator {
    executor: Arc<dyn TransitionExecutor>,
    source: Arc<dyn DepositSource>,
    registry: Arc<WatcherRegistry>,
    wallet: Arc<dyn LedgerWallet>,
    policy: PolicyConfig,
}

impl DealOrchestrator {
    /// Wire up an orchestrator.
    pub fn new(
        executor: Arc<dyn TransitionExecutor>,
        source: Arc<dyn DepositSource>,
        registry: Arc<WatcherRegistry>,
        wallet: Arc<dyn LedgerWallet>,
        policy: PolicyConfig,
    ) -> Self {
        Self {
            executor,
            source,
            registry,
            wallet,
            policy,
        }
    }

    /// The registry watches are started on.
    pub fn registry(&self) -> &Arc<WatcherRegistry> {
        &self.registry
    }

    /// Load a deal, resolve its actions, and resume a pending payment watch.
    pub async fn open(&self, deal_id: &DealId) -> Result<DealView, OrchestratorError> {
        let deal = self.executor.deal(deal_id).await?;
        if let Err(e) = deal.validate_timeline() {
            tracing::warn!(deal_id = %deal_id, error = %e, "deal timeline failed validation");
        }
        let plan = plan(deal.status, deal.role, &self.policy);
        let watch = self.registry.resume(deal_id).await?;
        Ok(DealView { deal, plan, watch })
    }

    /// Perform `kind` on `deal` as its viewer.
    ///
    /// Transport failures are returned as-is and never retried here.
    pub async fn perform(
        &self,
        deal: &Deal,
        kind: ActionKind,
        reason: Option<String>,
    ) -> Result<PerformOutcome, OrchestratorError> {
        let Some(action) = find_action(deal.status, deal.role, &self.policy, kind) else {
            tracing::error!(
                deal_id = %deal.id,
                status = %deal.status,
                role = %deal.role,
                action = %kind,
                "rejected action outside policy"
            );
            return Err(OrchestratorError::PolicyViolation {
                status: deal.status,
                role: deal.role,
                action: kind,
            });
        };

        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        if action.requires_reason && reason.is_none() {
            return Err(OrchestratorError::ReasonRequired(kind));
        }

        let Some(target_status) = action.target_status else {
            return self.pay(deal).await;
        };

        let request = TransitionRequest {
            target_status,
            reason,
        };
        let updated = self.executor.transition(&deal.id, &request).await?;
        tracing::info!(
            deal_id = %deal.id,
            action = %kind,
            from = %deal.status,
            to = %updated.status,
            "deal transitioned"
        );
        Ok(PerformOutcome::Transitioned(updated))
    }

    async fn pay(&self, deal: &Deal) -> Result<PerformOutcome, OrchestratorError> {
        let deposit = self.source.deposit_info(&deal.id).await?;
        if deposit.status != DepositStatus::AwaitingPayment {
            return Err(OrchestratorError::DepositInProgress {
                deal_id: deal.id.clone(),
                status: deposit.status,
            });
        }
        let (receipt, watch) = self
            .registry
            .arm_payment(
                &deal.id,
                &deposit.escrow_address,
                deal.price_nano,
                self.wallet.as_ref(),
            )
            .await?;
        Ok(PerformOutcome::PaymentArmed { receipt, watch })
    }
}
