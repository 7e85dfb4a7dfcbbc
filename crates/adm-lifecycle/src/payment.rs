//! Ledger wallet collaborator and payment failure outcomes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use adm_core::NanoAmount;

/// A transfer the wallet is asked to dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    /// Destination (the deal's escrow address).
    pub address: String,
    /// Amount in nano units.
    pub amount_nano: NanoAmount,
}

/// Proof that the wallet dispatched a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    /// Hash of the dispatched transaction.
    pub tx_hash: String,
}

/// Errors from a [`LedgerWallet`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    /// The user declined the transfer in their wallet.
    #[error("transfer declined by the wallet user")]
    Declined,

    /// The wallet could not dispatch the transfer.
    #[error("transfer failed: {0}")]
    Failed(String),
}

/// Dispatches ledger transfers on the advertiser's behalf.
#[async_trait]
pub trait LedgerWallet: Send + Sync {
    /// Send `request` and return the transaction hash.
    async fn send(&self, request: &TransferRequest) -> Result<TransferReceipt, TransactionError>;
}

/// Terminal payment outcomes other than confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentFailure {
    /// The ledger's deposit window closed.
    Expired,
    /// The ledger refused the deposit.
    Rejected,
    /// Local polling gave up before a terminal status was seen.
    TimedOut,
}

impl PaymentFailure {
    /// What the user should be told, and what they can do about it.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Expired => {
                "The payment window for this deal has closed. Ask the channel owner to renew the offer before paying again."
            }
            Self::Rejected => {
                "The escrow deposit was rejected by the ledger. Check the amount and address, then contact support if funds left your wallet."
            }
            Self::TimedOut => {
                "Payment confirmation is taking longer than expected. Your transfer may still arrive; reopen the deal later to check its status."
            }
        }
    }
}

impl std::fmt::Display for PaymentFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Expired => "expired",
            Self::Rejected => "rejected",
            Self::TimedOut => "timed out",
        })
    }
}
