//! Escrow deposit projection and the [`DepositSource`] collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use adm_core::{DealId, NanoAmount, Timestamp};

/// Ledger-side status of an escrow deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DepositStatus {
    /// No transfer seen yet.
    AwaitingPayment,
    /// Transfer seen in the mempool or an unconfirmed block.
    TxDetected,
    /// Accumulating confirmations.
    Confirming,
    /// Enough confirmations; the deal will be funded.
    Confirmed,
    /// Transfer below the expected amount.
    Underpaid,
    /// Transfer above the expected amount.
    Overpaid,
    /// An operator must look at the deposit.
    AwaitingOperatorReview,
    /// The deposit window closed.
    Expired,
    /// The deposit was refused.
    Rejected,
    /// Unrecognized future status. Treated as non-terminal.
    #[serde(other)]
    Unknown,
}

impl DepositStatus {
    /// Whether polling stops at this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Expired | Self::Rejected)
    }
}

/// Escrow deposit state as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositInfo {
    /// Address the advertiser must pay into.
    pub escrow_address: String,
    /// Amount observed so far.
    pub amount_nano: NanoAmount,
    /// Ledger-side status.
    pub status: DepositStatus,
    /// Confirmations seen.
    #[serde(default)]
    pub current_confirmations: u32,
    /// Confirmations needed for `CONFIRMED`.
    #[serde(default)]
    pub required_confirmations: u32,
    /// Hash of the detected transfer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    /// When the deposit window closes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
}

impl DepositInfo {
    /// How much is still missing relative to `expected`, if anything.
    pub fn amount_shortfall(&self, expected: NanoAmount) -> Option<NanoAmount> {
        expected
            .checked_sub(self.amount_nano)
            .filter(|missing| !missing.is_zero())
    }

    /// How much was paid beyond `expected`, if anything.
    pub fn amount_excess(&self, expected: NanoAmount) -> Option<NanoAmount> {
        self.amount_nano
            .checked_sub(expected)
            .filter(|excess| !excess.is_zero())
    }
}

/// Errors from a [`DepositSource`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// No deposit exists for the deal.
    #[error("no deposit found for deal {0}")]
    NotFound(DealId),

    /// The request did not complete.
    #[error("deposit request failed: {0}")]
    Transport(String),

    /// The backend answered with an error status.
    #[error("deposit endpoint returned {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The response body could not be decoded.
    #[error("failed to decode deposit info: {0}")]
    Decode(String),
}

/// Fetches the current escrow deposit state for a deal.
#[async_trait]
pub trait DepositSource: Send + Sync {
    /// Current deposit info for `deal_id`.
    async fn deposit_info(&self, deal_id: &DealId) -> Result<DepositInfo, SourceError>;
}
