//! Manual wallet: the user pays from an external wallet app and hands the
//! resulting transaction hash to `adm pay`.

use async_trait::async_trait;

use adm_lifecycle::{LedgerWallet, TransactionError, TransferReceipt, TransferRequest};

/// A [`LedgerWallet`] that reports a transfer the user already sent.
#[derive(Debug, Clone, Default)]
pub struct ManualWallet {
    tx_hash: Option<String>,
}

impl ManualWallet {
    /// Wallet reporting `tx_hash` for the next transfer.
    pub fn with_tx_hash(tx_hash: impl Into<String>) -> Self {
        Self {
            tx_hash: Some(tx_hash.into()),
        }
    }

    /// Wallet that declines every transfer. Used by commands that never pay.
    pub fn declining() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerWallet for ManualWallet {
    async fn send(&self, request: &TransferRequest) -> Result<TransferReceipt, TransactionError> {
        let Some(tx_hash) = self.tx_hash.as_deref().map(str::trim) else {
            return Err(TransactionError::Declined);
        };
        if tx_hash.is_empty() {
            return Err(TransactionError::Failed("empty transaction hash".into()));
        }
        tracing::info!(
            address = %request.address,
            amount_nano = %request.amount_nano,
            tx_hash,
            "recording externally sent transfer"
        );
        Ok(TransferReceipt {
            tx_hash: tx_hash.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adm_core::NanoAmount;

    fn request() -> TransferRequest {
        TransferRequest {
            address: "EQ-escrow".into(),
            amount_nano: NanoAmount::new(1_000),
        }
    }

    #[tokio::test]
    async fn reports_supplied_hash() {
        let receipt = ManualWallet::with_tx_hash(" tx-1 ")
            .send(&request())
            .await
            .unwrap();
        assert_eq!(receipt.tx_hash, "tx-1");
    }

    #[tokio::test]
    async fn declining_wallet_declines() {
        assert_eq!(
            ManualWallet::declining().send(&request()).await,
            Err(TransactionError::Declined)
        );
    }

    #[tokio::test]
    async fn blank_hash_fails() {
        let err = ManualWallet::with_tx_hash("  ")
            .send(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, TransactionError::Failed(_)));
    }
}
