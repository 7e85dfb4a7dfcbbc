//! Typed client for escrow deposit state.
//!
//! `GET /api/v1/deals/{id}/deposit` returns the deal's escrow address,
//! the amount observed, and the ledger-side deposit status. Each call is a
//! single request; a failed poll is retried by the watcher on its next tick.

use std::sync::Arc;

use adm_core::DealId;
use adm_lifecycle::DepositInfo;

use crate::config::MarketApiConfig;
use crate::error::MarketApiError;

/// Client for the deposit endpoint.
#[derive(Debug, Clone)]
pub struct DepositClient {
    http: reqwest::Client,
    config: Arc<MarketApiConfig>,
}

impl DepositClient {
    pub(crate) fn new(http: reqwest::Client, config: Arc<MarketApiConfig>) -> Self {
        Self { http, config }
    }

    /// Current deposit state for a deal.
    ///
    /// Calls `GET {base_url}/api/v1/deals/{id}/deposit`.
    pub async fn get(&self, id: &DealId) -> Result<DepositInfo, MarketApiError> {
        let endpoint = format!("GET /deals/{id}/deposit");
        let url = self.config.endpoint(&["deals", id.as_str(), "deposit"]);

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| MarketApiError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        crate::decode(endpoint, resp).await
    }
}
