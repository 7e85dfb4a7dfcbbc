//! Typed client for deal resources.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/api/v1/deals/{id}` | Load a deal as the caller sees it |
//! | POST   | `/api/v1/deals/{id}/transition` | Request a status transition |
//!
//! Reads back off and retry on connect errors and timeouts. Transition requests are sent
//! exactly once with a fresh `Idempotency-Key`.

use std::sync::Arc;

use adm_core::DealId;
use adm_lifecycle::TransitionRequest;
use adm_state::Deal;
use uuid::Uuid;

use crate::config::MarketApiConfig;
use crate::error::MarketApiError;
use crate::retry::ReadRetry;

/// Header carrying the per-request idempotency token.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Client for deal endpoints.
#[derive(Debug, Clone)]
pub struct DealClient {
    http: reqwest::Client,
    config: Arc<MarketApiConfig>,
    retry: ReadRetry,
}

impl DealClient {
    pub(crate) fn new(http: reqwest::Client, config: Arc<MarketApiConfig>, retry: ReadRetry) -> Self {
        Self {
            http,
            config,
            retry,
        }
    }

    /// Load a deal.
    ///
    /// Calls `GET {base_url}/api/v1/deals/{id}`.
    pub async fn get(&self, id: &DealId) -> Result<Deal, MarketApiError> {
        let endpoint = format!("GET /deals/{id}");
        let url = self.config.endpoint(&["deals", id.as_str()]);

        let resp = self
            .retry
            .send(&endpoint, || self.http.get(url.clone()).send())
            .await
            .map_err(|e| MarketApiError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        crate::decode(endpoint, resp).await
    }

    /// Request a transition.
    ///
    /// Calls `POST {base_url}/api/v1/deals/{id}/transition` once, without
    /// retry.
    pub async fn transition(
        &self,
        id: &DealId,
        request: &TransitionRequest,
    ) -> Result<Deal, MarketApiError> {
        let endpoint = format!("POST /deals/{id}/transition");
        let url = self.config.endpoint(&["deals", id.as_str(), "transition"]);
        let idempotency_key = Uuid::new_v4();

        tracing::debug!(
            deal_id = %id,
            target_status = %request.target_status,
            %idempotency_key,
            "requesting deal transition"
        );

        let resp = self
            .http
            .post(url)
            .header(IDEMPOTENCY_KEY_HEADER, idempotency_key.to_string())
            .json(request)
            .send()
            .await
            .map_err(|e| MarketApiError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        crate::decode(endpoint, resp).await
    }
}
