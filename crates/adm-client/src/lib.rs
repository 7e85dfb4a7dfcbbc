//! # adm-client: Typed Rust client for the marketplace API
//!
//! Provides typed access to the two resources the lifecycle layer needs:
//! - **Deals** via `/api/v1/deals/{id}` and `/api/v1/deals/{id}/transition`
//! - **Deposits** via `/api/v1/deals/{id}/deposit`
//!
//! [`MarketClient`] implements both [`TransitionExecutor`] and
//! [`DepositSource`], so it plugs straight into a
//! [`adm_lifecycle::DealOrchestrator`] and [`adm_lifecycle::WatcherRegistry`].
//!
//! ## Status Mapping
//!
//! | HTTP | Transition | Deposit |
//! |------|------------|---------|
//! | 404 | `NotFound` | `NotFound` |
//! | 409 | `Conflict` | `Api` |
//! | other 4xx | `Client` | `Api` |
//! | 5xx | `Server` | `Api` |
//! | transport | `Transport` | `Transport` |
//! | bad body | `Decode` | `Decode` |

pub mod config;
pub mod deals;
pub mod deposits;
pub mod error;
pub mod retry;

pub use config::{ConfigError, MarketApiConfig};
pub use error::MarketApiError;
pub use retry::ReadRetry;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use adm_core::DealId;
use adm_lifecycle::{
    DepositInfo, DepositSource, SourceError, TransitionError, TransitionExecutor,
    TransitionRequest,
};
use adm_state::Deal;

/// Top-level marketplace API client.
#[derive(Debug, Clone)]
pub struct MarketClient {
    deals: deals::DealClient,
    deposits: deposits::DepositClient,
}

impl MarketClient {
    /// Create a client from configuration.
    pub fn new(config: MarketApiConfig) -> Result<Self, MarketApiError> {
        Self::with_read_retry(config, ReadRetry::default())
    }

    /// Create a client with an explicit backoff for deal reads.
    pub fn with_read_retry(
        config: MarketApiConfig,
        read_retry: ReadRetry,
    ) -> Result<Self, MarketApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                let mut auth = reqwest::header::HeaderValue::from_str(&format!(
                    "Bearer {}",
                    config.api_token.as_str()
                ))
                .map_err(|_| MarketApiError::Config(ConfigError::MissingToken))?;
                auth.set_sensitive(true);
                headers.insert(reqwest::header::AUTHORIZATION, auth);
                headers
            })
            .build()
            .map_err(|e| MarketApiError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        let config = Arc::new(config);
        Ok(Self {
            deals: deals::DealClient::new(http.clone(), Arc::clone(&config), read_retry),
            deposits: deposits::DepositClient::new(http, config),
        })
    }

    /// Access the deals client.
    pub fn deals(&self) -> &deals::DealClient {
        &self.deals
    }

    /// Access the deposits client.
    pub fn deposits(&self) -> &deposits::DepositClient {
        &self.deposits
    }
}

#[async_trait]
impl TransitionExecutor for MarketClient {
    async fn deal(&self, deal_id: &DealId) -> Result<Deal, TransitionError> {
        self.deals
            .get(deal_id)
            .await
            .map_err(|e| e.into_transition_error(deal_id))
    }

    async fn transition(
        &self,
        deal_id: &DealId,
        request: &TransitionRequest,
    ) -> Result<Deal, TransitionError> {
        self.deals
            .transition(deal_id, request)
            .await
            .map_err(|e| e.into_transition_error(deal_id))
    }
}

#[async_trait]
impl DepositSource for MarketClient {
    async fn deposit_info(&self, deal_id: &DealId) -> Result<DepositInfo, SourceError> {
        self.deposits
            .get(deal_id)
            .await
            .map_err(|e| e.into_source_error(deal_id))
    }
}

/// Turn a response into `T`, or an `ApiError` for non-2xx statuses.
pub(crate) async fn decode<T: serde::de::DeserializeOwned>(
    endpoint: String,
    resp: reqwest::Response,
) -> Result<T, MarketApiError> {
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        tracing::debug!(%endpoint, status, "market API returned error status");
        return Err(MarketApiError::ApiError {
            endpoint,
            status,
            body,
        });
    }

    resp.json().await.map_err(|e| MarketApiError::Deserialization {
        endpoint,
        source: e,
    })
}
