//! The [`TransitionExecutor`] collaborator: the only path by which a deal's
//! status changes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use adm_core::DealId;
use adm_state::{Deal, DealStatus};

/// Body of a transition request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    /// Status the backend is asked to move the deal to.
    pub target_status: DealStatus,
    /// Reason, for transitions that require one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Errors from a [`TransitionExecutor`], grouped by how callers react.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The request did not complete.
    #[error("transport error: {0}")]
    Transport(String),

    /// The deal changed since it was viewed (HTTP 409).
    #[error("deal {0} changed since it was loaded")]
    Conflict(DealId),

    /// The deal does not exist (HTTP 404).
    #[error("deal {0} not found")]
    NotFound(DealId),

    /// The backend refused the request (other 4xx).
    #[error("request rejected with {status}: {body}")]
    Client {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The backend failed (5xx).
    #[error("server error {status}: {body}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The response body could not be decoded.
    #[error("failed to decode deal: {0}")]
    Decode(String),
}

/// Reads deals and requests status transitions from the backend.
#[async_trait]
pub trait TransitionExecutor: Send + Sync {
    /// Load the deal as the current viewer sees it.
    async fn deal(&self, deal_id: &DealId) -> Result<Deal, TransitionError>;

    /// Ask the backend to move the deal. Returns the updated deal.
    async fn transition(
        &self,
        deal_id: &DealId,
        request: &TransitionRequest,
    ) -> Result<Deal, TransitionError>;
}
