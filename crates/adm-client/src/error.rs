//! Marketplace API client error types, and their mapping onto the
//! collaborator error classes the lifecycle layer reacts to.

use adm_core::DealId;
use adm_lifecycle::{SourceError, TransitionError};

/// Errors from marketplace API calls.
#[derive(Debug, thiserror::Error)]
pub enum MarketApiError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The API returned a non-2xx status.
    #[error("market API {endpoint} returned {status}: {body}")]
    ApiError {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}

impl MarketApiError {
    /// HTTP status of an error response, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Classify for the transition executor contract.
    pub fn into_transition_error(self, deal_id: &DealId) -> TransitionError {
        match self {
            Self::ApiError { status: 404, .. } => TransitionError::NotFound(deal_id.clone()),
            Self::ApiError { status: 409, .. } => TransitionError::Conflict(deal_id.clone()),
            Self::ApiError { status, body, .. } if (400..500).contains(&status) => {
                TransitionError::Client { status, body }
            }
            Self::ApiError { status, body, .. } => TransitionError::Server { status, body },
            Self::Deserialization { source, .. } => TransitionError::Decode(source.to_string()),
            e @ (Self::Http { .. } | Self::Config(_)) => TransitionError::Transport(e.to_string()),
        }
    }

    /// Classify for the deposit source contract.
    pub fn into_source_error(self, deal_id: &DealId) -> SourceError {
        match self {
            Self::ApiError { status: 404, .. } => SourceError::NotFound(deal_id.clone()),
            Self::ApiError { status, body, .. } => SourceError::Api { status, body },
            Self::Deserialization { source, .. } => SourceError::Decode(source.to_string()),
            e @ (Self::Http { .. } | Self::Config(_)) => SourceError::Transport(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16) -> MarketApiError {
        MarketApiError::ApiError {
            endpoint: "POST /deals/deal-3/transition".into(),
            status,
            body: "nope".into(),
        }
    }

    #[test]
    fn transition_status_classes() {
        let id = DealId::new("deal-3").unwrap();
        assert_eq!(api(404).into_transition_error(&id), TransitionError::NotFound(id.clone()));
        assert_eq!(api(409).into_transition_error(&id), TransitionError::Conflict(id.clone()));
        assert!(matches!(
            api(422).into_transition_error(&id),
            TransitionError::Client { status: 422, .. }
        ));
        assert!(matches!(
            api(502).into_transition_error(&id),
            TransitionError::Server { status: 502, .. }
        ));
    }

    #[test]
    fn source_status_classes() {
        let id = DealId::new("deal-3").unwrap();
        assert_eq!(api(404).into_source_error(&id), SourceError::NotFound(id.clone()));
        assert!(matches!(
            api(503).into_source_error(&id),
            SourceError::Api { status: 503, .. }
        ));
    }
}
