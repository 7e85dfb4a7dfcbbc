//! # Identifier Newtypes
//!
//! Deal identifiers are opaque strings assigned by the backend
//! (e.g. `deal-3`). They travel in URL paths and as keys in the intent
//! store, so the constructor restricts them to a URL-safe alphabet.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Maximum accepted length of a deal identifier.
const MAX_DEAL_ID_LEN: usize = 128;

/// Unique identifier for a deal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DealId(String);

impl DealId {
    /// Validate and wrap a deal identifier.
    ///
    /// Accepts 1–128 characters from `[A-Za-z0-9_.-]`, except ids made
    /// only of dots, which are relative path segments.
    pub fn new(value: impl Into<String>) -> Result<Self, CoreError> {
        let value = value.into();
        if value.is_empty() {
            return Err(CoreError::InvalidIdentifier {
                value,
                reason: "deal id must not be empty",
            });
        }
        if value.len() > MAX_DEAL_ID_LEN {
            return Err(CoreError::InvalidIdentifier {
                value,
                reason: "deal id exceeds 128 characters",
            });
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(CoreError::InvalidIdentifier {
                value,
                reason: "deal id may only contain ASCII letters, digits, '-', '_' and '.'",
            });
        }
        if value.chars().all(|c| c == '.') {
            return Err(CoreError::InvalidIdentifier {
                value,
                reason: "deal id must not consist only of '.'",
            });
        }
        Ok(Self(value))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DealId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DealId> for String {
    fn from(id: DealId) -> Self {
        id.0
    }
}

impl std::str::FromStr for DealId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for DealId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_backend_style_ids() {
        assert_eq!(DealId::new("deal-3").unwrap().as_str(), "deal-3");
        assert!(DealId::new("7f3c9a10_b.2").is_ok());
    }

    #[test]
    fn rejects_empty_and_path_breaking_ids() {
        assert!(DealId::new("").is_err());
        assert!(DealId::new("deal/3").is_err());
        assert!(DealId::new("deal 3").is_err());
        assert!(DealId::new("deal?x=1").is_err());
    }

    #[test]
    fn rejects_dot_segments() {
        for id in [".", "..", "..."] {
            assert!(
                matches!(DealId::new(id), Err(CoreError::InvalidIdentifier { .. })),
                "{id:?} should be rejected"
            );
        }
        assert!(DealId::new(".deal").is_ok());
        assert!(DealId::new("deal..3").is_ok());
    }

    #[test]
    fn rejects_overlong_ids() {
        assert!(DealId::new("a".repeat(MAX_DEAL_ID_LEN)).is_ok());
        assert!(DealId::new("a".repeat(MAX_DEAL_ID_LEN + 1)).is_err());
    }

    #[test]
    fn serde_is_a_plain_string() {
        let id = DealId::new("deal-3").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"deal-3\"");
        let parsed: DealId = serde_json::from_str("\"deal-3\"").unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn serde_rejects_invalid_ids() {
        assert!(serde_json::from_str::<DealId>("\"deal/3\"").is_err());
    }
}
