//! # Error Types
//!
//! Validation errors raised by the constructors in this crate. Higher
//! crates wrap `CoreError` in their own `thiserror` enums.

use thiserror::Error;

/// Errors produced while constructing or parsing core primitives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// An identifier failed validation.
    #[error("invalid identifier {value:?}: {reason}")]
    InvalidIdentifier {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// An amount could not be parsed as an exact nano-unit integer.
    #[error("invalid amount {value:?}: {reason}")]
    InvalidAmount {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A timestamp could not be parsed or is out of range.
    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}
