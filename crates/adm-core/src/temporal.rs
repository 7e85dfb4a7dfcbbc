//! # Temporal Types: UTC-Only Timestamps
//!
//! Defines `Timestamp`, a UTC timestamp truncated to millisecond precision.
//! Deal deadlines and timeline records arrive from the backend as RFC 3339
//! strings; payment intents persist `sentAt` as Unix epoch milliseconds.
//! Both views round-trip through this one type.
//!
//! ## Invariant
//!
//! A `Timestamp` never carries sub-millisecond precision, so
//! `from_epoch_millis(ts.epoch_millis()) == ts` for every value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;

/// A UTC-only timestamp, truncated to milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Timestamp(DateTime<Utc>);

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        DateTime::<Utc>::deserialize(deserializer).map(Self::from_utc)
    }
}

impl Timestamp {
    /// Current UTC time, truncated to milliseconds.
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    /// Wrap a `DateTime<Utc>`, truncating sub-millisecond precision.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        let millis = dt.timestamp_millis();
        Self(DateTime::from_timestamp_millis(millis).unwrap_or(dt))
    }

    /// Parse an RFC 3339 string with any offset, converting to UTC.
    ///
    /// Backend payloads are not guaranteed to use the `Z` suffix, so this
    /// parser is lenient about offsets and strict about everything else.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| CoreError::InvalidTimestamp {
            value: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::from_utc(dt.with_timezone(&Utc)))
    }

    /// Create a timestamp from Unix epoch milliseconds.
    pub fn from_epoch_millis(millis: i64) -> Result<Self, CoreError> {
        DateTime::from_timestamp_millis(millis)
            .map(Self)
            .ok_or_else(|| CoreError::InvalidTimestamp {
                value: millis.to_string(),
                reason: "epoch milliseconds out of range".into(),
            })
    }

    /// Unix epoch milliseconds.
    pub fn epoch_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Time elapsed from `earlier` to `self`, or zero if `earlier` is later.
    pub fn saturating_since(&self, earlier: &Timestamp) -> std::time::Duration {
        (self.0 - earlier.0).to_std().unwrap_or_default()
    }

    /// Render as RFC 3339 with a `Z` suffix and millisecond precision.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

/// Serde adapter persisting a [`Timestamp`] as Unix epoch milliseconds.
///
/// Use with `#[serde(with = "adm_core::temporal::epoch_millis")]`.
pub mod epoch_millis {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Timestamp;

    /// Serialize as an integer count of milliseconds.
    pub fn serialize<S: Serializer>(ts: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(ts.epoch_millis())
    }

    /// Deserialize from an integer count of milliseconds.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
        let millis = i64::deserialize(deserializer)?;
        Timestamp::from_epoch_millis(millis).map_err(serde::de::Error::custom)
    }
}
