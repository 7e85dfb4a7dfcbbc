//! # Exact Ledger Amounts
//!
//! `NanoAmount` counts the ledger's smallest unit (nanotons). Prices,
//! escrow deposits and transfer amounts all use it, so every comparison
//! on money is an integer comparison.
//!
//! ## Wire Format
//!
//! Serialized as a decimal string (`"1500000000"`). Deserialization
//! accepts a decimal string or a non-negative JSON integer. Floating-point
//! JSON numbers are rejected outright, even when they carry no fraction.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// Number of nano units in one whole ledger coin.
pub const NANO_PER_COIN: u64 = 1_000_000_000;

/// An exact amount in the ledger's smallest unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NanoAmount(u64);

impl NanoAmount {
    /// The zero amount.
    pub const ZERO: NanoAmount = NanoAmount(0);

    /// Wrap a raw nano-unit count.
    pub const fn new(nano: u64) -> Self {
        Self(nano)
    }

    /// The raw nano-unit count.
    pub const fn as_nano(&self) -> u64 {
        self.0
    }

    /// Parse a decimal string of ASCII digits.
    ///
    /// Signs, whitespace, separators and fractional parts are rejected.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        if s.is_empty() {
            return Err(CoreError::InvalidAmount {
                value: s.to_string(),
                reason: "amount must not be empty".into(),
            });
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoreError::InvalidAmount {
                value: s.to_string(),
                reason: "amount must be a decimal integer in nano units".into(),
            });
        }
        s.parse::<u64>()
            .map(Self)
            .map_err(|e| CoreError::InvalidAmount {
                value: s.to_string(),
                reason: e.to_string(),
            })
    }

    /// `self - other`, or `None` if it would go negative.
    pub fn checked_sub(self, other: NanoAmount) -> Option<NanoAmount> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// `self + other`, or `None` on overflow.
    pub fn checked_add(self, other: NanoAmount) -> Option<NanoAmount> {
        self.0.checked_add(other.0).map(Self)
    }

    /// `self - other`, clamped at zero.
    pub fn saturating_sub(self, other: NanoAmount) -> NanoAmount {
        Self(self.0.saturating_sub(other.0))
    }

    /// Whether the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl std::str::FromStr for NanoAmount {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for NanoAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NanoAmount {
    fn from(nano: u64) -> Self {
        Self(nano)
    }
}

impl Serialize for NanoAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for NanoAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NanoAmountVisitor)
    }
}

struct NanoAmountVisitor;

impl<'de> Visitor<'de> for NanoAmountVisitor {
    type Value = NanoAmount;

    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("a nano-unit amount as a decimal string or non-negative integer")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        NanoAmount::parse(v).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(NanoAmount(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        u64::try_from(v)
            .map(NanoAmount)
            .map_err(|_| E::custom(format!("amount must not be negative: {v}")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Err(E::custom(format!(
            "float values are not permitted for amounts; use a decimal string: {v}"
        )))
    }
}
