//! # adm-core: Foundational Types for the Marketplace
//!
//! Defines the primitives every other crate in the workspace builds on.
//! `adm-core` depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** A `DealId` is validated at
//!    construction and can be embedded in a URL path without escaping.
//!
//! 2. **Exact ledger amounts.** `NanoAmount` is an integer count of the
//!    ledger's smallest unit. It serializes as a decimal string and refuses
//!    floating-point JSON numbers on the way in.
//!
//! 3. **UTC-only timestamps.** `Timestamp` is always UTC with millisecond
//!    precision, which is the resolution of the persisted `sentAt` field.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `adm-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod amount;
pub mod error;
pub mod identity;
pub mod temporal;

pub use amount::NanoAmount;
pub use error::CoreError;
pub use identity::DealId;
pub use temporal::Timestamp;
