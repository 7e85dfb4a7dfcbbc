//! # Deal Status Model
//!
//! The 17 canonical deal statuses, their display groups, and the parties
//! that act on a deal.
//!
//! ## Groups
//!
//! - **Negotiation**: `DRAFT`, `OFFER_PENDING`, `NEGOTIATING`, `ACCEPTED`
//! - **Payment & Creative**: `AWAITING_PAYMENT`, `FUNDED`,
//!   `CREATIVE_SUBMITTED`, `CREATIVE_APPROVED`, `SCHEDULED`
//! - **Publication**: `PUBLISHED`, `DELIVERY_VERIFYING`, `COMPLETED_RELEASED`
//! - **Special**: `DISPUTED`, `CANCELLED`, `REFUNDED`, `PARTIALLY_REFUNDED`,
//!   `EXPIRED`
//!
//! Terminal statuses offer no participant actions. `DISPUTED` is terminal
//! from the participants' point of view, but the platform may still resolve
//! it (see [`crate::transition::SYSTEM_TRANSITIONS`]).

use serde::{Deserialize, Serialize};

/// The lifecycle status of a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DealStatus {
    /// Offer being composed by the advertiser.
    Draft,
    /// Offer sent, waiting for the channel owner.
    OfferPending,
    /// Counter-offers are being exchanged.
    Negotiating,
    /// Terms agreed; the backend advances to `AWAITING_PAYMENT`.
    Accepted,
    /// Waiting for the advertiser's escrow deposit.
    AwaitingPayment,
    /// Escrow deposit confirmed on the ledger.
    Funded,
    /// Owner submitted the creative for approval.
    CreativeSubmitted,
    /// Advertiser approved the creative.
    CreativeApproved,
    /// Publication time is fixed.
    Scheduled,
    /// The placement is live.
    Published,
    /// The platform is checking the placement stayed up.
    DeliveryVerifying,
    /// Delivery verified and escrow released to the owner (terminal).
    CompletedReleased,
    /// A participant opened a dispute (terminal for participants).
    Disputed,
    /// Deal abandoned before funding (terminal).
    Cancelled,
    /// Escrow returned to the advertiser (terminal).
    Refunded,
    /// Escrow split between the parties (terminal).
    PartiallyRefunded,
    /// A deadline passed before the deal progressed (terminal).
    Expired,
    /// Forward-compatible catch-all for statuses this client does not know.
    #[serde(other)]
    Unknown,
}

/// Display grouping of statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusGroup {
    /// Offer, counter-offers, acceptance.
    Negotiation,
    /// Escrow funding and creative approval.
    PaymentAndCreative,
    /// Live placement and settlement.
    Publication,
    /// Disputes, cancellations, refunds, expiry.
    Special,
}

impl DealStatus {
    /// Every known status, in lifecycle order.
    pub const ALL: [DealStatus; 17] = [
        Self::Draft,
        Self::OfferPending,
        Self::Negotiating,
        Self::Accepted,
        Self::AwaitingPayment,
        Self::Funded,
        Self::CreativeSubmitted,
        Self::CreativeApproved,
        Self::Scheduled,
        Self::Published,
        Self::DeliveryVerifying,
        Self::CompletedReleased,
        Self::Disputed,
        Self::Cancelled,
        Self::Refunded,
        Self::PartiallyRefunded,
        Self::Expired,
    ];

    /// The canonical wire name (e.g. `"AWAITING_PAYMENT"`).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::OfferPending => "OFFER_PENDING",
            Self::Negotiating => "NEGOTIATING",
            Self::Accepted => "ACCEPTED",
            Self::AwaitingPayment => "AWAITING_PAYMENT",
            Self::Funded => "FUNDED",
            Self::CreativeSubmitted => "CREATIVE_SUBMITTED",
            Self::CreativeApproved => "CREATIVE_APPROVED",
            Self::Scheduled => "SCHEDULED",
            Self::Published => "PUBLISHED",
            Self::DeliveryVerifying => "DELIVERY_VERIFYING",
            Self::CompletedReleased => "COMPLETED_RELEASED",
            Self::Disputed => "DISPUTED",
            Self::Cancelled => "CANCELLED",
            Self::Refunded => "REFUNDED",
            Self::PartiallyRefunded => "PARTIALLY_REFUNDED",
            Self::Expired => "EXPIRED",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Whether no further participant actions are offered.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::CompletedReleased
                | Self::Cancelled
                | Self::Expired
                | Self::Refunded
                | Self::PartiallyRefunded
                | Self::Disputed
        )
    }

    /// The display group, or `None` for [`DealStatus::Unknown`].
    pub fn group(&self) -> Option<StatusGroup> {
        match self {
            Self::Draft | Self::OfferPending | Self::Negotiating | Self::Accepted => {
                Some(StatusGroup::Negotiation)
            }
            Self::AwaitingPayment
            | Self::Funded
            | Self::CreativeSubmitted
            | Self::CreativeApproved
            | Self::Scheduled => Some(StatusGroup::PaymentAndCreative),
            Self::Published | Self::DeliveryVerifying | Self::CompletedReleased => {
                Some(StatusGroup::Publication)
            }
            Self::Disputed
            | Self::Cancelled
            | Self::Refunded
            | Self::PartiallyRefunded
            | Self::Expired => Some(StatusGroup::Special),
            Self::Unknown => None,
        }
    }

    /// Whether the status belongs to the creative-approval sub-flow.
    pub fn is_creative_stage(&self) -> bool {
        matches!(self, Self::CreativeSubmitted | Self::CreativeApproved)
    }
}

/// Free function form of [`DealStatus::is_terminal`].
pub fn is_terminal(status: DealStatus) -> bool {
    status.is_terminal()
}

impl std::fmt::Display for DealStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for DealStatus {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

/// A status or role name that does not match any known value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized name: {0}")]
pub struct UnknownName(pub String);

/// The viewer's role relative to a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// The party buying the placement.
    Advertiser,
    /// The channel owner selling the placement.
    Owner,
}

impl Role {
    /// Both roles.
    pub const ALL: [Role; 2] = [Role::Advertiser, Role::Owner];

    /// The canonical wire name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Advertiser => "ADVERTISER",
            Self::Owner => "OWNER",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Role {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

/// Who performed a recorded transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Actor {
    /// The advertiser.
    Advertiser,
    /// The channel owner.
    Owner,
    /// The platform backend (auto-advance, ledger observation, deadlines).
    System,
}

impl From<Role> for Actor {
    fn from(role: Role) -> Self {
        match role {
            Role::Advertiser => Actor::Advertiser,
            Role::Owner => Actor::Owner,
        }
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Advertiser => "ADVERTISER",
            Self::Owner => "OWNER",
            Self::System => "SYSTEM",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_set_is_exact() {
        let terminal: Vec<_> = DealStatus::ALL.into_iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(
            terminal,
            vec![
                DealStatus::CompletedReleased,
                DealStatus::Disputed,
                DealStatus::Cancelled,
                DealStatus::Refunded,
                DealStatus::PartiallyRefunded,
                DealStatus::Expired,
            ]
        );
        assert!(!DealStatus::Unknown.is_terminal());
    }

    #[test]
    fn every_known_status_has_a_group() {
        for status in DealStatus::ALL {
            assert!(status.group().is_some(), "{status} has no group");
        }
        assert_eq!(DealStatus::Unknown.group(), None);
    }

    #[test]
    fn serde_uses_screaming_snake_case() {
        let json = serde_json::to_string(&DealStatus::AwaitingPayment).unwrap();
        assert_eq!(json, "\"AWAITING_PAYMENT\"");
        for status in DealStatus::ALL {
            let json = format!("\"{}\"", status.name());
            let parsed: DealStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn unrecognized_wire_status_maps_to_unknown() {
        let parsed: DealStatus = serde_json::from_str("\"ON_HOLD\"").unwrap();
        assert_eq!(parsed, DealStatus::Unknown);
    }

    #[test]
    fn from_str_is_case_insensitive_and_rejects_unknown() {
        assert_eq!("funded".parse::<DealStatus>().unwrap(), DealStatus::Funded);
        assert!("UNKNOWN".parse::<DealStatus>().is_err());
        assert_eq!("owner".parse::<Role>().unwrap(), Role::Owner);
    }

    #[test]
    fn role_converts_to_actor() {
        assert_eq!(Actor::from(Role::Advertiser), Actor::Advertiser);
        assert_eq!(Actor::from(Role::Owner), Actor::Owner);
    }
}
