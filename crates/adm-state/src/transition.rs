//! # Transition Legality Table
//!
//! Two tables define every legal status change:
//!
//! - [`PARTICIPANT_TRANSITIONS`]: moves a participant may request, gated by
//!   role. Each row names the user-facing [`ActionKind`], whether a reason
//!   is mandatory, and whether the edge is one of the explicit negotiation
//!   cycles.
//! - [`SYSTEM_TRANSITIONS`]: moves only the backend performs (auto-advance,
//!   ledger confirmation, deadlines, delivery checks, dispute resolution).
//!
//! ```text
//! DRAFT ─send_offer─▶ OFFER_PENDING ─accept─▶ ACCEPTED ═▶ AWAITING_PAYMENT ═▶ FUNDED
//!                          │  ▲ counter_offer                 (pay arms the watcher)
//!                          ▼  │                                                  │
//!                      NEGOTIATING ─accept─▶ ACCEPTED          submit_creative ◀─┘
//!                                                                     ▼
//! COMPLETED_RELEASED ◀═ DELIVERY_VERIFYING ◀═ PUBLISHED ◀═ SCHEDULED ◀─ CREATIVE_APPROVED
//! ```
//!
//! `─▶` participant action, `═▶` system transition.
//!
//! ## Invariant
//!
//! With the rows flagged `negotiation_cycle` removed, the union of both
//! tables is acyclic.

use serde::{Deserialize, Serialize};

use crate::status::{Actor, DealStatus, Role};

/// A user-facing deal action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Send a drafted offer to the channel owner.
    SendOffer,
    /// Accept the current terms.
    Accept,
    /// Decline the offer or negotiation.
    Reject,
    /// Propose different terms.
    CounterOffer,
    /// Withdraw before anything was agreed.
    Cancel,
    /// Fund the escrow deposit. Arms the deposit watcher; changes no status.
    Pay,
    /// Submit the creative for the advertiser's approval.
    SubmitCreative,
    /// Approve the submitted creative.
    ApproveCreative,
    /// Send the creative back for changes.
    RequestRevision,
    /// Fix the publication time.
    Schedule,
    /// Escalate to the platform.
    OpenDispute,
}

impl ActionKind {
    /// Every action kind.
    pub const ALL: [ActionKind; 11] = [
        Self::SendOffer,
        Self::Accept,
        Self::Reject,
        Self::CounterOffer,
        Self::Cancel,
        Self::Pay,
        Self::SubmitCreative,
        Self::ApproveCreative,
        Self::RequestRevision,
        Self::Schedule,
        Self::OpenDispute,
    ];

    /// The snake_case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SendOffer => "send_offer",
            Self::Accept => "accept",
            Self::Reject => "reject",
            Self::CounterOffer => "counter_offer",
            Self::Cancel => "cancel",
            Self::Pay => "pay",
            Self::SubmitCreative => "submit_creative",
            Self::ApproveCreative => "approve_creative",
            Self::RequestRevision => "request_revision",
            Self::Schedule => "schedule",
            Self::OpenDispute => "open_dispute",
        }
    }

    /// Translation key for the action's button label.
    pub fn i18n_key(&self) -> &'static str {
        match self {
            Self::SendOffer => "deal.action.send_offer",
            Self::Accept => "deal.action.accept",
            Self::Reject => "deal.action.reject",
            Self::CounterOffer => "deal.action.counter_offer",
            Self::Cancel => "deal.action.cancel",
            Self::Pay => "deal.action.pay",
            Self::SubmitCreative => "deal.action.submit_creative",
            Self::ApproveCreative => "deal.action.approve_creative",
            Self::RequestRevision => "deal.action.request_revision",
            Self::Schedule => "deal.action.schedule",
            Self::OpenDispute => "deal.action.open_dispute",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionKind {
    type Err = crate::status::UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| crate::status::UnknownName(s.to_string()))
    }
}

/// Which participant may take a row's action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Party {
    /// Only the advertiser.
    Advertiser,
    /// Only the channel owner.
    Owner,
    /// Either participant.
    Either,
}

impl Party {
    /// Whether `role` is allowed by this party restriction.
    pub fn admits(&self, role: Role) -> bool {
        match self {
            Self::Either => true,
            Self::Advertiser => role == Role::Advertiser,
            Self::Owner => role == Role::Owner,
        }
    }
}

/// One row of the participant transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticipantTransition {
    /// Status the action is available from.
    pub from: DealStatus,
    /// Who may take it.
    pub party: Party,
    /// The action.
    pub action: ActionKind,
    /// Resulting status, or `None` when the action does not itself move the
    /// deal (`pay`).
    pub to: Option<DealStatus>,
    /// Whether a non-empty reason must accompany the request.
    pub requires_reason: bool,
    /// Whether this edge is one of the explicit negotiation cycles.
    pub negotiation_cycle: bool,
}

const fn row(
    from: DealStatus,
    party: Party,
    action: ActionKind,
    to: Option<DealStatus>,
    requires_reason: bool,
) -> ParticipantTransition {
    ParticipantTransition {
        from,
        party,
        action,
        to,
        requires_reason,
        negotiation_cycle: false,
    }
}

const fn cycle(
    from: DealStatus,
    party: Party,
    action: ActionKind,
    to: DealStatus,
) -> ParticipantTransition {
    ParticipantTransition {
        from,
        party,
        action,
        to: Some(to),
        requires_reason: true,
        negotiation_cycle: true,
    }
}

use ActionKind as A;
use DealStatus as S;

/// Role-gated participant transitions, in presentation order.
pub const PARTICIPANT_TRANSITIONS: &[ParticipantTransition] = &[
    row(S::Draft, Party::Advertiser, A::SendOffer, Some(S::OfferPending), false),
    row(S::Draft, Party::Advertiser, A::Cancel, Some(S::Cancelled), false),
    row(S::OfferPending, Party::Owner, A::Accept, Some(S::Accepted), false),
    row(S::OfferPending, Party::Owner, A::CounterOffer, Some(S::Negotiating), true),
    row(S::OfferPending, Party::Owner, A::Reject, Some(S::Cancelled), true),
    row(S::OfferPending, Party::Advertiser, A::Cancel, Some(S::Cancelled), false),
    row(S::Negotiating, Party::Either, A::Accept, Some(S::Accepted), false),
    cycle(S::Negotiating, Party::Either, A::CounterOffer, S::Negotiating),
    row(S::Negotiating, Party::Either, A::Reject, Some(S::Cancelled), true),
    row(S::AwaitingPayment, Party::Advertiser, A::Pay, None, false),
    row(S::Funded, Party::Owner, A::SubmitCreative, Some(S::CreativeSubmitted), false),
    row(S::Funded, Party::Either, A::OpenDispute, Some(S::Disputed), true),
    row(S::CreativeSubmitted, Party::Advertiser, A::ApproveCreative, Some(S::CreativeApproved), false),
    cycle(S::CreativeSubmitted, Party::Advertiser, A::RequestRevision, S::Funded),
    row(S::CreativeSubmitted, Party::Either, A::OpenDispute, Some(S::Disputed), true),
    row(S::CreativeApproved, Party::Owner, A::Schedule, Some(S::Scheduled), false),
    row(S::CreativeApproved, Party::Either, A::OpenDispute, Some(S::Disputed), true),
    row(S::Scheduled, Party::Either, A::OpenDispute, Some(S::Disputed), true),
    row(S::Published, Party::Either, A::OpenDispute, Some(S::Disputed), true),
    row(S::DeliveryVerifying, Party::Either, A::OpenDispute, Some(S::Disputed), true),
];

/// Transitions performed only by the backend.
pub const SYSTEM_TRANSITIONS: &[(DealStatus, DealStatus)] = &[
    (S::OfferPending, S::Expired),
    (S::Negotiating, S::Expired),
    (S::Accepted, S::AwaitingPayment),
    (S::AwaitingPayment, S::Funded),
    (S::AwaitingPayment, S::Expired),
    (S::Funded, S::Refunded),
    (S::CreativeSubmitted, S::Refunded),
    (S::CreativeApproved, S::Refunded),
    (S::Scheduled, S::Published),
    (S::Published, S::DeliveryVerifying),
    (S::DeliveryVerifying, S::CompletedReleased),
    (S::DeliveryVerifying, S::PartiallyRefunded),
    (S::Disputed, S::CompletedReleased),
    (S::Disputed, S::Refunded),
    (S::Disputed, S::PartiallyRefunded),
];

impl ParticipantTransition {
    /// Whether the action moves the deal into the creative-approval
    /// sub-flow.
    pub fn enters_creative_stage(&self) -> bool {
        self.to.is_some_and(|to| to.is_creative_stage())
    }
}

impl DealStatus {
    /// Participant transitions available to `role` from this status.
    pub fn participant_transitions(
        self,
        role: Role,
    ) -> impl Iterator<Item = &'static ParticipantTransition> {
        PARTICIPANT_TRANSITIONS
            .iter()
            .filter(move |t| t.from == self && t.party.admits(role))
    }

    /// Statuses the backend may move this status to.
    pub fn system_transitions(self) -> impl Iterator<Item = DealStatus> {
        SYSTEM_TRANSITIONS
            .iter()
            .filter(move |(from, _)| *from == self)
            .map(|(_, to)| *to)
    }
}

/// Whether `actor` may move a deal from `from` to `to`.
pub fn is_legal_transition(from: DealStatus, to: DealStatus, actor: Actor) -> bool {
    match actor {
        Actor::System => SYSTEM_TRANSITIONS.contains(&(from, to)),
        Actor::Advertiser => participant_row(from, to, Role::Advertiser).is_some(),
        Actor::Owner => participant_row(from, to, Role::Owner).is_some(),
    }
}

/// The participant row moving `from → to` for `role`, preferring one that
/// does not require a reason.
pub fn participant_row(
    from: DealStatus,
    to: DealStatus,
    role: Role,
) -> Option<&'static ParticipantTransition> {
    let mut matching = from
        .participant_transitions(role)
        .filter(move |t| t.to == Some(to));
    let first = matching.next()?;
    if !first.requires_reason {
        return Some(first);
    }
    Some(matching.find(|t| !t.requires_reason).unwrap_or(first))
}
