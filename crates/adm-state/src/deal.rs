//! # Deal Record
//!
//! The client-side projection of a deal as returned by the backend. The
//! timeline is an append-only audit trail; [`Deal::try_transition`] is the
//! only way to extend it and enforces the legality table at runtime, the
//! same way every transition recorded by the backend must satisfy it.
//!
//! Deals are never mutated locally in production flows. `try_transition`
//! exists for building fixtures and replaying timelines, and
//! [`Deal::validate_timeline`] sanity-checks server payloads.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use adm_core::{DealId, NanoAmount, Timestamp};

use crate::status::{Actor, DealStatus, Role};
use crate::transition::{is_legal_transition, participant_row};

/// One entry in a deal's timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    /// Status the deal entered.
    pub status: DealStatus,
    /// Who moved it there.
    pub actor: Actor,
    /// Free-text reason (counter-offers, rejections, disputes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// When the change happened.
    pub at: Timestamp,
}

/// A deal between an advertiser and a channel owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    /// Backend-assigned identifier.
    pub id: DealId,
    /// Current status.
    pub status: DealStatus,
    /// The viewer's role relative to this deal.
    pub role: Role,
    /// Agreed price in nano units.
    pub price_nano: NanoAmount,
    /// Deadline bounding the current status, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_at: Option<Timestamp>,
    /// Append-only status history, oldest first.
    #[serde(default)]
    pub timeline: Vec<TimelineEntry>,
}

/// Errors raised by deal state checks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// The transition is not in the legality table for this actor.
    #[error("invalid deal transition: {from} -> {to} by {actor}")]
    InvalidTransition {
        /// Current status.
        from: DealStatus,
        /// Attempted target status.
        to: DealStatus,
        /// Who attempted it.
        actor: Actor,
    },

    /// The transition requires a non-empty reason.
    #[error("transition {from} -> {to} requires a reason")]
    ReasonRequired {
        /// Current status.
        from: DealStatus,
        /// Attempted target status.
        to: DealStatus,
    },

    /// Timeline entries are not in chronological order.
    #[error("timeline entry {index} at {at} precedes its predecessor")]
    TimelineOutOfOrder {
        /// Index of the offending entry.
        index: usize,
        /// Its timestamp.
        at: Timestamp,
    },

    /// The first timeline entry is not an advertiser creating the deal.
    #[error("deal timeline must start with an advertiser offer, found {status} by {actor}")]
    InvalidOrigin {
        /// Status of the first entry.
        status: DealStatus,
        /// Actor of the first entry.
        actor: Actor,
    },

    /// The last timeline entry disagrees with the deal's status.
    #[error("deal status {status} does not match last timeline entry {last}")]
    TimelineMismatch {
        /// The deal's `status` field.
        status: DealStatus,
        /// Status of the last timeline entry.
        last: DealStatus,
    },
}

impl Deal {
    /// Create a deal the way an advertiser does: a fresh record in `status`
    /// (`DRAFT` or `OFFER_PENDING`) with a single origin entry.
    pub fn create(
        id: DealId,
        role: Role,
        price_nano: NanoAmount,
        status: DealStatus,
        at: Timestamp,
    ) -> Result<Self, StateError> {
        if !is_origin(status, Actor::Advertiser) {
            return Err(StateError::InvalidOrigin {
                status,
                actor: Actor::Advertiser,
            });
        }
        Ok(Self {
            id,
            status,
            role,
            price_nano,
            deadline_at: None,
            timeline: vec![TimelineEntry {
                status,
                actor: Actor::Advertiser,
                reason: None,
                at,
            }],
        })
    }

    /// Whether the deal is in a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Attempt a transition with runtime validation.
    ///
    /// Rejects moves missing from the legality table for `actor`, and
    /// participant moves that require a reason when none (or only
    /// whitespace) is given. The timeline is appended on success; on
    /// error the deal is unchanged.
    pub fn try_transition(
        &mut self,
        to: DealStatus,
        actor: Actor,
        reason: Option<String>,
        at: Timestamp,
    ) -> Result<(), StateError> {
        check_step(self.status, to, actor, reason.as_deref())?;
        self.timeline.push(TimelineEntry {
            status: to,
            actor,
            reason,
            at,
        });
        self.status = to;
        Ok(())
    }

    /// Replay the timeline and check it against the legality table.
    ///
    /// An empty timeline is accepted (older backends omit it).
    pub fn validate_timeline(&self) -> Result<(), StateError> {
        let Some(first) = self.timeline.first() else {
            return Ok(());
        };
        if !is_origin(first.status, first.actor) {
            return Err(StateError::InvalidOrigin {
                status: first.status,
                actor: first.actor,
            });
        }
        for (index, pair) in self.timeline.windows(2).enumerate() {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.at < prev.at {
                return Err(StateError::TimelineOutOfOrder {
                    index: index + 1,
                    at: next.at,
                });
            }
            check_step(prev.status, next.status, next.actor, next.reason.as_deref())?;
        }
        let last = self.timeline[self.timeline.len() - 1].status;
        if last != self.status {
            return Err(StateError::TimelineMismatch {
                status: self.status,
                last,
            });
        }
        Ok(())
    }

    /// Whether the deadline for the current status has passed at `now`.
    pub fn is_past_deadline(&self, now: Timestamp) -> bool {
        self.deadline_at.is_some_and(|deadline| now >= deadline)
    }

    /// Time left before the deadline, `None` without a deadline, zero once
    /// it has passed.
    pub fn time_remaining(&self, now: Timestamp) -> Option<Duration> {
        self.deadline_at.map(|deadline| deadline.saturating_since(&now))
    }

    /// When the deal last entered `status`, if the timeline records it.
    pub fn entered_at(&self, status: DealStatus) -> Option<Timestamp> {
        self.timeline
            .iter()
            .rev()
            .find(|entry| entry.status == status)
            .map(|entry| entry.at)
    }
}

fn is_origin(status: DealStatus, actor: Actor) -> bool {
    actor == Actor::Advertiser && matches!(status, DealStatus::Draft | DealStatus::OfferPending)
}

fn check_step(
    from: DealStatus,
    to: DealStatus,
    actor: Actor,
    reason: Option<&str>,
) -> Result<(), StateError> {
    if !is_legal_transition(from, to, actor) {
        return Err(StateError::InvalidTransition { from, to, actor });
    }
    let role = match actor {
        Actor::Advertiser => Role::Advertiser,
        Actor::Owner => Role::Owner,
        Actor::System => return Ok(()),
    };
    let needs_reason = participant_row(from, to, role).is_some_and(|row| row.requires_reason);
    let has_reason = reason.is_some_and(|r| !r.trim().is_empty());
    if needs_reason && !has_reason {
        return Err(StateError::ReasonRequired { from, to });
    }
    Ok(())
}
