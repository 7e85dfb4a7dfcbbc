//! # adm-state: Deal Lifecycle State Machine
//!
//! The pure, synchronous half of the marketplace client: the status model,
//! the role-gated transition table, the timeline projection and the action
//! policy resolver. No I/O happens here.
//!
//! ## Modules
//!
//! - **Status** (`status.rs`): the 17 deal statuses, their display groups,
//!   terminality, and the `Role`/`Actor` enums.
//!
//! - **Transition** (`transition.rs`): participant and system transition
//!   tables. A participant row carries the action, the target status, and
//!   whether a reason is required.
//!
//! - **Deal** (`deal.rs`): the deal record with its append-only timeline.
//!   `Deal::try_transition` checks every append against the tables at
//!   runtime; `Deal::validate_timeline` replays a server payload.
//!
//! - **Timeline** (`timeline.rs`): projection onto `Done`/`Current`/`Upcoming`
//!   steps for progress views.
//!
//! - **Policy** (`policy.rs`): `resolve(status, role, config)`, the only
//!   place that decides which actions a viewer is offered.
//!
//! ## Design
//!
//! Deal status is server-authoritative and arrives as data, so the state
//! machine is checked at runtime against static tables rather than encoded
//! in types. Unrecognized wire statuses decode to `DealStatus::Unknown`,
//! which offers no actions.

pub mod deal;
pub mod policy;
pub mod status;
pub mod timeline;
pub mod transition;

// ─── Status re-exports ──────────────────────────────────────────────

pub use status::{is_terminal, Actor, DealStatus, Role, StatusGroup, UnknownName};

// ─── Transition re-exports ──────────────────────────────────────────

pub use transition::{
    is_legal_transition, participant_row, ActionKind, ParticipantTransition, Party,
    PARTICIPANT_TRANSITIONS, SYSTEM_TRANSITIONS,
};

// ─── Deal and timeline re-exports ───────────────────────────────────

pub use deal::{Deal, StateError, TimelineEntry};
pub use timeline::{timeline_steps_for, StepState, TimelineStep, CANONICAL_PATH};

// ─── Policy re-exports ──────────────────────────────────────────────

pub use policy::{find_action, plan, resolve, Action, ActionPlan, BlockedReason, PolicyConfig};
