//! # Timeline Projection
//!
//! Projects a [`Deal`] onto the ordered list of steps a progress view
//! renders. The canonical happy path is always shown; `DRAFT` and
//! `NEGOTIATING` appear only when the deal actually visited them, and
//! special statuses (disputes, cancellations, refunds, expiry) are appended
//! after the last happy-path step reached.

use serde::Serialize;

use adm_core::Timestamp;

use crate::deal::Deal;
use crate::status::DealStatus;

/// Happy-path statuses from offer to release, in order.
pub const CANONICAL_PATH: [DealStatus; 10] = [
    DealStatus::OfferPending,
    DealStatus::Accepted,
    DealStatus::AwaitingPayment,
    DealStatus::Funded,
    DealStatus::CreativeSubmitted,
    DealStatus::CreativeApproved,
    DealStatus::Scheduled,
    DealStatus::Published,
    DealStatus::DeliveryVerifying,
    DealStatus::CompletedReleased,
];

/// How a step renders relative to the deal's current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    /// Already passed.
    Done,
    /// The deal's current status.
    Current,
    /// Not reached yet.
    Upcoming,
}

/// One rendered step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineStep {
    /// Status this step represents.
    pub status: DealStatus,
    /// Rendering state.
    pub state: StepState,
    /// When the deal last entered the status, if recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at: Option<Timestamp>,
}

/// Build the progress steps for `deal`.
pub fn timeline_steps_for(deal: &Deal) -> Vec<TimelineStep> {
    let visited = |status: DealStatus| {
        deal.status == status || deal.timeline.iter().any(|entry| entry.status == status)
    };

    let mut path: Vec<DealStatus> = Vec::with_capacity(CANONICAL_PATH.len() + 2);
    if visited(DealStatus::Draft) {
        path.push(DealStatus::Draft);
    }
    path.push(DealStatus::OfferPending);
    if visited(DealStatus::Negotiating) {
        path.push(DealStatus::Negotiating);
    }
    path.extend_from_slice(&CANONICAL_PATH[1..]);

    let step = |status: DealStatus, state: StepState| TimelineStep {
        status,
        state,
        at: deal.entered_at(status),
    };

    if let Some(current) = path.iter().position(|s| *s == deal.status) {
        return path
            .iter()
            .enumerate()
            .map(|(i, status)| {
                let state = if i < current {
                    StepState::Done
                } else if i == current && !deal.status.is_terminal() {
                    StepState::Current
                } else if i == current {
                    StepState::Done
                } else {
                    StepState::Upcoming
                };
                step(*status, state)
            })
            .collect();
    }

    // Off the happy path: keep what was reached, then the detour.
    let reached = deal
        .timeline
        .iter()
        .filter_map(|entry| path.iter().position(|s| *s == entry.status))
        .max();
    let mut steps: Vec<TimelineStep> = match reached {
        Some(last) => path[..=last]
            .iter()
            .map(|status| step(*status, StepState::Done))
            .collect(),
        None => Vec::new(),
    };

    let mut detour: Vec<DealStatus> = Vec::new();
    for entry in &deal.timeline {
        if !path.contains(&entry.status) && !detour.contains(&entry.status) {
            detour.push(entry.status);
        }
    }
    if !detour.contains(&deal.status) {
        detour.push(deal.status);
    }
    let last = detour.len() - 1;
    for (i, status) in detour.into_iter().enumerate() {
        let state = if i == last && !status.is_terminal() {
            StepState::Current
        } else {
            StepState::Done
        };
        steps.push(step(status, state));
    }
    steps
}
