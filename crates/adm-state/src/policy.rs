//! # Action Policy Resolver
//!
//! Derives the actions a viewer may take on a deal from its status, the
//! viewer's role and the deployment's feature toggles. This is the single
//! source of legality for the interactive layer: every returned [`Action`]
//! corresponds to a row of [`PARTICIPANT_TRANSITIONS`] and can be presented
//! without re-validation.
//!
//! The resolver is pure and total. Terminal and unrecognized statuses
//! resolve to no actions.

use serde::Serialize;

use crate::status::{DealStatus, Role};
use crate::transition::{ActionKind, ParticipantTransition, PARTICIPANT_TRANSITIONS};

/// Feature toggles that narrow the offered actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyConfig {
    /// Whether the creative submit/approve sub-flow is enabled.
    pub creative_approval: bool,
    /// Whether participants may open disputes.
    pub disputes: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            creative_approval: true,
            disputes: true,
        }
    }
}

impl PolicyConfig {
    /// Load toggles from the environment.
    ///
    /// Variables (`true`/`false`/`1`/`0`, case-insensitive; anything else
    /// keeps the default):
    /// - `ADM_CREATIVE_APPROVAL` (default: `true`)
    /// - `ADM_DISPUTES` (default: `true`)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            creative_approval: env_flag("ADM_CREATIVE_APPROVAL", defaults.creative_approval),
            disputes: env_flag("ADM_DISPUTES", defaults.disputes),
        }
    }
}

fn env_flag(var: &str, default: bool) -> bool {
    std::env::var(var)
        .ok()
        .and_then(|raw| parse_flag(&raw))
        .unwrap_or(default)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// An action offered to the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// What the action does.
    #[serde(rename = "type")]
    pub kind: ActionKind,
    /// Status the backend is asked to move to; `None` for `pay`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_status: Option<DealStatus>,
    /// Whether the user must supply a reason.
    pub requires_reason: bool,
    /// Translation key for the button label.
    pub i18n_key: &'static str,
}

impl From<&ParticipantTransition> for Action {
    fn from(row: &ParticipantTransition) -> Self {
        Self {
            kind: row.action,
            target_status: row.to,
            requires_reason: row.requires_reason,
            i18n_key: row.action.i18n_key(),
        }
    }
}

/// Why the normal flow is held at the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockedReason {
    /// The deal sits in the creative stage but creative approval is off.
    CreativeApprovalDisabled,
}

/// Resolved actions plus any reason the flow cannot proceed normally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActionPlan {
    /// Actions to present, in table order.
    pub actions: Vec<Action>,
    /// Set when the flow is held rather than silently skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked: Option<BlockedReason>,
}

/// Resolve the plan for `status` viewed as `role`.
pub fn plan(status: DealStatus, role: Role, config: &PolicyConfig) -> ActionPlan {
    if status.is_terminal() || status == DealStatus::Unknown {
        return ActionPlan::default();
    }

    let actions = status
        .participant_transitions(role)
        .filter(|row| config.disputes || row.action != ActionKind::OpenDispute)
        .filter(|row| config.creative_approval || !row.enters_creative_stage())
        .map(Action::from)
        .collect();

    let in_creative_stage = matches!(
        status,
        DealStatus::Funded | DealStatus::CreativeSubmitted | DealStatus::CreativeApproved
    );
    let blocked = (!config.creative_approval && in_creative_stage)
        .then_some(BlockedReason::CreativeApprovalDisabled);

    ActionPlan { actions, blocked }
}

/// The actions `role` may take on a deal in `status`.
pub fn resolve(status: DealStatus, role: Role, config: &PolicyConfig) -> Vec<Action> {
    plan(status, role, config).actions
}

/// The offered action of `kind`, if any.
pub fn find_action(
    status: DealStatus,
    role: Role,
    config: &PolicyConfig,
    kind: ActionKind,
) -> Option<Action> {
    resolve(status, role, config)
        .into_iter()
        .find(|action| action.kind == kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(actions: &[Action]) -> Vec<ActionKind> {
        actions.iter().map(|a| a.kind).collect()
    }

    #[test]
    fn draft_offers_send_and_cancel_to_advertiser_only() {
        let config = PolicyConfig::default();
        assert_eq!(
            kinds(&resolve(DealStatus::Draft, Role::Advertiser, &config)),
            vec![ActionKind::SendOffer, ActionKind::Cancel]
        );
        assert!(resolve(DealStatus::Draft, Role::Owner, &config).is_empty());
    }

    #[test]
    fn pay_has_no_target_status() {
        let action = find_action(
            DealStatus::AwaitingPayment,
            Role::Advertiser,
            &PolicyConfig::default(),
            ActionKind::Pay,
        )
        .unwrap();
        assert_eq!(action.target_status, None);
        assert!(!action.requires_reason);
        assert_eq!(action.i18n_key, "deal.action.pay");
    }

    #[test]
    fn disputes_toggle_removes_open_dispute() {
        let config = PolicyConfig {
            disputes: false,
            ..PolicyConfig::default()
        };
        for status in DealStatus::ALL {
            for role in Role::ALL {
                assert!(find_action(status, role, &config, ActionKind::OpenDispute).is_none());
            }
        }
        assert!(find_action(
            DealStatus::Published,
            Role::Owner,
            &PolicyConfig::default(),
            ActionKind::OpenDispute
        )
        .is_some());
    }

    #[test]
    fn creative_approval_off_blocks_the_creative_stage() {
        let config = PolicyConfig {
            creative_approval: false,
            ..PolicyConfig::default()
        };
        let funded = plan(DealStatus::Funded, Role::Owner, &config);
        assert_eq!(funded.blocked, Some(BlockedReason::CreativeApprovalDisabled));
        assert_eq!(kinds(&funded.actions), vec![ActionKind::OpenDispute]);

        let submitted = plan(DealStatus::CreativeSubmitted, Role::Advertiser, &config);
        assert_eq!(submitted.blocked, Some(BlockedReason::CreativeApprovalDisabled));
        assert_eq!(
            kinds(&submitted.actions),
            vec![ActionKind::RequestRevision, ActionKind::OpenDispute]
        );

        let awaiting = plan(DealStatus::AwaitingPayment, Role::Advertiser, &config);
        assert_eq!(awaiting.blocked, None);
    }

    #[test]
    fn unknown_status_resolves_to_nothing() {
        for role in Role::ALL {
            assert_eq!(plan(DealStatus::Unknown, role, &PolicyConfig::default()), ActionPlan::default());
        }
    }

    #[test]
    fn action_serializes_with_type_tag() {
        let action = find_action(
            DealStatus::OfferPending,
            Role::Owner,
            &PolicyConfig::default(),
            ActionKind::CounterOffer,
        )
        .unwrap();
        let json = serde_json::to_value(action).unwrap();
        assert_eq!(json["type"], "counter_offer");
        assert_eq!(json["targetStatus"], "NEGOTIATING");
        assert_eq!(json["requiresReason"], true);
        assert_eq!(json["i18nKey"], "deal.action.counter_offer");
    }

    #[test]
    fn parse_flag_accepts_words_and_digits() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" 0 "), Some(false));
        assert_eq!(parse_flag("yes"), None);
    }
}
