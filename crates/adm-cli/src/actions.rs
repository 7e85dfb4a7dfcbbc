//! # Actions Subcommand
//!
//! Offline policy lookup: which actions a role is offered at a status under
//! the current `ADM_CREATIVE_APPROVAL` / `ADM_DISPUTES` toggles. Never
//! contacts the API.

use anyhow::Result;
use clap::Args;

use adm_state::{plan, ActionPlan, DealStatus, PolicyConfig, Role};

/// Arguments for `adm actions`.
#[derive(Args, Debug)]
pub struct ActionsArgs {
    /// Deal status, e.g. `AWAITING_PAYMENT`.
    #[arg(long)]
    pub status: String,

    /// Viewer role: `ADVERTISER` or `OWNER`.
    #[arg(long)]
    pub role: String,

    /// Treat creative approval as disabled regardless of the environment.
    #[arg(long)]
    pub no_creative_approval: bool,

    /// Treat disputes as disabled regardless of the environment.
    #[arg(long)]
    pub no_disputes: bool,
}

/// Resolve the plan named by `args`.
pub fn resolve_plan(args: &ActionsArgs) -> Result<ActionPlan> {
    let status: DealStatus = args.status.trim().parse()?;
    let role: Role = args.role.trim().parse()?;

    let mut config = PolicyConfig::from_env();
    config.creative_approval &= !args.no_creative_approval;
    config.disputes &= !args.no_disputes;

    Ok(plan(status, role, &config))
}

/// Execute `adm actions`.
pub fn run_actions(args: &ActionsArgs, json: bool) -> Result<u8> {
    let plan = resolve_plan(args)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(0);
    }
    print_plan(&plan);
    Ok(0)
}

/// Human-readable rendering of a plan.
pub fn print_plan(plan: &ActionPlan) {
    if let Some(blocked) = plan.blocked {
        println!("flow blocked: {blocked:?}");
    }
    if plan.actions.is_empty() {
        println!("no actions available");
        return;
    }
    for action in &plan.actions {
        let target = action
            .target_status
            .map(|s| format!(" -> {s}"))
            .unwrap_or_default();
        let reason = if action.requires_reason {
            " (reason required)"
        } else {
            ""
        };
        println!("  {}{target}{reason}", action.kind);
    }
}
