//! # Escrow Deposit Watcher
//!
//! Polls a [`DepositSource`] for one deal until the deposit reaches a
//! terminal status, the wall-clock timeout passes, or the watch is
//! cancelled.
//!
//! ## Polling
//!
//! Ticks come from a `tokio::time::interval` with
//! [`MissedTickBehavior::Delay`]. Each tick issues one request and awaits it
//! before the next tick, so requests for a deal never overlap. A failed
//! poll is logged and retried on the next tick.
//!
//! ## Termination
//!
//! | Deposit status | Effect |
//! |----------------|--------|
//! | `TX_DETECTED`, `CONFIRMING` | continue, `Progress` |
//! | `UNDERPAID` | continue, `Underpaid` |
//! | `OVERPAID` | continue, `Overpaid` |
//! | `AWAITING_OPERATOR_REVIEW` | continue, `UnderReview` |
//! | `AWAITING_PAYMENT`, unknown | continue silently |
//! | `CONFIRMED` | stop, clear intent, `Confirmed` |
//! | `EXPIRED` | stop, clear intent, `Expired` |
//! | `REJECTED` | stop, clear intent, `Rejected` |
//! | timeout | stop, clear intent, `TimedOut` |
//!
//! Cancellation is checked after every awaited fetch. A cancelled watch
//! never touches the intent store.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::time::{Instant, MissedTickBehavior};

use adm_core::{DealId, NanoAmount};

use crate::deposit::{DepositInfo, DepositSource, DepositStatus};
use crate::intent::{blocking, IntentStore};
use crate::payment::PaymentFailure;

/// Default delay between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Default wall-clock bound on a watch.
pub const DEFAULT_WATCH_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Polling cadence and bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchConfig {
    /// Delay between polls.
    pub poll_interval: Duration,
    /// Give up after this long without a terminal status.
    pub timeout: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_WATCH_TIMEOUT,
        }
    }
}

impl WatchConfig {
    /// Load from the environment.
    ///
    /// Variables:
    /// - `ADM_POLL_INTERVAL_SECS` (default: 3, zero is ignored)
    /// - `ADM_WATCH_TIMEOUT_SECS` (default: 600)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            poll_interval: env_secs("ADM_POLL_INTERVAL_SECS")
                .filter(|d| !d.is_zero())
                .unwrap_or(defaults.poll_interval),
            timeout: env_secs("ADM_WATCH_TIMEOUT_SECS").unwrap_or(defaults.timeout),
        }
    }
}

fn env_secs(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Something a watch observed, streamed to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WatchEvent {
    /// The transfer was seen and is gathering confirmations.
    Progress {
        /// `TX_DETECTED` or `CONFIRMING`.
        status: DepositStatus,
        /// Confirmations so far.
        current: u32,
        /// Confirmations needed.
        required: u32,
    },
    /// Less than the expected amount arrived. Not fatal.
    Underpaid {
        /// Amount observed.
        received: NanoAmount,
        /// Missing amount, when the expected amount is known.
        #[serde(skip_serializing_if = "Option::is_none")]
        shortfall: Option<NanoAmount>,
    },
    /// More than the expected amount arrived.
    Overpaid {
        /// Amount observed.
        received: NanoAmount,
        /// Surplus, when the expected amount is known.
        #[serde(skip_serializing_if = "Option::is_none")]
        excess: Option<NanoAmount>,
    },
    /// An operator is reviewing the deposit.
    UnderReview,
    /// The deposit is confirmed. Terminal.
    Confirmed {
        /// Hash of the confirmed transfer.
        #[serde(skip_serializing_if = "Option::is_none")]
        tx_hash: Option<String>,
    },
    /// The deposit window closed. Terminal.
    Expired,
    /// The ledger refused the deposit. Terminal.
    Rejected,
    /// Local polling gave up. Terminal.
    TimedOut,
}

/// How a watch ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WatchOutcome {
    /// The deposit is confirmed.
    Confirmed {
        /// Hash of the confirmed transfer.
        #[serde(skip_serializing_if = "Option::is_none")]
        tx_hash: Option<String>,
    },
    /// The payment will not complete.
    Failed {
        /// Which way it failed.
        failure: PaymentFailure,
    },
    /// The watch was cancelled; the intent is untouched.
    Cancelled,
}

/// One deal's polling loop. Built by the registry, consumed by [`DepositWatch::run`].
pub(crate) struct DepositWatch {
    pub(crate) deal_id: DealId,
    pub(crate) expected: Option<NanoAmount>,
    pub(crate) source: Arc<dyn DepositSource>,
    pub(crate) store: Arc<dyn IntentStore>,
    pub(crate) config: WatchConfig,
    pub(crate) events: broadcast::Sender<WatchEvent>,
    pub(crate) cancel: watch::Receiver<bool>,
}

impl DepositWatch {
    pub(crate) async fn run(self) -> WatchOutcome {
        let DepositWatch {
            deal_id,
            expected,
            source,
            store,
            config,
            events,
            mut cancel,
        } = self;

        let deadline = Instant::now() + config.timeout;
        let mut ticker = tokio::time::interval(config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_event: Option<WatchEvent> = None;

        tracing::info!(deal_id = %deal_id, timeout_secs = config.timeout.as_secs(), "deposit watch started");

        loop {
            tokio::select! {
                biased;
                _ = cancelled(&mut cancel) => return on_cancel(&deal_id),
                _ = tokio::time::sleep_until(deadline) => {
                    return finish(&deal_id, &store, &events, WatchEvent::TimedOut).await;
                }
                _ = ticker.tick() => {}
            }

            let result = tokio::select! {
                biased;
                _ = cancelled(&mut cancel) => return on_cancel(&deal_id),
                _ = tokio::time::sleep_until(deadline) => {
                    return finish(&deal_id, &store, &events, WatchEvent::TimedOut).await;
                }
                result = source.deposit_info(&deal_id) => result,
            };
            if *cancel.borrow() {
                return on_cancel(&deal_id);
            }

            let info = match result {
                Ok(info) => info,
                Err(e) => {
                    tracing::warn!(deal_id = %deal_id, error = %e, "deposit poll failed, retrying next tick");
                    continue;
                }
            };
            tracing::debug!(
                deal_id = %deal_id,
                status = ?info.status,
                confirmations = info.current_confirmations,
                "deposit polled"
            );

            if let Some(terminal) = terminal_event(&info) {
                return finish(&deal_id, &store, &events, terminal).await;
            }

            // Unchanged snapshots are not re-reported; a changed amount is.
            let event = progress_event(&info, expected);
            if event == last_event {
                continue;
            }
            last_event = event.clone();
            if let Some(event) = event {
                let _ = events.send(event);
            }
        }
    }
}

async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    // A dropped sender counts as cancellation.
    let _ = cancel.wait_for(|flag| *flag).await;
}

fn on_cancel(deal_id: &DealId) -> WatchOutcome {
    tracing::info!(deal_id = %deal_id, "deposit watch cancelled");
    WatchOutcome::Cancelled
}

fn terminal_event(info: &DepositInfo) -> Option<WatchEvent> {
    match info.status {
        DepositStatus::Confirmed => Some(WatchEvent::Confirmed {
            tx_hash: info.tx_hash.clone(),
        }),
        DepositStatus::Expired => Some(WatchEvent::Expired),
        DepositStatus::Rejected => Some(WatchEvent::Rejected),
        _ => None,
    }
}

fn progress_event(info: &DepositInfo, expected: Option<NanoAmount>) -> Option<WatchEvent> {
    match info.status {
        DepositStatus::TxDetected | DepositStatus::Confirming => Some(WatchEvent::Progress {
            status: info.status,
            current: info.current_confirmations,
            required: info.required_confirmations,
        }),
        DepositStatus::Underpaid => Some(WatchEvent::Underpaid {
            received: info.amount_nano,
            shortfall: expected.and_then(|e| info.amount_shortfall(e)),
        }),
        DepositStatus::Overpaid => Some(WatchEvent::Overpaid {
            received: info.amount_nano,
            excess: expected.and_then(|e| info.amount_excess(e)),
        }),
        DepositStatus::AwaitingOperatorReview => Some(WatchEvent::UnderReview),
        DepositStatus::AwaitingPayment
        | DepositStatus::Unknown
        | DepositStatus::Confirmed
        | DepositStatus::Expired
        | DepositStatus::Rejected => None,
    }
}

async fn finish(
    deal_id: &DealId,
    store: &Arc<dyn IntentStore>,
    events: &broadcast::Sender<WatchEvent>,
    terminal: WatchEvent,
) -> WatchOutcome {
    let id = deal_id.clone();
    if let Err(e) = blocking(store, move |store| store.clear(&id)).await {
        tracing::warn!(deal_id = %deal_id, error = %e, "failed to clear payment intent");
    }
    let outcome = match &terminal {
        WatchEvent::Confirmed { tx_hash } => WatchOutcome::Confirmed {
            tx_hash: tx_hash.clone(),
        },
        WatchEvent::Expired => WatchOutcome::Failed {
            failure: PaymentFailure::Expired,
        },
        WatchEvent::Rejected => WatchOutcome::Failed {
            failure: PaymentFailure::Rejected,
        },
        _ => WatchOutcome::Failed {
            failure: PaymentFailure::TimedOut,
        },
    };
    tracing::info!(deal_id = %deal_id, outcome = ?outcome, "deposit watch finished");
    let _ = events.send(terminal);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(status: DepositStatus, amount: u64) -> DepositInfo {
        DepositInfo {
            escrow_address: "EQ-escrow".into(),
            amount_nano: NanoAmount::new(amount),
            status,
            current_confirmations: 1,
            required_confirmations: 2,
            tx_hash: Some("tx-1".into()),
            expires_at: None,
        }
    }

    #[test]
    fn terminal_statuses_map_to_terminal_events() {
        assert_eq!(
            terminal_event(&info(DepositStatus::Confirmed, 10)),
            Some(WatchEvent::Confirmed {
                tx_hash: Some("tx-1".into())
            })
        );
        assert_eq!(terminal_event(&info(DepositStatus::Expired, 0)), Some(WatchEvent::Expired));
        assert_eq!(terminal_event(&info(DepositStatus::Rejected, 0)), Some(WatchEvent::Rejected));
        assert_eq!(terminal_event(&info(DepositStatus::Overpaid, 0)), None);
    }

    #[test]
    fn underpaid_reports_shortfall_when_expected_known() {
        let event = progress_event(&info(DepositStatus::Underpaid, 600), Some(NanoAmount::new(1_000)));
        assert_eq!(
            event,
            Some(WatchEvent::Underpaid {
                received: NanoAmount::new(600),
                shortfall: Some(NanoAmount::new(400)),
            })
        );
        let event = progress_event(&info(DepositStatus::Underpaid, 600), None);
        assert!(matches!(event, Some(WatchEvent::Underpaid { shortfall: None, .. })));
    }

    #[test]
    fn silent_statuses_emit_nothing() {
        assert_eq!(progress_event(&info(DepositStatus::AwaitingPayment, 0), None), None);
        assert_eq!(progress_event(&info(DepositStatus::Unknown, 0), None), None);
    }

    #[test]
    fn event_wire_shape() {
        let json = serde_json::to_value(WatchEvent::Progress {
            status: DepositStatus::Confirming,
            current: 1,
            required: 2,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "progress", "status": "CONFIRMING", "current": 1, "required": 2})
        );
    }
}
