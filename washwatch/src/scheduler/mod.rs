//! Notification sweep: decides which pending notifications are fulfilled,
//! re-estimates the rest, and schedules its own next run.

pub mod wake;

pub use wake::{TokioWakeScheduler, WakeScheduler};

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use rooms_status::model::MachineStatus;

use crate::Result;
use crate::notifier::Notifier;
use crate::refresher::RoomRefresher;
use crate::store::{MachineStore, StoredMachine};

/// Wake token owned by the notification sweep. At most one wake is ever
/// outstanding for it.
pub const NOTIFICATION_WAKE_TOKEN: &str = "pending-notification-check";

const SECONDS_PER_MINUTE: u64 = 60;

/// Policy knobs for estimating when a watched machine will be ready.
///
/// The factor deliberately under-estimates so the next check lands a little
/// early; the per-status defaults cover machines that report no time at
/// all. These are product policy, not derived values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatePolicy {
    /// Scale applied to a reported time remaining.
    #[serde(default = "default_early_check_factor")]
    pub early_check_factor: f64,
    /// Floor for any re-check interval.
    #[serde(default = "default_min_recheck_secs")]
    pub min_recheck_secs: u64,
    #[serde(default = "default_cycle_complete_secs")]
    pub default_cycle_complete_secs: u64,
    #[serde(default = "default_in_use_secs")]
    pub default_in_use_secs: u64,
    #[serde(default = "default_unavailable_secs")]
    pub default_unavailable_secs: u64,
    #[serde(default = "default_unknown_secs")]
    pub default_unknown_secs: u64,
}

fn default_early_check_factor() -> f64 {
    0.6
}

fn default_min_recheck_secs() -> u64 {
    SECONDS_PER_MINUTE
}

fn default_cycle_complete_secs() -> u64 {
    5 * SECONDS_PER_MINUTE
}

fn default_in_use_secs() -> u64 {
    5 * SECONDS_PER_MINUTE
}

fn default_unavailable_secs() -> u64 {
    45 * SECONDS_PER_MINUTE
}

fn default_unknown_secs() -> u64 {
    30 * SECONDS_PER_MINUTE
}

impl Default for EstimatePolicy {
    fn default() -> Self {
        Self {
            early_check_factor: default_early_check_factor(),
            min_recheck_secs: default_min_recheck_secs(),
            default_cycle_complete_secs: default_cycle_complete_secs(),
            default_in_use_secs: default_in_use_secs(),
            default_unavailable_secs: default_unavailable_secs(),
            default_unknown_secs: default_unknown_secs(),
        }
    }
}

impl EstimatePolicy {
    fn min_recheck(&self) -> Duration {
        Duration::from_secs(self.min_recheck_secs)
    }

    fn default_for(&self, status: MachineStatus) -> Duration {
        let seconds = match status {
            MachineStatus::CycleComplete => self.default_cycle_complete_secs,
            MachineStatus::InUse => self.default_in_use_secs,
            MachineStatus::Unavailable => self.default_unavailable_secs,
            _ => self.default_unknown_secs,
        };
        Duration::from_secs(seconds)
    }

    /// How long until this machine is worth checking again.
    pub fn remaining_for(&self, record: &StoredMachine) -> Duration {
        match record.machine.time_remaining {
            Some(reported) if reported >= Duration::from_secs(1) => {
                reported.mul_f64(self.early_check_factor).max(self.min_recheck())
            }
            _ => self.default_for(record.machine.status),
        }
    }
}

/// Result of one sweep, for callers and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    pub fulfilled: usize,
    pub still_pending: usize,
    pub next_wake: Option<DateTime<Utc>>,
}

/// Stateless, re-entrant notification sweep.
///
/// Each run refreshes every watched room, resolves fulfilled notifications,
/// re-estimates the rest, and asks the wake scheduler for the next run.
pub struct NotificationScheduler<S: MachineStore> {
    refresher: Arc<RoomRefresher<S>>,
    store: Arc<S>,
    notifier: Arc<dyn Notifier>,
    wake: Arc<dyn WakeScheduler>,
    policy: EstimatePolicy,
}

impl<S: MachineStore> NotificationScheduler<S> {
    pub fn new(
        refresher: Arc<RoomRefresher<S>>,
        store: Arc<S>,
        notifier: Arc<dyn Notifier>,
        wake: Arc<dyn WakeScheduler>,
        policy: EstimatePolicy,
    ) -> Self {
        Self {
            refresher,
            store,
            notifier,
            wake,
            policy,
        }
    }

    /// Run one sweep to completion.
    ///
    /// A room whose refresh fails keeps its notifications pending with their
    /// previous estimates; only store failures abort the cycle.
    pub async fn run_sweep(&self) -> Result<SweepSummary> {
        let pending = self.store.pending_by_room().await?;
        if pending.is_empty() {
            debug!("no pending notifications; nothing to sweep");
            return Ok(SweepSummary {
                fulfilled: 0,
                still_pending: 0,
                next_wake: None,
            });
        }

        let mut fulfilled = 0usize;

        for (&room_id, notifications) in &pending {
            let outcome = self.refresher.refresh(room_id).await?;
            if !outcome.is_success() {
                debug!(
                    room_id,
                    pending = notifications.len(),
                    "refresh failed; estimates left unchanged"
                );
                continue;
            }

            let machines = self.store.machines_in_room(room_id).await?;

            for notification in notifications {
                let Some(current) = machines
                    .iter()
                    .find(|record| record.machine.key() == notification.machine)
                else {
                    // Not observed in this fetch; treat as not yet ready.
                    debug!(
                        room_id,
                        notification = notification.id,
                        "watched machine not in the fresh set"
                    );
                    continue;
                };

                if current.machine.status.satisfies(notification.desired_status) {
                    fulfilled += 1;
                    self.store.delete_pending(notification.id).await?;
                } else {
                    let estimate = current.last_updated + self.policy.remaining_for(current);
                    self.store
                        .update_pending_estimate(notification.id, estimate)
                        .await?;
                }
            }
        }

        if fulfilled > 0 {
            // One alert summarizing the sweep, never one per machine.
            if let Err(error) = self.notifier.notify_ready(fulfilled).await {
                warn!(%error, "failed to deliver ready notification");
            }
        }

        // The next wake is the earliest estimate across everything still
        // pending, including rooms this sweep could not refresh.
        let remaining = self.store.pending_by_room().await?;
        let still_pending = remaining.values().map(Vec::len).sum();
        let next_wake = remaining
            .values()
            .flatten()
            .filter_map(|notification| notification.estimated_completion_at)
            .min();

        if let Some(at) = next_wake {
            self.wake.schedule_wake_at(NOTIFICATION_WAKE_TOKEN, at);
        }

        info!(fulfilled, still_pending, ?next_wake, "notification sweep complete");
        Ok(SweepSummary {
            fulfilled,
            still_pending,
            next_wake,
        })
    }
}
