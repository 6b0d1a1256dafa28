//! Refresh cycles.
//!
//! One refresh cycle fetches alerts, both decision collections and the
//! remote configuration as a concurrent batch with all-or-nothing
//! semantics: if any request fails the cycle fails, the previous snapshot
//! is retained and the dashboard status flips to degraded. Foreground
//! cycles (user-navigated) surface a loading state; background cycles
//! (timer-driven) update silently. The polling loop awaits each in-flight
//! batch before sleeping again, so cycles never overlap.

use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::api::AppState;
use crate::api_client::{ApiClient, FetchError};
use crate::buckets::bucket_series;
use crate::model::{Alert, Decision};
use crate::range::reanchor_sticky;
use crate::resolver;

/// Who asked for the cycle. Foreground shows a loading state; background
/// must not disturb it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshKind {
    Foreground,
    Background,
}

/// Observable dashboard status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashStatus {
    /// Data is current.
    Ok,
    /// A foreground cycle is in flight.
    Loading,
    /// The last cycle failed; prior data is still displayed.
    Degraded,
}

/// One successfully fetched batch.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub alerts: Vec<Alert>,
    pub decisions_active: Vec<Decision>,
    pub decisions_all: Vec<Decision>,
    pub lookback_days: u32,
    pub fetched_at: DateTime<Utc>,
}

/// Fetch one batch. All four requests run concurrently; the first failure
/// fails the whole cycle.
pub async fn fetch_snapshot(client: &ApiClient) -> Result<Snapshot, FetchError> {
    let (alerts, decisions_active, decisions_all, config) = tokio::join!(
        client.get_alerts(),
        client.get_decisions(false),
        client.get_decisions(true),
        client.get_config(),
    );

    Ok(Snapshot {
        alerts: alerts?,
        decisions_active: decisions_active?,
        decisions_all: decisions_all?,
        lookback_days: config?.lookback_days,
        fetched_at: Utc::now(),
    })
}

/// Run one refresh cycle against the shared state.
///
/// On success the snapshot is replaced and a sticky date range is
/// re-anchored to the newest buckets. On failure the previous snapshot
/// stays and the status becomes degraded.
pub async fn run_cycle(state: &AppState, kind: RefreshKind) -> DashStatus {
    if kind == RefreshKind::Foreground {
        state.dash.write().await.status = DashStatus::Loading;
    }

    match fetch_snapshot(&state.client).await {
        Ok(snapshot) => {
            let mut dash = state.dash.write().await;

            if dash.filter.range_sticky {
                if let Some(range) = dash.filter.date_range.clone() {
                    let now = Local::now();
                    let views = resolver::resolve(
                        &snapshot.alerts,
                        &snapshot.decisions_active,
                        &snapshot.decisions_all,
                        &dash.filter,
                        snapshot.lookback_days,
                        now,
                    );
                    let units = dash.granularity.window_units(snapshot.lookback_days);
                    let slider =
                        bucket_series(&views.slider.alerts, units, dash.granularity, None, now);
                    match reanchor_sticky(&range, &slider) {
                        Some(reanchored) => dash.filter.set_range(reanchored, true),
                        None => dash.filter.clear_range(),
                    }
                }
            }

            info!(
                alert_count = snapshot.alerts.len(),
                decision_count = snapshot.decisions_all.len(),
                lookback_days = snapshot.lookback_days,
                "Refresh cycle completed"
            );
            dash.snapshot = Some(snapshot);
            dash.status = DashStatus::Ok;
            DashStatus::Ok
        }
        Err(e) => {
            let mut dash = state.dash.write().await;
            dash.status = DashStatus::Degraded;
            warn!(
                foreground = matches!(kind, RefreshKind::Foreground),
                error = %e,
                "Refresh cycle failed, keeping previous data"
            );
            DashStatus::Degraded
        }
    }
}

/// Background polling task.
///
/// The interval is a watch channel so preference changes take effect on
/// the next tick; `None` turns polling off. Each iteration awaits the
/// cycle before sleeping again, which rules out overlapping batches.
pub struct Poller {
    handle: JoinHandle<()>,
}

impl Poller {
    pub fn spawn(state: AppState, mut interval: watch::Receiver<Option<Duration>>) -> Self {
        let handle = tokio::spawn(async move {
            loop {
                let current = *interval.borrow();
                match current {
                    Some(period) => {
                        tokio::select! {
                            _ = tokio::time::sleep(period) => {
                                run_cycle(&state, RefreshKind::Background).await;
                            }
                            changed = interval.changed() => {
                                if changed.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    None => {
                        // Polling is off; wait for the interval to change.
                        if interval.changed().await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Self { handle }
    }

    /// Stop polling. Safe to call with a cycle in flight; the previous
    /// snapshot stays in place.
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
