//! Synchronization bootstrap
//!
//! Wires the push channel to the view stores: one handler per event kind,
//! each gating the event on the active date range before merging it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::connection::ConnectionManager;
use super::dispatcher::Subscription;
use crate::date_range::{format_instant, DateRangeController};
use crate::models::{EventKind, LiveEvent};
use crate::store::{DashboardStore, JobDetailStore, JobsStore};

/// Everything a live event may be merged into
#[derive(Clone)]
pub struct SyncTargets {
    pub range: Arc<DateRangeController>,
    pub jobs: Arc<JobsStore>,
    pub dashboard: Arc<DashboardStore>,
    pub job_detail: Arc<JobDetailStore>,
}

impl SyncTargets {
    /// Gate `event` on the active range, then merge it into every store.
    ///
    /// Returns whether the event passed the gate.
    pub fn apply(&self, event: &LiveEvent, received_at: DateTime<Utc>) -> bool {
        let range = self.range.current();
        let timestamp = event.gate_timestamp(received_at);
        if !range.accepts(timestamp) {
            debug!(
                kind = %event.kind(),
                timestamp = %format_instant(timestamp),
                from = %format_instant(range.from),
                to = %format_instant(range.to),
                live = range.is_to_date_live,
                "Event outside active range, skipped"
            );
            return false;
        }

        match event {
            LiveEvent::ExecutionCreated(execution) => {
                let jobs = self.jobs.apply_execution(execution);
                let dashboard = self.dashboard.apply_execution(execution);
                let detail = self.job_detail.apply_execution(execution);
                debug!(
                    job_id = execution.job_id,
                    status = %execution.status,
                    jobs,
                    dashboard,
                    detail,
                    "Execution merged"
                );
            }
            LiveEvent::JobUpdated(job) => {
                let jobs = self.jobs.apply_job_update(job);
                let dashboard = self.dashboard.apply_job_update(job);
                let detail = self.job_detail.apply_job_update(job);
                debug!(job_id = job.id, jobs, dashboard, detail, "Job update merged");
            }
            LiveEvent::DashboardUpdated(summary) => {
                let dashboard = self.dashboard.replace_summary(summary.clone());
                debug!(dashboard, "Dashboard summary merged");
            }
        }
        true
    }
}

/// Live synchronization started by [`start`]
#[must_use = "dropping the handle leaves the channel open; call teardown()"]
pub struct SyncHandle {
    subscriptions: Vec<Subscription>,
    connection: Option<ConnectionManager>,
}

impl SyncHandle {
    pub fn is_active(&self) -> bool {
        self.connection.is_some()
    }

    /// Unsubscribe every handler and disconnect. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };

        for subscription in self.subscriptions.drain(..) {
            subscription.unsubscribe();
        }
        connection.disconnect();
        info!("Live sync stopped");
    }
}

/// Register the gate-then-merge handlers and open the channel at `url`
pub fn start(connection: &ConnectionManager, url: &str, targets: SyncTargets) -> SyncHandle {
    let dispatcher = connection.dispatcher();
    let subscriptions = EventKind::ALL
        .into_iter()
        .map(|kind| {
            let targets = targets.clone();
            dispatcher.on(kind, move |event| {
                targets.apply(event, Utc::now());
                Ok(())
            })
        })
        .collect();

    connection.connect(url);
    info!(%url, "Live sync started");

    SyncHandle {
        subscriptions,
        connection: Some(connection.clone()),
    }
}
