//! Dashboard summary store

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use super::{CacheState, CacheStore, ExecutionWindow};
use crate::api::UpstreamApi;
use crate::date_range::DateRange;
use crate::format::overall_success_rate;
use crate::models::{DashboardSummary, Execution, Job};

/// Entries kept in `recent_activity`
pub const RECENT_ACTIVITY: usize = 10;

/// Summary plus the per-job windows built from live executions
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardView {
    pub summary: DashboardSummary,
    pub windows: HashMap<u64, ExecutionWindow>,
}

impl DashboardView {
    pub fn new(summary: DashboardSummary) -> Self {
        Self {
            summary,
            windows: HashMap::new(),
        }
    }

    fn record(&mut self, execution: &Execution) -> bool {
        let summary = &mut self.summary;
        let Some(line) = summary
            .job_summaries
            .iter_mut()
            .find(|s| s.id == execution.job_id)
        else {
            return false;
        };

        let window = self.windows.entry(execution.job_id).or_default();
        window.push(execution.clone());

        line.success_rate = window.success_rate();
        line.last_execution = Some(execution.timestamp);
        line.avg_response_time = execution.response_time as f64;
        line.execution_count += 1;

        summary.total_executions += 1;
        *summary
            .status_breakdown
            .entry(execution.status.as_str().to_string())
            .or_insert(0) += 1;

        summary.recent_activity.insert(0, execution.clone());
        summary.recent_activity.truncate(RECENT_ACTIVITY);

        summary.overall_success_rate =
            overall_success_rate(summary.job_summaries.iter().map(|s| s.success_rate));
        true
    }
}

/// Aggregated dashboard metrics
pub struct DashboardStore {
    api: Arc<dyn UpstreamApi>,
    cache: CacheStore<DashboardView>,
}

impl DashboardStore {
    pub fn new(api: Arc<dyn UpstreamApi>) -> Self {
        Self {
            api,
            cache: CacheStore::new("dashboard"),
        }
    }

    /// Fetch the summary for `range`
    pub async fn fetch_summary(&self, range: &DateRange) -> bool {
        let api = Arc::clone(&self.api);
        let (from, to) = (range.from, range.to);
        self.cache
            .load(async move {
                let summary = api.get_dashboard_summary(from, to).await?;
                debug!(jobs = summary.total_jobs, "Dashboard summary fetched");
                Ok(DashboardView::new(summary))
            })
            .await
    }

    /// Merge an execution for a job on the dashboard
    pub fn apply_execution(&self, execution: &Execution) -> bool {
        self.cache.patch(|view| view.record(execution))
    }

    pub fn apply_job_update(&self, update: &Job) -> bool {
        self.cache.patch(|view| {
            match view
                .summary
                .job_summaries
                .iter_mut()
                .find(|s| s.id == update.id)
            {
                Some(line) => {
                    line.apply_metadata(update);
                    true
                }
                None => false,
            }
        })
    }

    /// Swap in a pushed summary, keeping windows of jobs still listed
    pub fn replace_summary(&self, summary: DashboardSummary) -> bool {
        self.cache.patch(|view| {
            view.windows
                .retain(|id, _| summary.job_summaries.iter().any(|s| s.id == *id));
            view.summary = summary;
            true
        })
    }

    pub fn reset(&self) {
        self.cache.reset();
    }

    pub fn snapshot(&self) -> CacheState<DashboardView> {
        self.cache.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<CacheState<DashboardView>> {
        self.cache.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExecutionStatus;
    use crate::test_support::{execution, job, job_summary, summary, ts, StubApi};

    fn range() -> DateRange {
        DateRange::new(ts("2024-05-01T00:00:00Z"), ts("2024-05-08T00:00:00Z"), false).unwrap()
    }

    async fn loaded_store() -> DashboardStore {
        let api = Arc::new(StubApi::default());
        let mut fetched = summary(vec![job_summary(1, "api", 90.0), job_summary(2, "db", 80.0)]);
        fetched.total_executions = 40;
        fetched.overall_success_rate = 85.0;
        *api.summary.lock() = fetched;

        let store = DashboardStore::new(api);
        assert!(store.fetch_summary(&range()).await);
        store
    }

    fn view(store: &DashboardStore) -> DashboardView {
        store.snapshot().data.unwrap()
    }

    #[tokio::test]
    async fn test_fetch_summary() {
        let store = loaded_store().await;
        let view = view(&store);
        assert_eq!(view.summary.total_jobs, 2);
        assert!(view.windows.is_empty());
    }

    #[tokio::test]
    async fn test_execution_updates_summary_line_and_totals() {
        let store = loaded_store().await;
        let mut event = execution(7, 2, ExecutionStatus::Success, "2024-05-02T10:00:00Z");
        event.response_time = 250;

        assert!(store.apply_execution(&event));

        let view = view(&store);
        let db = &view.summary.job_summaries[1];
        assert_eq!(db.success_rate, 100.0);
        assert_eq!(db.execution_count, 1);
        assert_eq!(db.avg_response_time, 250.0);
        assert_eq!(db.last_execution, Some(event.timestamp));

        assert_eq!(view.summary.total_executions, 41);
        assert_eq!(view.summary.status_breakdown.get("success"), Some(&1));
        assert_eq!(view.summary.recent_activity, vec![event]);
        assert_eq!(view.summary.overall_success_rate, 95.0);
        assert_eq!(view.windows.get(&2).map(ExecutionWindow::len), Some(1));
    }

    #[tokio::test]
    async fn test_recent_activity_bounded() {
        let store = loaded_store().await;
        for id in 0..15 {
            store.apply_execution(&execution(
                id,
                1,
                ExecutionStatus::Failed,
                "2024-05-02T10:00:00Z",
            ));
        }

        let view = view(&store);
        assert_eq!(view.summary.recent_activity.len(), RECENT_ACTIVITY);
        assert_eq!(view.summary.recent_activity[0].id, 14);
        assert_eq!(view.summary.status_breakdown.get("failed"), Some(&15));
        assert_eq!(view.summary.job_summaries[0].execution_count, 15);
    }

    #[tokio::test]
    async fn test_breakdown_keeps_wire_status_spelling() {
        let api = Arc::new(StubApi::default());
        let mut fetched = summary(vec![job_summary(1, "api", 90.0)]);
        fetched.status_breakdown = HashMap::from([("failure".to_string(), 4)]);
        *api.summary.lock() = fetched;
        let store = DashboardStore::new(api);
        store.fetch_summary(&range()).await;

        store.apply_execution(&execution(
            1,
            1,
            ExecutionStatus::Failure,
            "2024-05-02T10:00:00Z",
        ));

        let breakdown = view(&store).summary.status_breakdown;
        assert_eq!(breakdown.get("failure"), Some(&5));
        assert!(!breakdown.contains_key("failed"));
    }

    #[tokio::test]
    async fn test_execution_for_unlisted_job_is_noop() {
        let store = loaded_store().await;
        let before = store.snapshot();

        assert!(!store.apply_execution(&execution(
            1,
            42,
            ExecutionStatus::Success,
            "2024-05-02T10:00:00Z"
        )));
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_job_update_renames_summary_line() {
        let store = loaded_store().await;
        let mut update = job(1, "api-v2");
        update.enabled = false;

        assert!(store.apply_job_update(&update));

        let view = view(&store);
        assert_eq!(view.summary.job_summaries[0].name, "api-v2");
        assert!(!view.summary.job_summaries[0].enabled);
        assert_eq!(view.summary.job_summaries[0].success_rate, 90.0);
    }

    #[tokio::test]
    async fn test_replace_summary_keeps_windows_of_listed_jobs() {
        let store = loaded_store().await;
        store.apply_execution(&execution(1, 1, ExecutionStatus::Success, "2024-05-02T10:00:00Z"));
        store.apply_execution(&execution(2, 2, ExecutionStatus::Success, "2024-05-02T10:00:00Z"));

        let pushed = summary(vec![job_summary(2, "db", 75.0), job_summary(3, "dns", 100.0)]);
        assert!(store.replace_summary(pushed.clone()));

        let view = view(&store);
        assert_eq!(view.summary, pushed);
        assert!(!view.windows.contains_key(&1));
        assert!(view.windows.contains_key(&2));
    }

    #[tokio::test]
    async fn test_replace_summary_without_dashboard_is_noop() {
        let store = DashboardStore::new(Arc::new(StubApi::default()));
        assert!(!store.replace_summary(summary(vec![])));
        assert!(store.snapshot().data.is_none());
    }
}
