//! Jobs list store

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use super::{CacheState, CacheStore, JobEntry};
use crate::api::UpstreamApi;
use crate::date_range::DateRange;
use crate::models::{Execution, Job};

/// Every job with its recent executions
pub struct JobsStore {
    api: Arc<dyn UpstreamApi>,
    cache: CacheStore<Vec<JobEntry>>,
}

impl JobsStore {
    pub fn new(api: Arc<dyn UpstreamApi>) -> Self {
        Self {
            api,
            cache: CacheStore::new("jobs"),
        }
    }

    /// Fetch the job list for `range`
    pub async fn fetch_jobs(&self, range: &DateRange) -> bool {
        let api = Arc::clone(&self.api);
        let (from, to) = (range.from, range.to);
        self.cache
            .load(async move {
                let jobs = api.get_jobs(from, to).await?;
                debug!(count = jobs.len(), "Jobs fetched");
                Ok(jobs.into_iter().map(JobEntry::new).collect())
            })
            .await
    }

    /// Merge an execution into its job, if listed
    pub fn apply_execution(&self, execution: &Execution) -> bool {
        self.cache.patch(|entries| {
            match entries.iter_mut().find(|e| e.job.id == execution.job_id) {
                Some(entry) => {
                    entry.record(execution.clone());
                    true
                }
                None => false,
            }
        })
    }

    /// Patch a listed job's metadata
    pub fn apply_job_update(&self, update: &Job) -> bool {
        self.cache.patch(|entries| {
            match entries.iter_mut().find(|e| e.job.id == update.id) {
                Some(entry) => {
                    entry.job.apply_metadata(update);
                    true
                }
                None => false,
            }
        })
    }

    pub fn job(&self, id: u64) -> Option<JobEntry> {
        self.cache.inspect(|state| {
            state
                .data
                .as_ref()
                .and_then(|entries| entries.iter().find(|e| e.job.id == id).cloned())
        })
    }

    pub fn reset(&self) {
        self.cache.reset();
    }

    pub fn snapshot(&self) -> CacheState<Vec<JobEntry>> {
        self.cache.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<CacheState<Vec<JobEntry>>> {
        self.cache.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExecutionStatus;
    use crate::store::RECENT_EXECUTIONS;
    use crate::test_support::{execution, job, ts, StubApi};

    fn range() -> DateRange {
        DateRange::new(ts("2024-05-01T00:00:00Z"), ts("2024-05-08T00:00:00Z"), false).unwrap()
    }

    async fn loaded_store() -> (JobsStore, Arc<StubApi>) {
        let api = Arc::new(StubApi::default());
        *api.jobs.lock() = vec![job(1, "api"), job(2, "db")];
        let store = JobsStore::new(api.clone());
        assert!(store.fetch_jobs(&range()).await);
        (store, api)
    }

    #[tokio::test]
    async fn test_fetch_jobs() {
        let (store, api) = loaded_store().await;

        let state = store.snapshot();
        assert!(!state.loading);
        assert!(state.error.is_none());
        assert_eq!(state.data.map(|d| d.len()), Some(2));
        assert_eq!(*api.calls.lock(), vec!["get_jobs".to_string()]);
    }

    #[tokio::test]
    async fn test_fetch_failure_records_status() {
        let (store, api) = loaded_store().await;
        *api.fail_status.lock() = Some(500);

        store.fetch_jobs(&range()).await;

        let state = store.snapshot();
        assert!(state.data.is_none());
        assert_eq!(state.error.and_then(|e| e.status), Some(500));
    }

    #[tokio::test]
    async fn test_execution_merged_into_matching_job() {
        let (store, _api) = loaded_store().await;
        let event = execution(10, 2, ExecutionStatus::Failed, "2024-05-02T10:00:00Z");

        assert!(store.apply_execution(&event));

        let db = store.job(2).unwrap();
        assert_eq!(db.recent.len(), 1);
        assert_eq!(db.job.success_rate, 0.0);
        assert_eq!(db.job.last_execution, Some(event.timestamp));
        assert_eq!(store.job(1).unwrap().recent.len(), 0);
    }

    #[tokio::test]
    async fn test_execution_for_unknown_job_is_noop() {
        let (store, _api) = loaded_store().await;
        let before = store.snapshot();

        assert!(!store.apply_execution(&execution(
            10,
            99,
            ExecutionStatus::Success,
            "2024-05-02T10:00:00Z"
        )));
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_execution_before_fetch_is_noop() {
        let store = JobsStore::new(Arc::new(StubApi::default()));
        assert!(!store.apply_execution(&execution(
            1,
            1,
            ExecutionStatus::Success,
            "2024-05-02T10:00:00Z"
        )));
        assert!(store.snapshot().data.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_delivery_is_not_deduplicated() {
        let (store, _api) = loaded_store().await;
        let event = execution(10, 1, ExecutionStatus::Success, "2024-05-02T10:00:00Z");

        store.apply_execution(&event);
        store.apply_execution(&event);

        let ids: Vec<u64> = store.job(1).unwrap().recent.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![10, 10]);
    }

    #[tokio::test]
    async fn test_window_bounded_to_recent_executions() {
        let (store, _api) = loaded_store().await;
        for id in 0..25 {
            store.apply_execution(&execution(
                id,
                1,
                ExecutionStatus::Success,
                "2024-05-02T10:00:00Z",
            ));
        }

        let entry = store.job(1).unwrap();
        assert_eq!(entry.recent.len(), RECENT_EXECUTIONS);
        assert_eq!(entry.recent.newest().map(|e| e.id), Some(24));
        assert_eq!(entry.job.success_rate, 100.0);
    }

    #[tokio::test]
    async fn test_job_update_patches_metadata_only() {
        let (store, _api) = loaded_store().await;
        store.apply_execution(&execution(
            10,
            1,
            ExecutionStatus::Success,
            "2024-05-02T10:00:00Z",
        ));

        let mut update = job(1, "api-renamed");
        update.enabled = false;
        update.updated_at = ts("2024-05-03T00:00:00Z");
        assert!(store.apply_job_update(&update));

        let entry = store.job(1).unwrap();
        assert_eq!(entry.job.name, "api-renamed");
        assert!(!entry.job.enabled);
        assert_eq!(entry.job.updated_at, update.updated_at);
        assert_eq!(entry.job.success_rate, 100.0);
        assert_eq!(entry.recent.len(), 1);
    }

    #[tokio::test]
    async fn test_reset_clears_state() {
        let (store, _api) = loaded_store().await;
        store.reset();
        assert_eq!(store.snapshot(), CacheState::default());
    }
}
