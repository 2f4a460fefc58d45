//! Single-job detail store

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use super::{CacheState, CacheStore, JobEntry};
use crate::api::UpstreamApi;
use crate::date_range::DateRange;
use crate::models::{Execution, Job};

/// The job opened in the detail view
#[derive(Debug, Clone, PartialEq)]
pub struct JobDetail {
    /// Job with its recent-execution ring buffer, merged from live events
    pub entry: JobEntry,
    /// Execution history as fetched, newest first, up to the requested limit
    pub history: Vec<Execution>,
}

impl JobDetail {
    pub fn new(job: Job) -> Self {
        let history = job.executions.clone();
        Self {
            entry: JobEntry::new(job),
            history,
        }
    }

    pub fn job(&self) -> &Job {
        &self.entry.job
    }
}

/// Detail view cache
pub struct JobDetailStore {
    api: Arc<dyn UpstreamApi>,
    cache: CacheStore<JobDetail>,
}

impl JobDetailStore {
    pub fn new(api: Arc<dyn UpstreamApi>) -> Self {
        Self {
            api,
            cache: CacheStore::new("job_detail"),
        }
    }

    /// Fetch job `id` with up to `limit` executions in `range`
    pub async fn fetch_job(&self, id: u64, range: &DateRange, limit: usize) -> bool {
        let api = Arc::clone(&self.api);
        let (from, to) = (range.from, range.to);
        self.cache
            .load(async move {
                let job = api.get_job(id, from, to, limit).await?;
                debug!(id, executions = job.executions.len(), "Job detail fetched");
                Ok(JobDetail::new(job))
            })
            .await
    }

    /// Id of the job held, if any
    pub fn observed_job(&self) -> Option<u64> {
        self.cache
            .inspect(|state| state.data.as_ref().map(|detail| detail.job().id))
    }

    /// Merge an execution of the observed job
    pub fn apply_execution(&self, execution: &Execution) -> bool {
        self.cache.patch(|detail| {
            if detail.job().id != execution.job_id {
                return false;
            }
            detail.entry.record(execution.clone());
            true
        })
    }

    pub fn apply_job_update(&self, update: &Job) -> bool {
        self.cache.patch(|detail| {
            if detail.job().id != update.id {
                return false;
            }
            detail.entry.job.apply_metadata(update);
            true
        })
    }

    pub fn reset(&self) {
        self.cache.reset();
    }

    pub fn snapshot(&self) -> CacheState<JobDetail> {
        self.cache.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<CacheState<JobDetail>> {
        self.cache.subscribe()
    }
}
