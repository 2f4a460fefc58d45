//! Upstream read API
//!
//! The stores read snapshots through [`UpstreamApi`]; [`ApiClient`] is the
//! HTTP implementation used by the binary.

pub mod client;

pub use client::ApiClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{DashboardSummary, Job};

/// Default number of executions returned with a single job
pub const DEFAULT_JOB_HISTORY_LIMIT: usize = 100;

/// Asynchronous reads against the monitoring backend
#[async_trait]
pub trait UpstreamApi: Send + Sync {
    /// All jobs with metrics computed over the range
    async fn get_jobs(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Job>>;

    /// One job with up to `limit` executions in the range, newest first
    async fn get_job(
        &self,
        id: u64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: usize,
    ) -> Result<Job>;

    /// Aggregated dashboard metrics for the range
    async fn get_dashboard_summary(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<DashboardSummary>;
}
