//! Fixtures shared by the unit tests

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::json;

use crate::api::UpstreamApi;
use crate::error::{Result, SyncError};
use crate::models::{DashboardSummary, Execution, ExecutionStatus, Job, JobSummary};

pub fn ts(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .expect("valid RFC 3339 timestamp")
        .with_timezone(&Utc)
}

pub fn execution(id: u64, job_id: u64, status: ExecutionStatus, timestamp: &str) -> Execution {
    Execution {
        id,
        job_id,
        status,
        response_time: 100,
        details: None,
        timestamp: ts(timestamp),
    }
}

pub fn job(id: u64, name: &str) -> Job {
    Job {
        id,
        name: name.to_string(),
        kind: "http".to_string(),
        config: json!({"url": format!("https://{}.example.com", name)}),
        enabled: true,
        created_at: ts("2024-01-01T00:00:00Z"),
        updated_at: ts("2024-01-01T00:00:00Z"),
        executions: Vec::new(),
        success_rate: 0.0,
        last_execution: None,
        avg_response_time: 0.0,
    }
}

pub fn job_summary(id: u64, name: &str, success_rate: f64) -> JobSummary {
    JobSummary {
        id,
        name: name.to_string(),
        kind: "http".to_string(),
        enabled: true,
        success_rate,
        last_execution: None,
        avg_response_time: 0.0,
        execution_count: 0,
    }
}

pub fn summary(jobs: Vec<JobSummary>) -> DashboardSummary {
    DashboardSummary {
        total_jobs: jobs.len() as i64,
        active_jobs: jobs.iter().filter(|j| j.enabled).count() as i64,
        job_summaries: jobs,
        status_breakdown: HashMap::new(),
        ..DashboardSummary::default()
    }
}

/// Canned upstream responses
#[derive(Default)]
pub struct StubApi {
    pub jobs: Mutex<Vec<Job>>,
    pub job: Mutex<Option<Job>>,
    pub summary: Mutex<DashboardSummary>,
    /// When set, every read fails with this HTTP status
    pub fail_status: Mutex<Option<u16>>,
    pub calls: Mutex<Vec<String>>,
}

impl StubApi {
    fn check(&self, call: String) -> Result<()> {
        self.calls.lock().push(call);
        match *self.fail_status.lock() {
            Some(status) => Err(SyncError::HttpStatus {
                status,
                reason: "Internal Server Error".to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl UpstreamApi for StubApi {
    async fn get_jobs(&self, _from: DateTime<Utc>, _to: DateTime<Utc>) -> Result<Vec<Job>> {
        self.check("get_jobs".to_string())?;
        Ok(self.jobs.lock().clone())
    }

    async fn get_job(
        &self,
        id: u64,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
        limit: usize,
    ) -> Result<Job> {
        self.check(format!("get_job:{}:{}", id, limit))?;
        self.job
            .lock()
            .clone()
            .filter(|j| j.id == id)
            .ok_or_else(|| SyncError::HttpStatus {
                status: 404,
                reason: "Not Found".to_string(),
            })
    }

    async fn get_dashboard_summary(
        &self,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
    ) -> Result<DashboardSummary> {
        self.check("get_dashboard_summary".to_string())?;
        Ok(self.summary.lock().clone())
    }
}
