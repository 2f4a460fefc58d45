use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Execution, Job};

/// Aggregated dashboard metrics for a date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DashboardSummary {
    #[serde(default)]
    pub total_jobs: i64,
    #[serde(default)]
    pub active_jobs: i64,
    /// Average of per-job success rates (0-100)
    #[serde(default)]
    pub overall_success_rate: f64,
    #[serde(default)]
    pub total_executions: i64,
    #[serde(default)]
    pub job_summaries: Vec<JobSummary>,
    /// Latest executions across all jobs, newest first
    #[serde(default)]
    pub recent_activity: Vec<Execution>,
    #[serde(default)]
    pub status_breakdown: HashMap<String, i64>,
    #[serde(default)]
    pub type_breakdown: HashMap<String, i64>,
}

/// Per-job line of the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub success_rate: f64,
    #[serde(default)]
    pub last_execution: Option<DateTime<Utc>>,
    #[serde(default)]
    pub avg_response_time: f64,
    #[serde(default)]
    pub execution_count: i64,
}

impl JobSummary {
    pub fn apply_metadata(&mut self, update: &Job) {
        self.name.clone_from(&update.name);
        self.kind.clone_from(&update.kind);
        self.enabled = update.enabled;
    }
}

/// Upstream health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
}
