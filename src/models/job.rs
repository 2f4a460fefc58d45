use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Execution;

/// A monitoring job with metrics computed for the requested range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: u64,
    pub name: String,
    /// Check type: http, tcp, dns, ssl, ping, ...
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Execution history, newest first (only present on single-job reads)
    #[serde(default)]
    pub executions: Vec<Execution>,
    /// Success rate (0-100)
    #[serde(default)]
    pub success_rate: f64,
    #[serde(default)]
    pub last_execution: Option<DateTime<Utc>>,
    /// Average response time in milliseconds
    #[serde(default)]
    pub avg_response_time: f64,
}

impl Job {
    /// Copy the job's configuration fields from a pushed update, leaving
    /// range-derived metrics alone
    pub fn apply_metadata(&mut self, update: &Job) {
        self.name.clone_from(&update.name);
        self.kind.clone_from(&update.kind);
        self.config.clone_from(&update.config);
        self.enabled = update.enabled;
        self.updated_at = update.updated_at;
    }
}
