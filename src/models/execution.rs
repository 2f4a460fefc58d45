use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome reported by the runner for one check execution.
///
/// Keeps the exact wire spelling so statuses round-trip and match the keys
/// of a fetched `status_breakdown`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExecutionStatus {
    Success,
    Failure,
    Failed,
    Error,
    Warning,
    Running,
    Timeout,
    Other(String),
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failure => "failure",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Error => "error",
            ExecutionStatus::Warning => "warning",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Timeout => "timeout",
            ExecutionStatus::Other(raw) => raw,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionStatus::Success)
    }

    /// Any spelling of a failed check
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Failure
                | ExecutionStatus::Failed
                | ExecutionStatus::Error
                | ExecutionStatus::Timeout
        )
    }
}

impl From<String> for ExecutionStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "success" => ExecutionStatus::Success,
            "failure" => ExecutionStatus::Failure,
            "failed" => ExecutionStatus::Failed,
            "error" => ExecutionStatus::Error,
            "warning" => ExecutionStatus::Warning,
            "running" => ExecutionStatus::Running,
            "timeout" => ExecutionStatus::Timeout,
            _ => ExecutionStatus::Other(raw),
        }
    }
}

impl From<ExecutionStatus> for String {
    fn from(status: ExecutionStatus) -> Self {
        match status {
            ExecutionStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single job execution result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub id: u64,
    pub job_id: u64,
    pub status: ExecutionStatus,
    /// Response time in milliseconds
    #[serde(default)]
    pub response_time: i64,
    #[serde(default)]
    pub details: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        let parse = |s: &str| serde_json::from_value::<ExecutionStatus>(Value::from(s)).unwrap();

        assert_eq!(parse("success"), ExecutionStatus::Success);
        assert_eq!(parse("failed"), ExecutionStatus::Failed);
        assert_eq!(parse("failure"), ExecutionStatus::Failure);
        assert_eq!(parse("error"), ExecutionStatus::Error);
        assert_eq!(parse("timeout"), ExecutionStatus::Timeout);
        assert_eq!(parse("paused"), ExecutionStatus::Other("paused".to_string()));

        assert!(parse("failure").is_failure());
        assert!(parse("error").is_failure());
        assert!(!parse("paused").is_success());
    }

    #[test]
    fn test_status_round_trips_wire_spelling() {
        for raw in ["success", "failure", "failed", "error", "paused"] {
            let status: ExecutionStatus = serde_json::from_value(Value::from(raw)).unwrap();
            assert_eq!(status.as_str(), raw);
            assert_eq!(serde_json::to_value(&status).unwrap(), Value::from(raw));
        }
    }

    #[test]
    fn test_execution_ignores_extra_fields() {
        let raw = r#"{
            "id": 7,
            "job_id": 3,
            "status": "failure",
            "response_time": 120,
            "details": {"code": 500},
            "timestamp": "2024-05-01T10:00:00Z",
            "job": {"id": 0, "name": ""}
        }"#;

        let execution: Execution = serde_json::from_str(raw).unwrap();
        assert_eq!(execution.job_id, 3);
        assert_eq!(execution.status, ExecutionStatus::Failure);
        assert_eq!(execution.response_time, 120);
        assert_eq!(execution.timestamp.to_rfc3339(), "2024-05-01T10:00:00+00:00");
    }
}
