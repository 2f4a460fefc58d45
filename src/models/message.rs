use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{DashboardSummary, Execution, Job};

/// Wire unit of the push channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

/// Event kinds understood by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ExecutionCreated,
    JobUpdated,
    DashboardUpdated,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [
        EventKind::ExecutionCreated,
        EventKind::JobUpdated,
        EventKind::DashboardUpdated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ExecutionCreated => "execution_created",
            EventKind::JobUpdated => "job_updated",
            EventKind::DashboardUpdated => "dashboard_updated",
        }
    }

    /// Map a wire `type` to a known kind; unknown kinds yield `None`
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "execution_created" => Some(EventKind::ExecutionCreated),
            "job_updated" => Some(EventKind::JobUpdated),
            "dashboard_updated" => Some(EventKind::DashboardUpdated),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A decoded push-channel event
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    ExecutionCreated(Execution),
    JobUpdated(Job),
    DashboardUpdated(DashboardSummary),
}

impl LiveEvent {
    /// Decode the payload of an envelope whose kind is already known
    pub fn decode(kind: EventKind, data: Value) -> serde_json::Result<Self> {
        Ok(match kind {
            EventKind::ExecutionCreated => LiveEvent::ExecutionCreated(serde_json::from_value(data)?),
            EventKind::JobUpdated => LiveEvent::JobUpdated(serde_json::from_value(data)?),
            EventKind::DashboardUpdated => LiveEvent::DashboardUpdated(serde_json::from_value(data)?),
        })
    }

    pub fn kind(&self) -> EventKind {
        match self {
            LiveEvent::ExecutionCreated(_) => EventKind::ExecutionCreated,
            LiveEvent::JobUpdated(_) => EventKind::JobUpdated,
            LiveEvent::DashboardUpdated(_) => EventKind::DashboardUpdated,
        }
    }

    /// Instant checked against the active date range.
    ///
    /// Dashboard summaries carry no timestamp of their own and describe the
    /// moment they were pushed, so they are gated on `received_at`.
    pub fn gate_timestamp(&self, received_at: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            LiveEvent::ExecutionCreated(execution) => execution.timestamp,
            LiveEvent::JobUpdated(job) => job.updated_at,
            LiveEvent::DashboardUpdated(_) => received_at,
        }
    }
}
