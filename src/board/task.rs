use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task lifecycle states. `status = locked ⇔ locked_by is
/// present` and `status ∈ {done, failed} ⇒ completed_at is present` are
/// enforced by [`super::store::BoardStore`], not by this type — the type
/// only constrains *which* strings are representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    Locked,
    Done,
    Failed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Open => "open",
            TaskStatus::Locked => "locked",
            TaskStatus::Done => "done",
            TaskStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// One task record — one file, file name = `{id}.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: i64,
    pub locked_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub heartbeat: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Task {
    pub fn new(id: String, description: String, priority: i64) -> Self {
        Self {
            id,
            description,
            status: TaskStatus::Open,
            priority,
            locked_by: None,
            created_at: Utc::now(),
            completed_at: None,
            heartbeat: None,
            reason: None,
        }
    }
}
