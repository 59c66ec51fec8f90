use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One lock file's contents. `resource` is the file stem (task id, role
/// name, or any other caller-chosen key); `task_id` is carried in the
/// body too so a raw `.lock` file is self-describing without cross-
/// referencing its own file name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockRecord {
    pub agent_id: String,
    pub task_id: String,
    pub acquired_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
}

impl LockRecord {
    pub fn new(agent_id: String, task_id: String) -> Self {
        let now = Utc::now();
        Self {
            agent_id,
            task_id,
            acquired_at: now,
            last_heartbeat: now,
        }
    }

    /// Staleness is judged against `last_heartbeat`, not `acquired_at`, so
    /// a long-running-but-alive holder is never evicted just because it
    /// acquired the lock a while ago.
    pub fn is_stale(&self, max_age: chrono::Duration) -> bool {
        Utc::now() - self.last_heartbeat > max_age
    }
}
