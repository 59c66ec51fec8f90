use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fleet-entry status values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FleetStatus {
    Running,
    Healthy,
    Stopped,
    Restarting,
    Crashed,
    NoContainer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetEntry {
    pub agent_id: String,
    pub container_id: String,
    pub status: FleetStatus,
    pub role: String,
    pub model: String,
    pub started_at: Option<DateTime<Utc>>,
    pub restart_count: u32,
}

/// Process-wide fleet state, guarded by a single `Mutex` so every handler —
/// including the background health loop — serializes on the same
/// primitive. A single exclusive lock, rather than a `RwLock`, makes
/// "every handler serializes" a type-level fact instead of a convention.
#[derive(Clone, Default)]
pub struct FleetTable {
    inner: Arc<Mutex<HashMap<String, FleetEntry>>>,
}

impl FleetTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lock<R>(&self, f: impl FnOnce(&mut HashMap<String, FleetEntry>) -> R) -> R {
        let mut guard = self.inner.lock().expect("fleet table mutex poisoned");
        f(&mut guard)
    }

    pub fn snapshot(&self) -> Vec<FleetEntry> {
        self.with_lock(|table| {
            let mut entries: Vec<_> = table.values().cloned().collect();
            entries.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
            entries
        })
    }

    pub fn get(&self, agent_id: &str) -> Option<FleetEntry> {
        self.with_lock(|table| table.get(agent_id).cloned())
    }

    pub fn clear(&self) {
        self.with_lock(|table| table.clear());
    }
}
