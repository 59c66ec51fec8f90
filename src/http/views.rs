//! View-model assembly shared by the page and partial handlers: task
//! grouping/stats, and the merged fleet-table + lock-store agent card
//! view.

use std::collections::BTreeMap;

use chrono_humanize::HumanTime;
use serde::Serialize;

use crate::board::{Message, Task, TaskStatus};
use crate::fleet::{FleetEntry, FleetStatus};
use crate::lock::LockRecord;

const FRESH_WINDOW_SECS: i64 = 600;

#[derive(Debug, Serialize)]
pub struct Stats {
    pub open: usize,
    pub locked: usize,
    pub done: usize,
    pub failed: usize,
    pub active_locks: usize,
}

pub fn compute_stats(tasks: &[Task], locks: &[(String, LockRecord)]) -> Stats {
    let mut stats = Stats {
        open: 0,
        locked: 0,
        done: 0,
        failed: 0,
        active_locks: locks.len(),
    };
    for task in tasks {
        match task.status {
            TaskStatus::Open => stats.open += 1,
            TaskStatus::Locked => stats.locked += 1,
            TaskStatus::Done => stats.done += 1,
            TaskStatus::Failed => stats.failed += 1,
        }
    }
    stats
}

/// Groups tasks by status, sorting each group by descending priority then
/// ascending id.
pub fn group_tasks(mut tasks: Vec<Task>) -> BTreeMap<String, Vec<Task>> {
    tasks.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));
    let mut groups: BTreeMap<String, Vec<Task>> = BTreeMap::new();
    for task in tasks {
        groups.entry(task.status.to_string()).or_default().push(task);
    }
    groups
}

#[derive(Debug, Serialize)]
pub struct AgentCard {
    pub agent_id: String,
    pub status: String,
    pub container_id: String,
    pub role: String,
    pub model: String,
    pub restart_count: u32,
    pub task_id: Option<String>,
    pub heartbeat_ago: Option<String>,
    pub fresh: bool,
    pub orphaned_lock: bool,
}

/// Merges the fleet table with live locks into the dashboard's unified
/// agent-card view: every fleet entry becomes a card; every lock whose
/// agent id matches a card attaches
/// `task_id` + humanized heartbeat age; unmatched locks become orphaned
/// cards with status "no container". Sorted by agent id.
pub fn assemble_agent_cards(fleet: Vec<FleetEntry>, locks: Vec<(String, LockRecord)>) -> Vec<AgentCard> {
    let mut cards: BTreeMap<String, AgentCard> = fleet
        .into_iter()
        .map(|entry| {
            let status = fleet_status_label(entry.status).to_string();
            (
                entry.agent_id.clone(),
                AgentCard {
                    agent_id: entry.agent_id,
                    status,
                    container_id: entry.container_id,
                    role: entry.role,
                    model: entry.model,
                    restart_count: entry.restart_count,
                    task_id: None,
                    heartbeat_ago: None,
                    fresh: false,
                    orphaned_lock: false,
                },
            )
        })
        .collect();

    for (task_id, record) in locks {
        let age_secs = (chrono::Utc::now() - record.last_heartbeat).num_seconds();
        let fresh = age_secs < FRESH_WINDOW_SECS;
        let heartbeat_ago = HumanTime::from(record.last_heartbeat).to_string();

        match cards.get_mut(&record.agent_id) {
            Some(card) => {
                card.task_id = Some(task_id);
                card.heartbeat_ago = Some(heartbeat_ago);
                card.fresh = fresh;
            }
            None => {
                cards.insert(
                    record.agent_id.clone(),
                    AgentCard {
                        agent_id: record.agent_id,
                        status: "no container".to_string(),
                        container_id: String::new(),
                        role: String::new(),
                        model: String::new(),
                        restart_count: 0,
                        task_id: Some(task_id),
                        heartbeat_ago: Some(heartbeat_ago),
                        fresh,
                        orphaned_lock: true,
                    },
                );
            }
        }
    }

    cards.into_values().collect()
}

fn fleet_status_label(status: FleetStatus) -> &'static str {
    match status {
        FleetStatus::Running => "running",
        FleetStatus::Healthy => "healthy",
        FleetStatus::Stopped => "stopped",
        FleetStatus::Restarting => "restarting",
        FleetStatus::Crashed => "crashed",
        FleetStatus::NoContainer => "no container",
    }
}

pub fn messages_view(messages: &[Message]) -> Vec<&Message> {
    messages.iter().collect()
}
