//! File-per-task, file-per-message board store: one JSON file per entity,
//! directory enumeration for queries, read-modify-write for mutations.
//! `claim` is *not* atomic across processes — true mutual exclusion is
//! the lock store's job (`crate::lock::LockStore`), not this one's.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use tokio::fs;

use crate::error::BoardError;
use crate::ids::new_short_id;

use super::message::Message;
use super::task::{Task, TaskStatus};

pub struct BoardStore {
    tasks_dir: PathBuf,
    messages_dir: PathBuf,
    archive_dir: PathBuf,
}

impl BoardStore {
    /// `root` is the board root (e.g. `<project_root>/.fleet`); tasks,
    /// messages, and archive live in fixed subdirectories beneath it.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            tasks_dir: root.join("tasks"),
            messages_dir: root.join("messages"),
            archive_dir: root.join("archive"),
        }
    }

    async fn ensure_dirs(&self) -> Result<(), BoardError> {
        fs::create_dir_all(&self.tasks_dir).await?;
        fs::create_dir_all(&self.messages_dir).await?;
        Ok(())
    }

    fn task_path(&self, id: &str) -> PathBuf {
        self.tasks_dir.join(format!("{id}.json"))
    }

    fn message_path(&self, id: &str) -> PathBuf {
        self.messages_dir.join(format!("{id}.json"))
    }

    async fn read_task(&self, path: &Path) -> Result<Task, BoardError> {
        let raw = fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn write_task(&self, task: &Task) -> Result<(), BoardError> {
        let raw = serde_json::to_string_pretty(task)?;
        fs::write(self.task_path(&task.id), raw).await?;
        Ok(())
    }

    async fn read_message(&self, path: &Path) -> Result<Message, BoardError> {
        let raw = fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn write_message(&self, message: &Message) -> Result<(), BoardError> {
        let raw = serde_json::to_string_pretty(message)?;
        fs::write(self.message_path(&message.id), raw).await?;
        Ok(())
    }

    // ── Tasks ───────────────────────────────────────────────────────────────

    pub async fn add_task(&self, description: String, priority: i64) -> Result<String, BoardError> {
        self.ensure_dirs().await?;
        let id = new_short_id();
        let task = Task::new(id.clone(), description, priority);
        self.write_task(&task).await?;
        Ok(id)
    }

    pub async fn list_tasks(&self, status: Option<TaskStatus>) -> Result<Vec<Task>, BoardError> {
        self.ensure_dirs().await?;
        let mut tasks = Vec::new();
        let mut entries = fs::read_dir(&self.tasks_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let task = self.read_task(&path).await?;
            if status.is_none_or(|s| s == task.status) {
                tasks.push(task);
            }
        }
        Ok(tasks)
    }

    pub async fn get_task(&self, id: &str) -> Result<Task, BoardError> {
        let path = self.task_path(id);
        if !path.exists() {
            return Err(BoardError::NotFound(id.to_string()));
        }
        self.read_task(&path).await
    }

    /// Pick the highest-priority open task, tie-broken ascending by id.
    /// Returns `None` if no task is open. NOT atomic across processes —
    /// see module docs.
    pub async fn claim(&self, agent_id: &str) -> Result<Option<Task>, BoardError> {
        let mut open = self.list_tasks(Some(TaskStatus::Open)).await?;
        if open.is_empty() {
            return Ok(None);
        }
        open.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));
        let mut chosen = open.into_iter().next().expect("checked non-empty above");
        chosen.status = TaskStatus::Locked;
        chosen.locked_by = Some(agent_id.to_string());
        chosen.heartbeat = Some(Utc::now());
        self.write_task(&chosen).await?;
        Ok(Some(chosen))
    }

    fn verify_owner(task: &Task, agent_id: &str) -> Result<(), BoardError> {
        if task.status != TaskStatus::Locked || task.locked_by.as_deref() != Some(agent_id) {
            return Err(BoardError::NotOwner {
                task_id: task.id.clone(),
                agent_id: agent_id.to_string(),
                status: task.status.to_string(),
                locked_by: task.locked_by.clone(),
            });
        }
        Ok(())
    }

    pub async fn complete(&self, id: &str, agent_id: &str) -> Result<(), BoardError> {
        let mut task = self.get_task(id).await?;
        Self::verify_owner(&task, agent_id)?;
        task.status = TaskStatus::Done;
        task.completed_at = Some(Utc::now());
        self.write_task(&task).await
    }

    pub async fn fail(&self, id: &str, agent_id: &str, reason: String) -> Result<(), BoardError> {
        let mut task = self.get_task(id).await?;
        Self::verify_owner(&task, agent_id)?;
        task.status = TaskStatus::Failed;
        task.completed_at = Some(Utc::now());
        task.reason = Some(reason);
        self.write_task(&task).await
    }

    /// Administrative path: any status -> open, clears lock ownership and
    /// heartbeat. Idempotent: reopening an already-open task is a no-op
    /// write of the same state. Returns `false` if the task does not exist.
    pub async fn reopen(&self, id: &str) -> Result<bool, BoardError> {
        let path = self.task_path(id);
        if !path.exists() {
            return Ok(false);
        }
        let mut task = self.read_task(&path).await?;
        task.status = TaskStatus::Open;
        task.locked_by = None;
        task.heartbeat = None;
        task.completed_at = None;
        task.reason = None;
        self.write_task(&task).await?;
        Ok(true)
    }

    /// Administrative path: delete a task file. No-op (returns `false`) if
    /// the task does not exist. Deleting the associated lock file is the
    /// caller's responsibility, not this method's.
    pub async fn delete(&self, id: &str) -> Result<bool, BoardError> {
        let path = self.task_path(id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).await?;
        Ok(true)
    }

    /// Move done/failed tasks whose `completed_at` is older than
    /// `older_than_days` into the archive directory. Tolerates a file
    /// disappearing mid-sweep (another process racing an archive pass).
    pub async fn archive(&self, older_than_days: i64) -> Result<Vec<String>, BoardError> {
        self.ensure_dirs().await?;
        fs::create_dir_all(&self.archive_dir).await?;
        let cutoff = Utc::now() - chrono::Duration::days(older_than_days);

        let mut archived = Vec::new();
        let mut entries = fs::read_dir(&self.tasks_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let task = match self.read_task(&path).await {
                Ok(t) => t,
                Err(_) => continue,
            };
            if !matches!(task.status, TaskStatus::Done | TaskStatus::Failed) {
                continue;
            }
            let Some(completed_at) = task.completed_at else {
                continue;
            };
            if completed_at >= cutoff {
                continue;
            }
            let dest = self.archive_dir.join(format!("{}.json", task.id));
            if fs::rename(&path, &dest).await.is_ok() {
                archived.push(task.id);
            }
        }
        Ok(archived)
    }

    // ── Messages ────────────────────────────────────────────────────────────

    pub async fn post_message(
        &self,
        from: String,
        to: String,
        text: String,
    ) -> Result<String, BoardError> {
        self.ensure_dirs().await?;
        let id = new_short_id();
        let message = Message::new(id.clone(), from, to, text);
        self.write_message(&message).await?;
        Ok(id)
    }

    pub async fn get_messages(
        &self,
        role: &str,
        unread_only: bool,
    ) -> Result<Vec<Message>, BoardError> {
        self.ensure_dirs().await?;
        let mut messages = Vec::new();
        let mut entries = fs::read_dir(&self.messages_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let message = self.read_message(&path).await?;
            if message.to != role {
                continue;
            }
            if unread_only && message.read {
                continue;
            }
            messages.push(message);
        }
        Ok(messages)
    }

    /// All messages across every role, newest first, capped at `limit` —
    /// used by the dashboard's messages partial.
    pub async fn list_all_messages(&self, limit: usize) -> Result<Vec<Message>, BoardError> {
        self.ensure_dirs().await?;
        let mut messages = Vec::new();
        let mut entries = fs::read_dir(&self.messages_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Ok(message) = self.read_message(&path).await {
                messages.push(message);
            }
        }
        messages.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        messages.truncate(limit);
        Ok(messages)
    }

    pub async fn mark_read(&self, id: &str) -> Result<(), BoardError> {
        let path = self.message_path(id);
        let mut message = self.read_message(&path).await?;
        message.read = true;
        self.write_message(&message).await
    }

    #[cfg(test)]
    pub(crate) fn tasks_dir(&self) -> &Path {
        &self.tasks_dir
    }
}

/// Default stale bound surfaced to callers that want a human-facing
/// duration rather than a raw seconds count (dashboard "fresh" badge).
pub const DEFAULT_HEARTBEAT_FRESH_WINDOW: Duration = Duration::from_secs(600);
