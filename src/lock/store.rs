//! Lock store: one JSON file per resource, acquired with an atomic
//! exclusive-create.
//!
//! This is the system's one correctness-load-bearing mutual-exclusion
//! primitive, so `acquire` uses `OpenOptions::create_new(true)`, which is
//! atomic at the filesystem level, rather than a check-then-write that
//! would leave a TOCTOU gap under concurrent agents.

use std::path::{Path, PathBuf};

use chrono::{Duration as ChronoDuration, Utc};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::LockError;

use super::record::LockRecord;

pub struct LockStore {
    dir: PathBuf,
}

impl LockStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            dir: root.as_ref().join("locks"),
        }
    }

    fn lock_path(&self, resource: &str) -> PathBuf {
        self.dir.join(format!("{resource}.lock"))
    }

    async fn read(&self, resource: &str) -> Result<Option<LockRecord>, LockError> {
        let path = self.lock_path(resource);
        match fs::read_to_string(&path).await {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn overwrite(&self, resource: &str, record: &LockRecord) -> Result<(), LockError> {
        let raw = serde_json::to_string_pretty(record)?;
        fs::write(self.lock_path(resource), raw).await?;
        Ok(())
    }

    /// Atomically create the lock file if and only if it does not already
    /// exist. Returns `true` on success, `false` if another holder beat us
    /// to it — never returns an error for the ordinary contention case.
    pub async fn acquire(&self, resource: &str, agent_id: &str) -> Result<bool, LockError> {
        fs::create_dir_all(&self.dir).await?;
        let record = LockRecord::new(agent_id.to_string(), resource.to_string());
        let raw = serde_json::to_string_pretty(&record)?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        match options.open(self.lock_path(resource)).await {
            Ok(mut file) => {
                file.write_all(raw.as_bytes()).await?;
                file.flush().await?;
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Releases the lock if `agent_id` is the current holder. Returns
    /// `false` (not an error) if the lock does not exist or is held by
    /// someone else.
    pub async fn release(&self, resource: &str, agent_id: &str) -> Result<bool, LockError> {
        match self.read(resource).await? {
            Some(record) if record.agent_id == agent_id => {
                fs::remove_file(self.lock_path(resource)).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Bumps `last_heartbeat` in place. Returns `false` if the lock does
    /// not exist or is held by someone else.
    pub async fn refresh(&self, resource: &str, agent_id: &str) -> Result<bool, LockError> {
        match self.read(resource).await? {
            Some(mut record) if record.agent_id == agent_id => {
                record.last_heartbeat = Utc::now();
                self.overwrite(resource, &record).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub async fn is_locked(&self, resource: &str) -> Result<bool, LockError> {
        Ok(self.read(resource).await?.is_some())
    }

    pub async fn get(&self, resource: &str) -> Result<Option<LockRecord>, LockError> {
        self.read(resource).await
    }

    /// Removes a lock unconditionally, regardless of holder. Used by the
    /// HTTP control plane's task-reopen/delete routes, which must clear a
    /// stuck lock even when the caller isn't the holder.
    pub async fn force_release(&self, resource: &str) -> Result<bool, LockError> {
        let path = self.lock_path(resource);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).await?;
        Ok(true)
    }

    /// `(resource, record)` pairs for every currently-held lock.
    pub async fn list(&self) -> Result<Vec<(String, LockRecord)>, LockError> {
        fs::create_dir_all(&self.dir).await?;
        let mut out = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("lock") {
                continue;
            }
            let Some(resource) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let raw = fs::read_to_string(&path).await?;
            let record: LockRecord = serde_json::from_str(&raw)?;
            out.push((resource.to_string(), record));
        }
        Ok(out)
    }

    /// Removes every lock whose heartbeat is older than `max_age_secs`.
    pub async fn cleanup_stale(&self, max_age_secs: i64) -> Result<Vec<String>, LockError> {
        let max_age = ChronoDuration::seconds(max_age_secs);
        let mut reaped = Vec::new();
        for (resource, record) in self.list().await? {
            if record.is_stale(max_age) {
                fs::remove_file(self.lock_path(&resource)).await?;
                reaped.push(resource);
            }
        }
        Ok(reaped)
    }
}

/// Default staleness bound for `cleanup_stale`: two hours.
pub const DEFAULT_STALE_SECONDS: i64 = 7200;
