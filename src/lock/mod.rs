//! The coordination substrate's lock store: atomic per-resource file locks
//! with heartbeat-based staleness. See module docs in [`store`].

mod record;
mod store;

pub use record::LockRecord;
pub use store::{LockStore, DEFAULT_STALE_SECONDS};

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, LockStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = LockStore::new(dir.path().join(".fleet"));
        (dir, store)
    }

    #[tokio::test]
    async fn acquire_is_exclusive() {
        let (_dir, store) = store();
        assert!(store.acquire("task-1", "agent-a").await.unwrap());
        assert!(!store.acquire("task-1", "agent-b").await.unwrap());
        assert!(store.is_locked("task-1").await.unwrap());
    }

    #[tokio::test]
    async fn release_requires_matching_owner() {
        let (_dir, store) = store();
        store.acquire("task-1", "agent-a").await.unwrap();
        assert!(!store.release("task-1", "agent-b").await.unwrap());
        assert!(store.release("task-1", "agent-a").await.unwrap());
        assert!(!store.is_locked("task-1").await.unwrap());
    }

    #[tokio::test]
    async fn refresh_bumps_heartbeat_for_owner_only() {
        let (_dir, store) = store();
        store.acquire("task-1", "agent-a").await.unwrap();
        let before = store.get("task-1").await.unwrap().unwrap().last_heartbeat;

        assert!(!store.refresh("task-1", "agent-b").await.unwrap());
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert!(store.refresh("task-1", "agent-a").await.unwrap());

        let after = store.get("task-1").await.unwrap().unwrap().last_heartbeat;
        assert!(after >= before);
    }

    #[tokio::test]
    async fn cleanup_stale_reaps_only_old_heartbeats() {
        let (_dir, store) = store();
        store.acquire("stale", "agent-a").await.unwrap();
        store.acquire("fresh", "agent-b").await.unwrap();

        // cleanup_stale compares against wall-clock `Utc::now()`, so a
        // negative max age treats every existing heartbeat as stale.
        let reaped = store.cleanup_stale(-1).await.unwrap();
        assert_eq!(reaped.len(), 2);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cleanup_stale_keeps_fresh_locks() {
        let (_dir, store) = store();
        store.acquire("fresh", "agent-a").await.unwrap();
        let reaped = store.cleanup_stale(DEFAULT_STALE_SECONDS).await.unwrap();
        assert!(reaped.is_empty());
        assert!(store.is_locked("fresh").await.unwrap());
    }

    #[tokio::test]
    async fn force_release_ignores_ownership() {
        let (_dir, store) = store();
        store.acquire("task-1", "agent-a").await.unwrap();
        assert!(store.force_release("task-1").await.unwrap());
        assert!(!store.force_release("task-1").await.unwrap());
    }
}
