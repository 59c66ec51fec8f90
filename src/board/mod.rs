//! The coordination substrate's task board: file-per-task, file-per-message,
//! no database, safe to inspect and edit by hand on disk.

mod message;
mod store;
mod task;

pub use message::Message;
pub use store::{BoardStore, DEFAULT_HEARTBEAT_FRESH_WINDOW};
pub use task::{Task, TaskStatus};

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, BoardStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = BoardStore::new(dir.path().join(".fleet"));
        (dir, store)
    }

    #[tokio::test]
    async fn add_and_list_round_trip() {
        let (_dir, store) = store();
        let id = store.add_task("write tests".into(), 5).await.unwrap();
        let tasks = store.list_tasks(None).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, id);
        assert_eq!(tasks[0].status, TaskStatus::Open);
        assert_eq!(tasks[0].locked_by, None);
    }

    #[tokio::test]
    async fn claim_picks_highest_priority_then_ascending_id() {
        let (_dir, store) = store();
        let low = store.add_task("low".into(), 1).await.unwrap();
        let _high_a = store.add_task("high a".into(), 9).await.unwrap();
        let _high_b = store.add_task("high b".into(), 9).await.unwrap();
        let _ = low;

        let claimed = store.claim("agent-1").await.unwrap().expect("a task");
        assert_eq!(claimed.priority, 9);
        assert_eq!(claimed.status, TaskStatus::Locked);
        assert_eq!(claimed.locked_by.as_deref(), Some("agent-1"));

        let mut remaining: Vec<_> = store
            .list_tasks(Some(TaskStatus::Open))
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        remaining.sort();
        assert_eq!(remaining.len(), 2);
    }

    #[tokio::test]
    async fn claim_returns_none_when_board_is_empty() {
        let (_dir, store) = store();
        assert!(store.claim("agent-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn complete_requires_matching_owner() {
        let (_dir, store) = store();
        let id = store.add_task("task".into(), 1).await.unwrap();
        store.claim("agent-1").await.unwrap();

        let err = store.complete(&id, "agent-2").await.unwrap_err();
        assert!(matches!(err, crate::error::BoardError::NotOwner { .. }));

        store.complete(&id, "agent-1").await.unwrap();
        let task = store.get_task(&id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Done);
        assert!(task.completed_at.is_some());
    }

    #[tokio::test]
    async fn fail_records_reason_and_rejects_wrong_owner() {
        let (_dir, store) = store();
        let id = store.add_task("task".into(), 1).await.unwrap();
        store.claim("agent-1").await.unwrap();

        assert!(store.fail(&id, "agent-2", "nope".into()).await.is_err());
        store.fail(&id, "agent-1", "out of memory".into()).await.unwrap();

        let task = store.get_task(&id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.reason.as_deref(), Some("out of memory"));
    }

    #[tokio::test]
    async fn reopen_clears_lock_state() {
        let (_dir, store) = store();
        let id = store.add_task("task".into(), 1).await.unwrap();
        store.claim("agent-1").await.unwrap();

        assert!(store.reopen(&id).await.unwrap());
        let task = store.get_task(&id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Open);
        assert_eq!(task.locked_by, None);
        assert_eq!(task.heartbeat, None);

        assert!(!store.reopen("no-such-id").await.unwrap());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (_dir, store) = store();
        let id = store.add_task("task".into(), 1).await.unwrap();
        assert!(store.delete(&id).await.unwrap());
        assert!(!store.delete(&id).await.unwrap());
        assert!(store.get_task(&id).await.is_err());
    }

    #[tokio::test]
    async fn messages_are_scoped_by_recipient_role_and_mark_read_is_one_way() {
        let (_dir, store) = store();
        let id = store
            .post_message("builder".into(), "reviewer".into(), "ready".into())
            .await
            .unwrap();
        store
            .post_message("builder".into(), "tester".into(), "also ready".into())
            .await
            .unwrap();

        let reviewer_inbox = store.get_messages("reviewer", false).await.unwrap();
        assert_eq!(reviewer_inbox.len(), 1);
        assert!(!reviewer_inbox[0].read);

        store.mark_read(&id).await.unwrap();
        let unread = store.get_messages("reviewer", true).await.unwrap();
        assert!(unread.is_empty());
        let all = store.get_messages("reviewer", false).await.unwrap();
        assert!(all[0].read);
    }

    #[tokio::test]
    async fn archive_moves_old_completed_tasks_only() {
        let (_dir, store) = store();
        let old_id = store.add_task("ancient".into(), 1).await.unwrap();
        store.claim("agent-1").await.unwrap();
        store.complete(&old_id, "agent-1").await.unwrap();

        // Backdate completed_at past the cutoff directly on disk, since
        // add_task/complete always stamp the current time.
        let path = store.tasks_dir().join(format!("{old_id}.json"));
        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        let mut task: Task = serde_json::from_str(&raw).unwrap();
        task.completed_at = Some(chrono::Utc::now() - chrono::Duration::days(30));
        tokio::fs::write(&path, serde_json::to_string_pretty(&task).unwrap())
            .await
            .unwrap();

        let fresh_id = store.add_task("recent".into(), 1).await.unwrap();
        store.claim("agent-2").await.unwrap();
        store.complete(&fresh_id, "agent-2").await.unwrap();

        let archived = store.archive(7).await.unwrap();
        assert_eq!(archived, vec![old_id.clone()]);

        let remaining: Vec<_> = store.list_tasks(None).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, fresh_id);
    }
}
