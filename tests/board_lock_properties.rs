//! Integration tests exercising the board and lock stores together
//! against an isolated `tempfile::TempDir`: concurrent claim safety,
//! priority tie-breaking, and stale-lock reaping.

use std::collections::HashSet;
use std::sync::Arc;

use agentfleet::board::{BoardStore, TaskStatus};
use agentfleet::lock::LockStore;
use tempfile::TempDir;

/// Claims a task and arbitrates ownership through the lock store: if the
/// board-level claim loses the lock race, the task is put back to `open`
/// and the attempt retried, since the board's claim alone is not atomic
/// across processes.
async fn claim_with_lock(board: &BoardStore, lock: &LockStore, agent_id: &str) -> Option<String> {
    loop {
        let task = board.claim(agent_id).await.expect("claim")?;
        if lock.acquire(&task.id, agent_id).await.expect("acquire") {
            return Some(task.id);
        }
        board.reopen(&task.id).await.expect("reopen after losing lock race");
    }
}

#[tokio::test]
async fn no_duplicate_claims_under_concurrency() {
    let dir = TempDir::new().unwrap();
    let board = Arc::new(BoardStore::new(dir.path().join(".fleet")));
    let lock = Arc::new(LockStore::new(dir.path().join(".fleet")));

    for priority in (1..=10).rev() {
        board.add_task(format!("task-{priority}"), priority).await.unwrap();
    }

    let mut handles = Vec::new();
    for i in 0..5 {
        let board = board.clone();
        let lock = lock.clone();
        let agent_id = format!("agent-{i}");
        handles.push(tokio::spawn(async move {
            let mut claimed = Vec::new();
            while let Some(id) = claim_with_lock(&board, &lock, &agent_id).await {
                board.complete(&id, &agent_id).await.unwrap();
                claimed.push(id);
            }
            claimed
        }));
    }

    let mut all_claimed = Vec::new();
    for handle in handles {
        all_claimed.extend(handle.await.unwrap());
    }

    let unique: HashSet<_> = all_claimed.iter().collect();
    assert_eq!(unique.len(), 10, "every claimed id must be distinct");
    assert_eq!(all_claimed.len(), 10, "all ten tasks must be claimed exactly once");

    let tasks = board.list_tasks(None).await.unwrap();
    assert_eq!(tasks.len(), 10);
    for task in tasks {
        assert_eq!(task.status, TaskStatus::Done);
        assert!(task.locked_by.is_some());
    }
}

#[tokio::test]
async fn priority_tie_break_is_ascending_by_id() {
    let dir = TempDir::new().unwrap();
    let board = BoardStore::new(dir.path().join(".fleet"));

    let a = board.add_task("a".into(), 5).await.unwrap();
    let b = board.add_task("b".into(), 5).await.unwrap();
    let _low = board.add_task("low".into(), 3).await.unwrap();

    let mut fives = [a, b];
    fives.sort();

    let first = board.claim("agent-1").await.unwrap().unwrap();
    assert_eq!(first.priority, 5);
    assert_eq!(first.id, fives[0]);

    let second = board.claim("agent-1").await.unwrap().unwrap();
    assert_eq!(second.priority, 5);
    assert_eq!(second.id, fives[1]);

    let third = board.claim("agent-1").await.unwrap().unwrap();
    assert_eq!(third.priority, 3);
}

#[tokio::test]
async fn stale_lock_is_reaped_and_resource_becomes_claimable_again() {
    let dir = TempDir::new().unwrap();
    let lock = LockStore::new(dir.path().join(".fleet"));

    assert!(lock.acquire("t1", "agent-a").await.unwrap());

    // Backdate last_heartbeat directly on disk, since acquire always
    // stamps the current time.
    let path = dir.path().join(".fleet").join("locks").join("t1.lock");
    let raw = tokio::fs::read_to_string(&path).await.unwrap();
    let mut record: agentfleet::lock::LockRecord = serde_json::from_str(&raw).unwrap();
    record.last_heartbeat = chrono::Utc::now() - chrono::Duration::hours(3);
    tokio::fs::write(&path, serde_json::to_string_pretty(&record).unwrap())
        .await
        .unwrap();

    let reaped = lock.cleanup_stale(7200).await.unwrap();
    assert_eq!(reaped, vec!["t1".to_string()]);
    assert!(!path.exists());

    assert!(lock.acquire("t1", "agent-b").await.unwrap());
}

#[tokio::test]
async fn heartbeat_preserves_against_stale_acquired_at() {
    let dir = TempDir::new().unwrap();
    let lock = LockStore::new(dir.path().join(".fleet"));

    assert!(lock.acquire("t1", "agent-a").await.unwrap());

    let path = dir.path().join(".fleet").join("locks").join("t1.lock");
    let raw = tokio::fs::read_to_string(&path).await.unwrap();
    let mut record: agentfleet::lock::LockRecord = serde_json::from_str(&raw).unwrap();
    record.acquired_at = chrono::Utc::now() - chrono::Duration::hours(3);
    tokio::fs::write(&path, serde_json::to_string_pretty(&record).unwrap())
        .await
        .unwrap();

    let reaped = lock.cleanup_stale(7200).await.unwrap();
    assert!(reaped.is_empty());
    assert!(path.exists());
}
