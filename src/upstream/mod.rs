//! Manages the bare source-control repository that serves as the agents'
//! synchronization point. Every call is argument-vector subprocess
//! invocation over `git`, never a linked library, so the same `git`
//! binary agents use is the one driving `init`/`push`/`merge`.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::UpstreamError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const PUSH_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentBranch {
    pub branch: String,
    pub agent_id: String,
    pub commit: String,
    pub date: DateTime<Utc>,
    pub subject: String,
    pub ahead: u32,
}

async fn run(args: &[&str], cwd: Option<&Path>, bound: Duration) -> Result<std::process::Output, UpstreamError> {
    let mut command = Command::new("git");
    command
        .args(args)
        .kill_on_drop(true)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }
    let mut child = command.spawn()?;
    let mut stdout = child.stdout.take().expect("piped stdout");
    let mut stderr = child.stderr.take().expect("piped stderr");

    let collect = async {
        let mut out_buf = Vec::new();
        let mut err_buf = Vec::new();
        let (_, _, status) = tokio::join!(
            stdout.read_to_end(&mut out_buf),
            stderr.read_to_end(&mut err_buf),
            child.wait(),
        );
        let status = status?;
        Ok::<_, std::io::Error>(std::process::Output {
            status,
            stdout: out_buf,
            stderr: err_buf,
        })
    };

    match timeout(bound, collect).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            let _ = child.kill().await;
            let _ = child.wait().await;
            Err(UpstreamError::Timeout(bound))
        }
    }
}

fn ensure_success(output: &std::process::Output) -> Result<(), UpstreamError> {
    if output.status.success() {
        return Ok(());
    }
    Err(UpstreamError::CommandFailed {
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Creates the bare repository at `upstream_path` if missing, then
/// force-pushes `project_root`'s current `HEAD` onto `refs/heads/<branch>`
/// in it, so agents cloning from `upstream_path` start from the host's
/// current state.
pub async fn init_upstream(project_root: &Path, upstream_path: &Path, branch: &str) -> Result<bool, UpstreamError> {
    if !upstream_path.join("HEAD").exists() {
        tokio::fs::create_dir_all(upstream_path).await?;
        let output = run(&["init", "--bare", &upstream_path.to_string_lossy()], None, DEFAULT_TIMEOUT).await?;
        ensure_success(&output)?;
    }

    let refspec = format!("HEAD:refs/heads/{branch}");
    let output = run(
        &["push", "--force", &upstream_path.to_string_lossy(), &refspec],
        Some(project_root),
        PUSH_TIMEOUT,
    )
    .await?;
    ensure_success(&output)?;
    Ok(true)
}

/// Enumerates `refs/heads/agent/*` branches, reporting each one's latest
/// commit and how far ahead of `main` it sits.
pub async fn list_agent_branches(upstream_path: &Path) -> Result<Vec<AgentBranch>, UpstreamError> {
    let format = "%(refname:short)%09%(objectname:short)%09%(committerdate:iso-strict)%09%(subject)";
    let output = run(
        &[
            "for-each-ref",
            "--format",
            format,
            "refs/heads/agent/",
        ],
        Some(upstream_path),
        DEFAULT_TIMEOUT,
    )
    .await?;
    ensure_success(&output)?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut branches = Vec::new();
    for line in stdout.lines() {
        let mut fields = line.splitn(4, '\t');
        let (Some(branch), Some(commit), Some(date), Some(subject)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        let agent_id = branch.strip_prefix("agent/").unwrap_or(branch).to_string();
        let date = DateTime::parse_from_rfc3339(date)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        let ahead = count_ahead(upstream_path, branch).await.unwrap_or(0);
        branches.push(AgentBranch {
            branch: branch.to_string(),
            agent_id,
            commit: commit.to_string(),
            date,
            subject: subject.to_string(),
            ahead,
        });
    }
    Ok(branches)
}

async fn count_ahead(upstream_path: &Path, branch: &str) -> Result<u32, UpstreamError> {
    let range = format!("main..{branch}");
    let output = run(
        &["rev-list", "--count", &range],
        Some(upstream_path),
        DEFAULT_TIMEOUT,
    )
    .await?;
    if !output.status.success() {
        return Ok(0);
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().parse().unwrap_or(0))
}

/// Fetches from the bare upstream into a configured `origin` remote,
/// syncing agent work out to wherever the operator's canonical remote is.
pub async fn sync_branches_to_origin(upstream_path: &Path, origin: &str) -> Result<bool, UpstreamError> {
    let output = run(
        &["push", origin, "refs/heads/agent/*:refs/heads/agent/*"],
        Some(upstream_path),
        PUSH_TIMEOUT,
    )
    .await?;
    ensure_success(&output)?;
    Ok(true)
}

/// Merges a single agent branch into `main` within the bare upstream.
pub async fn merge_agent_branch(upstream_path: &Path, branch: &str) -> Result<bool, UpstreamError> {
    let output = run(
        &["merge", "--ff-only", branch],
        Some(upstream_path),
        DEFAULT_TIMEOUT,
    )
    .await?;
    ensure_success(&output)?;
    Ok(true)
}
