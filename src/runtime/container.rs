use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::RuntimeError;

use super::{
    validate_role_and_agent, RunningContainer, RuntimeAdapter, StartAgentSpec, StartedContainer,
    BUILD_TIMEOUT, DEFAULT_TIMEOUT,
};

/// Production `RuntimeAdapter` over a container CLI (`docker` by default;
/// any CLI with the same verb shape, e.g. `podman`, works unmodified).
///
/// `container_prefix` is a configurable field rather than a hardcoded
/// constant, so more than one fleet can run on a shared host without
/// container name collisions.
pub struct ContainerRuntime {
    binary: String,
    container_prefix: String,
}

impl ContainerRuntime {
    pub fn new(binary: impl Into<String>, container_prefix: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            container_prefix: container_prefix.into(),
        }
    }

    fn container_name(&self, agent_id: &str) -> String {
        format!("{}{}", self.container_prefix, agent_id)
    }

    async fn run(&self, args: &[&str], bound: Duration) -> Result<std::process::Output, RuntimeError> {
        let mut child = Command::new(&self.binary)
            .args(args)
            .kill_on_drop(true)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

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
                Err(RuntimeError::Timeout(bound))
            }
        }
    }

    fn ensure_success(output: &std::process::Output) -> Result<(), RuntimeError> {
        if output.status.success() {
            return Ok(());
        }
        Err(RuntimeError::CommandFailed {
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct PsLine {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Names")]
    names: String,
    #[serde(rename = "Status")]
    status: String,
}

#[async_trait]
impl RuntimeAdapter for ContainerRuntime {
    async fn build_image(&self, name: &str, source_dir: &Path) -> Result<bool, RuntimeError> {
        let source = source_dir.to_string_lossy();
        let output = self
            .run(&["build", "-t", name, &source], BUILD_TIMEOUT)
            .await?;
        Self::ensure_success(&output)?;
        Ok(true)
    }

    async fn start_agent(&self, spec: StartAgentSpec) -> Result<StartedContainer, RuntimeError> {
        validate_role_and_agent(&spec.role, &spec.agent_id)?;

        let name = self.container_name(&spec.agent_id);
        let tasks_mount = format!("{}/tasks:/fleet/tasks", spec.board_root.display());
        let locks_mount = format!("{}/locks:/fleet/locks", spec.board_root.display());
        let messages_mount = format!("{}/messages:/fleet/messages", spec.board_root.display());
        let upstream_mount = format!("{}:/fleet/upstream", spec.upstream_path.display());

        let env_role = format!("AGENT_ROLE={}", spec.role);
        let env_id = format!("AGENT_ID={}", spec.agent_id);
        let env_model = format!("AGENT_MODEL={}", spec.model);
        let env_upstream = "UPSTREAM_REMOTE=/fleet/upstream".to_string();
        let env_max_sessions = format!("MAX_SESSIONS={}", spec.max_sessions);

        let mut args: Vec<String> = vec![
            "run".into(),
            "-d".into(),
            "--name".into(),
            name.clone(),
            "-v".into(),
            tasks_mount,
            "-v".into(),
            locks_mount,
            "-v".into(),
            messages_mount,
            "-v".into(),
            upstream_mount,
            "-e".into(),
            env_role,
            "-e".into(),
            env_id,
            "-e".into(),
            env_model,
            "-e".into(),
            env_upstream,
            "-e".into(),
            env_max_sessions,
        ];

        if let Some(creds) = &spec.credentials_path {
            args.push("-v".into());
            args.push(format!("{}:/fleet/credentials:ro", creds.display()));
        }
        if let Some(key) = &spec.api_key {
            args.push("-e".into());
            args.push(format!("ANTHROPIC_API_KEY={key}"));
        }
        // Provider overrides applied last so they win over the defaults above.
        for (key, value) in &spec.provider_env {
            args.push("-e".into());
            args.push(format!("{key}={value}"));
        }
        args.push(spec.image.clone());

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self.run(&arg_refs, DEFAULT_TIMEOUT).await?;
        Self::ensure_success(&output)?;
        let container_id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(StartedContainer {
            container_id,
            status: "running".into(),
        })
    }

    async fn stop_agent(&self, container_id: &str) -> Result<bool, RuntimeError> {
        let output = self.run(&["stop", container_id], DEFAULT_TIMEOUT).await?;
        Self::ensure_success(&output)?;
        Ok(true)
    }

    async fn restart_agent(&self, container_id: &str) -> Result<StartedContainer, RuntimeError> {
        let output = self.run(&["restart", container_id], DEFAULT_TIMEOUT).await?;
        Self::ensure_success(&output)?;
        Ok(StartedContainer {
            container_id: container_id.to_string(),
            status: "running".into(),
        })
    }

    async fn stop_fleet(&self) -> Result<u32, RuntimeError> {
        let running = self.list_running_agents().await?;
        let mut stopped = 0;
        for container in running {
            if container.name.starts_with(&self.container_prefix) && self.stop_agent(&container.container_id).await.is_ok()
            {
                stopped += 1;
            }
        }
        Ok(stopped)
    }

    async fn list_running_agents(&self) -> Result<Vec<RunningContainer>, RuntimeError> {
        let output = self
            .run(
                &["ps", "--format", "{{json .}}", "--filter", "status=running"],
                DEFAULT_TIMEOUT,
            )
            .await?;
        Self::ensure_success(&output)?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        let mut containers = Vec::new();
        for line in stdout.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let parsed: PsLine = serde_json::from_str(line).map_err(|e| RuntimeError::CommandFailed {
                status: "parse".into(),
                stderr: e.to_string(),
            })?;
            let Some(agent_id) = parsed.names.strip_prefix(&self.container_prefix) else {
                continue;
            };
            containers.push(RunningContainer {
                container_id: parsed.id,
                name: parsed.names.clone(),
                agent_id: agent_id.to_string(),
                status: "running".into(),
                running_for: parsed.status,
            });
        }
        Ok(containers)
    }

    async fn get_agent_logs(&self, container_id: &str, tail_lines: u32) -> Result<String, RuntimeError> {
        let tail = tail_lines.to_string();
        let output = self
            .run(&["logs", "--tail", &tail, container_id], DEFAULT_TIMEOUT)
            .await?;
        Self::ensure_success(&output)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn image_exists(&self, image: &str) -> Result<bool, RuntimeError> {
        let output = self.run(&["image", "inspect", image], DEFAULT_TIMEOUT).await?;
        Ok(output.status.success())
    }

    fn follow_logs_command(&self, container_id: &str) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .args(["logs", "-f", "--tail", "0", container_id])
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        command
    }
}
