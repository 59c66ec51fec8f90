//! Narrow, injection-safe facade over an external container-runtime CLI.
//!
//! Every operation is argument-vector-only (never a shell string), every
//! operation carries a timeout, and every caller-supplied identifier is
//! validated before a process is spawned.

mod container;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RuntimeError;
use crate::ids::{validate_agent_id, validate_role_name};

pub use container::ContainerRuntime;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const BUILD_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartedContainer {
    pub container_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunningContainer {
    pub container_id: String,
    pub name: String,
    /// `name` with the adapter's `container_prefix` stripped, recovering
    /// the bare agent id `start_agent` was given.
    pub agent_id: String,
    pub status: String,
    pub running_for: String,
}

/// Everything `start_agent` needs to assemble a `container run` invocation.
/// One struct instead of eight positional args.
#[derive(Debug, Clone)]
pub struct StartAgentSpec {
    pub agent_id: String,
    pub role: String,
    pub model: String,
    pub max_sessions: u32,
    pub image: String,
    pub upstream_path: std::path::PathBuf,
    pub board_root: std::path::PathBuf,
    pub credentials_path: Option<std::path::PathBuf>,
    pub api_key: Option<String>,
    pub provider_env: HashMap<String, String>,
    pub project_root: Option<std::path::PathBuf>,
}

/// A fake implementation is injected in tests so the fleet supervisor's
/// lifecycle and health-check logic can be exercised without spawning
/// real containers.
#[async_trait]
pub trait RuntimeAdapter: Send + Sync {
    async fn build_image(&self, name: &str, source_dir: &std::path::Path) -> Result<bool, RuntimeError>;
    async fn start_agent(&self, spec: StartAgentSpec) -> Result<StartedContainer, RuntimeError>;
    async fn stop_agent(&self, container_id: &str) -> Result<bool, RuntimeError>;
    async fn restart_agent(&self, container_id: &str) -> Result<StartedContainer, RuntimeError>;
    async fn stop_fleet(&self) -> Result<u32, RuntimeError>;
    async fn list_running_agents(&self) -> Result<Vec<RunningContainer>, RuntimeError>;
    async fn get_agent_logs(&self, container_id: &str, tail_lines: u32) -> Result<String, RuntimeError>;

    /// Whether `image` is present in the local image store.
    async fn image_exists(&self, image: &str) -> Result<bool, RuntimeError>;

    /// Builds (but does not spawn) a follow-mode log command for
    /// `container_id`, so the websocket log stream (`http::ws`) can own
    /// the child process's lifetime itself rather than going through a
    /// bounded `get_agent_logs` call.
    fn follow_logs_command(&self, container_id: &str) -> tokio::process::Command;
}

/// Entry-point validation shared by every adapter operation and by the
/// CLI/HTTP boundaries before they even reach the adapter.
pub fn validate_role_and_agent(role: &str, agent_id: &str) -> Result<(), RuntimeError> {
    validate_role_name(role).map_err(RuntimeError::InvalidIdentifier)?;
    validate_agent_id(agent_id).map_err(RuntimeError::InvalidIdentifier)?;
    Ok(())
}
