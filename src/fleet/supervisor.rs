use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;

use crate::config::FleetConfig;
use crate::error::{FleetError, RuntimeError};
use crate::ids::validate_agent_id;
use crate::runtime::{RuntimeAdapter, StartAgentSpec};
use crate::upstream;

use super::table::{FleetEntry, FleetStatus, FleetTable};

/// Bounded auto-restart ceiling: an agent that keeps dying is left dead
/// rather than restarted forever.
pub const MAX_RESTARTS: u32 = 3;

pub struct FleetSupervisor {
    runtime: Arc<dyn RuntimeAdapter>,
    table: FleetTable,
    board_root: PathBuf,
}

impl FleetSupervisor {
    pub fn new(runtime: Arc<dyn RuntimeAdapter>, board_root: PathBuf) -> Self {
        Self {
            runtime,
            table: FleetTable::new(),
            board_root,
        }
    }

    pub fn table(&self) -> &FleetTable {
        &self.table
    }

    pub fn snapshot(&self) -> Vec<FleetEntry> {
        self.table.snapshot()
    }

    /// Starts every configured role's replicas. Rejects up front when no
    /// roles are configured, initializes the upstream, merges the
    /// provider-env allowlist with config overrides, and records each
    /// started agent into the fleet table.
    pub async fn start_fleet(
        &self,
        config: &FleetConfig,
        project_root: &std::path::Path,
    ) -> Result<Vec<String>, FleetError> {
        if config.roles.is_empty() {
            return Err(FleetError::NoRolesConfigured);
        }

        upstream::init_upstream(project_root, &config.sync.upstream_path, &config.sync.branch)
            .await
            .map_err(FleetError::Upstream)?;

        let provider_env = config.build_provider_env();
        let mut started = Vec::new();

        for role in &config.roles {
            for index in 0..role.count {
                let agent_id = format!("{}-{index}", role.name);
                let spec = StartAgentSpec {
                    agent_id: agent_id.clone(),
                    role: role.name.clone(),
                    model: role.model.clone(),
                    max_sessions: role.max_sessions,
                    image: config.docker.image.clone(),
                    upstream_path: config.sync.upstream_path.clone(),
                    board_root: self.board_root.clone(),
                    credentials_path: config.docker.credentials_path.clone(),
                    api_key: config.auth.api_key_env.as_ref().and_then(|v| std::env::var(v).ok()),
                    provider_env: provider_env.clone(),
                    project_root: Some(project_root.to_path_buf()),
                };

                let result = self.runtime.start_agent(spec).await?;
                self.table.with_lock(|table| {
                    table.insert(
                        agent_id.clone(),
                        FleetEntry {
                            agent_id: agent_id.clone(),
                            container_id: result.container_id,
                            status: FleetStatus::Running,
                            role: role.name.clone(),
                            model: role.model.clone(),
                            started_at: Some(Utc::now()),
                            restart_count: 0,
                        },
                    );
                });
                started.push(agent_id);
            }
        }
        Ok(started)
    }

    pub async fn stop_fleet(&self) -> Result<u32, FleetError> {
        let stopped = self.runtime.stop_fleet().await?;
        self.table.clear();
        Ok(stopped)
    }

    pub async fn stop_agent(&self, agent_id: &str) -> Result<(), FleetError> {
        validate_agent_id(agent_id).map_err(FleetError::InvalidIdentifier)?;
        let entry = self
            .table
            .get(agent_id)
            .ok_or_else(|| FleetError::UnknownAgent(agent_id.to_string()))?;

        self.runtime.stop_agent(&entry.container_id).await?;
        self.table.with_lock(|table| {
            if let Some(entry) = table.get_mut(agent_id) {
                entry.status = FleetStatus::Stopped;
            }
        });
        Ok(())
    }

    pub async fn restart_agent(&self, agent_id: &str) -> Result<(), FleetError> {
        validate_agent_id(agent_id).map_err(FleetError::InvalidIdentifier)?;
        let entry = self
            .table
            .get(agent_id)
            .ok_or_else(|| FleetError::UnknownAgent(agent_id.to_string()))?;

        let result = self.runtime.restart_agent(&entry.container_id).await?;
        self.table.with_lock(|table| {
            if let Some(entry) = table.get_mut(agent_id) {
                entry.container_id = result.container_id;
                entry.status = FleetStatus::Restarting;
                entry.restart_count += 1;
            }
        });
        Ok(())
    }

    /// Rebuilds the fleet table from the runtime's own view of running
    /// containers, called once at supervisor startup. Strips the runtime's
    /// container-name prefix to recover the agent id, and derives role by
    /// stripping the trailing `-<replica index>` segment.
    pub async fn reconstruct_state(&self) -> Result<usize, FleetError> {
        let running = self.runtime.list_running_agents().await?;
        let mut restored = 0;
        self.table.with_lock(|table| {
            for container in &running {
                let agent_id = &container.agent_id;
                let role = agent_id.rsplit_once('-').map(|(role, _)| role).unwrap_or(agent_id);
                table.insert(
                    agent_id.clone(),
                    FleetEntry {
                        agent_id: agent_id.clone(),
                        container_id: container.container_id.clone(),
                        status: FleetStatus::Running,
                        role: role.to_string(),
                        model: String::new(),
                        started_at: None,
                        restart_count: 0,
                    },
                );
                restored += 1;
            }
        });
        Ok(restored)
    }

    pub fn board_root(&self) -> &std::path::Path {
        &self.board_root
    }

    pub fn runtime(&self) -> &Arc<dyn RuntimeAdapter> {
        &self.runtime
    }

    /// One health-check pass. Never propagates an error: a runtime query
    /// failure is logged by the caller and the loop simply tries again on
    /// the next tick.
    pub async fn health_tick(&self) -> Result<(), RuntimeError> {
        let running = self.runtime.list_running_agents().await?;
        let running_ids: std::collections::HashSet<_> =
            running.iter().map(|c| c.container_id.clone()).collect();

        let agents: Vec<FleetEntry> = self.table.snapshot();
        for mut entry in agents {
            if running_ids.contains(&entry.container_id) {
                entry.status = FleetStatus::Healthy;
                self.table.with_lock(|table| {
                    table.insert(entry.agent_id.clone(), entry);
                });
                continue;
            }

            if entry.restart_count < MAX_RESTARTS {
                match self.runtime.restart_agent(&entry.container_id).await {
                    Ok(result) => {
                        entry.container_id = result.container_id;
                        entry.status = FleetStatus::Restarting;
                    }
                    Err(_) => {
                        entry.status = FleetStatus::Crashed;
                    }
                }
                entry.restart_count += 1;
            } else {
                entry.status = FleetStatus::Crashed;
            }
            self.table.with_lock(|table| {
                table.insert(entry.agent_id.clone(), entry);
            });
        }
        Ok(())
    }
}
