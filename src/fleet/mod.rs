//! Fleet supervisor: in-memory fleet state, lifecycle operations, the
//! health loop, and state reconstruction from the container runtime.

mod health;
mod supervisor;
mod table;

pub use health::{run_once, spawn_health_loop, HEALTH_CHECK_INTERVAL};
pub use supervisor::{FleetSupervisor, MAX_RESTARTS};
pub use table::{FleetEntry, FleetStatus, FleetTable};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, DevpodConfig, DockerConfig, FleetConfig, ProviderConfig, RoleConfig, RuntimeKind, SyncConfig};
    use crate::error::RuntimeError;
    use crate::runtime::{RunningContainer, RuntimeAdapter, StartAgentSpec, StartedContainer};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeRuntime {
        running_container_ids: std::sync::Mutex<Vec<String>>,
        restart_calls: AtomicU32,
        restart_should_fail: std::sync::atomic::AtomicBool,
        next_container_id: AtomicU32,
    }

    #[async_trait]
    impl RuntimeAdapter for FakeRuntime {
        async fn build_image(&self, _name: &str, _source_dir: &std::path::Path) -> Result<bool, RuntimeError> {
            Ok(true)
        }

        async fn start_agent(&self, spec: StartAgentSpec) -> Result<StartedContainer, RuntimeError> {
            let id = self.next_container_id.fetch_add(1, Ordering::SeqCst);
            let container_id = format!("c{id}");
            self.running_container_ids.lock().unwrap().push(container_id.clone());
            let _ = spec;
            Ok(StartedContainer {
                container_id,
                status: "running".into(),
            })
        }

        async fn stop_agent(&self, container_id: &str) -> Result<bool, RuntimeError> {
            self.running_container_ids.lock().unwrap().retain(|id| id != container_id);
            Ok(true)
        }

        async fn restart_agent(&self, container_id: &str) -> Result<StartedContainer, RuntimeError> {
            self.restart_calls.fetch_add(1, Ordering::SeqCst);
            if self.restart_should_fail.load(Ordering::SeqCst) {
                return Err(RuntimeError::CommandFailed {
                    status: "1".into(),
                    stderr: "boom".into(),
                });
            }
            Ok(StartedContainer {
                container_id: container_id.to_string(),
                status: "running".into(),
            })
        }

        async fn stop_fleet(&self) -> Result<u32, RuntimeError> {
            let mut ids = self.running_container_ids.lock().unwrap();
            let count = ids.len() as u32;
            ids.clear();
            Ok(count)
        }

        async fn list_running_agents(&self) -> Result<Vec<RunningContainer>, RuntimeError> {
            Ok(self
                .running_container_ids
                .lock()
                .unwrap()
                .iter()
                .map(|id| RunningContainer {
                    container_id: id.clone(),
                    name: format!("fleet-agent-{id}"),
                    agent_id: id.clone(),
                    status: "running".into(),
                    running_for: "1m".into(),
                })
                .collect())
        }

        async fn get_agent_logs(&self, _container_id: &str, _tail_lines: u32) -> Result<String, RuntimeError> {
            Ok(String::new())
        }

        async fn image_exists(&self, _image: &str) -> Result<bool, RuntimeError> {
            Ok(true)
        }

        fn follow_logs_command(&self, _container_id: &str) -> tokio::process::Command {
            tokio::process::Command::new("true")
        }
    }

    fn config() -> FleetConfig {
        FleetConfig {
            runtime: RuntimeKind::Docker,
            roles: vec![RoleConfig {
                name: "implementer".into(),
                count: 2,
                model: "sonnet".into(),
                prompt_file: "prompts/implementer.md".into(),
                max_turns: 50,
                max_sessions: 1,
            }],
            docker: DockerConfig {
                image: "agentfleet:latest".into(),
                credentials_path: None,
            },
            devpod: DevpodConfig {
                provider: "aws".into(),
                instance_type: "t3.medium".into(),
                ide: "vscode".into(),
            },
            sync: SyncConfig {
                upstream_path: PathBuf::from("upstream.git"),
                branch: "main".into(),
                origin: None,
            },
            auth: AuthConfig {
                method: "api_key".into(),
                api_key_env: None,
            },
            provider: ProviderConfig::default(),
        }
    }

    #[tokio::test]
    async fn start_fleet_rejects_when_no_roles_configured() {
        let dir = TempDir::new().unwrap();
        let supervisor = FleetSupervisor::new(Arc::new(FakeRuntime::default()), dir.path().to_path_buf());
        let mut cfg = config();
        cfg.roles.clear();
        let err = supervisor.start_fleet(&cfg, dir.path()).await.unwrap_err();
        assert!(matches!(err, crate::error::FleetError::NoRolesConfigured));
    }

    #[tokio::test]
    async fn start_fleet_records_one_entry_per_replica() {
        let dir = TempDir::new().unwrap();
        let supervisor = FleetSupervisor::new(Arc::new(FakeRuntime::default()), dir.path().to_path_buf());
        let started = supervisor.start_fleet(&config(), dir.path()).await.unwrap();
        assert_eq!(started, vec!["implementer-0", "implementer-1"]);
        assert_eq!(supervisor.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn state_reconstruction_recovers_agent_id_and_role() {
        let dir = TempDir::new().unwrap();
        let runtime = Arc::new(FakeRuntime::default());
        let supervisor = FleetSupervisor::new(runtime.clone(), dir.path().to_path_buf());
        runtime.running_container_ids.lock().unwrap().push("impl-0".into());

        let restored = supervisor.reconstruct_state().await.unwrap();
        assert_eq!(restored, 1);
        let entry = supervisor.table().get("impl-0").unwrap();
        assert_eq!(entry.role, "impl");
        assert_eq!(entry.status, FleetStatus::Running);
    }

    #[tokio::test]
    async fn health_tick_restarts_missing_container_up_to_the_cap() {
        let dir = TempDir::new().unwrap();
        let runtime = Arc::new(FakeRuntime::default());
        let supervisor = FleetSupervisor::new(runtime.clone(), dir.path().to_path_buf());

        supervisor.table().with_lock(|table| {
            table.insert(
                "impl-0".into(),
                FleetEntry {
                    agent_id: "impl-0".into(),
                    container_id: "gone".into(),
                    status: FleetStatus::Running,
                    role: "impl".into(),
                    model: "sonnet".into(),
                    started_at: None,
                    restart_count: 0,
                },
            );
        });

        for expected_count in 1..=3 {
            supervisor.health_tick().await.unwrap();
            let entry = supervisor.table().get("impl-0").unwrap();
            assert_eq!(entry.restart_count, expected_count);
            assert_eq!(entry.status, FleetStatus::Restarting);
        }

        supervisor.health_tick().await.unwrap();
        let entry = supervisor.table().get("impl-0").unwrap();
        assert_eq!(entry.restart_count, 3);
        assert_eq!(entry.status, FleetStatus::Crashed);
        assert_eq!(runtime.restart_calls.load(Ordering::SeqCst), 3);
    }
}
