//! Batched readiness checks shown before starting the fleet: runtime
//! reachability, configured image, credentials, config validity, and
//! whether there's any open work on the board.

use serde::Serialize;

use crate::board::{BoardStore, TaskStatus};
use crate::config::FleetConfig;
use crate::runtime::RuntimeAdapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Fail,
    Warn,
}

#[derive(Debug, Serialize)]
pub struct PreflightCheck {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
}

impl std::fmt::Display for PreflightCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self.status {
            CheckStatus::Pass => "pass",
            CheckStatus::Fail => "fail",
            CheckStatus::Warn => "warn",
        };
        write!(f, "[{status}] {}: {}", self.name, self.message)
    }
}

pub async fn run_preflight(
    runtime: &dyn RuntimeAdapter,
    config: &FleetConfig,
    board: &BoardStore,
) -> Vec<PreflightCheck> {
    let mut checks = Vec::new();

    checks.push(match runtime.list_running_agents().await {
        Ok(_) => PreflightCheck {
            name: "runtime".into(),
            status: CheckStatus::Pass,
            message: "container runtime responsive".into(),
        },
        Err(e) => PreflightCheck {
            name: "runtime".into(),
            status: CheckStatus::Fail,
            message: format!("container runtime unreachable: {e}"),
        },
    });

    checks.push(match runtime.image_exists(&config.docker.image).await {
        Ok(true) => PreflightCheck {
            name: "image".into(),
            status: CheckStatus::Pass,
            message: format!("image present: {}", config.docker.image),
        },
        Ok(false) => PreflightCheck {
            name: "image".into(),
            status: CheckStatus::Fail,
            message: format!("image not found: {}", config.docker.image),
        },
        Err(e) => PreflightCheck {
            name: "image".into(),
            status: CheckStatus::Fail,
            message: format!("could not check image {}: {e}", config.docker.image),
        },
    });

    let credentials_present = config
        .docker
        .credentials_path
        .as_ref()
        .map(|p| p.exists())
        .unwrap_or(false)
        || config
            .auth
            .api_key_env
            .as_ref()
            .map(|v| std::env::var(v).is_ok())
            .unwrap_or(false);
    checks.push(PreflightCheck {
        name: "credentials".into(),
        status: if credentials_present { CheckStatus::Pass } else { CheckStatus::Fail },
        message: if credentials_present {
            "credentials available".into()
        } else {
            "no credentials file and no API key env var set".into()
        },
    });

    let config_errors = config.validate();
    checks.push(if config_errors.is_empty() {
        PreflightCheck {
            name: "config".into(),
            status: CheckStatus::Pass,
            message: "config is valid".into(),
        }
    } else {
        PreflightCheck {
            name: "config".into(),
            status: CheckStatus::Fail,
            message: config_errors.join("; "),
        }
    });

    let open_tasks = board.list_tasks(Some(TaskStatus::Open)).await.unwrap_or_default();
    checks.push(if open_tasks.is_empty() {
        PreflightCheck {
            name: "board".into(),
            status: CheckStatus::Warn,
            message: "no open tasks on the board".into(),
        }
    } else {
        PreflightCheck {
            name: "board".into(),
            status: CheckStatus::Pass,
            message: format!("{} open task(s)", open_tasks.len()),
        }
    });

    checks
}
