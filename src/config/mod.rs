//! Declarative fleet configuration: JSON file, CLI/env/file/default
//! precedence ladder (`FleetConfig::load`) and schema validation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::ids::validate_role_name;

/// Host env vars forwarded into every agent container unless overridden by
/// the config's `provider` block: API key, auth token, base URL, three
/// model overrides, and the API request timeout.
pub const PROVIDER_ENV_ALLOWLIST: &[&str] = &[
    "ANTHROPIC_API_KEY",
    "ANTHROPIC_AUTH_TOKEN",
    "ANTHROPIC_BASE_URL",
    "ANTHROPIC_DEFAULT_SONNET_MODEL",
    "ANTHROPIC_DEFAULT_OPUS_MODEL",
    "ANTHROPIC_DEFAULT_HAIKU_MODEL",
    "API_TIMEOUT_MS",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeKind {
    Docker,
    Devpod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleConfig {
    pub name: String,
    pub count: u32,
    pub model: String,
    pub prompt_file: String,
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: u32,
}

fn default_max_turns() -> u32 {
    50
}

fn default_max_sessions() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockerConfig {
    pub image: String,
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,
}

/// Alternate runtime provider section. Modeled as configuration data
/// only — no devpod backend is implemented.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevpodConfig {
    pub provider: String,
    pub instance_type: String,
    pub ide: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub upstream_path: PathBuf,
    pub branch: String,
    #[serde(default)]
    pub origin: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub method: String,
    #[serde(default)]
    pub api_key_env: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(flatten)]
    pub overrides: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    pub runtime: RuntimeKind,
    pub roles: Vec<RoleConfig>,
    pub docker: DockerConfig,
    pub devpod: DevpodConfig,
    pub sync: SyncConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl FleetConfig {
    /// CLI flag > environment variable > file on disk.
    pub async fn load(
        cli_path: Option<PathBuf>,
        env_var: &str,
        default_path: &Path,
    ) -> Result<(Self, PathBuf), ConfigError> {
        let path = cli_path
            .or_else(|| std::env::var_os(env_var).map(PathBuf::from))
            .unwrap_or_else(|| default_path.to_path_buf());

        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let raw = tokio::fs::read_to_string(&path).await?;
        let config: FleetConfig = serde_json::from_str(&raw)?;
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(ConfigError::Invalid(errors));
        }
        Ok((config, path))
    }

    /// Domain checks beyond what `serde` deserialization already
    /// guarantees — "is this value sane", not "is this key present".
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.roles.is_empty() {
            errors.push("roles: at least one role must be configured".to_string());
        }
        for role in &self.roles {
            if let Err(e) = validate_role_name(&role.name) {
                errors.push(format!("roles.{}: {e}", role.name));
            }
            if role.count == 0 {
                errors.push(format!("roles.{}: count must be >= 1", role.name));
            }
        }
        if self.runtime == RuntimeKind::Docker && self.docker.image.trim().is_empty() {
            errors.push("docker.image: must not be empty".to_string());
        }
        if self.sync.branch.trim().is_empty() {
            errors.push("sync.branch: must not be empty".to_string());
        }
        if self.auth.method.trim().is_empty() {
            errors.push("auth.method: must not be empty".to_string());
        }
        errors
    }

    /// Writes `<path>.bak` with the currently-active file's bytes (if any)
    /// before writing `self` as the new active file.
    pub async fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            let existing = tokio::fs::read(path).await?;
            let backup_path = path.with_extension(
                path.extension()
                    .map(|e| format!("{}.bak", e.to_string_lossy()))
                    .unwrap_or_else(|| "bak".to_string()),
            );
            tokio::fs::write(backup_path, existing).await?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, raw).await?;
        Ok(())
    }

    /// Merges the fixed env allowlist forwarded from the supervisor's own
    /// process environment with explicit overrides from `provider`, which
    /// are applied last so they win.
    pub fn build_provider_env(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        for key in PROVIDER_ENV_ALLOWLIST {
            if let Ok(value) = std::env::var(key) {
                env.insert((*key).to_string(), value);
            }
        }
        for (key, value) in &self.provider.overrides {
            env.insert(key.clone(), value.clone());
        }
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FleetConfig {
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
                upstream_path: PathBuf::from("/tmp/upstream"),
                branch: "main".into(),
                origin: None,
            },
            auth: AuthConfig {
                method: "api_key".into(),
                api_key_env: Some("ANTHROPIC_API_KEY".into()),
            },
            provider: ProviderConfig::default(),
        }
    }

    #[test]
    fn valid_config_has_no_errors() {
        assert!(sample().validate().is_empty());
    }

    #[test]
    fn empty_roles_is_invalid() {
        let mut config = sample();
        config.roles.clear();
        assert!(!config.validate().is_empty());
    }

    #[test]
    fn bad_role_name_is_invalid() {
        let mut config = sample();
        config.roles[0].name = "Not Valid!".into();
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.contains("Not Valid!")));
    }

    #[test]
    #[serial_test::serial]
    fn provider_overrides_win_over_allowlisted_env() {
        std::env::set_var("ANTHROPIC_API_KEY", "from-env");
        let mut config = sample();
        config
            .provider
            .overrides
            .insert("ANTHROPIC_API_KEY".into(), "from-config".into());
        let env = config.build_provider_env();
        assert_eq!(env.get("ANTHROPIC_API_KEY").map(String::as_str), Some("from-config"));
        std::env::remove_var("ANTHROPIC_API_KEY");
    }
}
