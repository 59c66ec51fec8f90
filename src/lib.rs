//! Coordination substrate, fleet supervisor, and dashboard control plane for
//! a fleet of autonomous coding agents.
//!
//! Three subsystems: [`board`] + [`lock`] (coordination substrate),
//! [`fleet`] (supervisor), and [`http`] (dashboard control plane).
//! [`runtime`] and [`upstream`] are the narrow adapters over the
//! container runtime and the version-control upstream that the
//! supervisor drives.

pub mod board;
pub mod config;
pub mod error;
pub mod fleet;
pub mod http;
pub mod ids;
pub mod lock;
pub mod runtime;
pub mod upstream;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::board::BoardStore;
use crate::config::FleetConfig;
use crate::fleet::FleetSupervisor;
use crate::lock::LockStore;

/// Shared application state passed to every HTTP handler and background
/// task: one `Arc`-wrapped struct, cloned cheaply per request, holding
/// every subsystem a handler might need.
#[derive(Clone)]
pub struct AppContext {
    pub board: Arc<BoardStore>,
    pub lock: Arc<LockStore>,
    pub fleet: Arc<FleetSupervisor>,
    pub config: Arc<tokio::sync::RwLock<FleetConfig>>,
    pub config_path: PathBuf,
    pub project_root: PathBuf,
    pub started_at: Instant,
}

impl AppContext {
    pub fn new(
        board: Arc<BoardStore>,
        lock: Arc<LockStore>,
        fleet: Arc<FleetSupervisor>,
        config: FleetConfig,
        config_path: PathBuf,
        project_root: PathBuf,
    ) -> Self {
        Self {
            board,
            lock,
            fleet,
            config: Arc::new(tokio::sync::RwLock::new(config)),
            config_path,
            project_root,
            started_at: Instant::now(),
        }
    }
}

/// Default root directory name for board/lock/message/archive storage,
/// relative to a project root.
pub const DEFAULT_BOARD_ROOT: &str = ".fleet";

/// Fixed prefix for every container this system creates, used both to name
/// containers and to recognize them again on `list_running_agents` /
/// `stop_fleet` / state reconstruction.
pub const CONTAINER_PREFIX: &str = "fleet-agent-";
