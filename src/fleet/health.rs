//! Background health-check loop: periodically polls the runtime adapter
//! and reconciles it against the fleet table.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, warn};

use super::supervisor::FleetSupervisor;

pub const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Spawns the periodic health tick. Every iteration swallows its own
/// errors so a transient runtime-query failure never kills the loop.
pub fn spawn_health_loop(supervisor: Arc<FleetSupervisor>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(HEALTH_CHECK_INTERVAL);
        loop {
            ticker.tick().await;
            if let Err(e) = supervisor.health_tick().await {
                warn!(error = %e, "fleet health tick failed, will retry next interval");
            }
        }
    })
}

/// Runs exactly one tick outside of the interval loop, surfacing errors —
/// used by the `GET /fleet/status` route to report a fresh view on demand,
/// and by tests that want deterministic single-tick control.
pub async fn run_once(supervisor: &FleetSupervisor) {
    if let Err(e) = supervisor.health_tick().await {
        error!(error = %e, "fleet health tick failed");
    }
}
