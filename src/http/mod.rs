//! The dashboard control plane: page/partial rendering and action
//! endpoints, built on `axum::Router` + shared `AppContext` state
//! (`.with_state(Arc<AppContext>)`, routes grouped by concern under
//! `routes/`).

mod pages;
pub mod preflight;
mod routes;
mod templates;
mod views;
mod ws;

pub use preflight::run_preflight as run_preflight_standalone;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::AppContext;

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .route("/partials/{region}", get(pages::partial))
        .route("/tasks", post(routes::tasks::add_task))
        .route("/tasks/{id}/reopen", post(routes::tasks::reopen_task))
        .route("/tasks/{id}/delete", post(routes::tasks::delete_task))
        .route("/tasks/archive", post(routes::tasks::archive_tasks))
        .route("/locks/cleanup", post(routes::tasks::cleanup_locks))
        .route(
            "/config",
            get(routes::config::get_config).post(routes::config::post_config),
        )
        .route("/fleet/start", post(routes::fleet::start_fleet))
        .route("/fleet/stop", post(routes::fleet::stop_fleet))
        .route("/fleet/status", get(routes::fleet::fleet_status))
        .route("/fleet/preflight", get(routes::fleet::fleet_preflight))
        .route("/agents/{id}/stop", post(routes::fleet::stop_agent))
        .route("/agents/{id}/restart", post(routes::fleet::restart_agent))
        .route("/agents/{id}/logs", get(ws::get_logs))
        .route("/agents/{id}/logs/ws", get(ws::logs_ws))
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}
