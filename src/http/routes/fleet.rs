//! Fleet lifecycle action endpoints: `POST /fleet/{start,stop}`,
//! `GET /fleet/status`, `GET /fleet/preflight`,
//! `POST /agents/{id}/{stop,restart}`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use crate::ids::validate_agent_id;
use crate::AppContext;

use super::super::preflight::run_preflight;

pub async fn start_fleet(State(ctx): State<Arc<AppContext>>) -> Response {
    let config = ctx.config.read().await;
    match ctx.fleet.start_fleet(&config, &ctx.project_root).await {
        Ok(started) => Json(json!({ "started": started })).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn stop_fleet(State(ctx): State<Arc<AppContext>>) -> Response {
    match ctx.fleet.stop_fleet().await {
        Ok(stopped) => Json(json!({ "stopped": stopped })).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn fleet_status(State(ctx): State<Arc<AppContext>>) -> Response {
    let snapshot = ctx.fleet.snapshot();
    Json(json!({ "agents": snapshot })).into_response()
}

pub async fn fleet_preflight(State(ctx): State<Arc<AppContext>>) -> Response {
    let config = ctx.config.read().await;
    let checks = run_preflight(ctx.fleet.runtime().as_ref(), &config, &ctx.board).await;
    Json(json!({ "checks": checks })).into_response()
}

fn invalid_agent_id(id: &str) -> Response {
    (
        axum::http::StatusCode::BAD_REQUEST,
        Json(json!({ "error": format!("invalid agent id: {id}") })),
    )
        .into_response()
}

pub async fn stop_agent(State(ctx): State<Arc<AppContext>>, Path(id): Path<String>) -> Response {
    if validate_agent_id(&id).is_err() {
        return invalid_agent_id(&id);
    }
    match ctx.fleet.stop_agent(&id).await {
        Ok(()) => Json(json!({ "agent_id": id, "status": "stopped" })).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn restart_agent(State(ctx): State<Arc<AppContext>>, Path(id): Path<String>) -> Response {
    if validate_agent_id(&id).is_err() {
        return invalid_agent_id(&id);
    }
    match ctx.fleet.restart_agent(&id).await {
        Ok(()) => Json(json!({ "agent_id": id, "status": "restarting" })).into_response(),
        Err(e) => e.into_response(),
    }
}
