//! Board action endpoints: `POST /tasks`, `/tasks/{id}/reopen`,
//! `/tasks/{id}/delete`, `/tasks/archive`, `/locks/cleanup`. Each mutates
//! the board/lock store and re-renders the board partial.

use std::sync::Arc;

use axum::extract::{Form, Path, State};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::AppContext;

use super::super::pages::render_board;

#[derive(Debug, Deserialize)]
pub struct AddTaskForm {
    pub description: String,
    #[serde(default)]
    pub priority: i64,
}

pub async fn add_task(State(ctx): State<Arc<AppContext>>, Form(form): Form<AddTaskForm>) -> Response {
    if let Err(e) = ctx.board.add_task(form.description, form.priority).await {
        return e.into_response();
    }
    render_board(&ctx).await
}

pub async fn reopen_task(State(ctx): State<Arc<AppContext>>, Path(id): Path<String>) -> Response {
    match ctx.board.reopen(&id).await {
        Ok(_) => {
            let _ = ctx.lock.force_release(&id).await;
            render_board(&ctx).await
        }
        Err(e) => e.into_response(),
    }
}

pub async fn delete_task(State(ctx): State<Arc<AppContext>>, Path(id): Path<String>) -> Response {
    match ctx.board.delete(&id).await {
        Ok(_) => {
            let _ = ctx.lock.force_release(&id).await;
            render_board(&ctx).await
        }
        Err(e) => e.into_response(),
    }
}

/// Default archive threshold when the dashboard triggers a sweep with no
/// explicit age, matching the stale-lock default's order of magnitude.
const DEFAULT_ARCHIVE_AGE_DAYS: i64 = 7;

pub async fn archive_tasks(State(ctx): State<Arc<AppContext>>) -> Response {
    if let Err(e) = ctx.board.archive(DEFAULT_ARCHIVE_AGE_DAYS).await {
        return e.into_response();
    }
    render_board(&ctx).await
}

pub async fn cleanup_locks(State(ctx): State<Arc<AppContext>>) -> Response {
    if let Err(e) = ctx.lock.cleanup_stale(crate::lock::DEFAULT_STALE_SECONDS).await {
        return e.into_response();
    }
    render_board(&ctx).await
}
