//! Full-page and per-region partial rendering.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use minijinja::context;

use crate::AppContext;

use super::preflight::run_preflight;
use super::templates::TEMPLATES;
use super::views::{assemble_agent_cards, compute_stats, group_tasks};

fn render(name: &str, ctx: minijinja::Value) -> Response {
    match TEMPLATES.get_template(name).and_then(|t| t.render(ctx)) {
        Ok(html) => Html(html).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("template error: {e}")).into_response(),
    }
}

pub async fn index(State(ctx): State<Arc<AppContext>>) -> Response {
    let _ = ctx;
    render("index.html", context! {})
}

pub async fn partial(State(ctx): State<Arc<AppContext>>, Path(region): Path<String>) -> Response {
    match region.as_str() {
        "board" => render_board(&ctx).await,
        "stats" => render_stats(&ctx).await,
        "agents" => render_agents(&ctx).await,
        "messages" => render_messages(&ctx).await,
        "fleet" => render_fleet(&ctx).await,
        "config" => render_config(&ctx, &[]).await,
        _ => (StatusCode::NOT_FOUND, "unknown partial").into_response(),
    }
}

pub async fn render_board(ctx: &AppContext) -> Response {
    let tasks = match ctx.board.list_tasks(None).await {
        Ok(t) => t,
        Err(e) => return e.into_response(),
    };
    let groups = group_tasks(tasks);
    render("partials/board.html", context! { groups => groups })
}

pub async fn render_stats(ctx: &AppContext) -> Response {
    let tasks = match ctx.board.list_tasks(None).await {
        Ok(t) => t,
        Err(e) => return e.into_response(),
    };
    let locks = match ctx.lock.list().await {
        Ok(l) => l,
        Err(e) => return e.into_response(),
    };
    let stats = compute_stats(&tasks, &locks);
    render("partials/stats.html", context! { stats => stats })
}

pub async fn render_agents(ctx: &AppContext) -> Response {
    let fleet = ctx.fleet.snapshot();
    let locks = match ctx.lock.list().await {
        Ok(l) => l,
        Err(e) => return e.into_response(),
    };
    let cards = assemble_agent_cards(fleet, locks);
    render("partials/agents.html", context! { cards => cards })
}

pub async fn render_messages(ctx: &AppContext) -> Response {
    let messages = match ctx.board.list_all_messages(200).await {
        Ok(m) => m,
        Err(e) => return e.into_response(),
    };
    render("partials/messages.html", context! { messages => messages })
}

pub async fn render_fleet(ctx: &AppContext) -> Response {
    let config = ctx.config.read().await;
    let preflight = run_preflight(ctx.fleet.runtime().as_ref(), &config, &ctx.board).await;
    render("partials/fleet.html", context! { preflight => preflight })
}

pub async fn render_config(ctx: &AppContext, errors: &[String]) -> Response {
    let config = ctx.config.read().await;
    let config_json = serde_json::to_string_pretty(&*config).unwrap_or_default();
    render(
        "partials/config.html",
        context! { config_json => config_json, errors => errors },
    )
}
