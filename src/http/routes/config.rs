//! `GET /config`, `POST /config` — GET returns the raw configuration;
//! POST validates a submitted JSON blob and, on success, backs up the
//! prior file before writing.

use std::sync::Arc;

use axum::extract::{Form, State};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use crate::config::FleetConfig;
use crate::AppContext;

use super::super::pages::render_config;

pub async fn get_config(State(ctx): State<Arc<AppContext>>) -> Response {
    let config = ctx.config.read().await;
    Json(&*config).into_response()
}

#[derive(Debug, Deserialize)]
pub struct ConfigForm {
    pub config_json: String,
}

pub async fn post_config(State(ctx): State<Arc<AppContext>>, Form(form): Form<ConfigForm>) -> Response {
    let parsed: FleetConfig = match serde_json::from_str(&form.config_json) {
        Ok(c) => c,
        Err(e) => return render_config(&ctx, &[format!("invalid json: {e}")]).await,
    };

    let errors = parsed.validate();
    if !errors.is_empty() {
        return render_config(&ctx, &errors).await;
    }

    if let Err(e) = parsed.save(&ctx.config_path).await {
        return render_config(&ctx, &[e.to_string()]).await;
    }

    *ctx.config.write().await = parsed;
    render_config(&ctx, &[]).await
}
