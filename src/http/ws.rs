//! Log endpoints: `GET /agents/{id}/logs` (bounded tail, rendered as
//! preformatted HTML) and `WS /agents/{id}/logs/ws` (live follow-mode
//! stream).
//!
//! The per-second throttle is a tumbling-window counter reset every
//! wall-clock second. ANSI stripping uses a compiled `once_cell` regex.

use std::process::Stdio;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse, Response};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::timeout;
use tracing::warn;

use crate::ids::validate_agent_id;
use crate::AppContext;

const LOG_LINE_TIMEOUT: Duration = Duration::from_secs(30);
const RATE_LIMIT_PER_SEC: u32 = 500;
const TAIL_LINES: u32 = 100;

static ANSI_CSI: Lazy<Regex> = Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("static regex"));

pub fn strip_ansi(line: &str) -> String {
    ANSI_CSI.replace_all(line, "").into_owned()
}

/// Tumbling per-second counter: resets whenever the wall-clock second
/// changes.
struct LineRateLimiter {
    window_start_secs: AtomicI64,
    count: AtomicU32,
    limit: u32,
}

impl LineRateLimiter {
    fn new(limit: u32) -> Self {
        Self {
            window_start_secs: AtomicI64::new(0),
            count: AtomicU32::new(0),
            limit,
        }
    }

    /// Returns `true` if this call is within budget for the current
    /// second, `false` once the limit has tripped for that second.
    fn allow(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        let window = self.window_start_secs.load(Ordering::SeqCst);
        if now != window {
            self.window_start_secs.store(now, Ordering::SeqCst);
            self.count.store(0, Ordering::SeqCst);
        }
        let count = self.count.fetch_add(1, Ordering::SeqCst);
        count < self.limit
    }
}

pub async fn get_logs(State(ctx): State<Arc<AppContext>>, Path(id): Path<String>) -> Response {
    if validate_agent_id(&id).is_err() {
        return (axum::http::StatusCode::BAD_REQUEST, "invalid agent id").into_response();
    }
    let Some(entry) = ctx.fleet.table().get(&id) else {
        return (axum::http::StatusCode::NOT_FOUND, "unknown agent").into_response();
    };

    match ctx.fleet.runtime().get_agent_logs(&entry.container_id, TAIL_LINES).await {
        Ok(raw) => {
            let stripped = strip_ansi(&raw);
            Html(format!("<pre>{}</pre>", html_escape(&stripped))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

pub async fn logs_ws(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    if validate_agent_id(&id).is_err() {
        return (axum::http::StatusCode::BAD_REQUEST, "invalid agent id").into_response();
    }
    let Some(entry) = ctx.fleet.table().get(&id) else {
        return (axum::http::StatusCode::NOT_FOUND, "unknown agent").into_response();
    };

    ws.on_upgrade(move |socket| stream_logs(socket, ctx, entry.container_id))
}

async fn stream_logs(mut socket: WebSocket, ctx: Arc<AppContext>, container_id: String) {
    let mut command = ctx.fleet.runtime().follow_logs_command(&container_id);
    let mut child = match command.stdout(Stdio::piped()).spawn() {
        Ok(child) => child,
        Err(e) => {
            let _ = socket.send(WsMessage::Text(format!("failed to start log stream: {e}").into())).await;
            return;
        }
    };

    let Some(stdout) = child.stdout.take() else {
        let _ = child.kill().await;
        return;
    };
    let mut lines = BufReader::new(stdout).lines();
    let limiter = LineRateLimiter::new(RATE_LIMIT_PER_SEC);
    let mut throttled_this_second = false;

    loop {
        match timeout(LOG_LINE_TIMEOUT, lines.next_line()).await {
            Ok(Ok(Some(line))) => {
                if !limiter.allow() {
                    if !throttled_this_second {
                        throttled_this_second = true;
                        if socket
                            .send(WsMessage::Text("(rate limit exceeded, dropping lines this second)".into()))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    continue;
                }
                throttled_this_second = false;
                let stripped = strip_ansi(&line);
                if socket.send(WsMessage::Text(stripped.into())).await.is_err() {
                    break;
                }
            }
            Ok(Ok(None)) => break,
            Ok(Err(e)) => {
                warn!(error = %e, "log stream read error");
                break;
            }
            Err(_) => break,
        }
    }

    let _ = child.kill().await;
    let _ = child.wait().await;
}
