//! `agentfleetd` — the coordination substrate, fleet supervisor, and
//! dashboard control plane as one daemon process.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use agentfleet::board::BoardStore;
use agentfleet::config::FleetConfig;
use agentfleet::fleet::{spawn_health_loop, FleetSupervisor};
use agentfleet::lock::LockStore;
use agentfleet::runtime::ContainerRuntime;
use agentfleet::{AppContext, CONTAINER_PREFIX, DEFAULT_BOARD_ROOT};

#[derive(Debug, Parser)]
#[command(name = "agentfleetd", about = "Fleet-of-agents coordinator and dashboard")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to the JSON fleet config file.
    #[arg(long, global = true, env = "AGENTFLEET_CONFIG")]
    config: Option<PathBuf>,

    /// Project root whose `.fleet/` directory backs the board/lock stores.
    #[arg(long, global = true, default_value = ".")]
    project_root: PathBuf,

    /// Log level filter, e.g. `info`, `agentfleet=debug`.
    #[arg(long, global = true, env = "AGENTFLEET_LOG", default_value = "info")]
    log_level: String,

    /// Optional directory for daily-rolling log files.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP dashboard + fleet supervisor.
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        #[arg(long, default_value_t = 8080)]
        port: u16,
        #[arg(long, default_value = "docker")]
        runtime_binary: String,
    },
    /// Run preflight checks once and print the result, without starting
    /// the server.
    Doctor {
        #[arg(long, default_value = "docker")]
        runtime_binary: String,
    },
}

fn setup_logging(log_level: &str, log_dir: Option<&PathBuf>) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(dir) = log_dir else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init();
        return None;
    };

    match std::fs::create_dir_all(dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::daily(dir, "agentfleetd.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer())
                .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                .init();
            Some(guard)
        }
        Err(e) => {
            eprintln!("log dir {} unusable ({e}), logging to stdout only", dir.display());
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer())
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _log_guard = setup_logging(&args.log_level, args.log_dir.as_ref());

    let board_root = args.project_root.join(DEFAULT_BOARD_ROOT);
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| args.project_root.join("agentfleet.json"));

    let (config, config_path) =
        FleetConfig::load(args.config.clone(), "AGENTFLEET_CONFIG", &config_path).await?;

    match args.command.unwrap_or(Command::Serve {
        host: "0.0.0.0".into(),
        port: 8080,
        runtime_binary: "docker".into(),
    }) {
        Command::Doctor { runtime_binary } => {
            let runtime = ContainerRuntime::new(runtime_binary, CONTAINER_PREFIX);
            let board = BoardStore::new(&board_root);
            let checks = agentfleet::http::run_preflight_standalone(&runtime, &config, &board).await;
            for check in checks {
                println!("{check}");
            }
            Ok(())
        }
        Command::Serve { host, port, runtime_binary } => {
            let board = Arc::new(BoardStore::new(&board_root));
            let lock = Arc::new(LockStore::new(&board_root));
            let runtime = Arc::new(ContainerRuntime::new(runtime_binary, CONTAINER_PREFIX));
            let fleet = Arc::new(FleetSupervisor::new(runtime, board_root.clone()));

            if let Err(e) = fleet.reconstruct_state().await {
                tracing::warn!(error = %e, "fleet state reconstruction failed at startup");
            }
            spawn_health_loop(fleet.clone());

            let ctx = Arc::new(AppContext::new(
                board,
                lock,
                fleet,
                config,
                config_path,
                args.project_root.clone(),
            ));
            let app = agentfleet::http::build_router(ctx);

            let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
            tracing::info!(%host, port, "agentfleetd listening");
            axum::serve(listener, app).await?;
            Ok(())
        }
    }
}
