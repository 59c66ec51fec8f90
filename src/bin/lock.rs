//! Scriptable entry point over the `lock` library module, for use
//! directly from agent-facing shell scripts.

use std::path::PathBuf;

use agentfleet::lock::{LockStore, DEFAULT_STALE_SECONDS};
use clap::{Parser, Subcommand};
use serde_json::json;

#[derive(Debug, Parser)]
#[command(name = "lock")]
struct Args {
    #[arg(long, global = true, env = "AGENTFLEET_BOARD_ROOT", default_value = ".fleet")]
    board_root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Acquire { task_id: String, agent_id: String },
    Release { task_id: String, agent_id: String },
    Refresh { task_id: String, agent_id: String },
    List,
    Cleanup {
        #[arg(long, default_value_t = DEFAULT_STALE_SECONDS)]
        max_age_seconds: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let store = LockStore::new(&args.board_root);

    let result: anyhow::Result<serde_json::Value> = async {
        match args.command {
            Command::Acquire { task_id, agent_id } => {
                let acquired = store.acquire(&task_id, &agent_id).await?;
                Ok(json!({ "task_id": task_id, "acquired": acquired }))
            }
            Command::Release { task_id, agent_id } => {
                let released = store.release(&task_id, &agent_id).await?;
                Ok(json!({ "task_id": task_id, "released": released }))
            }
            Command::Refresh { task_id, agent_id } => {
                let refreshed = store.refresh(&task_id, &agent_id).await?;
                Ok(json!({ "task_id": task_id, "refreshed": refreshed }))
            }
            Command::List => {
                let locks = store.list().await?;
                let locks: Vec<_> = locks.into_iter().map(|(_, record)| record).collect();
                Ok(json!(locks))
            }
            Command::Cleanup { max_age_seconds } => {
                let reaped = store.cleanup_stale(max_age_seconds).await?;
                Ok(json!({ "reaped": reaped }))
            }
        }
    }
    .await;

    match result {
        Ok(value) => {
            println!("{value}");
            Ok(())
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
