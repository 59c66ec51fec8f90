//! Scriptable entry point for agent processes, over the `board` library
//! module. Every subcommand prints one JSON line to stdout on success
//! and exits non-zero with a message on stderr on failure.

use std::path::PathBuf;

use agentfleet::board::{BoardStore, TaskStatus};
use clap::{Parser, Subcommand};
use serde_json::json;

#[derive(Debug, Parser)]
#[command(name = "board")]
struct Args {
    #[arg(long, global = true, env = "AGENTFLEET_BOARD_ROOT", default_value = ".fleet")]
    board_root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Add {
        description: String,
        #[arg(long, default_value_t = 0)]
        priority: i64,
    },
    List {
        #[arg(long)]
        status: Option<String>,
    },
    Claim {
        agent_id: String,
    },
    Complete {
        task_id: String,
        agent_id: String,
    },
    Fail {
        task_id: String,
        agent_id: String,
        reason: String,
    },
    Message {
        from: String,
        to: String,
        text: String,
    },
    Messages {
        role: String,
        #[arg(long)]
        unread: bool,
    },
    #[command(name = "mark-read")]
    MarkRead {
        message_id: String,
    },
}

fn parse_status(s: &str) -> anyhow::Result<TaskStatus> {
    match s {
        "open" => Ok(TaskStatus::Open),
        "locked" => Ok(TaskStatus::Locked),
        "done" => Ok(TaskStatus::Done),
        "failed" => Ok(TaskStatus::Failed),
        other => anyhow::bail!("invalid status: {other}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let store = BoardStore::new(&args.board_root);

    let result: anyhow::Result<serde_json::Value> = async {
        match args.command {
            Command::Add { description, priority } => {
                let id = store.add_task(description, priority).await?;
                Ok(json!({ "id": id }))
            }
            Command::List { status } => {
                let status = status.as_deref().map(parse_status).transpose()?;
                let tasks = store.list_tasks(status).await?;
                Ok(json!(tasks))
            }
            Command::Claim { agent_id } => {
                let task = store.claim(&agent_id).await?;
                Ok(json!(task))
            }
            Command::Complete { task_id, agent_id } => {
                store.complete(&task_id, &agent_id).await?;
                Ok(json!({ "id": task_id, "status": "done" }))
            }
            Command::Fail { task_id, agent_id, reason } => {
                store.fail(&task_id, &agent_id, reason).await?;
                Ok(json!({ "id": task_id, "status": "failed" }))
            }
            Command::Message { from, to, text } => {
                let id = store.post_message(from, to, text).await?;
                Ok(json!({ "id": id }))
            }
            Command::Messages { role, unread } => {
                let messages = store.get_messages(&role, unread).await?;
                Ok(json!(messages))
            }
            Command::MarkRead { message_id } => {
                store.mark_read(&message_id).await?;
                Ok(json!({ "id": message_id, "read": true }))
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
