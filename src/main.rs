use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::info;

use wsnap_core::snapshot::{JsonAppState, NoAppState};
use wsnap_core::{ContentId, EngineConfig, SnapshotEngine, SnapshotError};

#[derive(Parser)]
#[command(name = "wsnap", version, about = "Commit and restore workspace snapshots")]
struct Cli {
    /// Config file (default: ~/.wsnap/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Snapshot a directory and make it the workspace's current snapshot
    Commit {
        #[arg(long)]
        workspace: String,
        /// Directory to scan
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// JSON file stored as the snapshot's application state
        #[arg(long)]
        app_state: Option<PathBuf>,
    },
    /// Write a snapshot's files into a directory
    Restore {
        /// Content id to restore; defaults to the workspace's current snapshot
        content_id: Option<String>,
        #[arg(long)]
        workspace: Option<String>,
        #[arg(long)]
        into: PathBuf,
    },
    /// Print the current pointer of a workspace
    Show {
        #[arg(long)]
        workspace: String,
    },
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    wsnap_core::util::init_logging(cli.log_json);

    match run(cli).await {
        Ok(output) => {
            println!("{}", output);
            std::process::ExitCode::SUCCESS
        }
        Err(e) => {
            let code = e
                .downcast_ref::<SnapshotError>()
                .map(SnapshotError::code)
                .unwrap_or("error");
            println!("{}", json!({ "error": code, "message": format!("{:#}", e) }));
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<String> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::load_default()?,
    };
    let engine = SnapshotEngine::from_config(&config)?;
    info!("Using {:?} store", config.store.kind);

    let output = match cli.command {
        Command::Commit {
            workspace,
            root,
            app_state,
        } => {
            let outcome = match app_state {
                Some(path) => {
                    let content = std::fs::read_to_string(&path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    let value: Value = serde_json::from_str(&content)
                        .with_context(|| format!("parsing {}", path.display()))?;
                    engine
                        .commit(&workspace, &root, &JsonAppState(value))
                        .await?
                }
                None => engine.commit(&workspace, &root, &NoAppState).await?,
            };
            json!({
                "contentId": outcome.content_id,
                "previous": outcome.previous,
                "files": outcome.file_count,
                "folders": outcome.folder_count,
                "truncated": outcome.truncated,
                "diagnostics": outcome.diagnostics,
            })
        }
        Command::Restore {
            content_id,
            workspace,
            into,
        } => {
            let outcome = match (content_id, workspace) {
                (Some(id), _) => engine.restore(&ContentId::new(id), &into).await?,
                (None, Some(ws)) => engine.restore_current(&ws, &into).await?,
                (None, None) => bail!("restore needs a content id or --workspace"),
            };
            json!({
                "contentId": outcome.content_id,
                "workspaceId": outcome.snapshot.workspace_id,
                "createdAt": outcome.snapshot.created_at,
                "files": outcome.snapshot.files.len(),
                "diagnostics": outcome.diagnostics,
            })
        }
        Command::Show { workspace } => match engine.current(&workspace).await? {
            Some(record) => serde_json::to_value(record)?,
            None => bail!("no snapshot recorded for workspace '{}'", workspace),
        },
    };

    Ok(serde_json::to_string_pretty(&output)?)
}
