use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use sqlx::SqlitePool;

use finvault_lib::catalog::{EntityKind, EntitySelection};
use finvault_lib::config::{default_db_path, EngineConfig};
use finvault_lib::db::open_sqlite_pool;
use finvault_lib::import::load_archive;
use finvault_lib::progress::log_progress;
use finvault_lib::report::write_run_report;
use finvault_lib::workspace::create_workspace;
use finvault_lib::{
    Exporter, ImportMode, Importer, ResetOptions, Resetter, RunOutcome, WorkspaceId,
};

const EXIT_PARTIAL: i32 = 2;

#[derive(Debug, Parser)]
#[command(name = "finvault", about = "Back up, restore and reset finance workspaces", version)]
struct Cli {
    /// Path of the SQLite database; defaults to the platform data directory.
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,
    /// JSON file with engine settings.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Workspace management.
    #[command(subcommand)]
    Workspace(WorkspaceCommand),
    /// Export entity tables of a workspace into a backup archive.
    Export {
        #[arg(long)]
        workspace: String,
        /// Comma-separated entity types; all when omitted.
        #[arg(long, value_delimiter = ',')]
        only: Vec<EntityKind>,
        /// Directory the archive is written to.
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Import a backup archive into a workspace.
    Import {
        #[arg(long)]
        workspace: String,
        #[arg(long, value_name = "FILE")]
        archive: PathBuf,
        /// `clean` replaces existing rows, `incremental` only adds missing ones.
        #[arg(long)]
        mode: ImportMode,
        #[arg(long, value_delimiter = ',')]
        only: Vec<EntityKind>,
        #[arg(long, value_name = "DIR")]
        report_dir: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Count what a reset would delete.
    Preview {
        #[arg(long)]
        workspace: String,
        #[arg(long, value_delimiter = ',')]
        only: Vec<EntityKind>,
        #[arg(long)]
        json: bool,
    },
    /// Delete entity tables of a workspace.
    Reset {
        #[arg(long)]
        workspace: String,
        #[arg(long, value_delimiter = ',')]
        only: Vec<EntityKind>,
        /// Export the selected tables before deleting them.
        #[arg(long)]
        backup: bool,
        /// Directory the safety backup is written to.
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
        #[arg(long, value_name = "DIR")]
        report_dir: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
enum WorkspaceCommand {
    /// Create a workspace and print its id.
    Create {
        #[arg(long)]
        name: String,
    },
}

fn main() {
    finvault_lib::init_logging();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let db_path = match cli.db {
        Some(path) => path,
        None => default_db_path().context("determine database path")?,
    };

    let runtime = tokio::runtime::Runtime::new().context("start async runtime")?;
    runtime.block_on(async {
        let pool = open_sqlite_pool(&db_path).await?;
        let result = dispatch(&pool, &db_path, config, cli.command).await;
        pool.close().await;
        result
    })
}

async fn dispatch(
    pool: &SqlitePool,
    db_path: &Path,
    mut config: EngineConfig,
    command: Commands,
) -> Result<i32> {
    match command {
        Commands::Workspace(WorkspaceCommand::Create { name }) => {
            let id = create_workspace(pool, &name).await?;
            println!("{id}");
            Ok(0)
        }
        Commands::Export {
            workspace,
            only,
            out,
            json,
        } => {
            let ws = WorkspaceId::parse(&workspace)?;
            let mut sink = log_progress;
            let archive = Exporter::new(pool, &config)
                .export(&ws, &selection(&only), &mut sink)
                .await?;
            let dir = out.unwrap_or_else(|| PathBuf::from("."));
            let path = archive.write_to(&dir)?;
            if json {
                print_json(&serde_json::json!({
                    "path": path.display().to_string(),
                    "summary": archive.summary,
                }))?;
            } else {
                for (kind, count) in &archive.summary.per_entity_counts {
                    println!("{:<16} {count}", kind.table());
                }
                println!("Exported {} rows to {}", archive.summary.total_rows, path.display());
            }
            Ok(0)
        }
        Commands::Import {
            workspace,
            archive,
            mode,
            only,
            report_dir,
            json,
        } => {
            let ws = WorkspaceId::parse(&workspace)?;
            let bytes = std::fs::read(&archive)
                .with_context(|| format!("read archive {}", archive.display()))?;
            let loaded = load_archive(&bytes, &config)?;
            if loaded.manifest.workspace_id != ws {
                tracing::info!(
                    target: "finvault",
                    area = "import",
                    event = "cross_workspace_restore",
                    source_workspace = loaded.manifest.workspace_id.as_str(),
                    workspace_id = ws.as_str()
                );
            }
            let mut payload = loaded.payload;
            if !only.is_empty() {
                payload.retain(&selection(&only));
            }

            let mut sink = log_progress;
            let report = Importer::new(pool, &config)
                .import(&ws, payload, mode, &mut sink)
                .await;
            if let Some(dir) = report_dir {
                write_run_report(&dir, "import", &ws, Some(&archive), &report)?;
            }
            if json {
                print_json(&report)?;
            } else {
                for (kind, count) in &report.per_entity_counts {
                    println!("{:<16} {count}", kind.table());
                }
                print_problems(&report.warnings, &report.errors);
                println!(
                    "Imported {} rows ({}) in {} ms",
                    report.total_imported, report.mode, report.elapsed_ms
                );
            }
            Ok(exit_code(report.outcome))
        }
        Commands::Preview {
            workspace,
            only,
            json,
        } => {
            let ws = WorkspaceId::parse(&workspace)?;
            let preview = Resetter::new(pool, &config)
                .preview(&ws, &selection(&only))
                .await?;
            if json {
                print_json(&preview)?;
            } else {
                for (kind, count) in &preview.per_entity_counts {
                    println!("{:<16} {count}", kind.table());
                }
                println!("{} rows would be deleted", preview.total_rows);
            }
            Ok(0)
        }
        Commands::Reset {
            workspace,
            only,
            backup,
            out,
            yes,
            report_dir,
            json,
        } => {
            if !yes {
                bail!("reset deletes data; pass --yes to confirm");
            }
            let ws = WorkspaceId::parse(&workspace)?;
            if backup {
                if let Some(dir) = out {
                    config.backup_dir = Some(dir);
                } else if config.backup_dir.is_none() {
                    let base = db_path.parent().unwrap_or_else(|| Path::new("."));
                    config.backup_dir = Some(base.join("backups"));
                }
            }

            let mut sink = log_progress;
            let report = Resetter::new(pool, &config)
                .reset(
                    &ws,
                    &selection(&only),
                    ResetOptions {
                        create_backup_before_reset: backup,
                    },
                    &mut sink,
                )
                .await;
            if let Some(dir) = report_dir {
                write_run_report(&dir, "reset", &ws, None, &report)?;
            }
            if json {
                print_json(&report)?;
            } else {
                for (kind, count) in &report.per_entity_counts {
                    println!("{:<16} {count}", kind.table());
                }
                if let Some(path) = &report.backup_path {
                    println!("Backup stored at {path}");
                }
                print_problems(&report.warnings, &report.errors);
                println!("Deleted {} rows in {} ms", report.total_deleted, report.elapsed_ms);
            }
            Ok(exit_code(report.outcome))
        }
    }
}

fn selection(only: &[EntityKind]) -> EntitySelection {
    if only.is_empty() {
        EntitySelection::all()
    } else {
        EntitySelection::only(only)
    }
}

fn exit_code(outcome: RunOutcome) -> i32 {
    match outcome {
        RunOutcome::Success => 0,
        RunOutcome::PartialFailure | RunOutcome::Aborted => EXIT_PARTIAL,
    }
}

fn print_problems(warnings: &[String], errors: &[finvault_lib::AppError]) {
    for warning in warnings {
        println!("warning: {warning}");
    }
    for error in errors {
        println!("error: {error}");
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let serialized = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{serialized}");
    Ok(())
}
