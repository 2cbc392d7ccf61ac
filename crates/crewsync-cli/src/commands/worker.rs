use std::path::Path;

use crewsync_core::{Worker, WorkerRole};

use crate::cli::WorkerCommands;
use crate::commands::common::{format_worker_lines, open_database, parse_worker_id};
use crate::error::CliError;

pub async fn run_worker(command: WorkerCommands, db_path: &Path) -> Result<(), CliError> {
    match command {
        WorkerCommands::Add {
            name,
            role,
            phone,
            push_token,
        } => {
            let worker = add_worker(&name, role.into(), phone, push_token, db_path).await?;
            println!("Created {} {} ({})", worker.role, worker.name, worker.id);
        }
        WorkerCommands::List { json } => run_worker_list(json, db_path).await?,
        WorkerCommands::Remove { id } => {
            let worker_id = parse_worker_id(&id)?;
            let db = open_database(db_path).await?;
            db.delete_worker(&worker_id).await?;
            println!("Removed worker {worker_id}");
        }
    }
    Ok(())
}

pub async fn add_worker(
    name: &str,
    role: WorkerRole,
    phone: Option<String>,
    push_token: Option<String>,
    db_path: &Path,
) -> Result<Worker, CliError> {
    let db = open_database(db_path).await?;
    Ok(db.create_worker(name, role, phone, push_token).await?)
}

async fn run_worker_list(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let workers = db.list_workers().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&workers)?);
        return Ok(());
    }

    if workers.is_empty() {
        println!("No workers yet. Add one with `crewsync worker add NAME`.");
        return Ok(());
    }

    for line in format_worker_lines(&workers) {
        println!("{line}");
    }
    Ok(())
}
