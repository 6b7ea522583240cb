//! CLI smoke entry point.
//!
//! # Responsibility
//! - Exercise the tracker end to end against a real SQLite store.
//! - Keep output deterministic apart from ids and timestamps.
//!
//! Environment:
//! - `ESSENCE_DB_PATH`: database file, in-memory when unset.
//! - `ESSENCE_LOG_DIR`: absolute log directory, file logging off when unset.
//! - `ESSENCE_LOG_LEVEL`: log level, build default when unset.
//! - `ESSENCE_OWNER`: acting owner, `cli-user` when unset.

use essence_core::db::{open_db, open_db_in_memory};
use essence_core::{
    default_log_level, init_logging, CompletionService, EventLogService, ProjectOverview,
    ProjectService, SqliteEventRepository, SqliteProgressRepository, SqliteProjectRepository,
    Taxonomy,
};
use log::info;
use std::error::Error;
use std::process::ExitCode;

const DEFAULT_OWNER: &str = "cli-user";

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("essence_cli error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    if let Some(log_dir) = env_value("ESSENCE_LOG_DIR") {
        let level = env_value("ESSENCE_LOG_LEVEL").unwrap_or_else(|| default_log_level().into());
        init_logging(&level, &log_dir)?;
    }

    let conn = match env_value("ESSENCE_DB_PATH") {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };
    let owner = env_value("ESSENCE_OWNER").unwrap_or_else(|| DEFAULT_OWNER.to_string());
    let owner = Some(owner.as_str());
    info!(
        "event=cli_start module=cli status=ok version={}",
        essence_core::core_version()
    );

    let taxonomy = Taxonomy::builtin()?;
    let projects = ProjectService::new(SqliteProjectRepository::try_new(&conn)?, taxonomy);
    let completion = CompletionService::new(SqliteProgressRepository::try_new(&conn)?);
    let events = EventLogService::new(SqliteEventRepository::try_new(&conn)?);

    let project_id = projects.ensure_default_project(owner)?;
    let overview = projects.project_overview(owner, project_id)?;

    // Advance the first alpha by one state.
    if let Some(first) = overview.concerns.iter().flat_map(|c| c.alphas.iter()).next() {
        let current = first
            .alpha
            .current_state_id
            .and_then(|id| first.states.iter().find(|state| state.id == id))
            .map_or(0, |state| state.order);
        if let Some(next) = first.states.iter().find(|state| state.order == current + 1) {
            completion.set_current_state(owner, first.alpha.id, Some(next.id))?;
            events.log_event(
                owner,
                project_id,
                &first.alpha.name,
                &format!("moved to {}", next.name),
            )?;
        }
    }

    print_overview(&projects.project_overview(owner, project_id)?);
    print!("{}", events.export_events_csv(owner, project_id)?);
    Ok(())
}

fn print_overview(overview: &ProjectOverview) {
    println!("project {} ({})", overview.project.name, overview.project.id);
    for concern in &overview.concerns {
        println!(
            "  {:<10} {:>6.2}%",
            concern.concern.name, concern.concern.completion
        );
        for alpha in &concern.alphas {
            println!(
                "    {:<16} {:>6.2}%  {}",
                alpha.alpha.name,
                alpha.alpha.completion,
                alpha.current_state_name().unwrap_or("-")
            );
        }
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
