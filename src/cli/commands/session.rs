//! Session command implementations.

use crate::cli::SessionCommands;
use crate::cli::commands::Workspace;
use crate::error::{Error, Result};
use crate::session::{SessionInfo, SessionStore};
use serde::Serialize;

/// Output for session list command.
#[derive(Serialize)]
struct SessionListOutput {
    sessions: Vec<SessionInfo>,
    count: usize,
}

/// Execute session commands.
///
/// # Errors
///
/// Returns an error if the session is unknown or the sessions directory
/// cannot be read.
pub fn execute(command: &SessionCommands, workspace: &Workspace, json: bool) -> Result<()> {
    let store = workspace.store();

    match command {
        SessionCommands::List => list(&store, json),
        SessionCommands::Delete { id } => delete(&store, id, json),
        SessionCommands::Prune { older_than_hours } => prune(&store, *older_than_hours, json),
    }
}

fn list(store: &SessionStore, json: bool) -> Result<()> {
    let sessions = store.list()?;

    if json {
        let output = SessionListOutput {
            count: sessions.len(),
            sessions,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if sessions.is_empty() {
        println!("No sessions found.");
    } else {
        println!("Sessions ({} found):", sessions.len());
        println!();
        for session in &sessions {
            let status_icon = if session.has_result { "○" } else { "●" };
            let status = if session.has_result { "applied" } else { "pending" };
            println!("{status_icon} {} [{status}]", session.id);
            println!("  Created: {}", session.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
    }

    Ok(())
}

fn delete(store: &SessionStore, id: &str, json: bool) -> Result<()> {
    let id = id.trim();
    if id.is_empty() {
        return Err(Error::MissingSessionId);
    }
    if !store.exists(id) {
        return Err(Error::UnknownSession { id: id.to_string() });
    }

    store.delete(id)?;

    if json {
        let output = serde_json::json!({
            "id": id,
            "deleted": true
        });
        println!("{output}");
    } else {
        println!("Deleted session: {id}");
    }

    Ok(())
}

fn prune(store: &SessionStore, older_than_hours: u32, json: bool) -> Result<()> {
    let removed = store.prune(chrono::Duration::hours(i64::from(older_than_hours)))?;

    if json {
        let output = serde_json::json!({
            "removed": removed,
            "older_than_hours": older_than_hours
        });
        println!("{output}");
    } else {
        println!("Pruned {removed} session(s) older than {older_than_hours}h");
    }

    Ok(())
}
